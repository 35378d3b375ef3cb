//! Persistence port.
//!
//! Handlers only see [`Store`]; `MongoStore` backs production, `InMemoryStore`
//! is used when no database is configured and in tests.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::schemas::{Expense, Group, GroupId, NewExpense, User, UserId};

mod memory;
mod mongo;

pub use memory::InMemoryStore;
pub use mongo::MongoStore;

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, name: String) -> Result<User, StoreError>;

    /// All users ordered by id
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Users with the given ids, in id order. Unknown ids are skipped.
    async fn find_users(&self, ids: &[UserId]) -> Result<Vec<User>, StoreError>;

    /// Membership must already be validated and deduplicated.
    async fn create_group(&self, name: String, user_ids: Vec<UserId>)
        -> Result<Group, StoreError>;

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError>;

    async fn get_group(&self, id: GroupId) -> Result<Option<Group>, StoreError>;

    async fn create_expense(&self, expense: NewExpense) -> Result<Expense, StoreError>;

    async fn list_expenses(&self) -> Result<Vec<Expense>, StoreError>;

    /// Expenses of one group in creation order
    async fn list_group_expenses(&self, group_id: GroupId) -> Result<Vec<Expense>, StoreError>;
}
