use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::Store;
use crate::error::StoreError;
use crate::schemas::{Expense, ExpenseId, Group, GroupId, NewExpense, User, UserId};

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    groups: BTreeMap<GroupId, Group>,
    expenses: BTreeMap<ExpenseId, Expense>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// Rows are never deleted, so the next id is always one past the largest.
fn next_id<T>(table: &BTreeMap<i64, T>) -> i64 {
    table.keys().next_back().map_or(1, |last| last + 1)
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_user(&self, name: String) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        let user = User {
            id: next_id(&tables.users),
            name,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn find_users(&self, ids: &[UserId]) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = ids
            .iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect();
        users.sort_by_key(|user| user.id);
        users.dedup_by_key(|user| user.id);
        Ok(users)
    }

    async fn create_group(
        &self,
        name: String,
        user_ids: Vec<UserId>,
    ) -> Result<Group, StoreError> {
        let mut tables = self.tables.write().await;
        let group = Group {
            id: next_id(&tables.groups),
            name,
            user_ids,
        };
        tables.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        Ok(self.tables.read().await.groups.values().cloned().collect())
    }

    async fn get_group(&self, id: GroupId) -> Result<Option<Group>, StoreError> {
        Ok(self.tables.read().await.groups.get(&id).cloned())
    }

    async fn create_expense(&self, expense: NewExpense) -> Result<Expense, StoreError> {
        let mut tables = self.tables.write().await;
        let expense = Expense {
            id: next_id(&tables.expenses),
            description: expense.description,
            amount: expense.amount,
            group_id: expense.group_id,
            payer_id: expense.payer_id,
            split_type: expense.split_type.to_string(),
            split_data: expense.split_data,
            date_added: Utc::now(),
        };
        tables.expenses.insert(expense.id, expense.clone());
        Ok(expense)
    }

    async fn list_expenses(&self) -> Result<Vec<Expense>, StoreError> {
        Ok(self.tables.read().await.expenses.values().cloned().collect())
    }

    async fn list_group_expenses(&self, group_id: GroupId) -> Result<Vec<Expense>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .expenses
            .values()
            .filter(|expense| expense.group_id == group_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::SplitPolicy;
    use rust_decimal::Decimal;

    fn new_expense(group_id: GroupId, payer_id: UserId) -> NewExpense {
        NewExpense {
            description: "Dinner".to_string(),
            amount: Decimal::new(4250, 2),
            group_id,
            payer_id,
            split_type: SplitPolicy::Equal,
            split_data: None,
        }
    }

    #[actix_web::test]
    async fn ids_are_sequential_per_table() {
        let store = InMemoryStore::new();
        let alice = store.create_user("Alice".to_string()).await.unwrap();
        let bob = store.create_user("Bob".to_string()).await.unwrap();
        let group = store
            .create_group("Trip".to_string(), vec![alice.id, bob.id])
            .await
            .unwrap();

        assert_eq!(alice.id, 1);
        assert_eq!(bob.id, 2);
        assert_eq!(group.id, 1);
        assert_eq!(store.list_users().await.unwrap(), vec![alice, bob]);
    }

    #[actix_web::test]
    async fn find_users_skips_unknown_ids() {
        let store = InMemoryStore::new();
        let alice = store.create_user("Alice".to_string()).await.unwrap();
        let bob = store.create_user("Bob".to_string()).await.unwrap();

        let found = store.find_users(&[bob.id, 42, alice.id]).await.unwrap();
        assert_eq!(found, vec![alice, bob]);
    }

    #[actix_web::test]
    async fn group_expenses_are_filtered_and_ordered() {
        let store = InMemoryStore::new();
        let first = store.create_expense(new_expense(1, 1)).await.unwrap();
        store.create_expense(new_expense(2, 1)).await.unwrap();
        let third = store.create_expense(new_expense(1, 2)).await.unwrap();

        let expenses = store.list_group_expenses(1).await.unwrap();
        assert_eq!(
            expenses.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![first.id, third.id]
        );
        assert_eq!(expenses[0].split_type, "equal");
        assert_eq!(store.list_expenses().await.unwrap().len(), 3);
    }

    #[actix_web::test]
    async fn missing_group_is_none() {
        let store = InMemoryStore::new();
        assert_eq!(store.get_group(9).await.unwrap(), None);
    }
}
