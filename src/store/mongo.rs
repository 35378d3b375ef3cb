use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Client, Collection, Database,
};
use serde::{de::DeserializeOwned, Deserialize};

use super::Store;
use crate::error::StoreError;
use crate::schemas::{Expense, Group, GroupId, NewExpense, User, UserId};

const USERS: &str = "users";
const GROUPS: &str = "groups";
const EXPENSES: &str = "expenses";
const COUNTERS: &str = "counters";

#[derive(Deserialize)]
struct Counter {
    seq: i64,
}

pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        // Fail at startup rather than on the first request
        client
            .database(database)
            .run_command(doc! { "ping": 1 }, None)
            .await?;
        Ok(Self {
            database: client.database(database),
        })
    }

    fn users(&self) -> Collection<User> {
        self.database.collection(USERS)
    }

    fn groups(&self) -> Collection<Group> {
        self.database.collection(GROUPS)
    }

    fn expenses(&self) -> Collection<Expense> {
        self.database.collection(EXPENSES)
    }

    /// Allocates the next integer id for `collection`.
    async fn next_id(&self, collection: &str) -> Result<i64, StoreError> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        let counter = self
            .database
            .collection::<Counter>(COUNTERS)
            .find_one_and_update(
                doc! { "_id": collection },
                doc! { "$inc": { "seq": 1_i64 } },
                options,
            )
            .await?
            .ok_or_else(|| StoreError::Corrupted(format!("no id counter for {collection}")))?;
        Ok(counter.seq)
    }
}

async fn find_sorted<T>(
    collection: &Collection<T>,
    filter: Document,
) -> Result<Vec<T>, StoreError>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let options = FindOptions::builder().sort(doc! { "id": 1 }).build();
    let cursor = collection.find(filter, options).await?;
    Ok(cursor.try_collect().await?)
}

#[async_trait]
impl Store for MongoStore {
    async fn create_user(&self, name: String) -> Result<User, StoreError> {
        let user = User {
            id: self.next_id(USERS).await?,
            name,
        };
        self.users().insert_one(&user, None).await?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        find_sorted(&self.users(), doc! {}).await
    }

    async fn find_users(&self, ids: &[UserId]) -> Result<Vec<User>, StoreError> {
        find_sorted(&self.users(), doc! { "id": { "$in": ids.to_vec() } }).await
    }

    async fn create_group(
        &self,
        name: String,
        user_ids: Vec<UserId>,
    ) -> Result<Group, StoreError> {
        let group = Group {
            id: self.next_id(GROUPS).await?,
            name,
            user_ids,
        };
        self.groups().insert_one(&group, None).await?;
        Ok(group)
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        find_sorted(&self.groups(), doc! {}).await
    }

    async fn get_group(&self, id: GroupId) -> Result<Option<Group>, StoreError> {
        Ok(self.groups().find_one(doc! { "id": id }, None).await?)
    }

    async fn create_expense(&self, expense: NewExpense) -> Result<Expense, StoreError> {
        let expense = Expense {
            id: self.next_id(EXPENSES).await?,
            description: expense.description,
            amount: expense.amount,
            group_id: expense.group_id,
            payer_id: expense.payer_id,
            split_type: expense.split_type.to_string(),
            split_data: expense.split_data,
            date_added: Utc::now(),
        };
        self.expenses().insert_one(&expense, None).await?;
        Ok(expense)
    }

    async fn list_expenses(&self) -> Result<Vec<Expense>, StoreError> {
        find_sorted(&self.expenses(), doc! {}).await
    }

    async fn list_group_expenses(&self, group_id: GroupId) -> Result<Vec<Expense>, StoreError> {
        find_sorted(&self.expenses(), doc! { "group_id": group_id }).await
    }
}
