use std::collections::BTreeMap;

use actix_web::{get, post, web, HttpResponse};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::balance::{compute_balance_from_group, parse_split_data, Balances, CURRENCY_SCALE};
use crate::error::ApiError;
use crate::exchange::get_exchanges_from_balances;
use crate::schemas::{
    Expense, ExpenseId, Group, GroupId, NewExpense, SplitData, SplitPolicy, User, UserId,
};
use crate::store::Store;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .service(health)
    .service(create_user)
    .service(get_users)
    .service(create_group)
    .service(get_groups)
    .service(get_group)
    .service(get_group_balances)
    .service(get_group_exchanges)
    .service(add_expense)
    .service(get_expenses);
}

#[derive(Deserialize)]
struct UserJson {
    name: Option<String>,
}

#[derive(Deserialize)]
struct GroupJson {
    name: Option<String>,
    user_ids: Option<Vec<UserId>>,
}

#[derive(Deserialize)]
struct ExpenseJson {
    description: Option<String>,
    amount: Option<Decimal>,
    group_id: Option<GroupId>,
    payer_id: Option<UserId>,
    split_type: Option<String>,
    split_data: Option<SplitData>,
}

#[derive(Serialize)]
struct GroupView {
    id: GroupId,
    name: String,
    users: Vec<User>,
}

impl GroupView {
    // Members keep the order they were added in
    fn new(group: Group, users: &BTreeMap<UserId, User>) -> Self {
        Self {
            id: group.id,
            name: group.name,
            users: group
                .user_ids
                .iter()
                .filter_map(|id| users.get(id).cloned())
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct ExpenseView {
    id: ExpenseId,
    description: String,
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
    group_id: GroupId,
    payer_id: UserId,
    split_type: String,
    split_data: Option<BTreeMap<String, f64>>,
    date_added: String,
}

impl From<Expense> for ExpenseView {
    fn from(expense: Expense) -> Self {
        Self {
            id: expense.id,
            description: expense.description,
            amount: expense.amount,
            group_id: expense.group_id,
            payer_id: expense.payer_id,
            split_type: expense.split_type,
            split_data: expense.split_data.map(|data| {
                data.into_iter()
                    .map(|(member, percentage)| (member, to_number(percentage)))
                    .collect()
            }),
            date_added: expense.date_added.to_rfc3339(),
        }
    }
}

fn to_number(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

fn required_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn users_by_id(users: Vec<User>) -> BTreeMap<UserId, User> {
    users.into_iter().map(|user| (user.id, user)).collect()
}

fn group_not_found(id: GroupId) -> ApiError {
    ApiError::NotFound(format!("Group with id {id} not found"))
}

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[post("/users")]
async fn create_user(
    store: web::Data<dyn Store>,
    json: web::Json<UserJson>,
) -> Result<HttpResponse, ApiError> {
    let name = required_text(json.into_inner().name)
        .ok_or_else(|| ApiError::BadRequest("Name is required".to_string()))?;
    let user = store.create_user(name).await?;
    tracing::info!(user_id = user.id, "User created");
    Ok(HttpResponse::Created().json(json!({
        "message": "User created successfully",
        "user": user,
    })))
}

#[get("/users")]
async fn get_users(store: web::Data<dyn Store>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(store.list_users().await?))
}

#[post("/groups")]
async fn create_group(
    store: web::Data<dyn Store>,
    json: web::Json<GroupJson>,
) -> Result<HttpResponse, ApiError> {
    let json = json.into_inner();
    let name = required_text(json.name)
        .ok_or_else(|| ApiError::BadRequest("Group name is required".to_string()))?;
    let requested = json
        .user_ids
        .filter(|ids| !ids.is_empty())
        .ok_or_else(|| ApiError::BadRequest("User IDs are required".to_string()))?;

    let mut user_ids = Vec::with_capacity(requested.len());
    for id in requested {
        if !user_ids.contains(&id) {
            user_ids.push(id);
        }
    }

    let users = users_by_id(store.find_users(&user_ids).await?);
    if let Some(missing) = user_ids.iter().find(|id| !users.contains_key(id)) {
        return Err(ApiError::NotFound(format!(
            "User with id {missing} not found"
        )));
    }

    let group = store.create_group(name, user_ids).await?;
    tracing::info!(group_id = group.id, members = group.user_ids.len(), "Group created");
    Ok(HttpResponse::Created().json(json!({
        "message": "Group created successfully",
        "group": GroupView::new(group, &users),
    })))
}

#[get("/groups")]
async fn get_groups(store: web::Data<dyn Store>) -> Result<HttpResponse, ApiError> {
    let users = users_by_id(store.list_users().await?);
    let groups: Vec<GroupView> = store
        .list_groups()
        .await?
        .into_iter()
        .map(|group| GroupView::new(group, &users))
        .collect();
    Ok(HttpResponse::Ok().json(groups))
}

#[get("/groups/{id}")]
async fn get_group(
    store: web::Data<dyn Store>,
    id: web::Path<GroupId>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let group = store.get_group(id).await?.ok_or_else(|| group_not_found(id))?;
    let users = users_by_id(store.find_users(&group.user_ids).await?);
    Ok(HttpResponse::Ok().json(GroupView::new(group, &users)))
}

async fn load_balances(store: &dyn Store, id: GroupId) -> Result<Balances, ApiError> {
    let group = store.get_group(id).await?.ok_or_else(|| group_not_found(id))?;
    let expenses = store.list_group_expenses(group.id).await?;
    let balances = compute_balance_from_group(&group, &expenses)?;
    tracing::debug!(group_id = id, expenses = expenses.len(), "Balances computed");
    Ok(balances)
}

#[get("/groups/{id}/balances")]
async fn get_group_balances(
    store: web::Data<dyn Store>,
    id: web::Path<GroupId>,
) -> Result<HttpResponse, ApiError> {
    let balances: BTreeMap<UserId, f64> = load_balances(store.get_ref(), id.into_inner())
        .await?
        .into_iter()
        .map(|(member, balance)| (member, to_number(balance)))
        .collect();
    Ok(HttpResponse::Ok().json(json!({ "balances": balances })))
}

#[get("/groups/{id}/exchanges")]
async fn get_group_exchanges(
    store: web::Data<dyn Store>,
    id: web::Path<GroupId>,
) -> Result<HttpResponse, ApiError> {
    let balances = load_balances(store.get_ref(), id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "exchanges": get_exchanges_from_balances(&balances),
    })))
}

/// Largest amount a single expense may carry.
const MAX_AMOUNT: i64 = 1_000_000_000_000_000;

/// Checks everything about an expense that doesn't need the store.
fn validate_expense(json: ExpenseJson) -> Result<NewExpense, ApiError> {
    let (Some(description), Some(amount), Some(group_id), Some(payer_id), Some(split_type)) = (
        required_text(json.description),
        json.amount,
        json.group_id,
        json.payer_id,
        json.split_type,
    ) else {
        return Err(ApiError::BadRequest(
            "Missing required expense data".to_string(),
        ));
    };
    let split_type: SplitPolicy = split_type
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid split type".to_string()))?;

    if amount <= Decimal::ZERO {
        return Err(ApiError::BadRequest("Amount must be positive".to_string()));
    }
    if amount > Decimal::from(MAX_AMOUNT) {
        return Err(ApiError::BadRequest(format!(
            "Amount must not exceed {MAX_AMOUNT}"
        )));
    }
    if amount.normalize().scale() > CURRENCY_SCALE {
        return Err(ApiError::BadRequest(format!(
            "Amount must have at most {CURRENCY_SCALE} decimal places"
        )));
    }

    let split_data = json.split_data.filter(|data| !data.is_empty());
    if split_type == SplitPolicy::Percentage {
        let data = split_data.as_ref().ok_or_else(|| {
            ApiError::BadRequest("split data required for percentage split".to_string())
        })?;
        let shares = parse_split_data(data).map_err(|err| ApiError::BadRequest(err.to_string()))?;
        if let Some((member, _)) = shares
            .iter()
            .find(|(_, percentage)| *percentage < Decimal::ZERO || *percentage > Decimal::ONE_HUNDRED)
        {
            return Err(ApiError::BadRequest(format!(
                "Percentage for user {member} must be between 0 and 100"
            )));
        }
    }

    Ok(NewExpense {
        description,
        amount,
        group_id,
        payer_id,
        split_type,
        split_data,
    })
}

#[post("/expenses")]
async fn add_expense(
    store: web::Data<dyn Store>,
    json: web::Json<ExpenseJson>,
) -> Result<HttpResponse, ApiError> {
    let expense = validate_expense(json.into_inner()).map_err(|err| {
        tracing::warn!("Rejected expense: {}", err);
        err
    })?;

    let group = store
        .get_group(expense.group_id)
        .await?
        .ok_or_else(|| group_not_found(expense.group_id))?;
    if store.find_users(&[expense.payer_id]).await?.is_empty() {
        return Err(ApiError::NotFound(format!(
            "Payer with id {} not found",
            expense.payer_id
        )));
    }
    if !group.user_ids.contains(&expense.payer_id) {
        return Err(ApiError::BadRequest(format!(
            "Payer with id {} is not a member of group {}",
            expense.payer_id, group.id
        )));
    }

    let expense = store.create_expense(expense).await?;
    tracing::info!(
        expense_id = expense.id,
        group_id = expense.group_id,
        split_type = %expense.split_type,
        "Expense added"
    );
    Ok(HttpResponse::Created().json(json!({
        "message": "Expense added successfully",
        "expense": ExpenseView::from(expense),
    })))
}

#[get("/expenses")]
async fn get_expenses(store: web::Data<dyn Store>) -> Result<HttpResponse, ApiError> {
    let expenses: Vec<ExpenseView> = store
        .list_expenses()
        .await?
        .into_iter()
        .map(ExpenseView::from)
        .collect();
    Ok(HttpResponse::Ok().json(expenses))
}
