use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::BalanceError;

pub type UserId = i64;
pub type GroupId = i64;
pub type ExpenseId = i64;

/// Percentage share per member, keyed by the member id as written in the request.
pub type SplitData = BTreeMap<String, Decimal>;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub user_ids: Vec<UserId>,
}

impl Group {
    pub fn members(&self) -> BTreeSet<UserId> {
        self.user_ids.iter().copied().collect()
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub description: String,
    pub amount: Decimal,
    pub group_id: GroupId,
    pub payer_id: UserId,
    // Raw tag, parsed when balances are computed
    pub split_type: String,
    pub split_data: Option<SplitData>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date_added: DateTime<Utc>,
}

impl Expense {
    pub fn split_policy(&self) -> Result<SplitPolicy, BalanceError> {
        self.split_type.parse()
    }
}

/// An expense that passed request validation but has no id yet.
#[derive(Clone, Debug, PartialEq)]
pub struct NewExpense {
    pub description: String,
    pub amount: Decimal,
    pub group_id: GroupId,
    pub payer_id: UserId,
    pub split_type: SplitPolicy,
    pub split_data: Option<SplitData>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SplitPolicy {
    Equal,
    Percentage,
}

impl SplitPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitPolicy::Equal => "equal",
            SplitPolicy::Percentage => "percentage",
        }
    }
}

impl fmt::Display for SplitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitPolicy {
    type Err = BalanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equal" => Ok(SplitPolicy::Equal),
            "percentage" => Ok(SplitPolicy::Percentage),
            other => Err(BalanceError::UnknownSplitPolicy(other.to_string())),
        }
    }
}
