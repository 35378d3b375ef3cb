use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::BalanceError;
use crate::schemas::{Expense, Group, SplitData, SplitPolicy, UserId};

/// Signed balance per member: positive means the group owes the member.
pub type Balances = BTreeMap<UserId, Decimal>;

/// Decimal places every share is rounded to before it is applied.
pub const CURRENCY_SCALE: u32 = 2;

pub fn compute_balance_from_group(
    group: &Group,
    expenses: &[Expense],
) -> Result<Balances, BalanceError> {
    compute_balances(&group.members(), expenses)
}

/// Accumulates every expense into a per-member balance.
///
/// The result always has exactly `members` as keys, starting from zero.
/// Shares are rounded half-even to [`CURRENCY_SCALE`] and the payer is
/// credited with the amount minus their own rounded share, so the total of a
/// single expense may be off by half a cent per participant.
pub fn compute_balances(
    members: &BTreeSet<UserId>,
    expenses: &[Expense],
) -> Result<Balances, BalanceError> {
    let mut balance: Balances = members.iter().map(|id| (*id, Decimal::ZERO)).collect();
    for expense in expenses {
        match expense.split_policy()? {
            SplitPolicy::Equal => apply_equal(&mut balance, expense)?,
            SplitPolicy::Percentage => apply_percentage(&mut balance, expense)?,
        }
    }
    Ok(balance)
}

fn apply_equal(balance: &mut Balances, expense: &Expense) -> Result<(), BalanceError> {
    if balance.is_empty() {
        return Err(BalanceError::EmptyGroup);
    }
    let share = expense
        .amount
        .checked_div(Decimal::from(balance.len()))
        .map(round_share)
        .ok_or(BalanceError::Overflow(expense.id))?;
    for (member, value) in balance.iter_mut() {
        *value = if *member == expense.payer_id {
            credit_payer(*value, expense, share)?
        } else {
            debit(*value, expense, share)?
        };
    }
    Ok(())
}

fn apply_percentage(balance: &mut Balances, expense: &Expense) -> Result<(), BalanceError> {
    let split_data = expense.split_data.as_ref().ok_or_else(|| {
        BalanceError::InvalidPercentageData(format!("expense {} has no split data", expense.id))
    })?;
    for (member, percentage) in parse_split_data(split_data)? {
        // Entries for non-members are ignored, percentages are not required to sum to 100.
        let Some(value) = balance.get_mut(&member) else {
            continue;
        };
        let owed = expense
            .amount
            .checked_mul(percentage)
            .and_then(|total| total.checked_div(Decimal::ONE_HUNDRED))
            .map(round_share)
            .ok_or(BalanceError::Overflow(expense.id))?;
        *value = if member == expense.payer_id {
            credit_payer(*value, expense, owed)?
        } else {
            debit(*value, expense, owed)?
        };
    }
    Ok(())
}

// The payer fronted the whole amount but still owes their own share.
fn credit_payer(
    value: Decimal,
    expense: &Expense,
    own_share: Decimal,
) -> Result<Decimal, BalanceError> {
    expense
        .amount
        .checked_sub(own_share)
        .and_then(|credit| value.checked_add(credit))
        .ok_or(BalanceError::Overflow(expense.id))
}

fn debit(value: Decimal, expense: &Expense, share: Decimal) -> Result<Decimal, BalanceError> {
    value
        .checked_sub(share)
        .ok_or(BalanceError::Overflow(expense.id))
}

/// Reads the member ids out of the split data keys.
pub fn parse_split_data(split_data: &SplitData) -> Result<Vec<(UserId, Decimal)>, BalanceError> {
    split_data
        .iter()
        .map(|(key, percentage)| {
            key.trim()
                .parse::<UserId>()
                .map(|id| (id, *percentage))
                .map_err(|_| {
                    BalanceError::InvalidPercentageData(format!("{key:?} is not a user id"))
                })
        })
        .collect()
}

fn round_share(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointNearestEven)
}
