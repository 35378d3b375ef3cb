use crate::balance::Balances;
use crate::schemas::UserId;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Clone, Debug)]
pub struct PersonalBalance {
    pub id: UserId,
    pub balance: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Exchange {
    pub payer: UserId,
    pub receiver: UserId,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

// Matches the biggest debt with the biggest credit until one side runs out.
// Whatever is left on the other side is residue from rounding or from
// percentage splits that don't add up to 100.
fn get_simplified_exchanges(
    mut payers: Vec<PersonalBalance>,
    mut receivers: Vec<PersonalBalance>,
) -> Vec<Exchange> {
    // Ascending by amount, so the largest (lowest id on ties) ends up last
    let order = |a: &PersonalBalance, b: &PersonalBalance| {
        a.balance.cmp(&b.balance).then(b.id.cmp(&a.id))
    };
    payers.sort_by(order);
    receivers.sort_by(order);

    let mut exchanges = Vec::new();
    loop {
        let (Some(payer), Some(receiver)) = (payers.last_mut(), receivers.last_mut()) else {
            break;
        };
        let amount = payer.balance.min(receiver.balance);
        exchanges.push(Exchange {
            payer: payer.id,
            receiver: receiver.id,
            amount,
        });
        payer.balance -= amount;
        receiver.balance -= amount;
        if payer.balance.is_zero() {
            payers.pop();
        }
        if receiver.balance.is_zero() {
            receivers.pop();
        }
    }
    exchanges
}

pub fn get_exchanges_from_balances(balances: &Balances) -> Vec<Exchange> {
    // Divide people into payers and receivers
    let mut payers = Vec::new();
    let mut receivers = Vec::new();

    for (id, balance) in balances {
        if balance.is_zero() {
            continue;
        }
        let person = PersonalBalance {
            id: *id,
            balance: balance.abs(),
        };
        if balance.is_sign_negative() {
            payers.push(person);
        } else {
            receivers.push(person);
        }
    }

    get_simplified_exchanges(payers, receivers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balances(entries: &[(UserId, Decimal)]) -> Balances {
        entries.iter().copied().collect()
    }

    #[test]
    fn settled_group_needs_no_exchanges() {
        let exchanges = get_exchanges_from_balances(&balances(&[
            (1, Decimal::ZERO),
            (2, Decimal::ZERO),
        ]));
        assert!(exchanges.is_empty());
    }

    #[test]
    fn single_debt_is_paid_directly() {
        let exchanges = get_exchanges_from_balances(&balances(&[
            (1, Decimal::from(50)),
            (2, Decimal::from(-50)),
        ]));
        assert_eq!(
            exchanges,
            vec![Exchange {
                payer: 2,
                receiver: 1,
                amount: Decimal::from(50),
            }]
        );
    }

    #[test]
    fn largest_debts_are_matched_first() {
        let exchanges = get_exchanges_from_balances(&balances(&[
            (1, Decimal::from(70)),
            (2, Decimal::from(30)),
            (3, Decimal::from(-60)),
            (4, Decimal::from(-40)),
        ]));
        assert_eq!(
            exchanges,
            vec![
                Exchange {
                    payer: 3,
                    receiver: 1,
                    amount: Decimal::from(60),
                },
                Exchange {
                    payer: 4,
                    receiver: 1,
                    amount: Decimal::from(10),
                },
                Exchange {
                    payer: 4,
                    receiver: 2,
                    amount: Decimal::from(30),
                },
            ]
        );
    }

    #[test]
    fn rounding_residue_is_left_unmatched() {
        let exchanges = get_exchanges_from_balances(&balances(&[
            (1, Decimal::new(6667, 2)),
            (2, Decimal::new(-3333, 2)),
            (3, Decimal::new(-3333, 2)),
        ]));
        assert_eq!(exchanges.len(), 2);
        assert_eq!(exchanges[0].payer, 2);
        assert_eq!(exchanges[1].payer, 3);
        assert!(exchanges
            .iter()
            .all(|exchange| exchange.receiver == 1 && exchange.amount == Decimal::new(3333, 2)));
    }

    #[test]
    fn exchange_serializes_amount_as_number() {
        let json = serde_json::to_value(Exchange {
            payer: 2,
            receiver: 1,
            amount: Decimal::new(1250, 2),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"payer": 2, "receiver": 1, "amount": 12.5}));
    }
}
