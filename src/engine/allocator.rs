//! Oldest-first spend allocation.
//!
//! Allocation is a pure function of the ordered history and the balances read
//! from the store; the [`Ledger`](super::Ledger) persists whatever plan comes out.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use super::error::InsufficientPoints;
use super::state::Balances;
use crate::model::{Payer, Points, Transaction};

/// One payer's share of a spend. `points` is always negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Debit {
    pub payer: Payer,
    pub points: Points,
}

/// The debits produced by one spend, in the order payers were first drawn from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SpendPlan(Vec<Debit>);

impl SpendPlan {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Debit> + '_ {
        self.0.iter()
    }

    /// Total points spent, as a positive number.
    pub fn total(&self) -> Points {
        self.0.iter().map(|debit| -debit.points).sum()
    }

    pub fn into_debits(self) -> Vec<Debit> {
        self.0
    }
}

/// Decide how much to debit from each payer to spend exactly `requested` points.
///
/// `history` must be in ledger order (timestamp ascending, ties by insertion).
/// Credits are drawn oldest-first across all payers; a payer is never drawn
/// past its balance.
pub fn allocate(
    history: &[Transaction],
    balances: &Balances,
    requested: Points,
) -> Result<SpendPlan, InsufficientPoints> {
    let total = balances.total();
    if requested > total {
        return Err(InsufficientPoints::Exceeds(requested, total));
    }

    let spendable = unconsumed_credits(history);
    let mut remaining = requested;
    let mut spent: Vec<(&str, Points)> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();

    for (tx, available) in history.iter().zip(spendable) {
        if remaining <= 0 {
            break;
        }
        if available <= 0 {
            continue;
        }

        let payer = tx.payer.as_str();
        let already = slots.get(payer).map_or(0, |&slot| spent[slot].1);
        let headroom = balances.get(payer) - already;
        let draw = available.min(headroom).min(remaining);
        if draw <= 0 {
            continue;
        }

        let slot = *slots.entry(payer).or_insert_with(|| {
            spent.push((payer, 0));
            spent.len() - 1
        });
        spent[slot].1 += draw;
        remaining -= draw;
    }

    if remaining > 0 {
        return Err(InsufficientPoints::Unallocated(remaining, requested));
    }

    Ok(SpendPlan(
        spent
            .into_iter()
            .filter(|(_, points)| *points > 0)
            .map(|(payer, points)| Debit {
                payer: payer.to_string(),
                points: -points,
            })
            .collect(),
    ))
}

/// For every transaction in `history`, the part of its credit that earlier
/// debits of the same payer have not already used up.
///
/// Debits consume their payer's oldest open credits first. A debit larger than
/// what is open is carried forward and settled against the payer's next credits.
fn unconsumed_credits(history: &[Transaction]) -> Vec<Points> {
    let mut open = vec![0; history.len()];
    let mut lots: HashMap<&str, VecDeque<usize>> = HashMap::new();
    let mut owed: HashMap<&str, Points> = HashMap::new();

    for (idx, tx) in history.iter().enumerate() {
        let payer = tx.payer.as_str();

        if tx.is_credit() {
            let debt = owed.entry(payer).or_default();
            let settled = tx.points.min(*debt);
            *debt -= settled;
            open[idx] = tx.points - settled;
            if open[idx] > 0 {
                lots.entry(payer).or_default().push_back(idx);
            }
        } else if tx.points < 0 {
            let mut due = tx.points.saturating_neg();
            let queue = lots.entry(payer).or_default();
            while due > 0 {
                let Some(&oldest) = queue.front() else { break };
                let take = open[oldest].min(due);
                open[oldest] -= take;
                due -= take;
                if open[oldest] == 0 {
                    queue.pop_front();
                }
            }
            let debt = owed.entry(payer).or_default();
            *debt = debt.saturating_add(due);
        }
    }

    open
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    // test utils

    fn on(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, month, day, hour, 0, 0).unwrap()
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        on(10, day, hour)
    }

    fn tx(payer: &str, points: Points, timestamp: DateTime<Utc>) -> Transaction {
        Transaction::new(payer, points, timestamp)
    }

    fn plan_of(
        history: &[Transaction],
        requested: Points,
    ) -> Result<Vec<(String, Points)>, InsufficientPoints> {
        let balances = Balances::from_transactions(history);
        allocate(history, &balances, requested).map(|plan| {
            plan.into_debits()
                .into_iter()
                .map(|debit| (debit.payer, debit.points))
                .collect()
        })
    }

    fn scenario() -> Vec<Transaction> {
        vec![
            tx("DANNON", 300, at(31, 10)),
            tx("UNILEVER", 200, at(31, 11)),
            tx("DANNON", -200, at(31, 15)),
            tx("MILLER COORS", 10000, on(11, 1, 14)),
            tx("DANNON", 1000, on(11, 2, 14)),
        ]
    }

    #[test]
    fn spends_oldest_points_first_across_payers() {
        let plan = plan_of(&scenario(), 5000).unwrap();
        assert_eq!(
            plan,
            vec![
                ("DANNON".to_string(), -100),
                ("UNILEVER".to_string(), -200),
                ("MILLER COORS".to_string(), -4700),
            ]
        );
    }

    #[test]
    fn zero_spend_is_an_empty_plan() {
        let balances = Balances::from_transactions(&scenario());
        let plan = allocate(&scenario(), &balances, 0).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.total(), 0);
    }

    #[test]
    fn empty_ledger_can_only_spend_zero() {
        assert!(plan_of(&[], 0).unwrap().is_empty());
        assert_eq!(plan_of(&[], 1), Err(InsufficientPoints::Exceeds(1, 0)));
    }

    #[test]
    fn spend_over_total_fails() {
        let history = vec![tx("DANNON", 5000, at(2, 14))];
        let err = plan_of(&history, 10000).unwrap_err();
        assert_eq!(err, InsufficientPoints::Exceeds(10000, 5000));
        let message = err.to_string();
        assert!(message.contains("10000"));
        assert!(message.contains("5000"));
    }

    #[test]
    fn spending_everything_keeps_fully_drained_payers() {
        let history = vec![tx("DANNON", 100, at(1, 1)), tx("UNILEVER", 50, at(1, 2))];
        let plan = plan_of(&history, 150).unwrap();
        assert_eq!(
            plan,
            vec![("DANNON".to_string(), -100), ("UNILEVER".to_string(), -50)]
        );
    }

    #[test]
    fn interleaves_payers_by_timestamp() {
        let history = vec![
            tx("A", 10, at(1, 1)),
            tx("B", 10, at(1, 2)),
            tx("A", 10, at(1, 3)),
            tx("B", 10, at(1, 4)),
        ];
        let plan = plan_of(&history, 25).unwrap();
        // A: 10 + 5, B: 10, first touched A then B
        assert_eq!(plan, vec![("A".to_string(), -15), ("B".to_string(), -10)]);
    }

    #[test]
    fn partial_draw_of_single_credit() {
        let history = vec![tx("A", 100, at(1, 1)), tx("B", 100, at(1, 2))];
        let plan = plan_of(&history, 30).unwrap();
        assert_eq!(plan, vec![("A".to_string(), -30)]);
    }

    #[test]
    fn prior_debits_consume_oldest_credits() {
        let history = vec![
            tx("A", 100, at(1, 1)),
            tx("B", 100, at(1, 2)),
            tx("A", 100, at(1, 3)),
            // spent the first A credit entirely
            tx("A", -100, at(1, 4)),
        ];
        let plan = plan_of(&history, 150).unwrap();
        assert_eq!(plan, vec![("B".to_string(), -100), ("A".to_string(), -50)]);
    }

    #[test]
    fn debit_recorded_before_credit_is_settled_against_later_credits() {
        let history = vec![
            tx("Y", 100, at(1, 0)),
            tx("X", -50, at(1, 1)),
            tx("Y", 100, at(1, 2)),
            tx("X", 100, at(1, 3)),
        ];
        // X balance 50, Y balance 200
        let plan = plan_of(&history, 120).unwrap();
        assert_eq!(plan, vec![("Y".to_string(), -120)]);

        let plan = plan_of(&history, 250).unwrap();
        assert_eq!(plan, vec![("Y".to_string(), -200), ("X".to_string(), -50)]);
    }

    #[test]
    fn payer_in_deficit_is_never_drawn() {
        let history = vec![
            tx("A", 100, at(1, 1)),
            tx("A", -150, at(1, 2)),
            tx("B", 300, at(1, 3)),
        ];
        // total is 250, but A can't contribute
        let plan = plan_of(&history, 250).unwrap();
        assert_eq!(plan, vec![("B".to_string(), -250)]);
    }

    #[test]
    fn balances_lower_than_history_cap_the_draw() {
        let history = vec![tx("A", 100, at(1, 1)), tx("B", 100, at(1, 2))];
        let balances: Balances = [("A".to_string(), 40), ("B".to_string(), 100)]
            .into_iter()
            .collect();
        let plan = allocate(&history, &balances, 100).unwrap();
        let debits = plan.into_debits();
        assert_eq!(debits[0], Debit { payer: "A".into(), points: -40 });
        assert_eq!(debits[1], Debit { payer: "B".into(), points: -60 });
    }

    #[test]
    fn balances_disagreeing_with_history_fail_after_walk() {
        let history = vec![tx("A", 100, at(1, 1))];
        let balances: Balances = [("A".to_string(), 100), ("B".to_string(), 50)]
            .into_iter()
            .collect();
        assert_eq!(
            allocate(&history, &balances, 120),
            Err(InsufficientPoints::Unallocated(20, 120))
        );
    }

    #[test]
    fn plan_total_matches_request() {
        let plan = {
            let history = scenario();
            let balances = Balances::from_transactions(&history);
            allocate(&history, &balances, 5000).unwrap()
        };
        assert_eq!(plan.total(), 5000);
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn plan_serializes_as_list_of_debits() {
        let history = vec![tx("DANNON", 100, at(1, 1))];
        let balances = Balances::from_transactions(&history);
        let plan = allocate(&history, &balances, 100).unwrap();
        assert_eq!(
            serde_json::to_string(&plan).unwrap(),
            r#"[{"payer":"DANNON","points":-100}]"#
        );
    }
}
