//! Progress milestone detection.
//!
//! A stateless scan over the debts and payment history. The caller owns the
//! set of milestone ids already achieved; any id in that set is never emitted
//! again, which makes re-evaluation idempotent.

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;

use crate::debt::{Debt, PaymentRecord};
use crate::types::{with_metadata, ComputationOutput, DebtId, Rate};
use crate::PayoffResult;

const HALFWAY: Rate = dec!(0.5);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneType {
    DebtCleared,
    HalfwayPoint,
    FirstDebtCleared,
    FullyDebtFree,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    /// `None` for portfolio-wide milestones.
    pub debt_id: Option<DebtId>,
    pub milestone_type: MilestoneType,
    pub achieved: bool,
    pub achieved_date: NaiveDate,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneInput {
    pub debts: Vec<Debt>,
    #[serde(default)]
    pub payments: Vec<PaymentRecord>,
    #[serde(default)]
    pub achieved_ids: BTreeSet<String>,
    pub as_of: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneOutput {
    pub new_milestones: Vec<Milestone>,
    pub debts_cleared: usize,
    pub debts_remaining: usize,
}

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

pub fn halfway_id(debt_id: &str) -> String {
    format!("halfway:{debt_id}")
}

pub fn debt_cleared_id(debt_id: &str) -> String {
    format!("debt_cleared:{debt_id}")
}

pub const FIRST_DEBT_CLEARED_ID: &str = "first_debt_cleared";
pub const FULLY_DEBT_FREE_ID: &str = "fully_debt_free";

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Milestones newly crossed by the current ledger state.
pub fn evaluate_milestones(
    debts: &[Debt],
    payments: &[PaymentRecord],
    achieved_ids: &BTreeSet<String>,
    as_of: NaiveDate,
) -> Vec<Milestone> {
    let mut found: Vec<Milestone> = Vec::new();
    let mut first_clear: Option<NaiveDate> = None;

    for debt in debts {
        if debt.is_open() {
            if debt.percent_paid() < HALFWAY {
                continue;
            }
            let id = halfway_id(&debt.id);
            if achieved_ids.contains(&id) {
                continue;
            }
            let half = debt.original_balance * HALFWAY;
            let date = payments
                .iter()
                .filter(|p| p.debt_id == debt.id && p.resulting_balance <= half)
                .map(|p| p.date)
                .min()
                .unwrap_or(as_of);
            found.push(Milestone {
                id,
                debt_id: Some(debt.id.clone()),
                milestone_type: MilestoneType::HalfwayPoint,
                achieved: true,
                achieved_date: date,
                description: format!("Halfway there: {} is 50% paid off.", debt.name),
            });
            continue;
        }

        let cleared_on = payments
            .iter()
            .filter(|p| p.debt_id == debt.id)
            .map(|p| p.date)
            .max()
            .unwrap_or(as_of);
        first_clear = Some(first_clear.map_or(cleared_on, |d| d.min(cleared_on)));

        let id = debt_cleared_id(&debt.id);
        if !achieved_ids.contains(&id) {
            found.push(Milestone {
                id,
                debt_id: Some(debt.id.clone()),
                milestone_type: MilestoneType::DebtCleared,
                achieved: true,
                achieved_date: cleared_on,
                description: format!("{} is paid off.", debt.name),
            });
        }
    }

    if let Some(date) = first_clear {
        if !achieved_ids.contains(FIRST_DEBT_CLEARED_ID) {
            found.push(Milestone {
                id: FIRST_DEBT_CLEARED_ID.into(),
                debt_id: None,
                milestone_type: MilestoneType::FirstDebtCleared,
                achieved: true,
                achieved_date: date,
                description: "First debt paid off.".into(),
            });
        }
    }

    let all_cleared = !debts.is_empty() && debts.iter().all(|d| !d.is_open());
    if all_cleared && !achieved_ids.contains(FULLY_DEBT_FREE_ID) {
        let date = payments.iter().map(|p| p.date).max().unwrap_or(as_of);
        found.push(Milestone {
            id: FULLY_DEBT_FREE_ID.into(),
            debt_id: None,
            milestone_type: MilestoneType::FullyDebtFree,
            achieved: true,
            achieved_date: date,
            description: "Debt free: every tracked debt is paid off.".into(),
        });
    }

    found.sort_by(|a, b| {
        a.achieved_date
            .cmp(&b.achieved_date)
            .then_with(|| a.id.cmp(&b.id))
    });
    found
}

/// Evaluate milestones and wrap the result for output.
pub fn detect_milestones(
    input: &MilestoneInput,
) -> PayoffResult<ComputationOutput<MilestoneOutput>> {
    let start = Instant::now();
    for debt in &input.debts {
        debt.validate()?;
    }

    let new_milestones =
        evaluate_milestones(&input.debts, &input.payments, &input.achieved_ids, input.as_of);
    let debts_cleared = input.debts.iter().filter(|d| !d.is_open()).count();

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "halfway_threshold": HALFWAY.to_string(),
        "already_achieved": input.achieved_ids.len(),
    });

    Ok(with_metadata(
        "Stateless milestone scan",
        &assumptions,
        Vec::new(),
        elapsed,
        MilestoneOutput {
            new_milestones,
            debts_cleared,
            debts_remaining: input.debts.len() - debts_cleared,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debt::DebtCategory;
    use crate::ledger::Ledger;
    use rust_decimal::Decimal;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn debt(id: &str, balance: Decimal) -> Debt {
        Debt {
            id: id.into(),
            name: id.to_uppercase(),
            category: DebtCategory::Other,
            original_balance: balance,
            current_balance: balance,
            apr: Decimal::ZERO,
            minimum_payment: dec!(50),
            due_day: 1,
            lender: None,
            is_active: true,
            start_date: date(1, 1),
        }
    }

    fn ids(ms: &[Milestone]) -> Vec<&str> {
        ms.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_halfway_detected_with_crossing_date() {
        let mut ledger = Ledger::new();
        ledger.add_debt(debt("a", dec!(1000))).unwrap();
        ledger.record_payment("a", dec!(300), date(2, 1), None).unwrap();
        ledger.record_payment("a", dec!(300), date(3, 1), None).unwrap();

        let found = evaluate_milestones(
            ledger.debts(),
            ledger.payments(),
            &BTreeSet::new(),
            date(4, 1),
        );
        assert_eq!(ids(&found), vec!["halfway:a"]);
        assert_eq!(found[0].achieved_date, date(3, 1));
    }

    #[test]
    fn test_clearing_emits_cleared_and_first_once() {
        let mut ledger = Ledger::new();
        ledger.add_debt(debt("a", dec!(500))).unwrap();
        ledger.add_debt(debt("b", dec!(900))).unwrap();
        ledger.record_payment("a", dec!(500), date(2, 10), None).unwrap();

        let mut achieved = BTreeSet::new();
        let found = evaluate_milestones(ledger.debts(), ledger.payments(), &achieved, date(3, 1));
        assert_eq!(ids(&found), vec!["debt_cleared:a", "first_debt_cleared"]);
        assert_eq!(found[0].achieved_date, date(2, 10));
        achieved.extend(found.into_iter().map(|m| m.id));

        let again = evaluate_milestones(ledger.debts(), ledger.payments(), &achieved, date(3, 1));
        assert!(again.is_empty());

        ledger.record_payment("b", dec!(900), date(4, 2), None).unwrap();
        let found = evaluate_milestones(ledger.debts(), ledger.payments(), &achieved, date(5, 1));
        assert_eq!(ids(&found), vec!["debt_cleared:b", "fully_debt_free"]);
        assert_eq!(found[1].achieved_date, date(4, 2));
    }

    #[test]
    fn test_output_ordered_by_date_then_id() {
        let mut ledger = Ledger::new();
        ledger.add_debt(debt("z", dec!(500))).unwrap();
        ledger.add_debt(debt("m", dec!(1000))).unwrap();
        ledger.add_debt(debt("b", dec!(900))).unwrap();
        ledger.record_payment("m", dec!(600), date(2, 1), None).unwrap();
        ledger.record_payment("z", dec!(500), date(3, 1), None).unwrap();

        let found = evaluate_milestones(ledger.debts(), ledger.payments(), &BTreeSet::new(), date(4, 1));
        assert_eq!(
            ids(&found),
            vec!["halfway:m", "debt_cleared:z", "first_debt_cleared"]
        );
    }

    #[test]
    fn test_activity_follows_balance_not_flag() {
        let input: MilestoneInput = serde_json::from_value(serde_json::json!({
            "debts": [{
                "id": "a",
                "name": "Card",
                "original_balance": "500",
                "current_balance": "0",
                "apr": "0.18",
                "minimum_payment": "25",
                "start_date": "2025-01-01"
            }],
            "as_of": "2025-06-01"
        }))
        .unwrap();
        let out = detect_milestones(&input).unwrap().result;
        assert_eq!(
            ids(&out.new_milestones),
            vec!["debt_cleared:a", "first_debt_cleared", "fully_debt_free"]
        );
        assert_eq!(out.debts_cleared, 1);

        let input: MilestoneInput = serde_json::from_value(serde_json::json!({
            "debts": [{
                "id": "b",
                "name": "Loan",
                "original_balance": "1000",
                "current_balance": "800",
                "apr": "0.08",
                "minimum_payment": "50",
                "is_active": false,
                "start_date": "2025-01-01"
            }],
            "as_of": "2025-06-01"
        }))
        .unwrap();
        let out = detect_milestones(&input).unwrap().result;
        assert!(out.new_milestones.is_empty());
        assert_eq!(out.debts_remaining, 1);
    }

    #[test]
    fn test_empty_ledger_has_no_milestones() {
        let found = evaluate_milestones(&[], &[], &BTreeSet::new(), date(1, 1));
        assert!(found.is_empty());
    }

    #[test]
    fn test_detect_milestones_counts() {
        let mut paid = debt("a", dec!(100));
        paid.current_balance = Decimal::ZERO;
        paid.is_active = false;
        let input = MilestoneInput {
            debts: vec![paid, debt("b", dec!(100))],
            payments: vec![],
            achieved_ids: BTreeSet::new(),
            as_of: date(6, 1),
        };
        let out = detect_milestones(&input).unwrap().result;
        assert_eq!(out.debts_cleared, 1);
        assert_eq!(out.debts_remaining, 1);
        assert_eq!(out.new_milestones[0].achieved_date, date(6, 1));
    }
}
