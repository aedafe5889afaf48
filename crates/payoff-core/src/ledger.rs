//! Debt ledger.
//!
//! Owns the debt records and their append-only payment history. Every
//! mutation validates its input at this boundary so nothing invalid ever
//! reaches the calculators or simulators, and every mutation returns the
//! [`LedgerEvent`]s it produced instead of publishing them anywhere.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use crate::debt::{Debt, PaymentKind, PaymentRecord};
use crate::error::PayoffError;
use crate::types::{with_metadata, ComputationOutput, DebtId, Money};
use crate::PayoffResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Serializable copy of the full ledger state, exchanged with repositories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub debts: Vec<Debt>,
    #[serde(default)]
    pub payments: Vec<PaymentRecord>,
}

/// Something that happened to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    DebtAdded {
        debt_id: DebtId,
    },
    DebtUpdated {
        debt_id: DebtId,
    },
    DebtDeleted {
        debt_id: DebtId,
        payments_removed: usize,
    },
    PaymentRecorded {
        debt_id: DebtId,
        amount: Money,
        resulting_balance: Money,
    },
    DebtCleared {
        debt_id: DebtId,
        date: NaiveDate,
    },
}

/// Result of [`Ledger::record_payment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub record: PaymentRecord,
    pub events: Vec<LedgerEvent>,
}

impl PaymentOutcome {
    /// True when this payment retired the debt.
    pub fn cleared_debt(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, LedgerEvent::DebtCleared { .. }))
    }
}

/// A payment applied to a serialized ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInput {
    pub ledger: LedgerSnapshot,
    pub debt_id: DebtId,
    pub amount: Money,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentApplication {
    /// Ledger state after the payment.
    pub ledger: LedgerSnapshot,
    pub payment: PaymentRecord,
    pub events: Vec<LedgerEvent>,
}

/// In-memory collection of debts plus payment history.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    debts: Vec<Debt>,
    payments: Vec<PaymentRecord>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from a snapshot, re-validating every record.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> PayoffResult<Self> {
        let mut ledger = Ledger::new();
        for mut debt in snapshot.debts {
            debt.validate()?;
            if ledger.position(&debt.id).is_some() {
                return Err(PayoffError::InvalidDebtParameters {
                    field: "id".into(),
                    reason: format!("Duplicate debt id '{}' in snapshot.", debt.id),
                });
            }
            debt.is_active = debt.current_balance > Decimal::ZERO;
            ledger.debts.push(debt);
        }
        for record in &snapshot.payments {
            if ledger.position(&record.debt_id).is_none() {
                return Err(PayoffError::DebtNotFound(record.debt_id.clone()));
            }
        }
        ledger.payments = snapshot.payments;
        debug!(
            debts = ledger.debts.len(),
            payments = ledger.payments.len(),
            "ledger loaded from snapshot"
        );
        Ok(ledger)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            debts: self.debts.clone(),
            payments: self.payments.clone(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Debt> {
        self.debts.iter().find(|d| d.id == id)
    }

    /// All debts in insertion order.
    pub fn debts(&self) -> &[Debt] {
        &self.debts
    }

    pub fn active_debts(&self) -> Vec<Debt> {
        self.debts.iter().filter(|d| d.is_open()).cloned().collect()
    }

    /// Full payment history in recording order.
    pub fn payments(&self) -> &[PaymentRecord] {
        &self.payments
    }

    pub fn payments_for<'a>(&'a self, debt_id: &'a str) -> impl Iterator<Item = &'a PaymentRecord> {
        self.payments.iter().filter(move |p| p.debt_id == debt_id)
    }

    /// Add a new debt. A debt already partly repaid gets an opening-balance
    /// record so principal history always reconciles to the original balance.
    pub fn add_debt(&mut self, mut debt: Debt) -> PayoffResult<LedgerEvent> {
        debt.validate()?;
        if self.position(&debt.id).is_some() {
            return Err(PayoffError::InvalidDebtParameters {
                field: "id".into(),
                reason: format!("A debt with id '{}' already exists.", debt.id),
            });
        }

        debt.is_active = debt.current_balance > Decimal::ZERO;
        if let Some(opening) = opening_record(&debt) {
            self.payments.push(opening);
        }
        debug!(debt_id = %debt.id, balance = %debt.current_balance, "debt added");
        let debt_id = debt.id.clone();
        self.debts.push(debt);
        Ok(LedgerEvent::DebtAdded { debt_id })
    }

    /// Replace a debt's mutable fields. Balances are derived from payment
    /// history once real payments exist and may not be edited afterwards.
    pub fn update_debt(&mut self, mut debt: Debt) -> PayoffResult<LedgerEvent> {
        let idx = self
            .position(&debt.id)
            .ok_or_else(|| PayoffError::DebtNotFound(debt.id.clone()))?;
        let stored = &self.debts[idx];
        if !stored.is_open() {
            return Err(PayoffError::DebtInactive(debt.id.clone()));
        }
        debt.validate()?;

        let balances_changed = stored.original_balance != debt.original_balance
            || stored.current_balance != debt.current_balance;
        if balances_changed {
            let has_payments = self
                .payments_for(&debt.id)
                .any(|p| p.kind == PaymentKind::Payment);
            if has_payments {
                return Err(PayoffError::InvalidDebtParameters {
                    field: "current_balance".into(),
                    reason: "Balances are derived from payment history once payments exist."
                        .into(),
                });
            }
            self.payments
                .retain(|p| !(p.debt_id == debt.id && p.kind == PaymentKind::OpeningBalance));
            if let Some(opening) = opening_record(&debt) {
                self.payments.push(opening);
            }
        }

        debt.is_active = debt.current_balance > Decimal::ZERO;
        debug!(debt_id = %debt.id, "debt updated");
        let debt_id = debt.id.clone();
        self.debts[idx] = debt;
        Ok(LedgerEvent::DebtUpdated { debt_id })
    }

    /// Remove a debt together with its whole payment history.
    pub fn delete_debt(&mut self, id: &str) -> PayoffResult<LedgerEvent> {
        let idx = self
            .position(id)
            .ok_or_else(|| PayoffError::DebtNotFound(id.to_string()))?;
        self.debts.remove(idx);
        let before = self.payments.len();
        self.payments.retain(|p| p.debt_id != id);
        let payments_removed = before - self.payments.len();
        debug!(debt_id = %id, payments_removed, "debt deleted");
        Ok(LedgerEvent::DebtDeleted {
            debt_id: id.to_string(),
            payments_removed,
        })
    }

    /// Apply a payment: interest first, then principal, balance clamped at
    /// zero. Clearing the balance deactivates and freezes the debt.
    pub fn record_payment(
        &mut self,
        debt_id: &str,
        amount: Money,
        date: NaiveDate,
        notes: Option<String>,
    ) -> PayoffResult<PaymentOutcome> {
        let idx = self
            .position(debt_id)
            .ok_or_else(|| PayoffError::DebtNotFound(debt_id.to_string()))?;
        if !self.debts[idx].is_open() {
            return Err(PayoffError::DebtInactive(debt_id.to_string()));
        }
        if amount <= Decimal::ZERO {
            return Err(PayoffError::InvalidPayment(format!(
                "Payment amount must be positive, got {amount}."
            )));
        }

        let debt = &mut self.debts[idx];
        let interest_paid = amount.min(debt.monthly_interest());
        let principal_paid = (amount - interest_paid).min(debt.current_balance);
        let resulting_balance = (debt.current_balance - principal_paid).max(Decimal::ZERO);
        debt.current_balance = resulting_balance;

        let record = PaymentRecord {
            debt_id: debt_id.to_string(),
            amount,
            date,
            principal_paid,
            interest_paid,
            resulting_balance,
            kind: PaymentKind::Payment,
            notes,
        };
        self.payments.push(record.clone());

        let mut events = vec![LedgerEvent::PaymentRecorded {
            debt_id: debt_id.to_string(),
            amount,
            resulting_balance,
        }];
        debug!(
            debt_id,
            %amount,
            %principal_paid,
            %interest_paid,
            %resulting_balance,
            "payment recorded"
        );

        if resulting_balance.is_zero() {
            debt.is_active = false;
            info!(debt_id, %date, "debt cleared");
            events.push(LedgerEvent::DebtCleared {
                debt_id: debt_id.to_string(),
                date,
            });
        }

        Ok(PaymentOutcome { record, events })
    }

    /// Accounting-identity discrepancy for one debt:
    /// original − current − Σ principal_paid. Zero for a consistent ledger.
    pub fn reconcile(&self, debt_id: &str) -> PayoffResult<Money> {
        let debt = self
            .get(debt_id)
            .ok_or_else(|| PayoffError::DebtNotFound(debt_id.to_string()))?;
        let principal: Money = self.payments_for(debt_id).map(|p| p.principal_paid).sum();
        Ok(debt.original_balance - debt.current_balance - principal)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.debts.iter().position(|d| d.id == id)
    }
}

/// Record one payment against a snapshot and return the new snapshot.
pub fn apply_payment(input: &PaymentInput) -> PayoffResult<ComputationOutput<PaymentApplication>> {
    let start = Instant::now();
    let mut ledger = Ledger::from_snapshot(input.ledger.clone())?;
    let outcome = ledger.record_payment(
        &input.debt_id,
        input.amount,
        input.date,
        input.notes.clone(),
    )?;

    let mut warnings = Vec::new();
    if outcome.record.amount > outcome.record.interest_paid + outcome.record.principal_paid {
        warnings.push(format!(
            "Payment exceeded the amount owed by {}; the excess was not applied.",
            outcome.record.amount - outcome.record.interest_paid - outcome.record.principal_paid
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "interest_accrual": "one month on the pre-payment balance",
        "rounding": "cents, half away from zero",
    });
    Ok(with_metadata(
        "Ledger payment application",
        &assumptions,
        warnings,
        elapsed,
        PaymentApplication {
            ledger: ledger.snapshot(),
            payment: outcome.record,
            events: outcome.events,
        },
    ))
}

fn opening_record(debt: &Debt) -> Option<PaymentRecord> {
    let already_paid = debt.original_balance - debt.current_balance;
    if already_paid <= Decimal::ZERO {
        return None;
    }
    Some(PaymentRecord {
        debt_id: debt.id.clone(),
        amount: already_paid,
        date: debt.start_date,
        principal_paid: already_paid,
        interest_paid: Decimal::ZERO,
        resulting_balance: debt.current_balance,
        kind: PaymentKind::OpeningBalance,
        notes: Some("Principal repaid before tracking began".into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debt::DebtCategory;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn debt(id: &str, balance: Money, apr: Money, min: Money) -> Debt {
        Debt {
            id: id.into(),
            name: id.to_uppercase(),
            category: DebtCategory::CreditCard,
            original_balance: balance,
            current_balance: balance,
            apr,
            minimum_payment: min,
            due_day: 1,
            lender: None,
            is_active: true,
            start_date: date(2024, 1, 1),
        }
    }

    #[test]
    fn test_add_rejects_invalid_parameters() {
        let mut ledger = Ledger::new();
        let err = ledger
            .add_debt(debt("a", dec!(0), dec!(0.1), dec!(10)))
            .unwrap_err();
        assert!(matches!(err, PayoffError::InvalidDebtParameters { .. }));
        assert!(ledger
            .add_debt(debt("a", dec!(100), dec!(-0.1), dec!(10)))
            .is_err());
        assert!(ledger
            .add_debt(debt("a", dec!(100), dec!(0.1), dec!(0)))
            .is_err());
        assert!(ledger.debts().is_empty());
    }

    #[test]
    fn test_add_rejects_duplicate_id() {
        let mut ledger = Ledger::new();
        ledger.add_debt(debt("a", dec!(100), dec!(0.1), dec!(10))).unwrap();
        assert!(ledger
            .add_debt(debt("a", dec!(200), dec!(0.1), dec!(10)))
            .is_err());
    }

    #[test]
    fn test_partially_repaid_debt_gets_opening_record() {
        let mut ledger = Ledger::new();
        let mut d = debt("a", dec!(1000), dec!(0.12), dec!(50));
        d.current_balance = dec!(600);
        ledger.add_debt(d).unwrap();

        let records: Vec<_> = ledger.payments_for("a").collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, PaymentKind::OpeningBalance);
        assert_eq!(records[0].principal_paid, dec!(400));
        assert_eq!(ledger.reconcile("a").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_record_payment_splits_interest_and_principal() {
        let mut ledger = Ledger::new();
        ledger
            .add_debt(debt("a", dec!(1000), dec!(0.24), dec!(50)))
            .unwrap();
        let outcome = ledger
            .record_payment("a", dec!(50), date(2024, 2, 1), None)
            .unwrap();
        // interest = 1000 * 0.02 = 20; principal = 30
        assert_eq!(outcome.record.interest_paid, dec!(20));
        assert_eq!(outcome.record.principal_paid, dec!(30));
        assert_eq!(outcome.record.resulting_balance, dec!(970));
        assert!(!outcome.cleared_debt());
        assert_eq!(ledger.get("a").unwrap().current_balance, dec!(970));
    }

    #[test]
    fn test_payment_smaller_than_interest_is_all_interest() {
        let mut ledger = Ledger::new();
        ledger
            .add_debt(debt("a", dec!(1000), dec!(0.24), dec!(50)))
            .unwrap();
        let outcome = ledger
            .record_payment("a", dec!(15), date(2024, 2, 1), None)
            .unwrap();
        assert_eq!(outcome.record.interest_paid, dec!(15));
        assert_eq!(outcome.record.principal_paid, Decimal::ZERO);
        assert_eq!(outcome.record.resulting_balance, dec!(1000));
    }

    #[test]
    fn test_full_payment_clears_and_freezes_debt() {
        let mut ledger = Ledger::new();
        ledger
            .add_debt(debt("a", dec!(500), dec!(0.12), dec!(25)))
            .unwrap();
        // 500 + 5 interest
        let outcome = ledger
            .record_payment("a", dec!(505), date(2024, 2, 1), Some("payoff".into()))
            .unwrap();
        assert!(outcome.cleared_debt());
        let d = ledger.get("a").unwrap().clone();
        assert_eq!(d.current_balance, Decimal::ZERO);
        assert!(!d.is_active);

        let err = ledger
            .record_payment("a", dec!(1), date(2024, 3, 1), None)
            .unwrap_err();
        assert!(matches!(err, PayoffError::DebtInactive(_)));

        let err = ledger.update_debt(d).unwrap_err();
        assert!(matches!(err, PayoffError::DebtInactive(_)));
    }

    #[test]
    fn test_record_payment_unknown_debt() {
        let mut ledger = Ledger::new();
        let err = ledger
            .record_payment("nope", dec!(10), date(2024, 1, 1), None)
            .unwrap_err();
        assert!(matches!(err, PayoffError::DebtNotFound(_)));
    }

    #[test]
    fn test_record_payment_rejects_non_positive_amount() {
        let mut ledger = Ledger::new();
        ledger
            .add_debt(debt("a", dec!(500), dec!(0.12), dec!(25)))
            .unwrap();
        let err = ledger
            .record_payment("a", dec!(0), date(2024, 2, 1), None)
            .unwrap_err();
        assert!(matches!(err, PayoffError::InvalidPayment(_)));
    }

    #[test]
    fn test_accounting_identity_holds_across_payments() {
        let mut ledger = Ledger::new();
        ledger
            .add_debt(debt("a", dec!(3000), dec!(0.199), dec!(90)))
            .unwrap();
        for month in 2..=12 {
            ledger
                .record_payment("a", dec!(137.45), date(2024, month, 1), None)
                .unwrap();
        }
        assert_eq!(ledger.reconcile("a").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_update_balance_blocked_after_payments() {
        let mut ledger = Ledger::new();
        ledger
            .add_debt(debt("a", dec!(1000), dec!(0.1), dec!(50)))
            .unwrap();
        ledger
            .record_payment("a", dec!(100), date(2024, 2, 1), None)
            .unwrap();

        let mut edited = ledger.get("a").unwrap().clone();
        edited.current_balance = dec!(500);
        assert!(matches!(
            ledger.update_debt(edited).unwrap_err(),
            PayoffError::InvalidDebtParameters { .. }
        ));

        let mut edited = ledger.get("a").unwrap().clone();
        edited.apr = dec!(0.05);
        edited.name = "Refinanced".into();
        ledger.update_debt(edited).unwrap();
        assert_eq!(ledger.get("a").unwrap().apr, dec!(0.05));
    }

    #[test]
    fn test_update_rewrites_opening_record_without_payments() {
        let mut ledger = Ledger::new();
        ledger
            .add_debt(debt("a", dec!(1000), dec!(0.1), dec!(50)))
            .unwrap();
        let mut edited = ledger.get("a").unwrap().clone();
        edited.current_balance = dec!(700);
        ledger.update_debt(edited).unwrap();
        assert_eq!(ledger.payments_for("a").count(), 1);
        assert_eq!(ledger.reconcile("a").unwrap(), Decimal::ZERO);

        let mut over = ledger.get("a").unwrap().clone();
        over.current_balance = dec!(1200);
        assert!(ledger.update_debt(over).is_err());
    }

    #[test]
    fn test_delete_cascades_payments() {
        let mut ledger = Ledger::new();
        ledger
            .add_debt(debt("a", dec!(1000), dec!(0.1), dec!(50)))
            .unwrap();
        ledger
            .add_debt(debt("b", dec!(1000), dec!(0.1), dec!(50)))
            .unwrap();
        ledger
            .record_payment("a", dec!(100), date(2024, 2, 1), None)
            .unwrap();
        ledger
            .record_payment("b", dec!(100), date(2024, 2, 1), None)
            .unwrap();

        let event = ledger.delete_debt("a").unwrap();
        assert_eq!(
            event,
            LedgerEvent::DebtDeleted {
                debt_id: "a".into(),
                payments_removed: 1
            }
        );
        assert!(ledger.get("a").is_none());
        assert_eq!(ledger.payments().len(), 1);
        assert!(matches!(
            ledger.delete_debt("a").unwrap_err(),
            PayoffError::DebtNotFound(_)
        ));
    }

    #[test]
    fn test_apply_payment_to_snapshot() {
        let mut ledger = Ledger::new();
        ledger.add_debt(debt("a", dec!(200), dec!(0.12), dec!(25))).unwrap();
        let input = PaymentInput {
            ledger: ledger.snapshot(),
            debt_id: "a".into(),
            amount: dec!(250),
            date: date(2024, 2, 1),
            notes: None,
        };
        let out = apply_payment(&input).unwrap();
        // 2.00 interest + 200 principal, 48 unused
        assert_eq!(out.result.payment.principal_paid, dec!(200));
        assert_eq!(out.result.ledger.payments.len(), 1);
        assert_eq!(out.result.ledger.debts[0].current_balance, Decimal::ZERO);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.result.events.len(), 2);
    }

    #[test]
    fn test_snapshot_rejects_orphan_payments() {
        let snapshot = LedgerSnapshot {
            debts: vec![],
            payments: vec![PaymentRecord {
                debt_id: "ghost".into(),
                amount: dec!(10),
                date: date(2024, 1, 1),
                principal_paid: dec!(10),
                interest_paid: Decimal::ZERO,
                resulting_balance: dec!(0),
                kind: PaymentKind::Payment,
                notes: None,
            }],
        };
        assert!(matches!(
            Ledger::from_snapshot(snapshot).unwrap_err(),
            PayoffError::DebtNotFound(_)
        ));
    }
}
