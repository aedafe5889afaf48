use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PayoffError;
use crate::types::{monthly_rate, round_cents, DebtId, Money, Rate};
use crate::PayoffResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Category tag for a debt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtCategory {
    CreditCard,
    StudentLoan,
    AutoLoan,
    Mortgage,
    PersonalLoan,
    Medical,
    #[default]
    Other,
}

/// A single outstanding obligation tracked by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    pub id: DebtId,
    pub name: String,
    #[serde(default)]
    pub category: DebtCategory,
    pub original_balance: Money,
    pub current_balance: Money,
    /// Annual percentage rate as a decimal (0.22 = 22%).
    pub apr: Rate,
    pub minimum_payment: Money,
    /// Day of month the payment is due (1..=31).
    #[serde(default = "default_due_day")]
    pub due_day: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lender: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub start_date: NaiveDate,
}

fn default_due_day() -> u32 {
    1
}

fn default_active() -> bool {
    true
}

/// Whether a payment record is a real payment or the opening adjustment
/// written when a debt is tracked after some principal was already repaid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    #[default]
    Payment,
    OpeningBalance,
}

/// Immutable entry in the append-only payment log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub debt_id: DebtId,
    pub amount: Money,
    pub date: NaiveDate,
    pub principal_paid: Money,
    pub interest_paid: Money,
    pub resulting_balance: Money,
    #[serde(default)]
    pub kind: PaymentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Derived figures
// ---------------------------------------------------------------------------

impl Debt {
    /// One month of interest on the current balance, rounded to cents.
    pub fn monthly_interest(&self) -> Money {
        round_cents(self.current_balance * monthly_rate(self.apr))
    }

    /// Share of the minimum payment that reduces principal (never negative).
    pub fn principal_portion(&self) -> Money {
        (self.minimum_payment - self.monthly_interest()).max(Decimal::ZERO)
    }

    /// Fraction of the original balance already repaid (0..=1).
    pub fn percent_paid(&self) -> Rate {
        if self.original_balance.is_zero() {
            return Decimal::ZERO;
        }
        (self.original_balance - self.current_balance) / self.original_balance
    }

    /// Still owes money. Calculators read this, never the stored `is_active`
    /// flag, so input that disagrees with its own balance cannot skew a plan.
    pub fn is_open(&self) -> bool {
        self.current_balance > Decimal::ZERO
    }

    /// True once the minimum payment can no longer retire the balance alone.
    pub fn is_underwater(&self) -> bool {
        self.current_balance > Decimal::ZERO && self.minimum_payment <= self.monthly_interest()
    }

    /// Validate the static constraints every stored debt must satisfy.
    pub fn validate(&self) -> PayoffResult<()> {
        if self.id.trim().is_empty() {
            return Err(invalid("id", "Debt id must not be blank."));
        }
        if self.original_balance <= Decimal::ZERO {
            return Err(invalid(
                "original_balance",
                "Original balance must be positive.",
            ));
        }
        if self.current_balance < Decimal::ZERO {
            return Err(invalid(
                "current_balance",
                "Current balance cannot be negative.",
            ));
        }
        if self.current_balance > self.original_balance {
            return Err(invalid(
                "current_balance",
                "Current balance cannot exceed the original balance.",
            ));
        }
        if self.apr < Decimal::ZERO {
            return Err(invalid("apr", "APR cannot be negative."));
        }
        if self.minimum_payment <= Decimal::ZERO {
            return Err(invalid(
                "minimum_payment",
                "Minimum payment must be positive.",
            ));
        }
        if !(1..=31).contains(&self.due_day) {
            return Err(invalid("due_day", "Due day must be between 1 and 31."));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> PayoffError {
    PayoffError::InvalidDebtParameters {
        field: field.into(),
        reason: reason.into(),
    }
}
