use chrono::{Months, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::PayoffError;
use crate::PayoffResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.22 = 22% APR). Never as percentages.
pub type Rate = Decimal;

/// Caller-assigned debt identifier.
pub type DebtId = String;

/// Balances at or below this amount count as paid off.
pub const BALANCE_EPSILON: Money = dec!(0.01);

/// Months in a year, for APR to monthly-rate conversion.
pub const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Round a monetary amount to whole cents (half away from zero).
pub fn round_cents(amount: Money) -> Money {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Monthly periodic rate from an APR.
pub fn monthly_rate(apr: Rate) -> Rate {
    apr / MONTHS_PER_YEAR
}

/// Calendar date `months` months after `date`, clamped to month end.
pub fn add_months(date: NaiveDate, months: u32) -> PayoffResult<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| PayoffError::InvalidInput {
            field: "as_of".into(),
            reason: format!("date {date} plus {months} months is out of range"),
        })
}

/// Bounds applied to every month-by-month simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationLimits {
    /// Hard cap on simulated months before giving up.
    #[serde(default = "default_max_months")]
    pub max_months: u32,
    /// Cap on the number of months emitted as projection rows.
    #[serde(default = "default_projection_months")]
    pub projection_months: u32,
    /// Balances at or below this amount count as cleared.
    #[serde(default = "default_epsilon")]
    pub epsilon: Money,
}

fn default_max_months() -> u32 {
    600
}

fn default_projection_months() -> u32 {
    360
}

fn default_epsilon() -> Money {
    BALANCE_EPSILON
}

impl Default for SimulationLimits {
    fn default() -> Self {
        Self {
            max_months: default_max_months(),
            projection_months: default_projection_months(),
            epsilon: default_epsilon(),
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
