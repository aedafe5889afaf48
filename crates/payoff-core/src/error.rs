use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayoffError {
    #[error("Invalid debt parameters: {field} — {reason}")]
    InvalidDebtParameters { field: String, reason: String },

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid payment: {0}")]
    InvalidPayment(String),

    #[error("Debt not found: {0}")]
    DebtNotFound(String),

    #[error("Debt is inactive (balance already cleared): {0}")]
    DebtInactive(String),

    #[error("Non-convergent amortization: {debt_id} accrues {monthly_interest}/month but the minimum payment is {minimum_payment}")]
    NonConvergentAmortization {
        debt_id: String,
        monthly_interest: Decimal,
        minimum_payment: Decimal,
    },

    #[error("Simulation did not converge: {remaining_debts} debt(s) totalling {remaining_balance} remain after {months} months")]
    SimulationDidNotConverge {
        months: u32,
        remaining_debts: usize,
        remaining_balance: Decimal,
    },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for PayoffError {
    fn from(e: serde_json::Error) -> Self {
        PayoffError::SerializationError(e.to_string())
    }
}
