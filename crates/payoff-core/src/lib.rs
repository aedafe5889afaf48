pub mod amortization;
pub mod debt;
pub mod error;
pub mod ledger;
pub mod projection;
pub mod repository;
pub mod service;
pub mod strategy;
pub mod summary;
pub mod types;
pub mod waterfall;

#[cfg(feature = "milestones")]
pub mod milestones;

#[cfg(feature = "recommendations")]
pub mod recommendations;

pub use debt::{Debt, DebtCategory, PaymentKind, PaymentRecord};
pub use error::PayoffError;
pub use ledger::{Ledger, LedgerEvent, LedgerSnapshot};
pub use service::{PayoffObserver, PayoffService};
pub use strategy::PayoffStrategy;
pub use types::*;
pub use waterfall::PayoffPlan;

/// Standard result type for all payoff operations
pub type PayoffResult<T> = Result<T, PayoffError>;
