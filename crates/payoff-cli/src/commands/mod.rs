pub mod ledger;
pub mod planning;
pub mod progress;

use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::input;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Repayment strategy flag.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    Snowball,
    Avalanche,
    Custom,
}

/// Flags shared by every command that runs a waterfall.
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct PlanningArgs {
    /// Path to JSON/YAML input; a ledger file works. Flags override its fields
    #[arg(long)]
    pub input: Option<String>,

    /// Repayment strategy
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Debt ids in priority order for the custom strategy (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub order: Option<Vec<String>>,

    /// Extra amount paid each month on top of the minimums
    #[arg(long)]
    pub extra: Option<Decimal>,

    /// Month zero of the simulation (YYYY-MM-DD, default today)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,
}

impl PlanningArgs {
    /// Load the input document and overlay the planning flags.
    pub fn document(&self) -> CliResult<Value> {
        let doc = input::load_document(self.input.as_deref())?;
        let doc = input::apply_overrides(
            doc,
            vec![
                ("strategy", strategy_value(self.strategy, self.order.as_deref())?),
                (
                    "extra_monthly_payment",
                    self.extra.map(|e| json!(e.to_string())),
                ),
                ("as_of", self.as_of.map(|d| json!(d.to_string()))),
            ],
        )?;
        Ok(with_default_as_of(doc))
    }
}

fn strategy_value(strategy: Option<StrategyArg>, order: Option<&[String]>) -> CliResult<Option<Value>> {
    let value = match (strategy, order) {
        (Some(StrategyArg::Custom), None) => {
            return Err("--strategy custom requires --order".into());
        }
        (Some(StrategyArg::Custom), Some(ids)) | (None, Some(ids)) => {
            Some(json!({"type": "custom", "order": ids}))
        }
        (Some(StrategyArg::Snowball), _) => Some(json!({"type": "snowball"})),
        (Some(StrategyArg::Avalanche), _) => Some(json!({"type": "avalanche"})),
        (None, None) => None,
    };
    Ok(value)
}

/// Fill in today's date when the document carries no `as_of`.
pub fn with_default_as_of(mut doc: Value) -> Value {
    if let Some(map) = doc.as_object_mut() {
        map.entry("as_of")
            .or_insert_with(|| json!(today().to_string()));
    }
    doc
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
