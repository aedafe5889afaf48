use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use payoff_core::milestones::{self, MilestoneInput};
use payoff_core::recommendations::{self, RecommendationInput};
use payoff_core::summary::{self, SummaryInput};

use super::{with_default_as_of, CliResult, PlanningArgs};
use crate::input;

/// Arguments for the milestone scan
#[derive(Args)]
pub struct MilestoneArgs {
    /// Path to JSON/YAML input with `debts` and `payments` (a ledger file)
    #[arg(long)]
    pub input: Option<String>,

    /// Milestone ids already achieved (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub achieved: Option<Vec<String>>,

    /// Evaluation date (YYYY-MM-DD, default today)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,
}

/// Arguments for the recommendation engine
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct RecommendArgs {
    #[command(flatten)]
    pub planning: PlanningArgs,

    /// APR above which refinancing is suggested (decimal, e.g. 0.2)
    #[arg(long)]
    pub refinance_apr: Option<Decimal>,

    /// Balance under which a debt counts as a quick win
    #[arg(long)]
    pub quick_win_balance: Option<Decimal>,

    /// Additional monthly payment used to probe paying more
    #[arg(long)]
    pub probe_extra: Option<Decimal>,
}

/// Arguments for the portfolio summary
#[derive(Args)]
pub struct SummaryArgs {
    /// Path to JSON/YAML input with `debts` and optional `payments`
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_milestones(args: MilestoneArgs) -> CliResult<Value> {
    let doc = input::load_document(args.input.as_deref())?;
    let doc = input::apply_overrides(
        doc,
        vec![
            ("achieved_ids", args.achieved.map(|ids| json!(ids))),
            ("as_of", args.as_of.map(|d| json!(d.to_string()))),
        ],
    )?;
    let milestone_input: MilestoneInput = input::into_input(with_default_as_of(doc))?;
    let result = milestones::detect_milestones(&milestone_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_recommend(args: RecommendArgs) -> CliResult<Value> {
    let mut doc = args.planning.document()?;
    let mut thresholds = doc
        .get("thresholds")
        .cloned()
        .unwrap_or_else(|| json!({}));
    thresholds = input::apply_overrides(
        thresholds,
        vec![
            ("refinance_apr", args.refinance_apr.map(|v| json!(v.to_string()))),
            (
                "quick_win_balance",
                args.quick_win_balance.map(|v| json!(v.to_string())),
            ),
            (
                "probe_extra_payment",
                args.probe_extra.map(|v| json!(v.to_string())),
            ),
        ],
    )?;
    doc = input::apply_overrides(doc, vec![("thresholds", Some(thresholds))])?;
    let recommendation_input: RecommendationInput = input::into_input(doc)?;
    let result = recommendations::generate_recommendations(&recommendation_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_summary(args: SummaryArgs) -> CliResult<Value> {
    let doc = input::load_document(args.input.as_deref())?;
    let summary_input: SummaryInput = input::into_input(doc)?;
    let result = summary::calculate_summary(&summary_input)?;
    Ok(serde_json::to_value(result)?)
}
