//! Heuristic payoff advice.
//!
//! No new modelling happens here: every figure quoted in a recommendation is
//! read off a waterfall run or a debt's derived fields. A simulation that
//! fails only drops the recommendation that depended on it.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::warn;

use crate::debt::Debt;
use crate::strategy::PayoffStrategy;
use crate::types::{with_metadata, ComputationOutput, DebtId, Money, Rate, SimulationLimits};
use crate::waterfall::{build_plan, validate_plan_inputs, PayoffPlan};
use crate::PayoffResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationThresholds {
    /// APR above which a debt is flagged for refinancing.
    #[serde(default = "default_refinance_apr")]
    pub refinance_apr: Rate,
    /// Balance below which a debt counts as a quick win.
    #[serde(default = "default_quick_win_balance")]
    pub quick_win_balance: Money,
    /// Snowball/avalanche interest gap worth mentioning.
    #[serde(default = "default_material_difference")]
    pub material_difference: Money,
    /// Additional monthly payment used to probe the value of paying more.
    #[serde(default = "default_probe_extra_payment")]
    pub probe_extra_payment: Money,
}

fn default_refinance_apr() -> Rate {
    dec!(0.20)
}

fn default_quick_win_balance() -> Money {
    dec!(1000)
}

fn default_material_difference() -> Money {
    dec!(500)
}

fn default_probe_extra_payment() -> Money {
    dec!(50)
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            refinance_apr: default_refinance_apr(),
            quick_win_balance: default_quick_win_balance(),
            material_difference: default_material_difference(),
            probe_extra_payment: default_probe_extra_payment(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationInput {
    pub debts: Vec<Debt>,
    #[serde(default)]
    pub strategy: PayoffStrategy,
    #[serde(default)]
    pub extra_monthly_payment: Money,
    pub as_of: NaiveDate,
    #[serde(default)]
    pub limits: SimulationLimits,
    #[serde(default)]
    pub thresholds: RecommendationThresholds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Refinance,
    QuickWin,
    SwitchStrategy,
    IncreasePayment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt_id: Option<DebtId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_saved: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub months_saved: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationOutput {
    pub recommendations: Vec<Recommendation>,
    /// The plan the advice was measured against, when it could be simulated.
    pub current_plan: Option<PayoffPlan>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn generate_recommendations(
    input: &RecommendationInput,
) -> PayoffResult<ComputationOutput<RecommendationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_plan_inputs(&input.debts, input.extra_monthly_payment)?;
    let thresholds = &input.thresholds;
    let active: Vec<&Debt> = input.debts.iter().filter(|d| d.is_open()).collect();
    let mut recommendations: Vec<Recommendation> = Vec::new();

    let run = |strategy: &PayoffStrategy, extra: Money| {
        build_plan(&input.debts, strategy, extra, input.as_of, &input.limits)
    };

    let current_plan = match run(&input.strategy, input.extra_monthly_payment) {
        Ok(plan) => Some(plan),
        Err(e) => {
            warn!(error = %e, "current plan could not be simulated");
            warnings.push(format!("Current plan could not be simulated: {e}"));
            None
        }
    };

    // -- Refinance --------------------------------------------------------
    if let Some(debt) = active
        .iter()
        .max_by(|a, b| a.apr.cmp(&b.apr).then_with(|| b.id.cmp(&a.id)))
    {
        if debt.apr > thresholds.refinance_apr {
            recommendations.push(Recommendation {
                kind: RecommendationKind::Refinance,
                title: format!("Consider refinancing {}", debt.name),
                message: format!(
                    "{} charges {}% APR, costing {} in interest this month. A lower-rate \
                     consolidation or balance transfer would cut that directly.",
                    debt.name,
                    percent(debt.apr),
                    debt.monthly_interest()
                ),
                debt_id: Some(debt.id.clone()),
                interest_saved: None,
                months_saved: None,
            });
        }
    }

    // -- Quick win --------------------------------------------------------
    if let Some(debt) = active
        .iter()
        .min_by(|a, b| {
            a.current_balance
                .cmp(&b.current_balance)
                .then_with(|| a.id.cmp(&b.id))
        })
    {
        if debt.current_balance < thresholds.quick_win_balance {
            let cleared_in = current_plan.as_ref().and_then(|p| {
                p.payoff_events
                    .iter()
                    .find(|e| e.debt_id == debt.id)
                    .map(|e| e.month)
            });
            let when = match cleared_in {
                Some(m) => format!(" Your current plan clears it in {m} month(s)."),
                None => String::new(),
            };
            recommendations.push(Recommendation {
                kind: RecommendationKind::QuickWin,
                title: format!("Quick win: {}", debt.name),
                message: format!(
                    "{} has only {} left. Clearing it frees up its {} minimum for your other debts.{}",
                    debt.name, debt.current_balance, debt.minimum_payment, when
                ),
                debt_id: Some(debt.id.clone()),
                interest_saved: None,
                months_saved: None,
            });
        }
    }

    // -- Snowball vs avalanche ---------------------------------------------
    match (
        run(&PayoffStrategy::Snowball, input.extra_monthly_payment),
        run(&PayoffStrategy::Avalanche, input.extra_monthly_payment),
    ) {
        (Ok(snowball), Ok(avalanche)) => {
            let gap = snowball.total_interest_paid - avalanche.total_interest_paid;
            if gap.abs() > thresholds.material_difference {
                let (cheaper, dearer) = if gap > Decimal::ZERO {
                    (&avalanche, &snowball)
                } else {
                    (&snowball, &avalanche)
                };
                let already = cheaper.strategy == input.strategy;
                let months_saved = dearer
                    .months_to_debt_free
                    .saturating_sub(cheaper.months_to_debt_free);
                recommendations.push(Recommendation {
                    kind: RecommendationKind::SwitchStrategy,
                    title: format!(
                        "The {} method saves {} in interest",
                        cheaper.strategy.label(),
                        gap.abs()
                    ),
                    message: format!(
                        "Paying {} first costs {} in interest versus {} with {}.{}",
                        cheaper.strategy.label(),
                        cheaper.total_interest_paid,
                        dearer.total_interest_paid,
                        dearer.strategy.label(),
                        if already {
                            " You are already using the cheaper method."
                        } else {
                            ""
                        }
                    ),
                    debt_id: None,
                    interest_saved: Some(gap.abs()),
                    months_saved: Some(months_saved),
                });
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            warnings.push(format!("Strategy comparison skipped: {e}"));
        }
    }

    // -- Extra payment probe ------------------------------------------------
    if let Some(base) = &current_plan {
        if !active.is_empty() {
            let probe = input.extra_monthly_payment + thresholds.probe_extra_payment;
            match run(&input.strategy, probe) {
                Ok(boosted) => {
                    let months_saved = base
                        .months_to_debt_free
                        .saturating_sub(boosted.months_to_debt_free);
                    let interest_saved =
                        base.total_interest_paid - boosted.total_interest_paid;
                    if months_saved > 0 || interest_saved > Decimal::ZERO {
                        recommendations.push(Recommendation {
                            kind: RecommendationKind::IncreasePayment,
                            title: format!(
                                "Add {} a month to finish {} month(s) sooner",
                                thresholds.probe_extra_payment, months_saved
                            ),
                            message: format!(
                                "Raising your extra payment from {} to {} moves your debt-free \
                                 date from {} to {} and saves {} in interest.",
                                input.extra_monthly_payment,
                                probe,
                                base.projected_payoff_date,
                                boosted.projected_payoff_date,
                                interest_saved
                            ),
                            debt_id: None,
                            interest_saved: Some(interest_saved),
                            months_saved: Some(months_saved),
                        });
                    }
                }
                Err(e) => warnings.push(format!("Extra payment probe skipped: {e}")),
            }
        }
    }

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "strategy": input.strategy.label(),
        "extra_monthly_payment": input.extra_monthly_payment.to_string(),
        "refinance_apr": thresholds.refinance_apr.to_string(),
        "quick_win_balance": thresholds.quick_win_balance.to_string(),
        "material_difference": thresholds.material_difference.to_string(),
        "probe_extra_payment": thresholds.probe_extra_payment.to_string(),
    });

    Ok(with_metadata(
        "Heuristics over waterfall simulations",
        &assumptions,
        warnings,
        elapsed,
        RecommendationOutput {
            recommendations,
            current_plan,
        },
    ))
}

fn percent(rate: Rate) -> Decimal {
    (rate * dec!(100)).round_dp(1).normalize()
}
