use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::strategy::sort_debts;
use crate::types::{add_months, with_metadata, ComputationOutput, DebtId, Money};
use crate::waterfall::{run_waterfall, validate_plan_inputs, PlanInput};
use crate::PayoffResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One (month, debt) point of the balance-over-time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoffProjection {
    pub month: u32,
    pub date: NaiveDate,
    pub debt_id: DebtId,
    pub balance: Money,
    pub interest_paid: Money,
    pub principal_paid: Money,
    pub payment: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionOutput {
    pub debt_order: Vec<DebtId>,
    pub rows: Vec<PayoffProjection>,
    /// Months covered by `rows`.
    pub months_projected: u32,
    /// Months the full simulation needed to clear every debt.
    pub months_to_debt_free: u32,
    /// True when the plan runs past the projection window.
    pub incomplete: bool,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Month-by-month balances for charting, using the same waterfall as the
/// plan. Rows stop at the projection window; the simulation itself still
/// runs to completion so non-convergence is reported rather than truncated.
pub fn generate_projection(input: &PlanInput) -> PayoffResult<ComputationOutput<ProjectionOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_plan_inputs(&input.debts, input.extra_monthly_payment)?;
    let ordered = sort_debts(&input.debts, &input.strategy);
    let window = input.limits.projection_months.min(input.limits.max_months);

    let mut rows: Vec<PayoffProjection> = Vec::new();
    let mut date_error = None;
    let run = run_waterfall(
        &ordered,
        input.extra_monthly_payment,
        &input.limits,
        |month, step| {
            if month > window || date_error.is_some() {
                return;
            }
            let date = match add_months(input.as_of, month) {
                Ok(d) => d,
                Err(e) => {
                    date_error = Some(e);
                    return;
                }
            };
            rows.extend(step.iter().map(|r| PayoffProjection {
                month,
                date,
                debt_id: r.debt_id.clone(),
                balance: r.balance,
                interest_paid: r.interest,
                principal_paid: r.principal,
                payment: r.payment,
            }));
        },
    )?;
    if let Some(e) = date_error {
        return Err(e);
    }

    let incomplete = run.months > window;
    if incomplete {
        warnings.push(format!(
            "Plan needs {} months; projection truncated at {} months.",
            run.months, window
        ));
    }
    debug!(rows = rows.len(), months = run.months, incomplete, "projection generated");

    let output = ProjectionOutput {
        debt_order: ordered.into_iter().map(|d| d.id).collect(),
        rows,
        months_projected: run.months.min(window),
        months_to_debt_free: run.months,
        incomplete,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "strategy": input.strategy.label(),
        "extra_monthly_payment": input.extra_monthly_payment.to_string(),
        "projection_months": window,
    });

    Ok(with_metadata(
        "Waterfall balance projection",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}
