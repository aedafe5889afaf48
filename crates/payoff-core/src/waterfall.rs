//! Multi-debt waterfall simulator.
//!
//! Month by month:
//! - every remaining debt accrues one month of interest (rounded to cents)
//! - the highest-priority remaining debt pays its minimum plus the extra pool,
//!   every other debt pays its own minimum
//! - balances are clamped at zero; anything at or below the epsilon clears
//! - a cleared debt's minimum joins the extra pool for all later months
//!
//! The same engine drives the projection generator, which records each month
//! instead of only the totals.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::amortization::total_interest_remaining;
use crate::debt::Debt;
use crate::error::PayoffError;
use crate::strategy::{sort_debts, PayoffStrategy};
use crate::types::{
    add_months, monthly_rate, round_cents, with_metadata, ComputationOutput, DebtId, Money,
    Rate, SimulationLimits,
};
use crate::PayoffResult;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInput {
    pub debts: Vec<Debt>,
    #[serde(default)]
    pub strategy: PayoffStrategy,
    #[serde(default)]
    pub extra_monthly_payment: Money,
    /// Month zero of the simulation; payoff dates count from here.
    pub as_of: NaiveDate,
    #[serde(default)]
    pub limits: SimulationLimits,
}

/// When a single debt leaves the waterfall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtPayoff {
    pub debt_id: DebtId,
    pub month: u32,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoffPlan {
    pub strategy: PayoffStrategy,
    pub extra_monthly_payment: Money,
    /// Waterfall order of debt ids, highest priority first.
    pub debt_order: Vec<DebtId>,
    pub months_to_debt_free: u32,
    pub projected_payoff_date: NaiveDate,
    pub total_interest_paid: Money,
    pub total_paid: Money,
    /// Interest paying only minimums, per the closed-form calculator.
    /// `None` when some debt never amortizes on its minimum alone.
    pub baseline_interest: Option<Money>,
    /// `baseline_interest - total_interest_paid`.
    pub total_interest_saved: Option<Money>,
    pub payoff_events: Vec<DebtPayoff>,
    pub created_at: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonInput {
    pub debts: Vec<Debt>,
    #[serde(default)]
    pub extra_monthly_payment: Money,
    #[serde(default = "default_strategies")]
    pub strategies: Vec<PayoffStrategy>,
    pub as_of: NaiveDate,
    #[serde(default)]
    pub limits: SimulationLimits,
}

fn default_strategies() -> Vec<PayoffStrategy> {
    vec![PayoffStrategy::Snowball, PayoffStrategy::Avalanche]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyComparison {
    pub plans: Vec<PayoffPlan>,
    /// Index into `plans` of the plan paying the least interest.
    pub cheapest: usize,
    /// Index into `plans` of the plan finishing soonest.
    pub fastest: usize,
    /// Interest spread between the most and least expensive plans.
    pub interest_spread: Money,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// One debt's movement within a simulated month.
#[derive(Debug, Clone)]
pub(crate) struct StepRow {
    pub debt_id: DebtId,
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    pub balance: Money,
}

#[derive(Debug, Clone)]
pub(crate) struct WaterfallRun {
    pub months: u32,
    pub total_interest: Money,
    pub total_paid: Money,
    /// (debt id, month it cleared), in clearing order.
    pub cleared: Vec<(DebtId, u32)>,
}

struct Slot {
    id: DebtId,
    balance: Money,
    rate: Rate,
    minimum: Money,
}

/// Run the waterfall over debts already in priority order. `on_month` sees
/// every remaining debt's row for each simulated month, before removal.
pub(crate) fn run_waterfall<F>(
    ordered: &[Debt],
    extra: Money,
    limits: &SimulationLimits,
    mut on_month: F,
) -> PayoffResult<WaterfallRun>
where
    F: FnMut(u32, &[StepRow]),
{
    let mut remaining: Vec<Slot> = ordered
        .iter()
        .filter(|d| d.current_balance > limits.epsilon)
        .map(|d| Slot {
            id: d.id.clone(),
            balance: d.current_balance,
            rate: monthly_rate(d.apr),
            minimum: d.minimum_payment,
        })
        .collect();

    let mut pool = extra;
    let mut month = 0u32;
    let mut total_interest = Decimal::ZERO;
    let mut total_paid = Decimal::ZERO;
    let mut cleared: Vec<(DebtId, u32)> = Vec::with_capacity(remaining.len());
    let mut rows: Vec<StepRow> = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        if month >= limits.max_months {
            warn!(
                months = month,
                remaining_debts = remaining.len(),
                "waterfall simulation hit the month cap"
            );
            return Err(not_converged(month, &remaining));
        }
        month += 1;
        rows.clear();

        let mut overflowed = false;
        for (i, slot) in remaining.iter_mut().enumerate() {
            let scheduled = if i == 0 {
                slot.minimum.checked_add(pool)
            } else {
                Some(slot.minimum)
            };
            let step =
                scheduled.and_then(|scheduled| step_debt(slot.balance, slot.rate, scheduled));
            let Some((interest, paid, new_balance)) = step else {
                overflowed = true;
                break;
            };
            let new_balance = if new_balance <= limits.epsilon {
                Decimal::ZERO
            } else {
                new_balance
            };
            let principal = if new_balance.is_zero() {
                slot.balance
            } else {
                (paid - interest).max(Decimal::ZERO)
            };

            rows.push(StepRow {
                debt_id: slot.id.clone(),
                payment: paid,
                interest,
                principal,
                balance: new_balance,
            });
            match (
                total_interest.checked_add(interest),
                total_paid.checked_add(paid),
            ) {
                (Some(ti), Some(tp)) => {
                    total_interest = ti;
                    total_paid = tp;
                }
                _ => {
                    overflowed = true;
                    break;
                }
            }
            slot.balance = new_balance;
        }
        if overflowed {
            warn!(
                months = month,
                remaining_debts = remaining.len(),
                "waterfall balances grew past the representable range"
            );
            return Err(not_converged(month, &remaining));
        }

        on_month(month, &rows);

        // Roll every cleared minimum into the pool for the following months.
        let mut i = 0;
        while i < remaining.len() {
            if remaining[i].balance.is_zero() {
                let slot = remaining.remove(i);
                pool = pool.saturating_add(slot.minimum);
                cleared.push((slot.id, month));
            } else {
                i += 1;
            }
        }
    }

    Ok(WaterfallRun {
        months: month,
        total_interest,
        total_paid,
        cleared,
    })
}

/// One month for one debt: (interest accrued, amount paid, new balance).
/// `None` once the balance no longer fits in a `Decimal`.
fn step_debt(balance: Money, rate: Rate, scheduled: Money) -> Option<(Money, Money, Money)> {
    let interest = round_cents(balance.checked_mul(rate)?);
    let owed = balance.checked_add(interest)?;
    let new_balance = (owed - scheduled).max(Decimal::ZERO);
    Some((interest, owed - new_balance, new_balance))
}

fn not_converged(months: u32, remaining: &[Slot]) -> PayoffError {
    PayoffError::SimulationDidNotConverge {
        months,
        remaining_debts: remaining.len(),
        remaining_balance: remaining
            .iter()
            .fold(Decimal::ZERO, |acc, s| acc.saturating_add(s.balance)),
    }
}

/// Sum of each active debt's closed-form minimum-only interest, or `None`
/// when any debt never amortizes on its own.
pub fn baseline_interest(debts: &[Debt]) -> PayoffResult<Option<Money>> {
    let mut total = Decimal::ZERO;
    for debt in debts.iter().filter(|d| d.is_open()) {
        match total_interest_remaining(debt) {
            Ok(interest) => total += interest,
            Err(PayoffError::NonConvergentAmortization { .. }) => return Ok(None),
            Err(e) => return Err(e),
        }
    }
    Ok(Some(total))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build a plan without the output envelope.
pub fn build_plan(
    debts: &[Debt],
    strategy: &PayoffStrategy,
    extra_monthly_payment: Money,
    as_of: NaiveDate,
    limits: &SimulationLimits,
) -> PayoffResult<PayoffPlan> {
    validate_plan_inputs(debts, extra_monthly_payment)?;

    let ordered = sort_debts(debts, strategy);
    let run = run_waterfall(&ordered, extra_monthly_payment, limits, |_, _| {})?;

    let baseline = baseline_interest(&ordered)?;
    let saved = baseline.map(|b| b - run.total_interest);

    let mut payoff_events = Vec::with_capacity(run.cleared.len());
    for (debt_id, month) in &run.cleared {
        payoff_events.push(DebtPayoff {
            debt_id: debt_id.clone(),
            month: *month,
            date: add_months(as_of, *month)?,
        });
    }

    debug!(
        strategy = strategy.label(),
        months = run.months,
        total_interest = %run.total_interest,
        "payoff plan simulated"
    );

    Ok(PayoffPlan {
        strategy: strategy.clone(),
        extra_monthly_payment,
        debt_order: ordered.into_iter().map(|d| d.id).collect(),
        months_to_debt_free: run.months,
        projected_payoff_date: add_months(as_of, run.months)?,
        total_interest_paid: run.total_interest,
        total_paid: run.total_paid,
        baseline_interest: baseline,
        total_interest_saved: saved,
        payoff_events,
        created_at: as_of,
    })
}

/// Simulate a full payoff plan for the given strategy and extra payment.
pub fn simulate_plan(input: &PlanInput) -> PayoffResult<ComputationOutput<PayoffPlan>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let plan = build_plan(
        &input.debts,
        &input.strategy,
        input.extra_monthly_payment,
        input.as_of,
        &input.limits,
    )?;

    if plan.baseline_interest.is_none() {
        warnings.push(
            "At least one debt never pays off on its minimum alone; interest saved is undefined."
                .into(),
        );
    }
    for debt in input.debts.iter().filter(|d| d.is_open() && d.is_underwater()) {
        warnings.push(format!(
            "'{}' minimum payment {} does not cover monthly interest {}.",
            debt.id,
            debt.minimum_payment,
            debt.monthly_interest()
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "strategy": input.strategy.label(),
        "extra_monthly_payment": input.extra_monthly_payment.to_string(),
        "max_months": input.limits.max_months,
        "epsilon": input.limits.epsilon.to_string(),
        "baseline": "closed-form minimum-payment interest per debt",
    });

    Ok(with_metadata(
        "Waterfall payoff simulation with minimum-payment rollover",
        &assumptions,
        warnings,
        elapsed,
        plan,
    ))
}

/// Run one plan per strategy against the same debts and extra payment.
pub fn compare_strategies(
    input: &ComparisonInput,
) -> PayoffResult<ComputationOutput<StrategyComparison>> {
    let start = Instant::now();

    if input.strategies.is_empty() {
        return Err(PayoffError::InvalidInput {
            field: "strategies".into(),
            reason: "At least one strategy is required.".into(),
        });
    }

    let plans = input
        .strategies
        .iter()
        .map(|s| {
            build_plan(
                &input.debts,
                s,
                input.extra_monthly_payment,
                input.as_of,
                &input.limits,
            )
        })
        .collect::<PayoffResult<Vec<_>>>()?;

    let mut cheapest = 0;
    let mut fastest = 0;
    for (i, plan) in plans.iter().enumerate() {
        if plan.total_interest_paid < plans[cheapest].total_interest_paid {
            cheapest = i;
        }
        if plan.months_to_debt_free < plans[fastest].months_to_debt_free {
            fastest = i;
        }
    }
    let max_interest = plans
        .iter()
        .map(|p| p.total_interest_paid)
        .max()
        .unwrap_or(Decimal::ZERO);
    let interest_spread = max_interest - plans[cheapest].total_interest_paid;

    let elapsed = start.elapsed().as_micros() as u64;
    let labels: Vec<&str> = input.strategies.iter().map(|s| s.label()).collect();
    let assumptions = serde_json::json!({
        "strategies": labels,
        "extra_monthly_payment": input.extra_monthly_payment.to_string(),
    });

    Ok(with_metadata(
        "Side-by-side waterfall simulations",
        &assumptions,
        Vec::new(),
        elapsed,
        StrategyComparison {
            plans,
            cheapest,
            fastest,
            interest_spread,
        },
    ))
}

pub(crate) fn validate_plan_inputs(debts: &[Debt], extra: Money) -> PayoffResult<()> {
    if extra < Decimal::ZERO {
        return Err(PayoffError::InvalidInput {
            field: "extra_monthly_payment".into(),
            reason: "Extra monthly payment cannot be negative.".into(),
        });
    }
    for debt in debts {
        debt.validate()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debt::DebtCategory;
    use rust_decimal_macros::dec;

    fn debt(id: &str, balance: Money, apr: Rate, min: Money) -> Debt {
        Debt {
            id: id.into(),
            name: id.into(),
            category: DebtCategory::CreditCard,
            original_balance: balance,
            current_balance: balance,
            apr,
            minimum_payment: min,
            due_day: 1,
            lender: None,
            is_active: true,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn plan(debts: &[Debt], strategy: PayoffStrategy, extra: Money) -> PayoffPlan {
        build_plan(debts, &strategy, extra, as_of(), &SimulationLimits::default()).unwrap()
    }

    #[test]
    fn test_single_zero_rate_debt() {
        let debts = vec![debt("a", dec!(1000), Decimal::ZERO, dec!(100))];
        let p = plan(&debts, PayoffStrategy::Snowball, Decimal::ZERO);
        assert_eq!(p.months_to_debt_free, 10);
        assert_eq!(p.total_interest_paid, Decimal::ZERO);
        assert_eq!(p.total_paid, dec!(1000));
        assert_eq!(
            p.projected_payoff_date,
            NaiveDate::from_ymd_opt(2025, 11, 1).unwrap()
        );
    }

    #[test]
    fn test_rollover_accelerates_second_debt() {
        let debts = vec![
            debt("small", dec!(300), Decimal::ZERO, dec!(100)),
            debt("big", dec!(1500), Decimal::ZERO, dec!(100)),
        ];
        let p = plan(&debts, PayoffStrategy::Snowball, Decimal::ZERO);
        // small clears in month 3 (300 of 1500 paid on big), then big gets 200/month:
        // 1200 remaining / 200 = 6 more months
        assert_eq!(p.payoff_events[0].debt_id, "small");
        assert_eq!(p.payoff_events[0].month, 3);
        assert_eq!(p.months_to_debt_free, 9);
    }

    #[test]
    fn test_empty_ledger_is_debt_free_now() {
        let p = plan(&[], PayoffStrategy::Avalanche, dec!(100));
        assert_eq!(p.months_to_debt_free, 0);
        assert_eq!(p.projected_payoff_date, as_of());
        assert_eq!(p.total_interest_saved, Some(Decimal::ZERO));
    }

    #[test]
    fn test_negative_extra_rejected() {
        let debts = vec![debt("a", dec!(1000), dec!(0.1), dec!(50))];
        let err = build_plan(
            &debts,
            &PayoffStrategy::Snowball,
            dec!(-1),
            as_of(),
            &SimulationLimits::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PayoffError::InvalidInput { .. }));
    }

    #[test]
    fn test_month_cap_reports_non_convergence() {
        let debts = vec![debt("a", dec!(10000), dec!(0.30), dec!(20))];
        let err = build_plan(
            &debts,
            &PayoffStrategy::Snowball,
            Decimal::ZERO,
            as_of(),
            &SimulationLimits::default(),
        )
        .unwrap_err();
        match err {
            PayoffError::SimulationDidNotConverge {
                months,
                remaining_debts,
                ..
            } => {
                assert_eq!(months, 600);
                assert_eq!(remaining_debts, 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_runaway_balance_reports_non_convergence() {
        // 25% a month on a 10 minimum grows past Decimal range before month 600
        let debts = vec![debt("payday", dec!(1000), dec!(3.0), dec!(10))];
        let err = build_plan(
            &debts,
            &PayoffStrategy::Snowball,
            Decimal::ZERO,
            as_of(),
            &SimulationLimits::default(),
        )
        .unwrap_err();
        match err {
            PayoffError::SimulationDidNotConverge {
                months,
                remaining_debts,
                remaining_balance,
            } => {
                assert!(months < 600);
                assert_eq!(remaining_debts, 1);
                assert!(remaining_balance > dec!(1000));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_extra_payment_rescues_underwater_debt() {
        // Interest 250/month, minimum 20: hopeless alone, fine with 500 extra.
        let debts = vec![debt("a", dec!(10000), dec!(0.30), dec!(20))];
        let p = plan(&debts, PayoffStrategy::Snowball, dec!(500));
        assert!(p.months_to_debt_free < 600);
        assert_eq!(p.baseline_interest, None);
        assert_eq!(p.total_interest_saved, None);
    }

    #[test]
    fn test_interest_saved_is_baseline_minus_simulated() {
        let debts = vec![
            debt("a", dec!(1000), dec!(0.24), dec!(50)),
            debt("b", dec!(5000), dec!(0.10), dec!(120)),
        ];
        let p = plan(&debts, PayoffStrategy::Snowball, dec!(100));
        let baseline = baseline_interest(&debts).unwrap().unwrap();
        assert_eq!(p.baseline_interest, Some(baseline));
        assert_eq!(
            p.total_interest_saved,
            Some(baseline - p.total_interest_paid)
        );
        assert!(p.total_interest_saved.unwrap() > Decimal::ZERO);
    }

    #[test]
    fn test_compare_strategies_picks_cheapest() {
        let input = ComparisonInput {
            debts: vec![
                debt("low", dec!(1000), dec!(0.05), dec!(30)),
                debt("high", dec!(4000), dec!(0.24), dec!(100)),
            ],
            extra_monthly_payment: dec!(150),
            strategies: default_strategies(),
            as_of: as_of(),
            limits: SimulationLimits::default(),
        };
        let out = compare_strategies(&input).unwrap();
        let cmp = &out.result;
        assert_eq!(cmp.plans.len(), 2);
        assert_eq!(cmp.plans[cmp.cheapest].strategy, PayoffStrategy::Avalanche);
        assert!(cmp.interest_spread > Decimal::ZERO);
    }

    #[test]
    fn test_stale_activity_flags_are_ignored() {
        let input: PlanInput = serde_json::from_value(serde_json::json!({
            "debts": [
                {
                    "id": "paid",
                    "name": "Paid",
                    "original_balance": "500",
                    "current_balance": "0",
                    "apr": "0.18",
                    "minimum_payment": "25",
                    "start_date": "2024-01-01"
                },
                {
                    "id": "open",
                    "name": "Open",
                    "original_balance": "1000",
                    "current_balance": "800",
                    "apr": "0",
                    "minimum_payment": "100",
                    "is_active": false,
                    "start_date": "2024-01-01"
                }
            ],
            "as_of": "2025-01-01"
        }))
        .unwrap();
        let plan = simulate_plan(&input).unwrap().result;
        assert_eq!(plan.debt_order, vec!["open"]);
        assert_eq!(plan.months_to_debt_free, 8);
        assert_eq!(plan.payoff_events.len(), 1);
    }

    #[test]
    fn test_simulate_plan_warns_on_undefined_baseline() {
        let input = PlanInput {
            debts: vec![debt("a", dec!(10000), dec!(0.30), dec!(20))],
            strategy: PayoffStrategy::Snowball,
            extra_monthly_payment: dec!(500),
            as_of: as_of(),
            limits: SimulationLimits::default(),
        };
        let out = simulate_plan(&input).unwrap();
        assert_eq!(out.warnings.len(), 2);
    }
}
