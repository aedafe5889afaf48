//! Closed-form single-debt amortization.
//!
//! months = ceil(-ln(1 - r*B/P) / ln(1 + r)), r = APR / 12
//!
//! These figures are advisory. The waterfall simulator steps month by month
//! and never calls into this module except for the minimum-only baseline.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::warn;

use crate::debt::Debt;
use crate::error::PayoffError;
use crate::types::{
    add_months, monthly_rate, round_cents, with_metadata, ComputationOutput, DebtId, Money,
    SimulationLimits,
};
use crate::PayoffResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationInput {
    pub debt: Debt,
    pub as_of: NaiveDate,
    #[serde(default)]
    pub limits: SimulationLimits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationSummary {
    pub debt_id: DebtId,
    pub months_to_payoff: u32,
    pub payoff_date: NaiveDate,
    pub total_interest_remaining: Money,
    pub total_paid: Money,
    pub monthly_interest: Money,
    pub principal_portion: Money,
}

/// One month of a single-debt schedule paid at the minimum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationRow {
    pub month: u32,
    pub date: NaiveDate,
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    pub balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationOutput {
    pub summary: AmortizationSummary,
    pub schedule: Vec<AmortizationRow>,
    pub schedule_interest: Money,
}

// ---------------------------------------------------------------------------
// Closed form
// ---------------------------------------------------------------------------

/// Months needed to retire the current balance at the minimum payment.
pub fn months_to_payoff(debt: &Debt) -> PayoffResult<u32> {
    let balance = debt.current_balance;
    let payment = debt.minimum_payment;
    if balance <= Decimal::ZERO {
        return Ok(0);
    }
    if payment <= Decimal::ZERO {
        return Err(PayoffError::DivisionByZero {
            context: format!("months_to_payoff for '{}'", debt.id),
        });
    }

    let rate = monthly_rate(debt.apr);
    if rate.is_zero() {
        return to_months((balance / payment).ceil(), debt);
    }

    if payment <= debt.monthly_interest() {
        return Err(non_convergent(debt));
    }

    // 1 - r*B/P is in (0, 1) once the payment out-runs the interest.
    let inner = Decimal::ONE - rate * balance / payment;
    if inner <= Decimal::ZERO {
        return Err(non_convergent(debt));
    }
    let numerator = inner
        .checked_ln()
        .ok_or_else(|| non_convergent(debt))?;
    let denominator = (Decimal::ONE + rate)
        .checked_ln()
        .ok_or_else(|| PayoffError::DivisionByZero {
            context: format!("ln(1 + r) for '{}'", debt.id),
        })?;
    if denominator.is_zero() {
        return Err(PayoffError::DivisionByZero {
            context: format!("ln(1 + r) for '{}'", debt.id),
        });
    }

    to_months((-numerator / denominator).ceil(), debt)
}

/// Interest still to be paid at the minimum: max(0, P * months - B).
pub fn total_interest_remaining(debt: &Debt) -> PayoffResult<Money> {
    let months = months_to_payoff(debt)?;
    let total = debt.minimum_payment * Decimal::from(months) - debt.current_balance;
    Ok(round_cents(total.max(Decimal::ZERO)))
}

/// Closed-form summary for display.
pub fn analyze_debt(debt: &Debt, as_of: NaiveDate) -> PayoffResult<AmortizationSummary> {
    let months = months_to_payoff(debt)?;
    let interest = total_interest_remaining(debt)?;
    Ok(AmortizationSummary {
        debt_id: debt.id.clone(),
        months_to_payoff: months,
        payoff_date: add_months(as_of, months)?,
        total_interest_remaining: interest,
        total_paid: debt.current_balance + interest,
        monthly_interest: debt.monthly_interest(),
        principal_portion: debt.principal_portion(),
    })
}

// ---------------------------------------------------------------------------
// Iterative schedule
// ---------------------------------------------------------------------------

/// Month-by-month schedule paying only the minimum, cut off at
/// `limits.max_months`. A cut-off schedule ends on a positive balance.
pub fn amortization_schedule(
    debt: &Debt,
    as_of: NaiveDate,
    limits: &SimulationLimits,
) -> PayoffResult<Vec<AmortizationRow>> {
    if debt.is_underwater() {
        return Err(non_convergent(debt));
    }

    let rate = monthly_rate(debt.apr);
    let mut balance = debt.current_balance;
    let mut rows = Vec::new();
    let mut month = 0u32;

    while balance > limits.epsilon && month < limits.max_months {
        month += 1;
        let interest = round_cents(balance * rate);
        let payment = debt.minimum_payment.min(balance + interest);
        let principal = payment - interest;
        balance = (balance - principal).max(Decimal::ZERO);
        rows.push(AmortizationRow {
            month,
            date: add_months(as_of, month)?,
            payment,
            interest,
            principal,
            balance,
        });
    }

    Ok(rows)
}

/// Closed-form summary plus the iterative schedule, wrapped for output.
pub fn calculate_amortization(
    input: &AmortizationInput,
) -> PayoffResult<ComputationOutput<AmortizationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    input.debt.validate()?;
    let summary = analyze_debt(&input.debt, input.as_of)?;
    let schedule = amortization_schedule(&input.debt, input.as_of, &input.limits)?;
    let schedule_interest: Money = schedule.iter().map(|r| r.interest).sum();

    let truncated = schedule
        .last()
        .is_some_and(|row| row.balance > input.limits.epsilon);
    if truncated {
        warn!(debt_id = %input.debt.id, "amortization schedule truncated");
        warnings.push(format!(
            "Schedule truncated at {} months; the closed-form payoff needs {} months.",
            schedule.len(),
            summary.months_to_payoff
        ));
    } else if schedule.len() as u32 != summary.months_to_payoff {
        warnings.push(format!(
            "Closed-form estimate ({} months) differs from the cent-rounded schedule ({} months).",
            summary.months_to_payoff,
            schedule.len()
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "monthly_rate": monthly_rate(input.debt.apr).to_string(),
        "payment": input.debt.minimum_payment.to_string(),
        "interest_rounding": "cents, half away from zero",
    });

    Ok(with_metadata(
        "Closed-form amortization with minimum-payment schedule",
        &assumptions,
        warnings,
        elapsed,
        AmortizationOutput {
            summary,
            schedule,
            schedule_interest,
        },
    ))
}

fn to_months(months: Decimal, debt: &Debt) -> PayoffResult<u32> {
    months.to_u32().ok_or_else(|| non_convergent(debt))
}

fn non_convergent(debt: &Debt) -> PayoffError {
    PayoffError::NonConvergentAmortization {
        debt_id: debt.id.clone(),
        monthly_interest: debt.monthly_interest(),
        minimum_payment: debt.minimum_payment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debt::DebtCategory;
    use rust_decimal_macros::dec;

    fn debt(balance: Money, apr: Decimal, min: Money) -> Debt {
        Debt {
            id: "loan".into(),
            name: "Loan".into(),
            category: DebtCategory::PersonalLoan,
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

    #[test]
    fn test_months_zero_apr() {
        // 1000 / 75 = 13.33 -> 14
        let d = debt(dec!(1000), Decimal::ZERO, dec!(75));
        assert_eq!(months_to_payoff(&d).unwrap(), 14);
        // 14 * 75 - 1000 = 50, an artefact of the final partial payment
        assert_eq!(total_interest_remaining(&d).unwrap(), dec!(50));
    }

    #[test]
    fn test_months_with_interest() {
        // 1000 at 12% paying 100/month: n = -ln(1 - 0.01*10)/ln(1.01) = 10.59 -> 11
        let d = debt(dec!(1000), dec!(0.12), dec!(100));
        assert_eq!(months_to_payoff(&d).unwrap(), 11);
        assert_eq!(total_interest_remaining(&d).unwrap(), dec!(100));
    }

    #[test]
    fn test_underwater_debt_never_amortizes() {
        // monthly interest = 10000 * 0.025 = 250 > 20
        let d = debt(dec!(10000), dec!(0.30), dec!(20));
        let err = months_to_payoff(&d).unwrap_err();
        match err {
            PayoffError::NonConvergentAmortization {
                monthly_interest,
                minimum_payment,
                ..
            } => {
                assert_eq!(monthly_interest, dec!(250));
                assert_eq!(minimum_payment, dec!(20));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(total_interest_remaining(&d).is_err());
    }

    #[test]
    fn test_payment_equal_to_interest_never_amortizes() {
        let d = debt(dec!(1200), dec!(0.10), dec!(10));
        assert!(matches!(
            months_to_payoff(&d),
            Err(PayoffError::NonConvergentAmortization { .. })
        ));
    }

    #[test]
    fn test_zero_balance_is_zero_months() {
        let mut d = debt(dec!(1000), dec!(0.2), dec!(50));
        d.current_balance = Decimal::ZERO;
        assert_eq!(months_to_payoff(&d).unwrap(), 0);
        assert_eq!(total_interest_remaining(&d).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_schedule_ends_at_zero_and_tracks_closed_form() {
        let d = debt(dec!(1000), dec!(0.12), dec!(100));
        let rows = amortization_schedule(&d, as_of(), &SimulationLimits::default()).unwrap();
        assert_eq!(rows.last().unwrap().balance, Decimal::ZERO);
        let closed = months_to_payoff(&d).unwrap() as i64;
        assert!((rows.len() as i64 - closed).abs() <= 1);
        for pair in rows.windows(2) {
            assert!(pair[1].balance <= pair[0].balance);
        }
    }

    #[test]
    fn test_analyze_debt_payoff_date() {
        let d = debt(dec!(1000), dec!(0.12), dec!(100));
        let summary = analyze_debt(&d, as_of()).unwrap();
        assert_eq!(
            summary.payoff_date,
            NaiveDate::from_ymd_opt(2025, 12, 1).unwrap()
        );
        assert_eq!(summary.monthly_interest, dec!(10));
        assert_eq!(summary.principal_portion, dec!(90));
    }

    #[test]
    fn test_calculate_amortization_envelope() {
        let input = AmortizationInput {
            debt: debt(dec!(2400), dec!(0.18), dec!(120)),
            as_of: as_of(),
            limits: SimulationLimits::default(),
        };
        let out = calculate_amortization(&input).unwrap();
        assert!(!out.result.schedule.is_empty());
        assert!(out.result.schedule_interest > Decimal::ZERO);
        assert!(out.result.summary.total_interest_remaining >= out.result.schedule_interest);
    }

    #[test]
    fn test_long_schedule_is_truncated_with_warning() {
        // 4000 / 5 = 800 months, past the 600 month cap
        let input = AmortizationInput {
            debt: debt(dec!(4000), Decimal::ZERO, dec!(5)),
            as_of: as_of(),
            limits: SimulationLimits::default(),
        };
        let out = calculate_amortization(&input).unwrap();
        assert_eq!(out.result.summary.months_to_payoff, 800);
        assert_eq!(out.result.schedule.len(), 600);
        assert_eq!(out.result.schedule.last().unwrap().balance, dec!(1000));
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].contains("truncated at 600"));
    }
}
