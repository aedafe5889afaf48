use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::debt::{Debt, PaymentKind, PaymentRecord};
use crate::types::{with_metadata, ComputationOutput, DebtId, Money, Rate};
use crate::PayoffResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryInput {
    pub debts: Vec<Debt>,
    #[serde(default)]
    pub payments: Vec<PaymentRecord>,
}

/// Portfolio-wide totals across every tracked debt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_original_balance: Money,
    pub total_current_balance: Money,
    pub total_principal_repaid: Money,
    /// Interest paid through recorded payments.
    pub total_interest_paid: Money,
    pub total_minimum_payment: Money,
    /// Current-balance weighted APR of active debts.
    pub weighted_apr: Rate,
    pub percent_paid: Rate,
    pub monthly_interest: Money,
    pub active_debts: usize,
    pub cleared_debts: usize,
    /// Active debt with the smallest balance, the next snowball target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smallest_balance_debt: Option<DebtId>,
    /// Active debt with the highest APR, the next avalanche target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest_apr_debt: Option<DebtId>,
}

pub fn summarize(debts: &[Debt], payments: &[PaymentRecord]) -> PortfolioSummary {
    let active: Vec<&Debt> = debts.iter().filter(|d| d.is_open()).collect();

    let total_original_balance: Money = debts.iter().map(|d| d.original_balance).sum();
    let total_current_balance: Money = debts.iter().map(|d| d.current_balance).sum();
    let total_minimum_payment: Money = active.iter().map(|d| d.minimum_payment).sum();
    let monthly_interest: Money = active.iter().map(|d| d.monthly_interest()).sum();

    let total_interest_paid: Money = payments
        .iter()
        .filter(|p| p.kind == PaymentKind::Payment)
        .map(|p| p.interest_paid)
        .sum();

    let active_balance: Money = active.iter().map(|d| d.current_balance).sum();
    let weighted_apr = if active_balance.is_zero() {
        Decimal::ZERO
    } else {
        active
            .iter()
            .map(|d| d.apr * d.current_balance)
            .sum::<Decimal>()
            / active_balance
    };

    let percent_paid = if total_original_balance.is_zero() {
        Decimal::ZERO
    } else {
        (total_original_balance - total_current_balance) / total_original_balance
    };

    let smallest_balance_debt = active
        .iter()
        .min_by(|a, b| a.current_balance.cmp(&b.current_balance).then_with(|| a.id.cmp(&b.id)))
        .map(|d| d.id.clone());
    let highest_apr_debt = active
        .iter()
        .max_by(|a, b| a.apr.cmp(&b.apr).then_with(|| b.id.cmp(&a.id)))
        .map(|d| d.id.clone());

    PortfolioSummary {
        total_original_balance,
        total_current_balance,
        total_principal_repaid: total_original_balance - total_current_balance,
        total_interest_paid,
        total_minimum_payment,
        weighted_apr,
        percent_paid,
        monthly_interest,
        active_debts: active.len(),
        cleared_debts: debts.len() - active.len(),
        smallest_balance_debt,
        highest_apr_debt,
    }
}

pub fn calculate_summary(
    input: &SummaryInput,
) -> PayoffResult<ComputationOutput<PortfolioSummary>> {
    let start = Instant::now();
    for debt in &input.debts {
        debt.validate()?;
    }
    let summary = summarize(&input.debts, &input.payments);
    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "weighting": "current balance",
    });
    Ok(with_metadata(
        "Portfolio debt summary",
        &assumptions,
        Vec::new(),
        elapsed,
        summary,
    ))
}
