use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::debt::Debt;
use crate::types::DebtId;

/// Repayment strategy deciding which debt receives the extra payment pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "order", rename_all = "snake_case")]
pub enum PayoffStrategy {
    /// Smallest balance first.
    #[default]
    Snowball,
    /// Highest APR first.
    Avalanche,
    /// Caller-supplied id order; omitted debts follow in snowball order.
    Custom(Vec<DebtId>),
}

impl PayoffStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            PayoffStrategy::Snowball => "snowball",
            PayoffStrategy::Avalanche => "avalanche",
            PayoffStrategy::Custom(_) => "custom",
        }
    }
}

/// Order the active debts for the waterfall. Inactive debts are dropped.
///
/// Every comparator falls back to the debt id, so the permutation is total
/// and identical inputs always produce identical orders.
pub fn sort_debts(debts: &[Debt], strategy: &PayoffStrategy) -> Vec<Debt> {
    let mut active: Vec<Debt> = debts.iter().filter(|d| d.is_open()).cloned().collect();

    match strategy {
        PayoffStrategy::Snowball => {
            active.sort_by(snowball_cmp);
            active
        }
        PayoffStrategy::Avalanche => {
            active.sort_by(avalanche_cmp);
            active
        }
        PayoffStrategy::Custom(order) => {
            let mut seen: HashSet<&str> = HashSet::new();
            let mut ordered: Vec<Debt> = Vec::with_capacity(active.len());
            for id in order {
                if !seen.insert(id.as_str()) {
                    continue;
                }
                if let Some(debt) = active.iter().find(|d| &d.id == id) {
                    ordered.push(debt.clone());
                }
            }
            let mut rest: Vec<Debt> = active
                .into_iter()
                .filter(|d| !seen.contains(d.id.as_str()))
                .collect();
            rest.sort_by(snowball_cmp);
            ordered.extend(rest);
            ordered
        }
    }
}

/// Ids of the sorted debts, the form stored on a plan.
pub fn debt_order(debts: &[Debt], strategy: &PayoffStrategy) -> Vec<DebtId> {
    sort_debts(debts, strategy)
        .into_iter()
        .map(|d| d.id)
        .collect()
}

fn snowball_cmp(a: &Debt, b: &Debt) -> Ordering {
    a.current_balance
        .cmp(&b.current_balance)
        .then_with(|| b.apr.cmp(&a.apr))
        .then_with(|| a.id.cmp(&b.id))
}

fn avalanche_cmp(a: &Debt, b: &Debt) -> Ordering {
    b.apr
        .cmp(&a.apr)
        .then_with(|| a.current_balance.cmp(&b.current_balance))
        .then_with(|| a.id.cmp(&b.id))
}
