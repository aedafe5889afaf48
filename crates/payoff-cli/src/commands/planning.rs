use clap::Args;
use chrono::NaiveDate;
use serde_json::{json, Value};

use payoff_core::amortization::{self, AmortizationInput};
use payoff_core::projection;
use payoff_core::strategy;
use payoff_core::waterfall::{self, ComparisonInput, PlanInput};

use super::{with_default_as_of, CliResult, PlanningArgs};
use crate::input;

/// Arguments for the single-debt amortization schedule
#[derive(Args)]
pub struct AmortizeArgs {
    /// Path to JSON/YAML input holding `debt`, or `debts` plus `--debt-id`
    #[arg(long)]
    pub input: Option<String>,

    /// Pick this debt out of a `debts` list
    #[arg(long)]
    pub debt_id: Option<String>,

    /// First schedule month counts from here (YYYY-MM-DD, default today)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,
}

pub fn run_plan(args: PlanningArgs) -> CliResult<Value> {
    let plan_input: PlanInput = input::into_input(args.document()?)?;
    let result = waterfall::simulate_plan(&plan_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_projection(args: PlanningArgs) -> CliResult<Value> {
    let plan_input: PlanInput = input::into_input(args.document()?)?;
    let result = projection::generate_projection(&plan_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Snowball against avalanche, plus the custom order when `--order` is given.
pub fn run_compare(args: PlanningArgs) -> CliResult<Value> {
    let mut doc = args.document()?;
    if let Some(order) = &args.order {
        let strategies = json!([
            {"type": "snowball"},
            {"type": "avalanche"},
            {"type": "custom", "order": order},
        ]);
        doc = input::apply_overrides(doc, vec![("strategies", Some(strategies))])?;
    }
    let comparison_input: ComparisonInput = input::into_input(doc)?;
    let result = waterfall::compare_strategies(&comparison_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Waterfall order only, without simulating.
pub fn run_order(args: PlanningArgs) -> CliResult<Value> {
    let plan_input: PlanInput = input::into_input(args.document()?)?;
    let sorted = strategy::sort_debts(&plan_input.debts, &plan_input.strategy);
    let rows: Vec<Value> = sorted
        .iter()
        .enumerate()
        .map(|(i, d)| {
            json!({
                "priority": i + 1,
                "debt_id": d.id,
                "name": d.name,
                "current_balance": d.current_balance,
                "apr": d.apr,
                "minimum_payment": d.minimum_payment,
            })
        })
        .collect();
    Ok(json!({
        "strategy": plan_input.strategy,
        "debt_order": sorted.iter().map(|d| d.id.clone()).collect::<Vec<_>>(),
        "rows": rows,
    }))
}

pub fn run_amortize(args: AmortizeArgs) -> CliResult<Value> {
    let doc = input::load_document(args.input.as_deref())?;
    let doc = select_debt(doc, args.debt_id.as_deref())?;
    let doc = input::apply_overrides(
        doc,
        vec![("as_of", args.as_of.map(|d| json!(d.to_string())))],
    )?;
    let amortization_input: AmortizationInput = input::into_input(with_default_as_of(doc))?;
    let result = amortization::calculate_amortization(&amortization_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Move one entry of `debts` into `debt`. A single-entry list needs no id.
fn select_debt(mut doc: Value, debt_id: Option<&str>) -> CliResult<Value> {
    let map = doc
        .as_object_mut()
        .ok_or("input document must be a JSON/YAML object")?;
    if map.contains_key("debt") && debt_id.is_none() {
        return Ok(doc);
    }
    let debts = map
        .get("debts")
        .and_then(|v| v.as_array())
        .ok_or("input needs a `debt` object or a `debts` list")?;
    let chosen = match debt_id {
        Some(id) => debts
            .iter()
            .find(|d| d.get("id").and_then(|v| v.as_str()) == Some(id))
            .ok_or_else(|| format!("no debt with id '{id}' in input"))?,
        None if debts.len() == 1 => &debts[0],
        None => return Err("several debts in input; pick one with --debt-id".into()),
    }
    .clone();
    map.insert("debt".to_string(), chosen);
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_doc() -> Value {
        json!({
            "debts": [
                {"id": "visa", "name": "Visa"},
                {"id": "car", "name": "Car"},
            ],
            "payments": [],
        })
    }

    #[test]
    fn test_select_debt_by_id() {
        let doc = select_debt(ledger_doc(), Some("car")).unwrap();
        assert_eq!(doc["debt"]["name"], "Car");
    }

    #[test]
    fn test_select_debt_requires_id_when_ambiguous() {
        assert!(select_debt(ledger_doc(), None).is_err());
        assert!(select_debt(ledger_doc(), Some("boat")).is_err());
    }

    #[test]
    fn test_select_debt_keeps_explicit_debt() {
        let doc = json!({"debt": {"id": "loan"}});
        let out = select_debt(doc.clone(), None).unwrap();
        assert_eq!(out, doc);
    }
}
