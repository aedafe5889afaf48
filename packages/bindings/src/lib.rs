use napi::Result as NapiResult;
use napi_derive::napi;

use payoff_core::waterfall::PlanInput;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

#[napi]
pub fn simulate_plan(input_json: String) -> NapiResult<String> {
    let input: PlanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = payoff_core::waterfall::simulate_plan(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn generate_projection(input_json: String) -> NapiResult<String> {
    let input: PlanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        payoff_core::projection::generate_projection(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn compare_strategies(input_json: String) -> NapiResult<String> {
    let input: payoff_core::waterfall::ComparisonInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        payoff_core::waterfall::compare_strategies(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Waterfall order of active debt ids for the input's strategy.
#[napi]
pub fn debt_order(input_json: String) -> NapiResult<Vec<String>> {
    let input: PlanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    Ok(payoff_core::strategy::debt_order(&input.debts, &input.strategy))
}

#[napi]
pub fn calculate_amortization(input_json: String) -> NapiResult<String> {
    let input: payoff_core::amortization::AmortizationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        payoff_core::amortization::calculate_amortization(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

#[napi]
pub fn apply_payment(input_json: String) -> NapiResult<String> {
    let input: payoff_core::ledger::PaymentInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = payoff_core::ledger::apply_payment(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn detect_milestones(input_json: String) -> NapiResult<String> {
    let input: payoff_core::milestones::MilestoneInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        payoff_core::milestones::detect_milestones(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn generate_recommendations(input_json: String) -> NapiResult<String> {
    let input: payoff_core::recommendations::RecommendationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = payoff_core::recommendations::generate_recommendations(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn calculate_summary(input_json: String) -> NapiResult<String> {
    let input: payoff_core::summary::SummaryInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = payoff_core::summary::calculate_summary(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
