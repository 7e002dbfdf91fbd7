use rayon::prelude::*;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::engine::{simulate, simulate_minimum_only};
use super::error::{EngineError, Result};
use super::policy::AllocationPolicy;
use super::types::{
    validate_extra_payment, ComparisonReport, EngineConfig, PlanKind, RunOutcome, SimulateRequest, SimulationResult,
    Strategy, StrategyFailure,
};

/// Runs the minimum-payments-only baseline plus every requested strategy and
/// ranks the successful strategies by total interest, cheapest first.
///
/// Each run owns its state, so the rayon and sequential paths produce the same report.
pub fn compare_strategies(
    request: &SimulateRequest,
    config: &EngineConfig,
) -> Result<ComparisonReport> {
    validate_extra_payment(request.extra_monthly_payment)?;
    if config.max_months == 0 {
        return Err(EngineError::invalid_request("maxMonths must be > 0"));
    }

    let mut jobs: Vec<Option<Strategy>> = Vec::with_capacity(request.strategies.len() + 1);
    jobs.push(None);
    jobs.extend(request.strategies.iter().copied().map(Some));

    let run = |job: &Option<Strategy>| -> (PlanKind, Result<SimulationResult>) {
        match job {
            None => (PlanKind::Baseline, simulate_minimum_only(&request.portfolio, config)),
            Some(strategy) => {
                let policy = AllocationPolicy::for_strategy(*strategy, request.custom_weights);
                (
                    PlanKind::from(*strategy),
                    simulate(
                        &request.portfolio,
                        &policy,
                        request.extra_monthly_payment,
                        config,
                    ),
                )
            }
        }
    };

    let outcomes: Vec<(PlanKind, Result<SimulationResult>)> = if config.parallel {
        jobs.par_iter().map(run).collect()
    } else {
        jobs.iter().map(run).collect()
    };

    let report = assemble_report(outcomes);
    debug!(
        strategies = request.strategies.len(),
        succeeded = report.results.len(),
        failed = report.failures.len(),
        "strategy comparison complete"
    );
    Ok(report)
}

fn assemble_report(outcomes: Vec<(PlanKind, Result<SimulationResult>)>) -> ComparisonReport {
    let mut outcomes = outcomes.into_iter();
    let baseline = match outcomes.next() {
        Some((_, Ok(mut result))) => {
            result.interest_saved_vs_baseline = Some(Decimal::ZERO);
            RunOutcome::Completed(result)
        }
        Some((plan, Err(err))) => {
            warn!(strategy = ?plan, error = %err, "baseline simulation failed");
            RunOutcome::Failed(StrategyFailure::from_error(plan, &err))
        }
        None => unreachable!("baseline job is always scheduled first"),
    };
    let baseline_interest = baseline.result().map(|r| r.total_interest_paid);

    let mut results = Vec::new();
    let mut failures = Vec::new();
    for (plan, outcome) in outcomes {
        match outcome {
            Ok(mut result) => {
                result.interest_saved_vs_baseline =
                    baseline_interest.map(|base| base - result.total_interest_paid);
                results.push(result);
            }
            Err(err) => {
                warn!(strategy = ?plan, error = %err, "strategy simulation failed");
                failures.push(StrategyFailure::from_error(plan, &err));
            }
        }
    }
    // Stable: equal totals keep request order.
    results.sort_by(|a, b| a.total_interest_paid.cmp(&b.total_interest_paid));

    ComparisonReport {
        baseline,
        results,
        failures,
    }
}
