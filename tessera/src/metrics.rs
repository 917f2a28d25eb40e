//! Balancer observability metrics
//!
//! Thin wrappers over the `metrics` facade. Without an installed recorder
//! every call is a no-op, so the balancer itself stays a pure computation.
//!
//! - Pre-check decisions
//! - Search runs (steps, duration, cost before and after)
//! - Per-function costs
//! - Candidate acceptance per generator

use std::time::Duration;

/// Record the outcome of a needs-balance check
pub fn record_needs_balance(needed: bool, reason: &'static str) {
    metrics::counter!(
        "tessera_needs_balance_total",
        "needed" => if needed { "true" } else { "false" },
        "reason" => reason,
    )
    .increment(1);
}

/// Record a finished balancing run
pub fn record_balance_run(
    stop_reason: &'static str,
    steps: u64,
    moves: usize,
    elapsed: Duration,
    initial_cost: f64,
    final_cost: f64,
) {
    metrics::counter!(
        "tessera_balance_runs_total",
        "stop_reason" => stop_reason,
    )
    .increment(1);

    metrics::histogram!("tessera_balance_duration_seconds").record(elapsed.as_secs_f64());
    metrics::histogram!("tessera_balance_steps").record(steps as f64);
    metrics::histogram!("tessera_balance_moves").record(moves as f64);
    metrics::gauge!("tessera_balance_initial_cost").set(initial_cost);
    metrics::gauge!("tessera_balance_final_cost").set(final_cost);
}

/// Record the current cost of one cost function
pub fn record_cost_function(name: &'static str, cost: f64) {
    metrics::gauge!(
        "tessera_cost_function_value",
        "function" => name,
    )
    .set(cost);
}

/// Record an accepted candidate
pub fn record_candidate_accepted(generator: &'static str) {
    metrics::counter!(
        "tessera_candidates_total",
        "generator" => generator,
        "result" => "accepted",
    )
    .increment(1);
}

/// Record a rejected candidate
pub fn record_candidate_rejected(generator: &'static str) {
    metrics::counter!(
        "tessera_candidates_total",
        "generator" => generator,
        "result" => "rejected",
    )
    .increment(1);
}

/// Record a generator that had nothing to propose
pub fn record_candidate_empty(generator: &'static str) {
    metrics::counter!(
        "tessera_candidates_total",
        "generator" => generator,
        "result" => "empty",
    )
    .increment(1);
}
