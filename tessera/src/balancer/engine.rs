//! Stochastic search engine
//!
//! Each iteration picks a generator by weight, applies its proposal one
//! elementary move at a time while notifying every cost function, and keeps
//! or reverts the change by simulated-annealing acceptance on the normalized
//! cost. The best assignment seen is restored at the end.

use super::{BalanceDecision, BalanceResult, CostReport, StopReason};
use crate::candidate::GeneratorSet;
use crate::cluster::{Action, ClusterState};
use crate::config::BalancerConfig;
use crate::cost::{CostFunctions, COST_EPSILON};
use crate::error::Result;
use crate::metrics;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Instant;
use tracing::{debug, info, trace};

/// Cost below which the search stops early
const COST_FLOOR: f64 = 1e-12;

/// Cost functions whose signal is replica co-location
const COLOCATION_FUNCTIONS: [&str; 2] = ["replica_host", "replica_rack"];

/// Region balancer driven by weighted cost functions
#[derive(Debug, Clone)]
pub struct StochasticBalancer {
    config: BalancerConfig,
}

impl StochasticBalancer {
    /// Create a balancer; the configuration is validated once here
    pub fn new(config: BalancerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }

    /// Weighted cost of the current assignment
    pub fn compute_cost(&self, cluster: &ClusterState) -> CostReport {
        let mut costs = CostFunctions::from_config(&self.config);
        costs.prepare(cluster);
        report(&costs)
    }

    /// Fast check whether a search could improve the cluster
    ///
    /// `table` only labels the log output; the check always covers the
    /// whole snapshot.
    pub fn needs_balance(&self, table: Option<&str>, cluster: &ClusterState) -> bool {
        self.check_balance(table, cluster).needs_balance()
    }

    /// Like [`needs_balance`](Self::needs_balance) but returns the rule that fired
    pub fn check_balance(&self, table: Option<&str>, cluster: &ClusterState) -> BalanceDecision {
        let decision = self.balance_decision(cluster);

        let needed = decision.needs_balance();
        metrics::record_needs_balance(needed, decision.label());
        if needed {
            debug!(
                table = table.unwrap_or("*"),
                reason = decision.label(),
                "Cluster needs balancing"
            );
        } else {
            info!(
                table = table.unwrap_or("*"),
                reason = decision.label(),
                servers = cluster.num_servers(),
                regions = cluster.num_regions(),
                "Skipping balance"
            );
        }
        decision
    }

    /// The reasoning behind [`needs_balance`](Self::needs_balance)
    pub fn balance_decision(&self, cluster: &ClusterState) -> BalanceDecision {
        let mut costs = CostFunctions::from_config(&self.config);
        costs.prepare(cluster);
        self.decide(cluster, &costs)
    }

    fn decide(&self, cluster: &ClusterState, costs: &CostFunctions) -> BalanceDecision {
        let servers = cluster.num_servers();
        if servers < self.config.min_servers {
            return BalanceDecision::TooFewServers {
                servers,
                min_servers: self.config.min_servers,
            };
        }
        if cluster.num_regions() == 0 {
            return BalanceDecision::NoRegions;
        }

        // Replica costs are scaled from the best achievable spread, so any
        // remaining cost means some sequence of moves can lower it.
        for name in COLOCATION_FUNCTIONS {
            if !costs.is_active(name) {
                continue;
            }
            if let Some(function) = costs.get(name) {
                let cost = function.cost();
                if cost > COST_EPSILON {
                    return BalanceDecision::Colocated {
                        function: name.to_string(),
                        cost,
                    };
                }
            }
        }

        let counts = cluster.region_counts();
        let min = counts.iter().copied().min().unwrap_or(0);
        let max = counts.iter().copied().max().unwrap_or(0);
        if min == 0 && max > 1 {
            return BalanceDecision::IdleServer;
        }

        let average = cluster.num_regions() as f64 / servers as f64;
        let floor = (average * (1.0 - self.config.slop)).floor().max(0.0) as usize;
        let ceiling = (average * (1.0 + self.config.slop)).ceil() as usize;
        if max > ceiling || min < floor {
            return BalanceDecision::OutsideSlop {
                min,
                max,
                floor,
                ceiling,
            };
        }

        let cost = costs.normalized();
        let threshold = self.config.min_cost_need_balance;
        if cost >= threshold {
            BalanceDecision::CostAboveThreshold { cost, threshold }
        } else {
            BalanceDecision::Balanced { cost, threshold }
        }
    }

    /// Search for a lower-cost assignment
    ///
    /// On return `cluster` holds the best assignment found, which is never
    /// worse than the input. Fails only if a generator proposes an invalid
    /// move, which leaves `cluster` in a consistent state.
    pub fn balance(&self, cluster: &mut ClusterState) -> Result<BalanceResult> {
        let started = Instant::now();
        let plan_id = uuid::Uuid::new_v4().to_string();

        let mut costs = CostFunctions::from_config(&self.config);
        costs.prepare(cluster);
        let initial_cost = costs.total();
        let decision = self.decide(cluster, &costs);
        metrics::record_needs_balance(decision.needs_balance(), decision.label());

        if !decision.needs_balance() {
            info!(
                plan_id = %plan_id,
                reason = decision.label(),
                cost = initial_cost,
                "No balancing needed"
            );
            return Ok(self.finish(
                plan_id,
                cluster,
                &costs,
                initial_cost,
                0,
                started,
                StopReason::NotNeeded,
            ));
        }

        let generators = GeneratorSet::from_config(&self.config.generators)?;
        let seed = self.config.seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let budget = self
            .config
            .step_budget(cluster.num_regions(), cluster.num_servers());
        let deadline = self.config.max_running_time();

        info!(
            plan_id = %plan_id,
            reason = decision.label(),
            servers = cluster.num_servers(),
            regions = cluster.num_regions(),
            budget,
            seed,
            cost = initial_cost,
            "Starting balancer search"
        );

        let mut current = costs.normalized();
        let mut best = current;
        let mut best_assignment = cluster.region_to_server().to_vec();
        let mut temperature = self.config.initial_temperature;
        let mut steps = 0u64;
        let mut stop_reason = StopReason::StepBudget;

        while steps < budget {
            if current < COST_FLOOR {
                stop_reason = StopReason::CostFloor;
                break;
            }
            if started.elapsed() >= deadline {
                stop_reason = StopReason::TimeBudget;
                break;
            }
            steps += 1;

            let generator = generators.pick(&mut rng);
            let action = generator.generate(cluster, &mut rng);
            if action.is_null() {
                metrics::record_candidate_empty(generator.name());
                continue;
            }

            apply_action(cluster, &mut costs, &action)?;
            let candidate = costs.normalized();
            let delta = candidate - current;

            let accept = delta < 0.0
                || (temperature > 0.0 && rng.gen::<f64>() < (-delta / temperature).exp());
            if accept {
                metrics::record_candidate_accepted(generator.name());
                current = candidate;
                if current < best {
                    best = current;
                    best_assignment.copy_from_slice(cluster.region_to_server());
                    trace!(step = steps, cost = best, generator = generator.name(), "New best");
                }
            } else {
                metrics::record_candidate_rejected(generator.name());
                apply_action(cluster, &mut costs, &action.undo())?;
            }

            temperature *= self.config.cooldown_rate;
        }

        cluster.restore(&best_assignment)?;
        costs.prepare(cluster);

        Ok(self.finish(
            plan_id,
            cluster,
            &costs,
            initial_cost,
            steps,
            started,
            stop_reason,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        plan_id: String,
        cluster: &ClusterState,
        costs: &CostFunctions,
        initial_cost: f64,
        steps: u64,
        started: Instant,
        stop_reason: StopReason,
    ) -> BalanceResult {
        let elapsed = started.elapsed();
        let final_cost = costs.total();
        let plans = cluster.region_plans();
        let components = costs.breakdown();

        for component in components.iter().filter(|c| c.active) {
            if let Some(function) = costs.get(&component.name) {
                metrics::record_cost_function(function.name(), component.cost);
            }
        }
        metrics::record_balance_run(
            stop_reason.label(),
            steps,
            plans.len(),
            elapsed,
            initial_cost,
            final_cost,
        );

        if stop_reason != StopReason::NotNeeded {
            info!(
                plan_id = %plan_id,
                steps,
                moves = plans.len(),
                initial_cost,
                final_cost,
                elapsed_ms = elapsed.as_millis() as u64,
                stop_reason = stop_reason.label(),
                "Balancer search finished"
            );
        }

        BalanceResult {
            plan_id,
            assignment: cluster.assignment(),
            plans,
            initial_cost,
            final_cost,
            steps,
            elapsed,
            stop_reason,
            costs: components,
        }
    }
}

/// Apply an action move by move, notifying cost functions after each one
fn apply_action(cluster: &mut ClusterState, costs: &mut CostFunctions, action: &Action) -> Result<()> {
    cluster.validate(action)?;
    for mv in action.moves() {
        cluster.move_region(mv.region, mv.from, mv.to)?;
        costs.region_moved(cluster, &mv);
    }
    Ok(())
}

fn report(costs: &CostFunctions) -> CostReport {
    CostReport {
        total: costs.total(),
        normalized: costs.normalized(),
        components: costs.breakdown(),
    }
}
