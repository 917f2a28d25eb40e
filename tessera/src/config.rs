//! Balancer configuration

use crate::error::{BalancerError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main balancer configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BalancerConfig {
    /// Hard cap on search iterations
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,

    /// Iterations allowed per region per server, before the hard cap
    #[serde(default = "default_steps_per_region")]
    pub steps_per_region: u64,

    /// Wall-clock budget for one search run in milliseconds
    #[serde(default = "default_max_running_time")]
    pub max_running_time_ms: u64,

    /// Normalized cost below which the cluster counts as balanced
    #[serde(default = "default_min_cost_need_balance")]
    pub min_cost_need_balance: f64,

    /// Annealing temperature at the first iteration
    #[serde(default = "default_initial_temperature")]
    pub initial_temperature: f64,

    /// Per-iteration temperature multiplier in (0, 1]
    #[serde(default = "default_cooldown_rate")]
    pub cooldown_rate: f64,

    /// Allowed deviation of a server's region count from the average
    #[serde(default = "default_slop")]
    pub slop: f64,

    /// Clusters with fewer servers are never balanced
    #[serde(default = "default_min_servers")]
    pub min_servers: usize,

    /// Fraction of regions the move cost tolerates before saturating
    #[serde(default = "default_max_move_percent")]
    pub max_move_percent: f64,

    /// RNG seed for reproducible runs (random when unset)
    #[serde(default)]
    pub seed: Option<u64>,

    /// Cost function weights
    #[serde(default)]
    pub weights: CostWeights,

    /// Candidate generator selection weights
    #[serde(default)]
    pub generators: GeneratorWeights,
}

fn default_max_steps() -> u64 {
    1_000_000
}

fn default_steps_per_region() -> u64 {
    800
}

fn default_max_running_time() -> u64 {
    30_000
}

fn default_min_cost_need_balance() -> f64 {
    0.025
}

fn default_initial_temperature() -> f64 {
    0.001
}

fn default_cooldown_rate() -> f64 {
    0.9995
}

fn default_slop() -> f64 {
    0.2
}

fn default_min_servers() -> usize {
    2
}

fn default_max_move_percent() -> f64 {
    0.25
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            steps_per_region: default_steps_per_region(),
            max_running_time_ms: default_max_running_time(),
            min_cost_need_balance: default_min_cost_need_balance(),
            initial_temperature: default_initial_temperature(),
            cooldown_rate: default_cooldown_rate(),
            slop: default_slop(),
            min_servers: default_min_servers(),
            max_move_percent: default_max_move_percent(),
            seed: None,
            weights: CostWeights::default(),
            generators: GeneratorWeights::default(),
        }
    }
}

/// Weight of each cost function; 0 disables a function
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CostWeights {
    #[serde(default = "default_region_count_skew")]
    pub region_count_skew: f64,

    #[serde(default = "default_move_cost")]
    pub move_cost: f64,

    #[serde(default = "default_table_skew")]
    pub table_skew: f64,

    #[serde(default = "default_locality")]
    pub locality: f64,

    #[serde(default = "default_replica_host")]
    pub replica_host: f64,

    #[serde(default = "default_replica_rack")]
    pub replica_rack: f64,

    #[serde(default = "default_load_weight")]
    pub read_requests: f64,

    #[serde(default = "default_load_weight")]
    pub write_requests: f64,

    #[serde(default = "default_load_weight")]
    pub memstore_size: f64,

    #[serde(default = "default_load_weight")]
    pub store_file_size: f64,
}

fn default_region_count_skew() -> f64 {
    500.0
}

fn default_move_cost() -> f64 {
    7.0
}

fn default_table_skew() -> f64 {
    35.0
}

fn default_locality() -> f64 {
    25.0
}

fn default_replica_host() -> f64 {
    100_000.0
}

fn default_replica_rack() -> f64 {
    10_000.0
}

fn default_load_weight() -> f64 {
    5.0
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            region_count_skew: default_region_count_skew(),
            move_cost: default_move_cost(),
            table_skew: default_table_skew(),
            locality: default_locality(),
            replica_host: default_replica_host(),
            replica_rack: default_replica_rack(),
            read_requests: default_load_weight(),
            write_requests: default_load_weight(),
            memstore_size: default_load_weight(),
            store_file_size: default_load_weight(),
        }
    }
}

impl CostWeights {
    fn named(&self) -> [(&'static str, f64); 10] {
        [
            ("region_count_skew", self.region_count_skew),
            ("move_cost", self.move_cost),
            ("table_skew", self.table_skew),
            ("locality", self.locality),
            ("replica_host", self.replica_host),
            ("replica_rack", self.replica_rack),
            ("read_requests", self.read_requests),
            ("write_requests", self.write_requests),
            ("memstore_size", self.memstore_size),
            ("store_file_size", self.store_file_size),
        ]
    }
}

/// Relative probability of picking each candidate generator
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GeneratorWeights {
    #[serde(default = "default_generator_weight")]
    pub random: f64,

    #[serde(default = "default_generator_weight")]
    pub load: f64,

    #[serde(default = "default_generator_weight")]
    pub locality: f64,

    #[serde(default = "default_generator_weight")]
    pub replica_host: f64,

    #[serde(default = "default_generator_weight")]
    pub replica_rack: f64,
}

fn default_generator_weight() -> f64 {
    1.0
}

impl Default for GeneratorWeights {
    fn default() -> Self {
        Self {
            random: default_generator_weight(),
            load: default_generator_weight(),
            locality: default_generator_weight(),
            replica_host: default_generator_weight(),
            replica_rack: default_generator_weight(),
        }
    }
}

impl GeneratorWeights {
    fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("random", self.random),
            ("load", self.load),
            ("locality", self.locality),
            ("replica_host", self.replica_host),
            ("replica_rack", self.replica_rack),
        ]
    }
}

impl BalancerConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BalancerError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Reject settings the search loop cannot run with
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in self.weights.named() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(BalancerError::Config(format!(
                    "cost weight '{}' must be a finite non-negative number, got {}",
                    name, weight
                )));
            }
        }

        let mut generator_total = 0.0;
        for (name, weight) in self.generators.named() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(BalancerError::Config(format!(
                    "generator weight '{}' must be a finite non-negative number, got {}",
                    name, weight
                )));
            }
            generator_total += weight;
        }
        if generator_total <= 0.0 {
            return Err(BalancerError::Config(
                "at least one candidate generator needs a positive weight".to_string(),
            ));
        }

        if !(self.cooldown_rate > 0.0 && self.cooldown_rate <= 1.0) {
            return Err(BalancerError::Config(format!(
                "cooldown_rate must be in (0, 1], got {}",
                self.cooldown_rate
            )));
        }
        if !self.initial_temperature.is_finite() || self.initial_temperature < 0.0 {
            return Err(BalancerError::Config(format!(
                "initial_temperature must be a finite non-negative number, got {}",
                self.initial_temperature
            )));
        }
        if self.max_steps == 0 || self.steps_per_region == 0 {
            return Err(BalancerError::Config(
                "max_steps and steps_per_region must be positive".to_string(),
            ));
        }
        if !self.min_cost_need_balance.is_finite() || self.min_cost_need_balance < 0.0 {
            return Err(BalancerError::Config(format!(
                "min_cost_need_balance must be a finite non-negative number, got {}",
                self.min_cost_need_balance
            )));
        }
        if !self.slop.is_finite() || self.slop < 0.0 {
            return Err(BalancerError::Config(format!(
                "slop must be a finite non-negative number, got {}",
                self.slop
            )));
        }
        if !(self.max_move_percent > 0.0 && self.max_move_percent <= 1.0) {
            return Err(BalancerError::Config(format!(
                "max_move_percent must be in (0, 1], got {}",
                self.max_move_percent
            )));
        }
        Ok(())
    }

    /// Search time budget as a Duration
    pub fn max_running_time(&self) -> Duration {
        Duration::from_millis(self.max_running_time_ms)
    }

    /// Iteration budget for a cluster of the given size
    pub fn step_budget(&self, num_regions: usize, num_servers: usize) -> u64 {
        let scaled = self
            .steps_per_region
            .saturating_mul(num_regions as u64)
            .saturating_mul(num_servers as u64);
        self.max_steps.min(scaled)
    }
}
