//! Move candidate generators
//!
//! A generator looks at the current snapshot and proposes one [`Action`] for
//! the search loop to score. Generators are stateless; all randomness comes
//! from the RNG the engine passes in, so a seeded run is reproducible.

mod load;
mod locality;
mod random;
mod replica;

pub use load::LoadCandidateGenerator;
pub use locality::LocalityCandidateGenerator;
pub use random::RandomCandidateGenerator;
pub use replica::{ReplicaHostCandidateGenerator, ReplicaRackCandidateGenerator};

use crate::cluster::{Action, ClusterState};
use crate::config::GeneratorWeights;
use crate::error::{BalancerError, Result};
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, RngCore};

/// Strategy proposing a single change to the assignment
pub trait CandidateGenerator: Send + Sync {
    /// Stable name used in logs and metrics
    fn name(&self) -> &'static str;

    /// Propose an action, or [`Action::Null`] when nothing applies
    fn generate(&self, cluster: &ClusterState, rng: &mut dyn RngCore) -> Action;
}

/// Pick a random region hosted on `server`
pub(crate) fn random_region(
    cluster: &ClusterState,
    server: usize,
    rng: &mut dyn RngCore,
) -> Option<usize> {
    let regions = cluster.regions_on_server(server);
    if regions.is_empty() {
        None
    } else {
        Some(regions[rng.gen_range(0..regions.len())])
    }
}

/// Generators with their selection weights
pub struct GeneratorSet {
    generators: Vec<Box<dyn CandidateGenerator>>,
    index: WeightedIndex<f64>,
}

impl GeneratorSet {
    /// Wrap generators with matching selection weights
    pub fn new(generators: Vec<(Box<dyn CandidateGenerator>, f64)>) -> Result<Self> {
        let (generators, weights): (Vec<_>, Vec<_>) = generators.into_iter().unzip();
        let index = WeightedIndex::new(&weights).map_err(|e| {
            BalancerError::Config(format!("invalid candidate generator weights: {}", e))
        })?;
        Ok(Self { generators, index })
    }

    /// The standard generator family weighted from configuration
    pub fn from_config(weights: &GeneratorWeights) -> Result<Self> {
        Self::new(vec![
            (Box::new(RandomCandidateGenerator), weights.random),
            (Box::new(LoadCandidateGenerator), weights.load),
            (Box::new(LocalityCandidateGenerator::default()), weights.locality),
            (Box::new(ReplicaHostCandidateGenerator), weights.replica_host),
            (Box::new(ReplicaRackCandidateGenerator), weights.replica_rack),
        ])
    }

    /// Sample a generator by weight
    pub fn pick(&self, rng: &mut dyn RngCore) -> &dyn CandidateGenerator {
        let i = self.index.sample(rng);
        &*self.generators[i]
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}
