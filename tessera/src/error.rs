//! Balancer error types

use thiserror::Error;

/// Errors that can occur while building or balancing a cluster snapshot
///
/// Every variant is a precondition violation on caller-supplied input or
/// configuration. Degenerate topologies, unachievable spreads and exhausted
/// search budgets are normal outcomes and never surface here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BalancerError {
    #[error("Server listed more than once: {0}")]
    DuplicateServer(String),

    #[error("Region {region} listed under both {first} and {second}")]
    DuplicateRegion {
        region: String,
        first: String,
        second: String,
    },

    #[error("Region {region} is not on server {server}")]
    RegionNotOnServer { region: usize, server: usize },

    #[error("Unknown server index: {0}")]
    UnknownServer(usize),

    #[error("Unknown region index: {0}")]
    UnknownRegion(usize),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BalancerError {
    /// Get the error type as a string for metrics labeling
    pub fn error_type(&self) -> &'static str {
        match self {
            BalancerError::DuplicateServer(_) => "duplicate_server",
            BalancerError::DuplicateRegion { .. } => "duplicate_region",
            BalancerError::RegionNotOnServer { .. } => "region_not_on_server",
            BalancerError::UnknownServer(_) => "unknown_server",
            BalancerError::UnknownRegion(_) => "unknown_region",
            BalancerError::InvalidAction(_) => "invalid_action",
            BalancerError::Config(_) => "config",
            BalancerError::Serialization(_) => "serialization",
        }
    }
}

impl From<toml::de::Error> for BalancerError {
    fn from(err: toml::de::Error) -> Self {
        BalancerError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for BalancerError {
    fn from(err: std::io::Error) -> Self {
        BalancerError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BalancerError>;
