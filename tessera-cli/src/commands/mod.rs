pub mod balance;
pub mod cost;
pub mod input;
pub mod needs_balance;

pub use balance::run_balance;
pub use cost::run_cost;
pub use input::{load_inputs, ClusterDescription, LoadedInputs};
pub use needs_balance::run_needs_balance;
