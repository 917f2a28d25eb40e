use super::LoadedInputs;
use anyhow::{Context, Result};
use tessera::{BalanceDecision, StochasticBalancer};

/// Print whether the described cluster needs balancing and why
pub fn run_needs_balance(inputs: &LoadedInputs, table: Option<&str>) -> Result<()> {
    let cluster = inputs.snapshot()?;
    let balancer =
        StochasticBalancer::new(inputs.config.clone()).context("Invalid balancer config")?;

    let decision = balancer.check_balance(table, &cluster);

    println!(
        "Needs balance: {} ({})",
        if decision.needs_balance() { "yes" } else { "no" },
        describe(&decision)
    );
    Ok(())
}

fn describe(decision: &BalanceDecision) -> String {
    match decision {
        BalanceDecision::TooFewServers {
            servers,
            min_servers,
        } => format!("{} servers, at least {} required", servers, min_servers),
        BalanceDecision::NoRegions => "no regions".to_string(),
        BalanceDecision::Colocated { function, cost } => {
            format!("replicas co-located, {} cost {:.4}", function, cost)
        }
        BalanceDecision::IdleServer => "idle server next to loaded servers".to_string(),
        BalanceDecision::OutsideSlop {
            min,
            max,
            floor,
            ceiling,
        } => format!(
            "region counts {}..{} outside allowed {}..{}",
            min, max, floor, ceiling
        ),
        BalanceDecision::CostAboveThreshold { cost, threshold } => {
            format!("cost {:.4} >= threshold {:.4}", cost, threshold)
        }
        BalanceDecision::Balanced { cost, threshold } => {
            format!("cost {:.4} < threshold {:.4}", cost, threshold)
        }
    }
}
