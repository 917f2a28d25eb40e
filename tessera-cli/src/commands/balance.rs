use super::LoadedInputs;
use anyhow::{Context, Result};
use std::path::Path;
use tessera::StochasticBalancer;

/// Balance the described cluster and print the resulting moves
pub fn run_balance(inputs: &LoadedInputs, output: Option<&Path>) -> Result<()> {
    let mut cluster = inputs.snapshot()?;
    let balancer =
        StochasticBalancer::new(inputs.config.clone()).context("Invalid balancer config")?;

    let result = balancer
        .balance(&mut cluster)
        .context("Balancer search failed")?;

    println!();
    println!("Plan {}", result.plan_id);
    println!("--------------------------------------------------------------------------------");
    println!("  Stop reason:   {}", result.stop_reason.label());
    println!("  Steps:         {}", result.steps);
    println!("  Elapsed:       {:?}", result.elapsed);
    println!("  Initial cost:  {:.4}", result.initial_cost);
    println!("  Final cost:    {:.4}", result.final_cost);
    println!("  Region moves:  {}", result.move_count());

    if !result.plans.is_empty() {
        println!();
        for plan in &result.plans {
            println!("  {}  {} -> {}", plan.region, plan.source, plan.destination);
        }
    }
    println!();

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
        tracing::info!("Wrote balance result to {:?}", path);
    }

    Ok(())
}
