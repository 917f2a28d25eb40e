use super::LoadedInputs;
use anyhow::{Context, Result};
use tessera::StochasticBalancer;

/// Print the per-function cost breakdown of the described cluster
pub fn run_cost(inputs: &LoadedInputs, json: bool) -> Result<()> {
    let cluster = inputs.snapshot()?;
    let balancer =
        StochasticBalancer::new(inputs.config.clone()).context("Invalid balancer config")?;
    let report = balancer.compute_cost(&cluster);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!(
        "Cluster: {} servers, {} racks, {} regions, {} tables",
        cluster.num_servers(),
        cluster.num_racks(),
        cluster.num_regions(),
        cluster.num_tables()
    );
    println!("--------------------------------------------------------------------------------");
    println!("  {:<20} {:>12} {:>10} {:>14}", "Function", "Weight", "Cost", "Weighted");
    for component in &report.components {
        if component.active {
            println!(
                "  {:<20} {:>12.1} {:>10.4} {:>14.4}",
                component.name,
                component.weight,
                component.cost,
                component.weight * component.cost
            );
        } else {
            println!(
                "  {:<20} {:>12.1} {:>10} {:>14}",
                component.name, component.weight, "-", "-"
            );
        }
    }
    println!("--------------------------------------------------------------------------------");
    println!("  Total:      {:.4}", report.total);
    println!("  Normalized: {:.6}", report.normalized);
    println!();
    Ok(())
}
