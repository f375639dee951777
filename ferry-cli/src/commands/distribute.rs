//! Distribute command handler
//!
//! Reads a manifest of modules and blueprints and places the assigned
//! blueprints on nodes of the selected environment, addressed by index.

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::*;
use ferry_core::domain::OrderedMap;
use ferry_deploy::distributor::{DistributionCatalog, DistributionManifest};
use ferry_deploy::loader::ContentLoader;
use std::path::PathBuf;

use crate::config::Config;

#[derive(Args)]
pub struct DistributeArgs {
    /// Manifest listing modules and blueprints
    #[arg(short, long)]
    input: PathBuf,

    /// Blueprint and node indices, e.g. "SQLite 3=0,1"
    #[arg(long = "assign", value_parser = parse_assignment, required = true)]
    assignments: Vec<(String, Vec<usize>)>,
}

/// Parse a single `name=index,index` assignment
fn parse_assignment(s: &str) -> Result<(String, Vec<usize>)> {
    let (name, indices) = s
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("invalid NAME=indices: no `=` found in `{}`", s))?;
    let indices = indices
        .split(',')
        .map(|i| {
            i.trim()
                .parse::<usize>()
                .with_context(|| format!("invalid node index `{}` in `{}`", i, s))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((name.trim().to_string(), indices))
}

pub async fn handle_distribute(args: DistributeArgs, config: &Config) -> Result<()> {
    let json = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read manifest: {}", args.input.display()))?;
    let manifest = DistributionManifest::from_json(&json)?;
    let catalog =
        DistributionCatalog::load(&manifest, &ContentLoader::for_descriptor(&args.input)).await?;

    let mut assignment = OrderedMap::new();
    for (name, indices) in args.assignments {
        assignment.insert(name, indices);
    }

    let distributor = config.distributor();
    let report = distributor
        .distribute(&config.relay, &config.nodes, &assignment, &catalog)
        .await?;

    for service in &report.created {
        println!(
            "  {} {} on {}: service {}",
            "✓".green(),
            service.blueprint.bold(),
            service.node.dimmed(),
            service.service_id.cyan()
        );
    }
    for failure in &report.failed {
        println!(
            "  {} {} on {}: {}",
            "✗".red(),
            failure.blueprint.bold(),
            failure.node.dimmed(),
            failure.error.red()
        );
    }

    if !report.is_complete() {
        bail!(
            "{} of {} placement(s) failed",
            report.failed.len(),
            report.failed.len() + report.created.len()
        );
    }

    println!(
        "{}",
        format!("✓ {} service(s) created", report.created.len())
            .green()
            .bold()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        let (name, indices) = parse_assignment("SQLite 3=0, 2,5").unwrap();

        assert_eq!(name, "SQLite 3");
        assert_eq!(indices, vec![0, 2, 5]);
    }

    #[test]
    fn test_parse_assignment_rejects_bad_input() {
        assert!(parse_assignment("history").is_err());
        assert!(parse_assignment("history=one").is_err());
    }
}
