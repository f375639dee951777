//! Deploy command handler

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use ferry_deploy::{DeploymentResult, ScriptDialect};
use std::path::PathBuf;

use crate::config::Config;

#[derive(Args)]
pub struct DeployArgs {
    /// Deployment descriptor
    #[arg(short, long)]
    input: PathBuf,

    /// Where the annotated descriptor is written
    #[arg(short, long)]
    output: PathBuf,

    /// Scripts were generated by the aqua compiler
    #[arg(long)]
    generated: bool,
}

pub async fn handle_deploy(args: DeployArgs, config: &Config) -> Result<()> {
    let dialect = if args.generated {
        ScriptDialect::Aqua
    } else {
        ScriptDialect::Air
    };

    let distributor = config.distributor();
    let result = ferry_deploy::deploy(
        &distributor,
        &config.relay,
        &config.nodes,
        &args.input,
        &args.output,
        dialect,
    )
    .await
    .with_context(|| format!("Failed to deploy {}", args.input.display()))?;

    println!("{}", "✓ Deployment finished successfully!".green().bold());
    println!("  Output: {}", args.output.display().to_string().cyan());
    print_summary(&result);
    Ok(())
}

/// Print the ids assigned during a deployment
fn print_summary(result: &DeploymentResult) {
    if !result.services.is_empty() {
        println!();
        println!("{}", format!("{} service(s):", result.services.len()).bold());
        for (name, service) in result.services.iter() {
            println!("  {} {}", "▸".cyan(), name.bold());
            println!("    ID:        {}", service.id.cyan());
            println!("    Blueprint: {}", service.blueprint_id.dimmed());
            println!("    Node:      {}", service.node.dimmed());
        }
    }

    if !result.script_storage.is_empty() {
        println!();
        println!(
            "{}",
            format!("{} persistent script(s):", result.script_storage.len()).bold()
        );
        for (name, script) in result.script_storage.iter() {
            println!("  {} {}: {}", "▸".cyan(), name.bold(), script.id.dimmed());
        }
    }
}
