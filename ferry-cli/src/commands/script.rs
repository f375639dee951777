//! Script command handlers

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::*;
use ferry_deploy::ScriptDialect;
use serde_json::{Map, Value};
use std::path::PathBuf;

use super::render_json;
use crate::config::Config;

#[derive(Args)]
pub struct RunAirArgs {
    /// Script file
    #[arg(long)]
    path: PathBuf,

    /// Variables as a JSON object
    #[arg(long)]
    data: Option<String>,
}

/// Parse `--data` into the variables handed to the script
fn parse_data(data: Option<&str>) -> Result<Map<String, Value>> {
    let Some(data) = data else {
        return Ok(Map::new());
    };
    match serde_json::from_str::<Value>(data).context("--data is not valid JSON")? {
        Value::Object(map) => Ok(map),
        _ => bail!("--data must be a JSON object"),
    }
}

pub async fn handle_run_air(args: RunAirArgs, config: &Config) -> Result<()> {
    let script = std::fs::read_to_string(&args.path)
        .with_context(|| format!("Failed to read script: {}", args.path.display()))?;
    let data = parse_data(args.data.as_deref())?;
    let name = args
        .path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "script".to_string());

    let distributor = config.distributor();
    let handle = distributor
        .run_script(&config.relay, &name, &script, data, ScriptDialect::Air)
        .await?;
    if config.verbose {
        eprintln!("{} {}", "Particle:".dimmed(), handle.particle_id);
    }

    let delivery = handle.wait(config.deploy.script_timeout).await?;
    println!("{}", render_json(&Value::Array(delivery.args), true));
    Ok(())
}
