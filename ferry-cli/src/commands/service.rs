//! Module, blueprint and service command handlers
//!
//! Every command here targets the relay node.

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::*;
use ferry_core::domain::blueprint::{Blueprint, hash_reference};
use ferry_core::domain::module::{ModuleArtifact, ModuleConfig, ModuleConfigSpec};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::Config;

#[derive(Args)]
pub struct NewServiceArgs {
    /// Module to include, as `path/to/module.wasm[:path/to/config.json]`
    #[arg(long = "module", required = true)]
    modules: Vec<String>,

    /// Blueprint name
    #[arg(long)]
    name: String,
}

#[derive(Args)]
pub struct UploadArgs {
    /// Module file
    #[arg(long)]
    path: PathBuf,

    /// Name to register the module under
    #[arg(long, required_unless_present = "config")]
    name: Option<String>,

    /// Module configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
pub struct AddBlueprintArgs {
    /// Blueprint name
    #[arg(long)]
    name: String,

    /// Module references, comma-separated
    #[arg(long, value_delimiter = ',')]
    deps: Vec<String>,

    /// Blueprint id to request
    #[arg(long)]
    id: Option<String>,
}

#[derive(Args)]
pub struct CreateServiceArgs {
    /// Blueprint id
    #[arg(long)]
    blueprint: String,
}

/// Split a `--module` value into the module path and an optional config path
fn parse_module_arg(value: &str) -> (PathBuf, Option<PathBuf>) {
    match value.split_once(':') {
        Some((module, config)) => (PathBuf::from(module), Some(PathBuf::from(config))),
        None => (PathBuf::from(value), None),
    }
}

fn read_config_spec(path: &Path) -> Result<ModuleConfigSpec> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read module config: {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Invalid module config: {}", path.display()))
}

/// Reads a module file and builds its configuration
///
/// The name comes from `name`, else from the config file, else from the file
/// stem.
fn load_module(path: &Path, config: Option<&Path>, name: Option<&str>) -> Result<ModuleArtifact> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read module: {}", path.display()))?;

    let mut spec = match config {
        Some(config) => read_config_spec(config)?,
        None => ModuleConfigSpec::default(),
    };
    if let Some(name) = name {
        spec.name = Some(name.to_string());
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let config = ModuleConfig::from_spec(&stem, &spec);
    if config.name.is_empty() {
        bail!("Cannot derive a module name from {}", path.display());
    }

    Ok(ModuleArtifact::new(config, bytes))
}

pub async fn handle_new_service(args: NewServiceArgs, config: &Config) -> Result<()> {
    let modules = args
        .modules
        .iter()
        .map(|value| {
            let (path, module_config) = parse_module_arg(value);
            load_module(&path, module_config.as_deref(), None)
        })
        .collect::<Result<Vec<_>>>()?;

    let distributor = config.distributor();
    let hashes = distributor
        .upload_modules_concurrently(&config.relay, &modules)
        .await?;

    let blueprint = Blueprint::new(
        &args.name,
        hashes.iter().map(|h| hash_reference(h)).collect(),
    )
    .with_id(Uuid::new_v4().to_string());
    let blueprint_id = distributor.upload_blueprint(&config.relay, &blueprint).await?;
    let service_id = distributor
        .create_service(&config.relay, &blueprint_id)
        .await?;

    println!("{}", "✓ Service created successfully!".green().bold());
    println!("  ID:        {}", service_id.cyan());
    println!("  Blueprint: {}", blueprint_id.dimmed());
    println!("  Node:      {}", config.relay.peer_id.dimmed());
    if config.verbose {
        for (module, hash) in modules.iter().zip(&hashes) {
            println!("  Module:    {} {}", module.name().bold(), hash.dimmed());
        }
    }
    Ok(())
}

pub async fn handle_upload(args: UploadArgs, config: &Config) -> Result<()> {
    let module = load_module(&args.path, args.config.as_deref(), args.name.as_deref())?;

    let hash = config
        .distributor()
        .upload_module(&config.relay, &module)
        .await?;

    println!(
        "{}",
        format!("✓ Module '{}' uploaded", module.name()).green().bold()
    );
    println!("  Hash: {}", hash.cyan());
    Ok(())
}

pub async fn handle_add_blueprint(args: AddBlueprintArgs, config: &Config) -> Result<()> {
    let mut blueprint = Blueprint::new(&args.name, args.deps);
    blueprint.id = args.id;

    let id = config
        .distributor()
        .upload_blueprint(&config.relay, &blueprint)
        .await?;

    println!("{}", "✓ Blueprint added".green().bold());
    println!("  ID: {}", id.cyan());
    Ok(())
}

pub async fn handle_create_service(args: CreateServiceArgs, config: &Config) -> Result<()> {
    let id = config
        .distributor()
        .create_service(&config.relay, &args.blueprint)
        .await?;

    println!("{}", "✓ Service created".green().bold());
    println!("  ID: {}", id.cyan());
    Ok(())
}
