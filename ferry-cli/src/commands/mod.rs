//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod deploy;
mod distribute;
mod query;
mod script;
mod service;

use anyhow::Result;
use clap::Subcommand;
use serde_json::Value;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Deploy the services, modules and scripts of a descriptor
    Deploy(deploy::DeployArgs),
    /// Upload modules to the relay and create a service from them
    NewService(service::NewServiceArgs),
    /// Place catalog blueprints on several nodes of the environment
    Distribute(distribute::DistributeArgs),
    /// Upload a single module to the relay
    Upload(service::UploadArgs),
    /// Register a blueprint on the relay
    AddBlueprint(service::AddBlueprintArgs),
    /// Create a service from a registered blueprint
    CreateService(service::CreateServiceArgs),
    /// List modules stored on the relay
    GetModules,
    /// List the interfaces of every service on the relay
    GetInterfaces {
        /// Pretty-print the result
        #[arg(long)]
        expand: bool,
    },
    /// Show the interface of one service
    GetInterface {
        /// Service id
        #[arg(long)]
        id: String,

        /// Pretty-print the result
        #[arg(long)]
        expand: bool,
    },
    /// Run a script on the relay and print what it calls back with
    RunAir(script::RunAirArgs),
    /// List the nodes of the selected environment
    Env,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Deploy(args) => deploy::handle_deploy(args, config).await,
        Commands::NewService(args) => service::handle_new_service(args, config).await,
        Commands::Distribute(args) => distribute::handle_distribute(args, config).await,
        Commands::Upload(args) => service::handle_upload(args, config).await,
        Commands::AddBlueprint(args) => service::handle_add_blueprint(args, config).await,
        Commands::CreateService(args) => service::handle_create_service(args, config).await,
        Commands::GetModules => query::get_modules(config).await,
        Commands::GetInterfaces { expand } => query::get_interfaces(config, expand).await,
        Commands::GetInterface { id, expand } => query::get_interface(config, &id, expand).await,
        Commands::RunAir(args) => script::handle_run_air(args, config).await,
        Commands::Env => query::list_environment(config),
    }
}

/// Renders a JSON value, indented when `expand` is set
pub(crate) fn render_json(value: &Value, expand: bool) -> String {
    let rendered = if expand {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    rendered.unwrap_or_else(|_| value.to_string())
}
