//! Configuration module
//!
//! Turns the global command-line flags into the environment, relay node,
//! client identity and deployment settings every command works with.

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use ferry_client::{ClientIdentity, HttpConnector};
use ferry_core::domain::network::{Environment, NetworkCatalog, select_relay};
use ferry_core::domain::node::Node;
use ferry_deploy::{DeployConfig, Distributor};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Flags shared by every command
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Network environment: krasnodar, local, testnet or stage
    ///
    /// Only `local` has built-in nodes. The others need --environments (or
    /// FERRY_ENVIRONMENTS) unless --node-addr names the relay directly.
    #[arg(long, global = true, default_value = "krasnodar")]
    pub env: String,

    /// Peer id of the relay node
    #[arg(long, global = true)]
    pub node_id: Option<String>,

    /// Multiaddr of the relay node
    #[arg(long, global = true)]
    pub node_addr: Option<String>,

    /// Seed for a deterministic client identity
    #[arg(long, global = true)]
    pub seed: Option<String>,

    /// JSON file mapping environment names to node lists
    #[arg(long, global = true, env = "FERRY_ENVIRONMENTS")]
    pub environments: Option<PathBuf>,

    /// Time-to-live of every node request, in milliseconds
    #[arg(long, global = true)]
    pub ttl: Option<u64>,

    /// Log level for ferry crates, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "error")]
    pub log: String,

    /// Print the client identity and extra details
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Give up on a script that has not called back after this many seconds
    #[arg(long, global = true)]
    pub script_timeout: Option<u64>,
}

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    /// Nodes of the selected environment
    pub nodes: Vec<Node>,
    /// Node the client talks to by default
    pub relay: Node,
    pub identity: ClientIdentity,
    pub deploy: DeployConfig,
    pub verbose: bool,
}

impl Config {
    pub fn from_args(args: &GlobalArgs) -> Result<Self> {
        let environment: Environment = args.env.parse()?;

        let catalog = match &args.environments {
            Some(path) => {
                let json = std::fs::read_to_string(path).with_context(|| {
                    format!("Failed to read environments file: {}", path.display())
                })?;
                NetworkCatalog::from_json(&json)?
            }
            None => NetworkCatalog::builtin(),
        };

        // An explicit address does not need a configured environment
        let nodes = match catalog.nodes(environment) {
            Ok(nodes) => nodes.to_vec(),
            Err(_) if args.node_addr.is_some() => Vec::new(),
            Err(e) => {
                return Err(e).context(
                    "Pass --environments (or FERRY_ENVIRONMENTS) or select --env local",
                );
            }
        };

        let relay = select_relay(
            environment,
            &nodes,
            args.node_id.as_deref(),
            args.node_addr.as_deref(),
        )?;

        debug!(
            "Environment {} has {} node(s), relay is {}",
            environment,
            nodes.len(),
            relay
        );

        let identity = match &args.seed {
            Some(seed) => ClientIdentity::from_seed(seed.as_str()),
            None => ClientIdentity::generate(),
        };
        if args.verbose {
            eprintln!("{} {}", "Client seed:".dimmed(), identity.seed());
            eprintln!("{} {}", "Relay:".dimmed(), relay);
        }

        let mut deploy = DeployConfig::from_env()?;
        if let Some(ttl) = args.ttl {
            deploy = deploy.with_ttl(Duration::from_millis(ttl));
        }
        if let Some(secs) = args.script_timeout {
            deploy = deploy.with_script_timeout(Some(Duration::from_secs(secs)));
        }
        deploy.validate()?;

        Ok(Self {
            environment,
            nodes,
            relay,
            identity,
            deploy,
            verbose: args.verbose,
        })
    }

    /// Builds a distributor talking HTTP to the nodes as this client
    pub fn distributor(&self) -> Distributor {
        let connector = HttpConnector::new(self.identity.clone())
            .with_poll_interval(self.deploy.callback_poll_interval);
        Distributor::new(Arc::new(connector), self.deploy.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> GlobalArgs {
        GlobalArgs {
            env: "local".to_string(),
            node_id: None,
            node_addr: None,
            seed: Some("fixed".to_string()),
            environments: None,
            ttl: None,
            log: "error".to_string(),
            verbose: false,
            script_timeout: None,
        }
    }

    #[test]
    fn test_local_environment_is_builtin() {
        let config = Config::from_args(&args()).unwrap();

        assert_eq!(config.environment, Environment::Local);
        assert_eq!(config.nodes.len(), 1);
        assert_eq!(config.relay, config.nodes[0]);
    }

    #[test]
    fn test_seed_gives_stable_identity() {
        let first = Config::from_args(&args()).unwrap();
        let second = Config::from_args(&args()).unwrap();

        assert_eq!(first.identity.id(), second.identity.id());
    }

    #[test]
    fn test_flags_override_deploy_settings() {
        let mut args = args();
        args.ttl = Some(1500);
        args.script_timeout = Some(30);

        let config = Config::from_args(&args).unwrap();

        assert_eq!(config.deploy.ttl, Duration::from_millis(1500));
        assert_eq!(config.deploy.script_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_default_environment_points_at_catalog_flag() {
        #[derive(clap::Parser)]
        struct Cli {
            #[command(flatten)]
            global: GlobalArgs,
        }

        let cli = <Cli as clap::Parser>::try_parse_from(["ferry"]).unwrap();
        assert_eq!(cli.global.env, "krasnodar");

        let mut global = cli.global;
        global.environments = None;
        let err = Config::from_args(&global).unwrap_err();
        assert!(format!("{:#}", err).contains("--environments"));
    }

    #[test]
    fn test_remote_environment_requires_catalog() {
        let mut args = args();
        args.env = "testnet".to_string();

        assert!(Config::from_args(&args).is_err());
    }

    #[test]
    fn test_environments_file_and_node_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("environments.json");
        std::fs::write(
            &path,
            r#"{ "testnet": [
                { "peer_id": "peer-a", "multiaddr": "/dns4/a.example.net/tcp/443/wss/p2p/peer-a" },
                { "peer_id": "peer-b", "multiaddr": "/dns4/b.example.net/tcp/443/wss/p2p/peer-b" }
            ] }"#,
        )
        .unwrap();

        let mut args = args();
        args.env = "testnet".to_string();
        args.environments = Some(path);
        args.node_id = Some("peer-b".to_string());

        let config = Config::from_args(&args).unwrap();

        assert_eq!(config.nodes.len(), 2);
        assert_eq!(config.relay.peer_id, "peer-b");
    }

    #[test]
    fn test_explicit_address_without_environment() {
        let mut args = args();
        args.env = "stage".to_string();
        args.node_addr = Some("/ip4/10.0.0.5/tcp/4310/ws".to_string());
        args.node_id = Some("peer-x".to_string());

        let config = Config::from_args(&args).unwrap();

        assert_eq!(config.relay.peer_id, "peer-x");
        assert_eq!(
            config.relay.multiaddr,
            "/ip4/10.0.0.5/tcp/4310/ws/p2p/peer-x"
        );
    }
}
