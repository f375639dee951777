//! Network environments
//!
//! An environment is a named list of nodes. `local` is built in and points at
//! a single node on the loopback interface; the public environments are loaded
//! from a JSON file mapping environment names to node lists.

use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::node::{AddressError, Multiaddr, Node};

/// Index of the node used as relay when none is requested explicitly
pub const DEFAULT_RELAY_INDEX: usize = 3;

const LOCAL_PEER_ID: &str = "12D3KooWKEprYXUXqoV5xSBeyqrWLpQLLH4PXfvVkDJtmcqmh5V3";
const LOCAL_MULTIADDR: &str =
    "/ip4/127.0.0.1/tcp/4310/ws/p2p/12D3KooWKEprYXUXqoV5xSBeyqrWLpQLLH4PXfvVkDJtmcqmh5V3";

/// Errors raised while selecting nodes from an environment
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("unknown environment '{0}' (expected krasnodar, local, testnet or stage)")]
    UnknownEnvironment(String),

    #[error("environment '{0}' has no nodes configured")]
    NoNodes(Environment),

    #[error("node '{node_id}' doesn't belong to the selected environment ({environment}):\n\t{known}")]
    NodeNotInEnvironment {
        node_id: String,
        environment: Environment,
        known: String,
    },

    #[error("node address '{0}' has no /p2p/<peer id> component and no node id was given")]
    MissingNodeId(String),

    #[error("invalid node address: {0}")]
    Address(#[from] AddressError),

    #[error("invalid environments file: {0}")]
    InvalidCatalog(#[from] serde_json::Error),
}

/// The closed set of network environments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    #[default]
    Krasnodar,
    Local,
    Testnet,
    Stage,
}

impl Environment {
    pub const ALL: [Environment; 4] = [
        Environment::Krasnodar,
        Environment::Local,
        Environment::Testnet,
        Environment::Stage,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Environment::Krasnodar => "krasnodar",
            Environment::Local => "local",
            Environment::Testnet => "testnet",
            Environment::Stage => "stage",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Environment {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Environment::ALL
            .into_iter()
            .find(|env| env.as_str() == s)
            .ok_or_else(|| NetworkError::UnknownEnvironment(s.to_string()))
    }
}

/// Node lists for every known environment
#[derive(Debug, Clone)]
pub struct NetworkCatalog {
    environments: HashMap<Environment, Vec<Node>>,
}

#[derive(Deserialize)]
struct CatalogFile(HashMap<String, Vec<Node>>);

impl NetworkCatalog {
    /// Catalog containing only the built-in local node
    pub fn builtin() -> Self {
        let mut environments = HashMap::new();
        environments.insert(
            Environment::Local,
            vec![Node::new(LOCAL_PEER_ID, LOCAL_MULTIADDR)],
        );
        Self { environments }
    }

    /// Builds a catalog from JSON, layered over the built-in one
    ///
    /// The document maps environment names to `[{ "peer_id", "multiaddr" }]`.
    pub fn from_json(json: &str) -> Result<Self, NetworkError> {
        let CatalogFile(entries) = serde_json::from_str(json)?;
        let mut catalog = Self::builtin();
        for (name, nodes) in entries {
            let environment = name.parse::<Environment>()?;
            catalog.environments.insert(environment, nodes);
        }
        Ok(catalog)
    }

    /// Nodes of an environment, which must not be empty
    pub fn nodes(&self, environment: Environment) -> Result<&[Node], NetworkError> {
        match self.environments.get(&environment) {
            Some(nodes) if !nodes.is_empty() => Ok(nodes),
            _ => Err(NetworkError::NoNodes(environment)),
        }
    }
}

/// Picks the relay node the client connects through
///
/// # Arguments
/// * `environment` - The selected environment, for error messages
/// * `nodes` - The environment's nodes
/// * `node_id` - Peer id requested with `--node-id`
/// * `node_addr` - Multiaddr requested with `--node-addr`
///
/// An explicit address wins. When it has no `/p2p/<peer id>` component the
/// requested node id is appended; when it has one, that peer id is used and
/// `node_id` is ignored. A bare node id must belong to the environment.
/// Otherwise the node at [`DEFAULT_RELAY_INDEX`] is used, or the first node
/// for environments smaller than that.
pub fn select_relay(
    environment: Environment,
    nodes: &[Node],
    node_id: Option<&str>,
    node_addr: Option<&str>,
) -> Result<Node, NetworkError> {
    if let Some(addr) = node_addr {
        let parsed = Multiaddr::parse(addr)?;
        return match (parsed.peer_id(), node_id) {
            (Some(embedded), _) => Ok(Node::new(embedded, addr)),
            (None, Some(id)) => {
                let full = format!("{}/p2p/{}", addr.trim_end_matches('/'), id);
                Ok(Node::new(id, full))
            }
            (None, None) => Err(NetworkError::MissingNodeId(addr.to_string())),
        };
    }

    if let Some(id) = node_id {
        return nodes
            .iter()
            .find(|node| node.peer_id == id)
            .cloned()
            .ok_or_else(|| NetworkError::NodeNotInEnvironment {
                node_id: id.to_string(),
                environment,
                known: nodes
                    .iter()
                    .map(|n| n.peer_id.as_str())
                    .collect::<Vec<_>>()
                    .join("\n\t"),
            });
    }

    nodes
        .get(DEFAULT_RELAY_INDEX)
        .or_else(|| nodes.first())
        .cloned()
        .ok_or(NetworkError::NoNodes(environment))
}
