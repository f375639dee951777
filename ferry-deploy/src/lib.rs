//! Ferry Deploy
//!
//! The deployment engine behind the `ferry` CLI.
//!
//! Architecture:
//! - Validator: checks a raw descriptor before any network action
//! - Loader: fetches module and script content from files or URLs
//! - Template: renders deployment variables into persistent scripts
//! - Distributor: uploads modules and blueprints, creates services, runs scripts
//! - Pipeline: drives a descriptor through its stages and writes the result
//!
//! # Example
//!
//! ```no_run
//! use ferry_client::{ClientIdentity, HttpConnector};
//! use ferry_core::domain::node::Node;
//! use ferry_deploy::{DeployConfig, Distributor, ScriptDialect, deploy};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> ferry_deploy::Result<()> {
//!     let relay = Node::new(
//!         "12D3KooWKEprYXUXqoV5xSBeyqrWLpQLLH4PXfvVkDJtmcqmh5V3",
//!         "/ip4/127.0.0.1/tcp/4310/ws/p2p/12D3KooWKEprYXUXqoV5xSBeyqrWLpQLLH4PXfvVkDJtmcqmh5V3",
//!     );
//!     let connector = HttpConnector::new(ClientIdentity::generate());
//!     let distributor = Distributor::new(Arc::new(connector), DeployConfig::default());
//!
//!     let result = deploy(
//!         &distributor,
//!         &relay,
//!         &[relay.clone()],
//!         Path::new("deploy.json"),
//!         Path::new("deployed.json"),
//!         ScriptDialect::Air,
//!     )
//!     .await?;
//!
//!     println!("{} services created", result.services.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod distributor;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod retry;
pub mod template;
pub mod validator;

pub use config::DeployConfig;
pub use distributor::{Distributor, ScriptDialect};
pub use error::{DeployError, Result};
pub use pipeline::{DeploymentResult, DeploymentStage, Pipeline, deploy};
