//! Ferry Node Client
//!
//! A small, type-safe HTTP client for the RPC endpoint of an execution node.
//!
//! [`NodeClient`] maps one method to one endpoint. The deployment engine does
//! not use it directly: it talks to nodes through the [`NodeConnection`] and
//! [`Connector`] traits, which [`HttpConnector`] implements on top of the
//! client and a [`CallbackRegistry`].
//!
//! # Example
//!
//! ```no_run
//! use ferry_client::{ClientIdentity, NodeClient};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> ferry_client::Result<()> {
//!     let client = NodeClient::new("http://127.0.0.1:4310", &ClientIdentity::generate());
//!
//!     let modules = client.get_modules(Duration::from_secs(60)).await?;
//!     println!("{}", modules);
//!     Ok(())
//! }
//! ```

pub mod callbacks;
pub mod connection;
pub mod error;
pub mod identity;
mod blueprints;
mod modules;
mod scripts;
mod services;

// Re-export commonly used types
pub use callbacks::CallbackRegistry;
pub use connection::{Connector, HttpConnector, NodeConnection};
pub use error::{ClientError, Result};
pub use identity::ClientIdentity;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

/// Header carrying the client identity on every request
pub const CLIENT_HEADER: &str = "x-ferry-client";

/// HTTP client for a single node's RPC endpoint
///
/// Endpoints are grouped by resource:
/// - Modules (upload, list)
/// - Blueprints
/// - Services (create, interfaces)
/// - Scripts (one-shot particles, callbacks, persistent scripts)
#[derive(Debug, Clone)]
pub struct NodeClient {
    /// Base URL of the node (e.g., "http://127.0.0.1:4310")
    base_url: String,
    /// HTTP client instance
    client: Client,
    /// Identity sent in the client header
    identity: String,
}

impl NodeClient {
    /// Create a new node client
    ///
    /// # Arguments
    /// * `base_url` - The node endpoint, usually derived from its multiaddr
    /// * `identity` - The identity presented to the node
    pub fn new(base_url: impl Into<String>, identity: &ClientIdentity) -> Self {
        Self::with_client(base_url, identity, Client::new())
    }

    /// Create a new node client with a custom HTTP client
    ///
    /// This allows you to configure proxies, TLS settings, etc. Per-request
    /// timeouts are always taken from the TTL passed to each call.
    pub fn with_client(
        base_url: impl Into<String>,
        identity: &ClientIdentity,
        client: Client,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            identity: identity.to_string(),
        }
    }

    /// Get the base URL of the node
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Tags a request with the client identity
    fn identified(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(CLIENT_HEADER, &self.identity)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
