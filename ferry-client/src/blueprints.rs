//! Blueprint-related API endpoints

use ferry_core::domain::blueprint::Blueprint;
use ferry_core::dto::blueprint::{AddBlueprint, BlueprintCreated};
use ferry_core::dto::ttl_millis;
use std::time::Duration;

use crate::NodeClient;
use crate::error::Result;

impl NodeClient {
    /// Register a blueprint on the node
    ///
    /// # Returns
    /// The blueprint id. A pinned id in `blueprint` is a request; the node
    /// may answer with a different one.
    pub async fn add_blueprint(&self, blueprint: &Blueprint, ttl: Duration) -> Result<String> {
        let response = self
            .identified(self.client.post(self.url("/api/blueprints")))
            .timeout(ttl)
            .json(&AddBlueprint::new(blueprint, ttl_millis(ttl)))
            .send()
            .await?;

        let created: BlueprintCreated = self.handle_response(response).await?;
        Ok(created.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClientIdentity, fake_node};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    #[tokio::test]
    async fn test_add_blueprint_echoes_pinned_id() {
        let router = Router::new().route(
            "/api/blueprints",
            post(|Json(body): Json<AddBlueprint>| async move {
                let id = body.id.unwrap_or_else(|| format!("bp-{}", body.name));
                Json(json!({ "id": id, "deps": body.dependencies.len() }))
            }),
        );
        let client = NodeClient::new(fake_node::serve(router).await, &ClientIdentity::generate());
        let ttl = Duration::from_secs(5);

        let plain = Blueprint::new("db", vec!["hash:h1".to_string()]);
        assert_eq!(client.add_blueprint(&plain, ttl).await.unwrap(), "bp-db");

        let pinned = plain.with_id("pinned-1");
        assert_eq!(client.add_blueprint(&pinned, ttl).await.unwrap(), "pinned-1");
    }

    #[tokio::test]
    async fn test_add_blueprint_rejects_malformed_response() {
        let router = Router::new().route(
            "/api/blueprints",
            post(|| async { Json(Value::String("not an object".into())) }),
        );
        let client = NodeClient::new(fake_node::serve(router).await, &ClientIdentity::generate());

        let err = client
            .add_blueprint(&Blueprint::new("db", vec![]), Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, crate::ClientError::ParseError(_)));
    }
}
