//! Service-related API endpoints

use ferry_core::dto::service::{CreateService, ServiceCreated};
use ferry_core::dto::ttl_millis;
use serde_json::Value;
use std::time::Duration;

use crate::NodeClient;
use crate::error::Result;

impl NodeClient {
    // =============================================================================
    // Service Creation
    // =============================================================================

    /// Instantiate a service from a registered blueprint
    ///
    /// # Returns
    /// The new service instance id
    pub async fn create_service(&self, blueprint_id: &str, ttl: Duration) -> Result<String> {
        let response = self
            .identified(self.client.post(self.url("/api/services")))
            .timeout(ttl)
            .json(&CreateService {
                blueprint_id: blueprint_id.to_string(),
                ttl_ms: ttl_millis(ttl),
            })
            .send()
            .await?;

        let created: ServiceCreated = self.handle_response(response).await?;
        Ok(created.id)
    }

    // =============================================================================
    // Service Interfaces
    // =============================================================================

    /// Interfaces of every service on the node
    pub async fn get_interfaces(&self, ttl: Duration) -> Result<Value> {
        let response = self
            .identified(self.client.get(self.url("/api/services/interfaces")))
            .timeout(ttl)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Interface of one service
    pub async fn get_interface(&self, service_id: &str, ttl: Duration) -> Result<Value> {
        let url = self.url(&format!("/api/services/{}/interface", service_id));
        let response = self
            .identified(self.client.get(url))
            .timeout(ttl)
            .send()
            .await?;

        self.handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClientIdentity, fake_node};
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    fn router() -> Router {
        Router::new()
            .route(
                "/api/services",
                post(|Json(body): Json<CreateService>| async move {
                    Json(json!({ "id": format!("svc-of-{}", body.blueprint_id) }))
                }),
            )
            .route(
                "/api/services/interfaces",
                get(|| async { Json(json!([{ "service_id": "svc-1" }])) }),
            )
            .route(
                "/api/services/{id}/interface",
                get(|Path(id): Path<String>| async move {
                    if id == "svc-1" {
                        Ok(Json(json!({ "function_signatures": [] })))
                    } else {
                        Err((StatusCode::NOT_FOUND, "unknown service"))
                    }
                }),
            )
    }

    #[tokio::test]
    async fn test_create_service() {
        let client = NodeClient::new(fake_node::serve(router()).await, &ClientIdentity::generate());

        let id = client
            .create_service("bp-db", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(id, "svc-of-bp-db");
    }

    #[tokio::test]
    async fn test_interfaces() {
        let client = NodeClient::new(fake_node::serve(router()).await, &ClientIdentity::generate());
        let ttl = Duration::from_secs(5);

        let all = client.get_interfaces(ttl).await.unwrap();
        assert_eq!(all[0]["service_id"], "svc-1");

        let one = client.get_interface("svc-1", ttl).await.unwrap();
        assert!(one["function_signatures"].is_array());

        let missing = client.get_interface("svc-2", ttl).await.unwrap_err();
        assert!(missing.is_not_found());
    }
}
