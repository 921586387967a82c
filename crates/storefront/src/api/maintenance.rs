//! Backend maintenance detection.
//!
//! The health endpoint is asked first: a `503`, or a body with
//! `success: false` and `maintenance: true`, means the backend is down for
//! maintenance. Otherwise the public settings' `maintenance_mode` flag decides.
//! When neither endpoint answers, the backend is assumed available.

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{ApiClient, ApiError};

const DEFAULT_MESSAGE: &str = "We are currently undergoing maintenance. Please check back soon.";
const UNAVAILABLE_MESSAGE: &str = "Service is under maintenance";

/// Whether the marketplace backend is serving requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaintenanceStatus {
    Available,
    Maintenance { message: String },
}

impl MaintenanceStatus {
    #[must_use]
    pub const fn is_maintenance(&self) -> bool {
        matches!(self, Self::Maintenance { .. })
    }

    fn maintenance(message: Option<String>) -> Self {
        Self::Maintenance {
            message: message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HealthBody {
    #[serde(default = "yes")]
    success: bool,
    #[serde(default)]
    maintenance: bool,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PublicSettings {
    #[serde(default)]
    maintenance_mode: bool,
    maintenance_message: Option<String>,
}

const fn yes() -> bool {
    true
}

impl ApiClient {
    /// Check whether the backend is in maintenance mode.
    #[instrument(skip(self))]
    pub async fn maintenance_status(&self) -> MaintenanceStatus {
        match self.health().await {
            Ok(Some(status)) => return status,
            Ok(None) => {}
            Err(e) => debug!(error = %e, "Health check failed, trying settings fallback"),
        }

        match self.public_settings().await {
            Ok(settings) if settings.maintenance_mode => {
                MaintenanceStatus::maintenance(settings.maintenance_message)
            }
            Ok(_) => MaintenanceStatus::Available,
            Err(e) => {
                debug!(error = %e, "Settings check failed, assuming available");
                MaintenanceStatus::Available
            }
        }
    }

    /// `Some` when the health endpoint alone settles the question.
    async fn health(&self) -> Result<Option<MaintenanceStatus>, ApiError> {
        let response = self.request(Method::GET, &["health"])?.send().await?;
        let status = response.status();
        let body = response.text().await?;

        let parsed = serde_json::from_str::<HealthBody>(&body).ok();
        if let Some(health) = &parsed
            && !health.success
            && health.maintenance
        {
            return Ok(Some(MaintenanceStatus::maintenance(health.message.clone())));
        }

        if status == StatusCode::SERVICE_UNAVAILABLE {
            return Ok(Some(MaintenanceStatus::Maintenance {
                message: UNAVAILABLE_MESSAGE.to_string(),
            }));
        }

        Ok(None)
    }

    async fn public_settings(&self) -> Result<PublicSettings, ApiError> {
        self.data(self.request(Method::GET, &["api", "settings", "public"])?)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Json, Router, http::StatusCode as AxumStatus, routing::get};
    use serde_json::json;

    use super::*;
    use crate::api::tests::client_for;

    #[tokio::test]
    async fn test_health_maintenance_body() {
        let router = Router::new().route(
            "/health",
            get(|| async {
                (
                    AxumStatus::SERVICE_UNAVAILABLE,
                    Json(json!({"success": false, "maintenance": true, "message": "Back at 6pm"})),
                )
            }),
        );
        let client = client_for(router).await;

        assert_eq!(
            client.maintenance_status().await,
            MaintenanceStatus::Maintenance {
                message: "Back at 6pm".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_bare_503_is_maintenance() {
        let router = Router::new().route(
            "/health",
            get(|| async { (AxumStatus::SERVICE_UNAVAILABLE, "down") }),
        );
        let client = client_for(router).await;

        assert!(client.maintenance_status().await.is_maintenance());
    }

    #[tokio::test]
    async fn test_settings_fallback() {
        let router = Router::new()
            .route("/health", get(|| async { Json(json!({"status": "ok"})) }))
            .route(
                "/api/settings/public",
                get(|| async {
                    Json(json!({"success": true, "data": {"maintenance_mode": true}}))
                }),
            );
        let client = client_for(router).await;

        assert_eq!(
            client.maintenance_status().await,
            MaintenanceStatus::Maintenance {
                message: DEFAULT_MESSAGE.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_errors_mean_available() {
        let client = client_for(Router::new()).await;

        assert_eq!(
            client.maintenance_status().await,
            MaintenanceStatus::Available
        );
    }
}
