//! Marketplace backend status.
//!
//! # Environment Variables
//!
//! - `AYTS_API_URL` - Marketplace backend base URL
//! - `AYTS_API_TIMEOUT_SECS` - Request timeout

use ayts_storefront::api::{ApiClient, MaintenanceStatus};
use ayts_storefront::config::ApiConfig;

/// Print whether the backend is available. Returns `false` during maintenance.
///
/// # Errors
///
/// Returns an error if the backend settings are invalid.
pub async fn check() -> Result<bool, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env()?;
    let client = ApiClient::new(&config)?;
    tracing::info!(api = %client.base_url(), "Checking marketplace backend");

    let status = client.maintenance_status().await;

    #[allow(clippy::print_stdout)]
    match &status {
        MaintenanceStatus::Available => println!("{}: available", client.base_url()),
        MaintenanceStatus::Maintenance { message } => {
            println!("{}: maintenance ({message})", client.base_url());
        }
    }

    Ok(!status.is_maintenance())
}
