use std::time::Duration;

use serde_json::json;
use tracing::debug;

use thirdweb_wallet_core::{AnalyticsPort, ConnectEvent, WalletConfig, WalletError};

pub const ANALYTICS_ENDPOINT: &str = "https://c.thirdweb.com/event";
const ANALYTICS_TIMEOUT: Duration = Duration::from_secs(5);
const SDK_PLATFORM: &str = "rust";

/// Posts wallet-connect events to the thirdweb analytics endpoint.
#[derive(Debug, Clone)]
pub struct HttpAnalytics {
    endpoint: String,
    client_id: String,
    bundle_id: String,
    client: reqwest::blocking::Client,
}

impl HttpAnalytics {
    pub fn new(config: &WalletConfig) -> Result<Self, WalletError> {
        Self::with_endpoint(config, ANALYTICS_ENDPOINT)
    }

    pub fn with_endpoint(
        config: &WalletConfig,
        endpoint: impl Into<String>,
    ) -> Result<Self, WalletError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(ANALYTICS_TIMEOUT)
            .build()
            .map_err(|e| WalletError::Transport(format!("failed to build analytics client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            client_id: config.client_id.clone(),
            bundle_id: config.bundle_id.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl AnalyticsPort for HttpAnalytics {
    fn track_connect(&self, event: &ConnectEvent) -> Result<(), WalletError> {
        let body = json!({
            "source": "connectWallet",
            "action": "connect",
            "walletAddress": event.wallet_address.to_string(),
            "walletType": event.wallet_type.as_str(),
        });
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-sdk-name", env!("CARGO_PKG_NAME"))
            .header("x-sdk-os", std::env::consts::OS)
            .header("x-sdk-platform", SDK_PLATFORM)
            .header("x-sdk-version", env!("CARGO_PKG_VERSION"))
            .header("x-client-id", &self.client_id)
            .header("x-bundle-id", &self.bundle_id)
            .json(&body)
            .send()
            .map_err(|e| WalletError::Transport(format!("analytics request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(WalletError::Transport(format!(
                "analytics endpoint returned {status}"
            )));
        }
        debug!(wallet_type = event.wallet_type.as_str(), "connect event recorded");
        Ok(())
    }
}
