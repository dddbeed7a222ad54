use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::ports::{AuthFamily, WalletError};

pub const DEFAULT_OAUTH_REDIRECT_PORT: u16 = 8789;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub client_id: String,
    pub bundle_id: String,
    pub secret_key: String,
    pub ecosystem_id: String,
    pub partner_id: String,
    pub encryption_key: String,
    pub engine_base_url: String,
    pub engine_access_token: String,
    pub storage_directory: String,
    pub send_analytics: bool,
    pub oauth_redirect_port: u16,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            bundle_id: String::new(),
            secret_key: String::new(),
            ecosystem_id: String::new(),
            partner_id: String::new(),
            encryption_key: String::new(),
            engine_base_url: String::new(),
            engine_access_token: String::new(),
            storage_directory: String::new(),
            send_analytics: true,
            oauth_redirect_port: DEFAULT_OAUTH_REDIRECT_PORT,
        }
    }
}

impl WalletConfig {
    pub fn is_ecosystem(&self) -> bool {
        !self.ecosystem_id.is_empty()
    }

    pub fn auth_family(&self) -> AuthFamily {
        if self.is_ecosystem() {
            AuthFamily::Ecosystem
        } else {
            AuthFamily::InApp
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.client_id.is_empty() || !self.secret_key.is_empty()
    }

    pub fn redirect_url(&self) -> String {
        format!("http://localhost:{}/callback", self.oauth_redirect_port)
    }

    /// Key required by standalone JWT and auth-endpoint sign-in.
    pub fn require_encryption_key(&self) -> Result<&str, WalletError> {
        if self.encryption_key.is_empty() {
            Err(WalletError::MissingEncryptionKey)
        } else {
            Ok(&self.encryption_key)
        }
    }
}

static GLOBAL: OnceLock<WalletConfig> = OnceLock::new();

/// Installs the process-wide configuration. Later calls are rejected.
pub fn init_global(config: WalletConfig) -> Result<(), WalletError> {
    GLOBAL
        .set(config)
        .map_err(|_| WalletError::Validation("global wallet config already set".to_owned()))
}

pub fn global() -> Option<&'static WalletConfig> {
    GLOBAL.get()
}
