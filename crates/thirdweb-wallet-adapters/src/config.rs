use std::fs;
use std::path::Path;

use thiserror::Error;

use thirdweb_wallet_core::{WalletConfig, WalletError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("invalid value for {name}: {value:?}")]
    InvalidVar { name: &'static str, value: String },
}

impl From<ConfigError> for WalletError {
    fn from(e: ConfigError) -> Self {
        WalletError::Validation(e.to_string())
    }
}

/// Reads `THIRDWEB_*` variables from the process environment. Unset variables keep their defaults.
pub fn from_env() -> Result<WalletConfig, ConfigError> {
    from_vars(|name| std::env::var(name).ok())
}

pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<WalletConfig, ConfigError> {
    let mut config = WalletConfig::default();
    let strings: [(&str, &mut String); 9] = [
        ("THIRDWEB_CLIENT_ID", &mut config.client_id),
        ("THIRDWEB_BUNDLE_ID", &mut config.bundle_id),
        ("THIRDWEB_SECRET_KEY", &mut config.secret_key),
        ("THIRDWEB_ECOSYSTEM_ID", &mut config.ecosystem_id),
        ("THIRDWEB_PARTNER_ID", &mut config.partner_id),
        ("THIRDWEB_ENCRYPTION_KEY", &mut config.encryption_key),
        ("THIRDWEB_ENGINE_BASE_URL", &mut config.engine_base_url),
        ("THIRDWEB_ENGINE_ACCESS_TOKEN", &mut config.engine_access_token),
        ("THIRDWEB_STORAGE_DIRECTORY", &mut config.storage_directory),
    ];
    for (name, field) in strings {
        if let Some(value) = lookup(name) {
            *field = value.trim().to_owned();
        }
    }

    if let Some(value) = lookup("THIRDWEB_SEND_ANALYTICS") {
        config.send_analytics = match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                return Err(ConfigError::InvalidVar {
                    name: "THIRDWEB_SEND_ANALYTICS",
                    value,
                })
            }
        };
    }
    if let Some(value) = lookup("THIRDWEB_OAUTH_REDIRECT_PORT") {
        config.oauth_redirect_port =
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidVar {
                    name: "THIRDWEB_OAUTH_REDIRECT_PORT",
                    value: value.clone(),
                })?;
    }
    Ok(config)
}

/// Loads a JSON config file. Missing fields keep their defaults.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<WalletConfig, ConfigError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}
