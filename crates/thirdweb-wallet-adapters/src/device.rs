use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::info;

use thirdweb_wallet_core::{DeviceIdPort, WalletConfig, WalletError};

pub const DEVICE_ID_FILE: &str = "thirdweb_device_id";

/// Persistent per-install identifier used as the guest session id.
#[derive(Debug)]
pub struct FileDeviceId {
    path: PathBuf,
    cached: Mutex<Option<String>>,
}

impl FileDeviceId {
    pub fn new(storage_directory: impl AsRef<Path>) -> Self {
        Self {
            path: storage_directory.as_ref().join(DEVICE_ID_FILE),
            cached: Mutex::new(None),
        }
    }

    /// Falls back to a `thirdweb` directory under the system temp dir when no storage directory is set.
    pub fn from_config(config: &WalletConfig) -> Self {
        if config.storage_directory.is_empty() {
            Self::new(std::env::temp_dir().join("thirdweb"))
        } else {
            Self::new(&config.storage_directory)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_or_create(&self) -> Result<String, WalletError> {
        match fs::read_to_string(&self.path) {
            Ok(stored) if !stored.trim().is_empty() => return Ok(stored.trim().to_owned()),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(WalletError::Transport(format!(
                    "failed to read device id {}: {e}",
                    self.path.display()
                )))
            }
        }

        let mut bytes = [0u8; 16];
        getrandom::getrandom(&mut bytes)
            .map_err(|e| WalletError::Transport(format!("failed to generate device id: {e}")))?;
        let id = alloy::hex::encode(bytes);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                WalletError::Transport(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        fs::write(&self.path, &id).map_err(|e| {
            WalletError::Transport(format!(
                "failed to write device id {}: {e}",
                self.path.display()
            ))
        })?;
        info!(path = %self.path.display(), "generated device id");
        Ok(id)
    }
}

impl DeviceIdPort for FileDeviceId {
    fn device_id(&self) -> Result<String, WalletError> {
        let mut cached = self
            .cached
            .lock()
            .map_err(|e| WalletError::Transport(format!("device id lock poisoned: {e}")))?;
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }
        let id = self.load_or_create()?;
        *cached = Some(id.clone());
        Ok(id)
    }
}
