//! Operations every handle kind supports, plus private-key wallets.

use std::str::FromStr;

use alloy::primitives::Address;
use tracing::{info, warn};

use crate::domain::{HandleId, PrivateKeyWallet, WalletHandle};
use crate::engine::WalletEngine;
use crate::gateway::{execute, FailurePolicy};
use crate::ports::{AnalyticsPort, CoreCall, DeviceIdPort, WalletCorePort, WalletError};

impl<C, A, D> WalletEngine<C, A, D>
where
    C: WalletCorePort,
    A: AnalyticsPort,
    D: DeviceIdPort,
{
    /// Address of the wallet, or the zero address when the lookup fails.
    pub fn to_address(&self, handle: &WalletHandle) -> Address {
        self.try_to_address(handle).unwrap_or_else(|e| {
            warn!(wallet = %handle.display_name(), error = %e, "address lookup failed");
            Address::ZERO
        })
    }

    pub fn try_to_address(&self, handle: &WalletHandle) -> Result<Address, WalletError> {
        let handle = Self::require_valid(handle)?;
        let raw = execute(
            &self.core,
            &CoreCall::GetWalletAddress { handle },
            FailurePolicy::default(),
        )?;
        Address::from_str(raw.trim())
            .map_err(|e| WalletError::Validation(format!("invalid wallet address `{raw}`: {e}")))
    }

    /// Signs `message` and returns the signature exactly as the core produced it.
    pub fn sign(&self, handle: &WalletHandle, message: &str) -> Result<String, WalletError> {
        let handle = Self::require_valid(handle)?;
        execute(
            &self.core,
            &CoreCall::SignMessage {
                handle,
                message: message.to_owned(),
            },
            FailurePolicy::default(),
        )
    }

    pub fn is_connected(&self, handle: &WalletHandle) -> Result<bool, WalletError> {
        let handle = Self::require_valid(handle)?;
        let raw = execute(
            &self.core,
            &CoreCall::IsConnected { handle },
            FailurePolicy::default(),
        )?;
        parse_bool(&raw)
    }

    /// Disconnects the wallet. On success the local handle is invalidated.
    pub fn disconnect(&self, handle: &mut WalletHandle) -> Result<(), WalletError> {
        let id = Self::require_valid(handle)?;
        execute(
            &self.core,
            &CoreCall::Disconnect { handle: id },
            FailurePolicy::default(),
        )?;
        info!(wallet = %handle.display_name(), "wallet disconnected");
        handle.invalidate();
        Ok(())
    }

    /// Releases the core-side resources and invalidates the handle. No-op on invalid handles.
    pub fn free(&self, handle: &mut WalletHandle) {
        if handle.is_valid() {
            self.core.free_wallet(handle.id());
        }
        handle.invalidate();
    }

    pub fn create_private_key_wallet(&self, private_key: &str) -> Result<WalletHandle, WalletError> {
        let raw = execute(
            &self.core,
            &CoreCall::CreatePrivateKeyWallet {
                private_key: private_key.to_owned(),
            },
            FailurePolicy::FailFast,
        )?;
        Ok(PrivateKeyWallet {
            id: HandleId::from_str(&raw)?,
        }
        .into())
    }

    pub fn generate_private_key_wallet(&self) -> Result<WalletHandle, WalletError> {
        let raw = execute(
            &self.core,
            &CoreCall::GeneratePrivateKeyWallet,
            FailurePolicy::FailFast,
        )?;
        Ok(PrivateKeyWallet {
            id: HandleId::from_str(&raw)?,
        }
        .into())
    }

    pub fn export_private_key(&self, handle: &WalletHandle) -> Result<String, WalletError> {
        let handle = match handle {
            WalletHandle::PrivateKey(w) if w.id.is_valid() => w.id,
            WalletHandle::PrivateKey(_) => return Err(WalletError::InvalidHandle),
            _ => return Err(WalletError::NotPrivateKeyWallet),
        };
        execute(
            &self.core,
            &CoreCall::ExportPrivateKey { handle },
            FailurePolicy::FailFast,
        )
    }
}

pub(crate) fn parse_bool(raw: &str) -> Result<bool, WalletError> {
    raw.trim()
        .to_ascii_lowercase()
        .parse()
        .map_err(|_| WalletError::Validation(format!("expected boolean, got `{raw}`")))
}
