use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, B256};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::domain::{
    HandleId, SessionKeyReceipt, SessionKeyRequest, SignerPermissions, SmartWallet, WalletHandle,
};
use crate::engine::WalletEngine;
use crate::gateway::{execute, FailurePolicy};
use crate::ports::{
    AnalyticsPort, CoreCall, CreateSmartWalletArgs, DeviceIdPort, WalletCorePort, WalletError,
};
use crate::wallet::parse_bool;

const TEN_YEARS_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartWalletOptions {
    pub chain_id: u64,
    pub gasless: bool,
    /// Empty uses the default account factory.
    pub factory: String,
    pub account_override: String,
}

impl SmartWalletOptions {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            gasless: true,
            factory: String::new(),
            account_override: String::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignerJson {
    signer: String,
    #[serde(default)]
    approved_targets: Vec<String>,
    #[serde(default)]
    native_token_limit_per_transaction: String,
    #[serde(default)]
    start_timestamp: Value,
    #[serde(default)]
    end_timestamp: Value,
}

fn timestamp(value: &Value) -> u64 {
    match value {
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        Value::Number(n) => n.as_u64().unwrap_or_default(),
        _ => 0,
    }
}

fn parse_address(raw: &str) -> Result<Address, WalletError> {
    Address::from_str(raw.trim())
        .map_err(|e| WalletError::Validation(format!("invalid address `{raw}`: {e}")))
}

pub fn parse_active_signers(raw: &str) -> Result<Vec<SignerPermissions>, WalletError> {
    let values: Vec<Value> = serde_json::from_str(raw)
        .map_err(|e| WalletError::Validation(format!("invalid active signers json: {e}")))?;
    values
        .into_iter()
        .filter(Value::is_object)
        .map(|value| {
            let json: SignerJson = serde_json::from_value(value)
                .map_err(|e| WalletError::Validation(format!("invalid signer entry: {e}")))?;
            Ok(SignerPermissions {
                signer: parse_address(&json.signer)?,
                approved_targets: json.approved_targets,
                native_token_limit_per_transaction: json.native_token_limit_per_transaction,
                start_timestamp: timestamp(&json.start_timestamp),
                end_timestamp: timestamp(&json.end_timestamp),
            })
        })
        .collect()
}

pub fn parse_admins(raw: &str) -> Result<Vec<Address>, WalletError> {
    let values: Vec<Value> = serde_json::from_str(raw)
        .map_err(|e| WalletError::Validation(format!("invalid admins json: {e}")))?;
    values
        .iter()
        .filter_map(Value::as_str)
        .map(parse_address)
        .collect()
}

fn parse_session_receipt(raw: &str) -> SessionKeyReceipt {
    let transaction_hash = serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|v| v.get("transactionHash").and_then(Value::as_str).map(str::to_owned))
        .and_then(|hash| B256::from_str(&hash).ok());
    SessionKeyReceipt { transaction_hash }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl<C, A, D> WalletEngine<C, A, D>
where
    C: WalletCorePort,
    A: AnalyticsPort,
    D: DeviceIdPort,
{
    /// Wraps an authenticated in-app wallet in a smart account.
    pub fn create_smart_wallet(
        &self,
        personal: &WalletHandle,
        options: &SmartWalletOptions,
    ) -> Result<WalletHandle, WalletError> {
        let signer = match personal {
            WalletHandle::InApp(w) if w.is_valid() => w.clone(),
            _ => return Err(WalletError::InvalidPersonalWallet),
        };
        let call = CoreCall::CreateSmartWallet(CreateSmartWalletArgs {
            client_id: self.config.client_id.clone(),
            bundle_id: self.config.bundle_id.clone(),
            secret_key: self.config.secret_key.clone(),
            personal_wallet: signer.id,
            chain_id: options.chain_id,
            gasless: options.gasless,
            factory: options.factory.clone(),
            account_override: options.account_override.clone(),
        });
        let raw = execute(&self.core, &call, FailurePolicy::default())?;
        let handle: WalletHandle = SmartWallet {
            id: HandleId::from_str(&raw)?,
            signer,
        }
        .into();
        info!(wallet = %handle.display_name(), chain_id = options.chain_id, "smart wallet created");
        self.emit_connect(&handle);
        Ok(handle)
    }

    fn smart_call(
        &self,
        handle: &WalletHandle,
        build: impl FnOnce(HandleId) -> CoreCall,
    ) -> Result<String, WalletError> {
        let smart = Self::require_smart(handle)?;
        execute(&self.core, &build(smart.id), FailurePolicy::default())
    }

    pub fn is_deployed(&self, handle: &WalletHandle) -> Result<bool, WalletError> {
        let raw = self.smart_call(handle, |handle| CoreCall::SmartIsDeployed { handle })?;
        parse_bool(&raw)
    }

    pub fn get_admins(&self, handle: &WalletHandle) -> Result<Vec<Address>, WalletError> {
        let raw = self.smart_call(handle, |handle| CoreCall::SmartGetAllAdmins { handle })?;
        parse_admins(&raw)
    }

    pub fn get_active_signers(
        &self,
        handle: &WalletHandle,
    ) -> Result<Vec<SignerPermissions>, WalletError> {
        let raw =
            self.smart_call(handle, |handle| CoreCall::SmartGetAllActiveSigners { handle })?;
        parse_active_signers(&raw)
    }

    pub fn add_admin(&self, handle: &WalletHandle, signer: Address) -> Result<(), WalletError> {
        self.smart_call(handle, |handle| CoreCall::SmartAddAdmin { handle, signer })?;
        Ok(())
    }

    pub fn remove_admin(&self, handle: &WalletHandle, signer: Address) -> Result<(), WalletError> {
        self.smart_call(handle, |handle| CoreCall::SmartRemoveAdmin { handle, signer })?;
        Ok(())
    }

    /// Grants a session key. An unset `permission_end` defaults to ten years from now.
    pub fn create_session_key(
        &self,
        handle: &WalletHandle,
        request: &SessionKeyRequest,
    ) -> Result<SessionKeyReceipt, WalletError> {
        let mut request = request.clone();
        if request.permission_end == 0 {
            request.permission_end = unix_now().saturating_add(TEN_YEARS_SECS);
        }
        let raw = self.smart_call(handle, |handle| CoreCall::SmartCreateSessionKey {
            handle,
            request,
        })?;
        Ok(parse_session_receipt(&raw))
    }

    pub fn revoke_session_key(
        &self,
        handle: &WalletHandle,
        signer: Address,
    ) -> Result<(), WalletError> {
        self.smart_call(handle, |handle| CoreCall::SmartRevokeSessionKey {
            handle,
            signer,
        })?;
        Ok(())
    }

    /// Whether `signer` currently holds a session key. An undeployed account has none.
    pub fn is_active_signer(
        &self,
        handle: &WalletHandle,
        signer: Address,
    ) -> Result<bool, WalletError> {
        if !self.is_deployed(handle)? {
            return Ok(false);
        }
        Ok(self
            .get_active_signers(handle)?
            .iter()
            .any(|permissions| permissions.signer == signer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signers_accept_string_timestamps() {
        let raw = r#"[{
            "signer": "0x0000000000000000000000000000000000000001",
            "approvedTargets": ["0x0000000000000000000000000000000000000002"],
            "nativeTokenLimitPerTransaction": "1000",
            "startTimestamp": "10",
            "endTimestamp": "20"
        }, 5]"#;
        let signers = parse_active_signers(raw).expect("parse");
        assert_eq!(signers.len(), 1);
        assert_eq!(signers[0].start_timestamp, 10);
        assert_eq!(signers[0].end_timestamp, 20);
        assert_eq!(signers[0].native_token_limit_per_transaction, "1000");
    }

    #[test]
    fn session_receipt_without_hash() {
        assert_eq!(parse_session_receipt("{}").transaction_hash, None);
        assert_eq!(parse_session_receipt("not json").transaction_hash, None);
    }
}
