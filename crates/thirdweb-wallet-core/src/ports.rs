use std::fmt;
use std::sync::Arc;

use alloy::primitives::Address;
use thiserror::Error;

use crate::domain::{ConnectEvent, HandleId, SessionKeyRequest};
use crate::gateway::RawOutcome;
use crate::oauth::CallbackSignal;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    /// Core reported success but flagged the failure as worth retrying.
    #[error("{0}")]
    Recoverable(String),
    #[error("{message}")]
    Rejected { message: String, retryable: bool },
    #[error("Invalid wallet handle")]
    InvalidHandle,
    #[error("Wallet handle is not a smart wallet")]
    NotSmartWallet,
    #[error("Wallet handle is not a private key wallet")]
    NotPrivateKeyWallet,
    #[error("Wallet handle is not {expected} source")]
    SourceMismatch { expected: &'static str },
    #[error("Invalid InApp wallet")]
    InvalidPersonalWallet,
    #[error("Invalid custom auth source")]
    InvalidCustomAuthSource,
    #[error("Ecosystem ID not set in settings")]
    EcosystemNotConfigured,
    #[error("No encryption key set")]
    MissingEncryptionKey,
    #[error("{0} query parameter is missing.")]
    MissingCallbackParameter(&'static str),
    #[error("failed to bind loopback listener on port {port}: {reason}")]
    ListenerBind { port: u16, reason: String },
    #[error("illegal login transition: {0}")]
    IllegalTransition(String),
}

impl WalletError {
    pub fn retryable(&self) -> bool {
        match self {
            WalletError::Recoverable(_) => true,
            WalletError::Rejected { retryable, .. } => *retryable,
            _ => false,
        }
    }

    /// Failures raised locally before any foreign call was made.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            WalletError::InvalidHandle
                | WalletError::NotSmartWallet
                | WalletError::NotPrivateKeyWallet
                | WalletError::SourceMismatch { .. }
                | WalletError::InvalidPersonalWallet
                | WalletError::InvalidCustomAuthSource
                | WalletError::EcosystemNotConfigured
                | WalletError::MissingEncryptionKey
                | WalletError::MissingCallbackParameter(_)
                | WalletError::ListenerBind { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthFamily {
    InApp,
    Ecosystem,
}

impl AuthFamily {
    pub fn prefix(self) -> &'static str {
        match self {
            AuthFamily::InApp => "in_app_wallet",
            AuthFamily::Ecosystem => "ecosystem_wallet",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OtpChannel {
    Email,
    Phone,
}

/// Arguments shared by in-app and ecosystem wallet creation. Empty strings reach the core as null.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CreateWalletArgs {
    pub client_id: String,
    pub bundle_id: String,
    pub secret_key: String,
    pub email: String,
    pub phone: String,
    pub storage_directory: String,
    pub auth_provider: String,
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct LinkAccountArgs {
    pub otp: String,
    pub oauth_result: String,
    pub jwt: String,
    pub payload: String,
    pub session_id: String,
    pub siwe_payload: String,
    pub siwe_signature: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct CreateSmartWalletArgs {
    pub client_id: String,
    pub bundle_id: String,
    pub secret_key: String,
    pub personal_wallet: HandleId,
    pub chain_id: u64,
    pub gasless: bool,
    pub factory: String,
    pub account_override: String,
}

/// One call into the wallet core. Owned so it can cross threads and be recorded.
#[derive(Clone, PartialEq, Eq)]
pub enum CoreCall {
    CreatePrivateKeyWallet { private_key: String },
    GeneratePrivateKeyWallet,
    ExportPrivateKey { handle: HandleId },
    CreateInAppWallet(CreateWalletArgs),
    CreateEcosystemWallet {
        ecosystem_id: String,
        partner_id: String,
        args: CreateWalletArgs,
    },
    SendOtp {
        family: AuthFamily,
        channel: OtpChannel,
        handle: HandleId,
    },
    SignInWithOtp {
        family: AuthFamily,
        channel: OtpChannel,
        handle: HandleId,
        otp: String,
    },
    FetchOAuthLoginLink {
        family: AuthFamily,
        handle: HandleId,
        redirect_url: String,
    },
    SignInWithOAuth {
        family: AuthFamily,
        handle: HandleId,
        auth_result: String,
    },
    /// `encryption_key` is only carried for standalone in-app wallets.
    SignInWithJwt {
        family: AuthFamily,
        handle: HandleId,
        jwt: String,
        encryption_key: Option<String>,
    },
    SignInWithAuthEndpoint {
        family: AuthFamily,
        handle: HandleId,
        payload: String,
        encryption_key: Option<String>,
    },
    SignInWithGuest {
        family: AuthFamily,
        handle: HandleId,
        session_id: String,
    },
    SignInWithSiwe {
        family: AuthFamily,
        handle: HandleId,
        payload: String,
        signature: String,
    },
    LinkAccount {
        handle: HandleId,
        wallet_to_link: HandleId,
        args: LinkAccountArgs,
    },
    GetLinkedAccounts { handle: HandleId },
    CreateSmartWallet(CreateSmartWalletArgs),
    SmartIsDeployed { handle: HandleId },
    SmartGetAllAdmins { handle: HandleId },
    SmartGetAllActiveSigners { handle: HandleId },
    SmartCreateSessionKey {
        handle: HandleId,
        request: SessionKeyRequest,
    },
    SmartRevokeSessionKey { handle: HandleId, signer: Address },
    SmartAddAdmin { handle: HandleId, signer: Address },
    SmartRemoveAdmin { handle: HandleId, signer: Address },
    GetWalletAddress { handle: HandleId },
    SignMessage { handle: HandleId, message: String },
    IsConnected { handle: HandleId },
    Disconnect { handle: HandleId },
}

impl CoreCall {
    /// Foreign symbol name, used in logs in place of the arguments.
    pub fn name(&self) -> String {
        let fixed = match self {
            CoreCall::CreatePrivateKeyWallet { .. } => "create_private_key_wallet",
            CoreCall::GeneratePrivateKeyWallet => "generate_private_key_wallet",
            CoreCall::ExportPrivateKey { .. } => "private_key_wallet_export",
            CoreCall::CreateInAppWallet(_) => "create_in_app_wallet",
            CoreCall::CreateEcosystemWallet { .. } => "create_ecosystem_wallet",
            CoreCall::LinkAccount { .. } => "ecosystem_wallet_link_account",
            CoreCall::GetLinkedAccounts { .. } => "ecosystem_wallet_get_linked_accounts",
            CoreCall::CreateSmartWallet(_) => "create_smart_wallet",
            CoreCall::SmartIsDeployed { .. } => "smart_wallet_is_deployed",
            CoreCall::SmartGetAllAdmins { .. } => "smart_wallet_get_all_admins",
            CoreCall::SmartGetAllActiveSigners { .. } => "smart_wallet_get_all_active_signers",
            CoreCall::SmartCreateSessionKey { .. } => "smart_wallet_create_session_key",
            CoreCall::SmartRevokeSessionKey { .. } => "smart_wallet_revoke_session_key",
            CoreCall::SmartAddAdmin { .. } => "smart_wallet_add_admin",
            CoreCall::SmartRemoveAdmin { .. } => "smart_wallet_remove_admin",
            CoreCall::GetWalletAddress { .. } => "get_wallet_address",
            CoreCall::SignMessage { .. } => "sign_message",
            CoreCall::IsConnected { .. } => "is_connected",
            CoreCall::Disconnect { .. } => "disconnect",
            CoreCall::SendOtp {
                family, channel, ..
            } => return family_symbol(*family, &otp_symbol("send_otp", *channel)),
            CoreCall::SignInWithOtp {
                family, channel, ..
            } => return family_symbol(*family, &otp_symbol("sign_in_with_otp", *channel)),
            CoreCall::FetchOAuthLoginLink { family, .. } => {
                return family_symbol(*family, "fetch_oauth_login_link")
            }
            CoreCall::SignInWithOAuth { family, .. } => {
                return family_symbol(*family, "sign_in_with_oauth")
            }
            CoreCall::SignInWithJwt { family, .. } => {
                return family_symbol(*family, "sign_in_with_jwt")
            }
            CoreCall::SignInWithAuthEndpoint { family, .. } => {
                return family_symbol(*family, "sign_in_with_auth_endpoint")
            }
            CoreCall::SignInWithGuest { family, .. } => {
                return family_symbol(*family, "sign_in_with_guest")
            }
            CoreCall::SignInWithSiwe { family, .. } => {
                return family_symbol(*family, "sign_in_with_siwe")
            }
        };
        fixed.to_owned()
    }

    /// Handle the call operates on, if any.
    pub fn handle(&self) -> Option<HandleId> {
        match self {
            CoreCall::ExportPrivateKey { handle }
            | CoreCall::SendOtp { handle, .. }
            | CoreCall::SignInWithOtp { handle, .. }
            | CoreCall::FetchOAuthLoginLink { handle, .. }
            | CoreCall::SignInWithOAuth { handle, .. }
            | CoreCall::SignInWithJwt { handle, .. }
            | CoreCall::SignInWithAuthEndpoint { handle, .. }
            | CoreCall::SignInWithGuest { handle, .. }
            | CoreCall::SignInWithSiwe { handle, .. }
            | CoreCall::LinkAccount { handle, .. }
            | CoreCall::GetLinkedAccounts { handle }
            | CoreCall::SmartIsDeployed { handle }
            | CoreCall::SmartGetAllAdmins { handle }
            | CoreCall::SmartGetAllActiveSigners { handle }
            | CoreCall::SmartCreateSessionKey { handle, .. }
            | CoreCall::SmartRevokeSessionKey { handle, .. }
            | CoreCall::SmartAddAdmin { handle, .. }
            | CoreCall::SmartRemoveAdmin { handle, .. }
            | CoreCall::GetWalletAddress { handle }
            | CoreCall::SignMessage { handle, .. }
            | CoreCall::IsConnected { handle }
            | CoreCall::Disconnect { handle } => Some(*handle),
            CoreCall::CreateSmartWallet(args) => Some(args.personal_wallet),
            CoreCall::CreatePrivateKeyWallet { .. }
            | CoreCall::GeneratePrivateKeyWallet
            | CoreCall::CreateInAppWallet(_)
            | CoreCall::CreateEcosystemWallet { .. } => None,
        }
    }
}

fn family_symbol(family: AuthFamily, stem: &str) -> String {
    format!("{}_{stem}", family.prefix())
}

fn otp_symbol(stem: &str, channel: OtpChannel) -> String {
    match channel {
        OtpChannel::Email => format!("{stem}_email"),
        OtpChannel::Phone => format!("{stem}_phone"),
    }
}

impl fmt::Debug for CoreCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.handle() {
            Some(handle) => write!(f, "{}({handle}, ..)", self.name()),
            None => write!(f, "{}(..)", self.name()),
        }
    }
}

/// Synchronous, blocking entry into the wallet core. Callers keep it off the primary thread.
pub trait WalletCorePort: Send + Sync {
    fn call(&self, call: &CoreCall) -> Result<RawOutcome, WalletError>;
    fn free_wallet(&self, handle: HandleId);
}

pub trait AnalyticsPort: Send + Sync {
    fn track_connect(&self, event: &ConnectEvent) -> Result<(), WalletError>;
}

pub trait BrowserPort: Send + Sync {
    fn open_url(&self, url: &str) -> Result<(), WalletError>;
}

pub trait DeviceIdPort: Send + Sync {
    fn device_id(&self) -> Result<String, WalletError>;
}

/// A running loopback listener. `shutdown` stops accepting requests and releases the port.
pub trait CallbackListener: Send {
    fn shutdown(self: Box<Self>);
}

pub trait CallbackServerPort: Send + Sync {
    fn listen(
        &self,
        port: u16,
        signal: Arc<CallbackSignal>,
    ) -> Result<Box<dyn CallbackListener>, WalletError>;
}
