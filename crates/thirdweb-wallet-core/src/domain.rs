use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::ports::WalletError;

/// Opaque identifier assigned by the wallet core. Zero is never a live wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleId(pub u64);

impl HandleId {
    pub const INVALID: HandleId = HandleId(0);

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HandleId {
    type Err = WalletError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let id: u64 = raw
            .trim()
            .parse()
            .map_err(|e| WalletError::Transport(format!("invalid handle id `{raw}`: {e}")))?;
        if id == 0 {
            return Err(WalletError::Transport(
                "wallet core returned handle id 0".to_owned(),
            ));
        }
        Ok(HandleId(id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalletKind {
    PrivateKey,
    InApp,
    Smart,
}

impl WalletKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WalletKind::PrivateKey => "privateKey",
            WalletKind::InApp => "inApp",
            WalletKind::Smart => "smart",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OAuthProvider {
    Google,
    Apple,
    Facebook,
    Discord,
    Farcaster,
    Telegram,
    Line,
    X,
    Coinbase,
    Twitch,
    Github,
}

impl OAuthProvider {
    pub const ALL: [OAuthProvider; 11] = [
        OAuthProvider::Google,
        OAuthProvider::Apple,
        OAuthProvider::Facebook,
        OAuthProvider::Discord,
        OAuthProvider::Farcaster,
        OAuthProvider::Telegram,
        OAuthProvider::Line,
        OAuthProvider::X,
        OAuthProvider::Coinbase,
        OAuthProvider::Twitch,
        OAuthProvider::Github,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OAuthProvider::Google => "Google",
            OAuthProvider::Apple => "Apple",
            OAuthProvider::Facebook => "Facebook",
            OAuthProvider::Discord => "Discord",
            OAuthProvider::Farcaster => "Farcaster",
            OAuthProvider::Telegram => "Telegram",
            OAuthProvider::Line => "Line",
            OAuthProvider::X => "X",
            OAuthProvider::Coinbase => "Coinbase",
            OAuthProvider::Twitch => "Twitch",
            OAuthProvider::Github => "Github",
        }
    }
}

impl FromStr for OAuthProvider {
    type Err = WalletError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        OAuthProvider::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| WalletError::Validation(format!("unknown oauth provider: {raw}")))
    }
}

/// Identity source an in-app wallet was created for. Fixed for the lifetime of the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InAppSource {
    Email,
    Phone,
    OAuthProvider(OAuthProvider),
    Jwt,
    AuthEndpoint,
    Guest,
    Siwe,
}

impl InAppSource {
    /// Tag used both for display and as the `auth_provider` argument of custom-auth wallets.
    pub fn as_str(self) -> &'static str {
        match self {
            InAppSource::Email => "Email",
            InAppSource::Phone => "Phone",
            InAppSource::OAuthProvider(_) => "OAuthProvider",
            InAppSource::Jwt => "JWT",
            InAppSource::AuthEndpoint => "AuthEndpoint",
            InAppSource::Guest => "Guest",
            InAppSource::Siwe => "SIWE",
        }
    }

    pub fn provider(self) -> Option<OAuthProvider> {
        match self {
            InAppSource::OAuthProvider(p) => Some(p),
            _ => None,
        }
    }

    pub fn from_tag(tag: &str, provider: Option<OAuthProvider>) -> Result<Self, WalletError> {
        let source = match tag {
            "Email" => InAppSource::Email,
            "Phone" => InAppSource::Phone,
            "JWT" => InAppSource::Jwt,
            "AuthEndpoint" => InAppSource::AuthEndpoint,
            "Guest" => InAppSource::Guest,
            "SIWE" => InAppSource::Siwe,
            "OAuthProvider" => InAppSource::OAuthProvider(provider.ok_or_else(|| {
                WalletError::Validation("oauth source requires a provider".to_owned())
            })?),
            other => {
                return Err(WalletError::Validation(format!(
                    "unknown in-app source: {other}"
                )))
            }
        };
        Ok(source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKeyWallet {
    pub id: HandleId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InAppWallet {
    pub id: HandleId,
    pub source: InAppSource,
    /// Partner the wallet was created under when running in ecosystem mode.
    pub ecosystem_partner_id: Option<String>,
}

impl InAppWallet {
    pub fn new(id: HandleId, source: InAppSource) -> Self {
        Self {
            id,
            source,
            ecosystem_partner_id: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.id.is_valid()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartWallet {
    pub id: HandleId,
    pub signer: InAppWallet,
}

impl SmartWallet {
    pub fn is_valid(&self) -> bool {
        self.id.is_valid() && self.signer.is_valid()
    }
}

/// A wallet session owned by the wallet core. Capabilities follow from the variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WalletHandle {
    PrivateKey(PrivateKeyWallet),
    InApp(InAppWallet),
    Smart(SmartWallet),
}

impl WalletHandle {
    pub fn id(&self) -> HandleId {
        match self {
            WalletHandle::PrivateKey(w) => w.id,
            WalletHandle::InApp(w) => w.id,
            WalletHandle::Smart(w) => w.id,
        }
    }

    pub fn kind(&self) -> WalletKind {
        match self {
            WalletHandle::PrivateKey(_) => WalletKind::PrivateKey,
            WalletHandle::InApp(_) => WalletKind::InApp,
            WalletHandle::Smart(_) => WalletKind::Smart,
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            WalletHandle::PrivateKey(w) => w.id.is_valid(),
            WalletHandle::InApp(w) => w.is_valid(),
            WalletHandle::Smart(w) => w.is_valid(),
        }
    }

    /// Zeroes the local copy. Foreign resources are only released by `free_wallet`/`disconnect`.
    pub fn invalidate(&mut self) {
        match self {
            WalletHandle::PrivateKey(w) => w.id = HandleId::INVALID,
            WalletHandle::InApp(w) => w.id = HandleId::INVALID,
            WalletHandle::Smart(w) => w.id = HandleId::INVALID,
        }
    }

    pub fn as_in_app(&self) -> Option<&InAppWallet> {
        match self {
            WalletHandle::InApp(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_smart(&self) -> Option<&SmartWallet> {
        match self {
            WalletHandle::Smart(w) => Some(w),
            _ => None,
        }
    }

    pub fn display_name(&self) -> String {
        if !self.is_valid() {
            return match self {
                WalletHandle::InApp(_) => "InAppWallet::INVALID".to_owned(),
                _ => "INVALID".to_owned(),
            };
        }
        let kind = self.kind().as_str();
        match self {
            WalletHandle::InApp(w) => match w.source {
                InAppSource::OAuthProvider(p) => {
                    format!("{kind}Wallet::OAuthProvider::{}::{}", p.as_str(), w.id)
                }
                source => format!("{kind}Wallet::{}::{}", source.as_str(), w.id),
            },
            _ => format!("{kind}Wallet::{}", self.id()),
        }
    }

    pub fn to_record(&self) -> HandleRecord {
        match self {
            WalletHandle::PrivateKey(w) => HandleRecord {
                id: w.id.0,
                kind: WalletKind::PrivateKey,
                source: None,
                provider: None,
                ecosystem_partner_id: None,
                signer: None,
            },
            WalletHandle::InApp(w) => in_app_record(w),
            WalletHandle::Smart(w) => HandleRecord {
                id: w.id.0,
                kind: WalletKind::Smart,
                source: None,
                provider: None,
                ecosystem_partner_id: None,
                signer: Some(Box::new(in_app_record(&w.signer))),
            },
        }
    }
}

/// Two handles are the same wallet when both are valid and share an id.
impl PartialEq for WalletHandle {
    fn eq(&self, other: &Self) -> bool {
        self.is_valid() && other.is_valid() && self.id() == other.id()
    }
}

impl From<InAppWallet> for WalletHandle {
    fn from(wallet: InAppWallet) -> Self {
        WalletHandle::InApp(wallet)
    }
}

impl From<SmartWallet> for WalletHandle {
    fn from(wallet: SmartWallet) -> Self {
        WalletHandle::Smart(wallet)
    }
}

impl From<PrivateKeyWallet> for WalletHandle {
    fn from(wallet: PrivateKeyWallet) -> Self {
        WalletHandle::PrivateKey(wallet)
    }
}

/// Flat, tag-based form of a handle for persistence or crossing a host boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleRecord {
    pub id: u64,
    pub kind: WalletKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<OAuthProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecosystem_partner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<Box<HandleRecord>>,
}

fn in_app_record(w: &InAppWallet) -> HandleRecord {
    HandleRecord {
        id: w.id.0,
        kind: WalletKind::InApp,
        source: Some(w.source.as_str().to_owned()),
        provider: w.source.provider(),
        ecosystem_partner_id: w.ecosystem_partner_id.clone(),
        signer: None,
    }
}

impl TryFrom<HandleRecord> for WalletHandle {
    type Error = WalletError;

    fn try_from(record: HandleRecord) -> Result<Self, Self::Error> {
        if record.id == 0 {
            return Err(WalletError::InvalidHandle);
        }
        let id = HandleId(record.id);
        match record.kind {
            WalletKind::PrivateKey => Ok(WalletHandle::PrivateKey(PrivateKeyWallet { id })),
            WalletKind::InApp => {
                let tag = record.source.as_deref().ok_or(WalletError::InvalidHandle)?;
                Ok(WalletHandle::InApp(InAppWallet {
                    id,
                    source: InAppSource::from_tag(tag, record.provider)?,
                    ecosystem_partner_id: record.ecosystem_partner_id,
                }))
            }
            WalletKind::Smart => {
                let signer = record.signer.ok_or(WalletError::InvalidHandle)?;
                match WalletHandle::try_from(*signer)? {
                    WalletHandle::InApp(signer) => {
                        Ok(WalletHandle::Smart(SmartWallet { id, signer }))
                    }
                    _ => Err(WalletError::InvalidHandle),
                }
            }
        }
    }
}

/// Input for one sign-in (or link) attempt.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthInput {
    Otp(String),
    OAuth(String),
    Jwt(String),
    AuthEndpoint(String),
    Guest,
    Siwe { payload: String, signature: String },
}

impl AuthInput {
    pub fn name(&self) -> &'static str {
        match self {
            AuthInput::Otp(_) => "otp",
            AuthInput::OAuth(_) => "oauth",
            AuthInput::Jwt(_) => "jwt",
            AuthInput::AuthEndpoint(_) => "auth_endpoint",
            AuthInput::Guest => "guest",
            AuthInput::Siwe { .. } => "siwe",
        }
    }
}

// Inputs are credentials; never print their contents.
impl fmt::Debug for AuthInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthInput::{}(..)", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerPermissions {
    pub signer: Address,
    pub approved_targets: Vec<String>,
    pub native_token_limit_per_transaction: String,
    pub start_timestamp: u64,
    pub end_timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionKeyRequest {
    pub signer: Address,
    pub approved_targets: Vec<Address>,
    pub native_token_limit_per_transaction_in_wei: String,
    /// Unix seconds; 0 leaves the bound to the wallet core.
    pub permission_start: u64,
    pub permission_end: u64,
    pub request_validity_start: u64,
    pub request_validity_end: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionKeyReceipt {
    pub transaction_hash: Option<B256>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedAccount {
    pub account_type: String,
    pub id: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectEvent {
    pub wallet_address: Address,
    pub wallet_type: WalletKind,
}
