pub mod auth;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod engine;
pub mod gateway;
pub mod oauth;
pub mod ports;
pub mod smart;
pub mod state_machine;
pub mod wallet;

pub use auth::{normalize_auth_result, parse_linked_accounts};
pub use client::WalletClient;
pub use config::{WalletConfig, DEFAULT_OAUTH_REDIRECT_PORT};
pub use dispatch::{Continuations, DispatchHandle, MainThreadDispatcher, TaskLauncher};
pub use domain::{
    AuthInput, ConnectEvent, HandleId, HandleRecord, InAppSource, InAppWallet, LinkedAccount,
    OAuthProvider, PrivateKeyWallet, SessionKeyReceipt, SessionKeyRequest, SignerPermissions,
    SmartWallet, WalletHandle, WalletKind,
};
pub use engine::WalletEngine;
pub use gateway::{classify, execute, invoke, FailurePolicy, OperationOutcome, RawOutcome};
pub use oauth::{
    CallbackPayload, CallbackResponse, CallbackSignal, LoopbackKind, OAuthSession, CALLBACK_PATH,
    SIWE_LOGIN_URL,
};
pub use ports::{
    AnalyticsPort, AuthFamily, BrowserPort, CallbackListener, CallbackServerPort, CoreCall,
    CreateSmartWalletArgs, CreateWalletArgs, DeviceIdPort, LinkAccountArgs, OtpChannel,
    WalletCorePort, WalletError,
};
pub use smart::{parse_active_signers, parse_admins, SmartWalletOptions};
pub use state_machine::{login_transition, LoginAction, LoginState, StateTransition};
