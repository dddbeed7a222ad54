//! In-app wallet creation and the per-source sign-in dispatch.

use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::domain::{AuthInput, HandleId, InAppSource, InAppWallet, LinkedAccount, WalletHandle};
use crate::engine::WalletEngine;
use crate::gateway::{execute, FailurePolicy};
use crate::ports::{
    AnalyticsPort, AuthFamily, CoreCall, CreateWalletArgs, DeviceIdPort, LinkAccountArgs,
    OtpChannel, WalletCorePort, WalletError,
};

const ENCODED_JSON_OBJECT_PREFIX: &str = "%7B%22";

/// Source tag an input needs, as shown in mismatch errors.
fn required_source(input: &AuthInput) -> &'static str {
    match input {
        AuthInput::Otp(_) => "email/phone",
        AuthInput::OAuth(_) => "OAuthProvider",
        AuthInput::Jwt(_) => "JWT",
        AuthInput::AuthEndpoint(_) => "AuthEndpoint",
        AuthInput::Guest => "Guest",
        AuthInput::Siwe { .. } => "SIWE",
    }
}

/// A redirect result that arrives still URL-encoded (`{"...`) is decoded once more.
pub fn normalize_auth_result(raw: &str) -> String {
    if raw.starts_with(ENCODED_JSON_OBJECT_PREFIX) {
        match urlencoding::decode(raw) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => raw.to_owned(),
        }
    } else {
        raw.to_owned()
    }
}

fn sign_in_wallet(handle: &WalletHandle, input: &AuthInput) -> Result<InAppWallet, WalletError> {
    match handle {
        WalletHandle::InApp(w) if w.is_valid() => Ok(w.clone()),
        WalletHandle::InApp(_) => Err(WalletError::InvalidHandle),
        _ => Err(WalletError::SourceMismatch {
            expected: required_source(input),
        }),
    }
}

#[derive(Deserialize)]
struct LinkedAccountJson {
    #[serde(rename = "type")]
    account_type: String,
    #[serde(default)]
    details: LinkedAccountDetails,
}

#[derive(Default, Deserialize)]
struct LinkedAccountDetails {
    id: Option<String>,
    email: Option<String>,
    address: Option<String>,
    phone: Option<String>,
}

pub fn parse_linked_accounts(raw: &str) -> Result<Vec<LinkedAccount>, WalletError> {
    let values: Vec<Value> = serde_json::from_str(raw)
        .map_err(|e| WalletError::Validation(format!("invalid linked accounts json: {e}")))?;
    let mut accounts = Vec::with_capacity(values.len());
    for value in values.into_iter().filter(Value::is_object) {
        let parsed: LinkedAccountJson = serde_json::from_value(value)
            .map_err(|e| WalletError::Validation(format!("invalid linked account: {e}")))?;
        accounts.push(LinkedAccount {
            account_type: parsed.account_type,
            id: parsed.details.id,
            email: parsed.details.email,
            address: parsed.details.address,
            phone: parsed.details.phone,
        });
    }
    Ok(accounts)
}

impl<C, A, D> WalletEngine<C, A, D>
where
    C: WalletCorePort,
    A: AnalyticsPort,
    D: DeviceIdPort,
{
    fn creation_args(&self, source: InAppSource, login: &str) -> CreateWalletArgs {
        let (email, phone, auth_provider) = match source {
            InAppSource::Email => (login.to_owned(), String::new(), String::new()),
            InAppSource::Phone => (String::new(), login.to_owned(), String::new()),
            InAppSource::OAuthProvider(p) => (String::new(), String::new(), p.as_str().to_owned()),
            other => (String::new(), String::new(), other.as_str().to_owned()),
        };
        CreateWalletArgs {
            client_id: self.config.client_id.clone(),
            bundle_id: self.config.bundle_id.clone(),
            secret_key: self.config.secret_key.clone(),
            email,
            phone,
            storage_directory: self.config.storage_directory.clone(),
            auth_provider,
        }
    }

    /// Creates a standalone in-app wallet. `login` is the email or phone for those sources.
    pub fn create_in_app_wallet(
        &self,
        source: InAppSource,
        login: &str,
    ) -> Result<WalletHandle, WalletError> {
        let call = CoreCall::CreateInAppWallet(self.creation_args(source, login));
        let raw = execute(&self.core, &call, FailurePolicy::FailFast)?;
        let wallet = InAppWallet::new(HandleId::from_str(&raw)?, source);
        info!(wallet = %WalletHandle::from(wallet.clone()).display_name(), "in-app wallet created");
        Ok(wallet.into())
    }

    /// Creates an ecosystem wallet under `partner_id`.
    pub fn create_ecosystem_wallet(
        &self,
        partner_id: &str,
        source: InAppSource,
        login: &str,
    ) -> Result<WalletHandle, WalletError> {
        self.require_ecosystem()?;
        let call = CoreCall::CreateEcosystemWallet {
            ecosystem_id: self.config.ecosystem_id.clone(),
            partner_id: partner_id.to_owned(),
            args: self.creation_args(source, login),
        };
        let raw = execute(&self.core, &call, FailurePolicy::FailFast)?;
        let wallet = InAppWallet {
            id: HandleId::from_str(&raw)?,
            source,
            ecosystem_partner_id: Some(partner_id.to_owned()),
        };
        info!(wallet = %WalletHandle::from(wallet.clone()).display_name(), "ecosystem wallet created");
        Ok(wallet.into())
    }

    /// JWT, auth-endpoint and guest wallets. Any other source is rejected before the core is called.
    pub fn create_custom_auth_wallet(
        &self,
        source: InAppSource,
    ) -> Result<WalletHandle, WalletError> {
        match source {
            InAppSource::Jwt | InAppSource::AuthEndpoint | InAppSource::Guest => {
                if self.config.is_ecosystem() {
                    let partner_id = self.config.partner_id.clone();
                    self.create_ecosystem_wallet(&partner_id, source, "")
                } else {
                    self.create_in_app_wallet(source, "")
                }
            }
            _ => Err(WalletError::InvalidCustomAuthSource),
        }
    }

    /// Selects the foreign sign-in call for `wallet` and `input`.
    ///
    /// Total over the seven sources; every pairing not listed fails with a
    /// source mismatch and never reaches the core.
    pub fn plan_sign_in(
        &self,
        wallet: &InAppWallet,
        input: &AuthInput,
    ) -> Result<CoreCall, WalletError> {
        if !wallet.is_valid() {
            return Err(WalletError::InvalidHandle);
        }
        let family = self.config.auth_family();
        let handle = wallet.id;
        let call = match (wallet.source, input) {
            (InAppSource::Email, AuthInput::Otp(otp)) => CoreCall::SignInWithOtp {
                family,
                channel: OtpChannel::Email,
                handle,
                otp: otp.clone(),
            },
            (InAppSource::Phone, AuthInput::Otp(otp)) => CoreCall::SignInWithOtp {
                family,
                channel: OtpChannel::Phone,
                handle,
                otp: otp.clone(),
            },
            (InAppSource::OAuthProvider(_), AuthInput::OAuth(result)) => {
                CoreCall::SignInWithOAuth {
                    family,
                    handle,
                    auth_result: normalize_auth_result(result),
                }
            }
            (InAppSource::Jwt, AuthInput::Jwt(jwt)) => CoreCall::SignInWithJwt {
                family,
                handle,
                jwt: jwt.clone(),
                encryption_key: self.encryption_key_for(family)?,
            },
            (InAppSource::AuthEndpoint, AuthInput::AuthEndpoint(payload)) => {
                CoreCall::SignInWithAuthEndpoint {
                    family,
                    handle,
                    payload: payload.clone(),
                    encryption_key: self.encryption_key_for(family)?,
                }
            }
            (InAppSource::Guest, AuthInput::Guest) => CoreCall::SignInWithGuest {
                family,
                handle,
                session_id: self.device.device_id()?,
            },
            (InAppSource::Siwe, AuthInput::Siwe { payload, signature }) => {
                CoreCall::SignInWithSiwe {
                    family,
                    handle,
                    payload: payload.clone(),
                    signature: signature.clone(),
                }
            }
            (_, input) => {
                return Err(WalletError::SourceMismatch {
                    expected: required_source(input),
                })
            }
        };
        Ok(call)
    }

    fn encryption_key_for(&self, family: AuthFamily) -> Result<Option<String>, WalletError> {
        match family {
            AuthFamily::Ecosystem => Ok(None),
            AuthFamily::InApp => Ok(Some(self.config.require_encryption_key()?.to_owned())),
        }
    }

    /// Local half of a sign-in: handle, source and configuration checks. Never calls the core.
    pub fn prepare_sign_in(
        &self,
        handle: &WalletHandle,
        input: &AuthInput,
    ) -> Result<CoreCall, WalletError> {
        let wallet = sign_in_wallet(handle, input)?;
        self.plan_sign_in(&wallet, input)
    }

    /// Runs a call produced by `prepare_sign_in`.
    pub fn run_sign_in(&self, handle: &WalletHandle, call: &CoreCall) -> Result<(), WalletError> {
        execute(&self.core, call, FailurePolicy::FailFast)?;
        info!(wallet = %handle.display_name(), call = %call.name(), "signed in");
        self.emit_connect(handle);
        Ok(())
    }

    /// Signs the wallet in with the input its source requires.
    pub fn sign_in(&self, handle: &WalletHandle, input: &AuthInput) -> Result<(), WalletError> {
        let call = self.prepare_sign_in(handle, input)?;
        self.run_sign_in(handle, &call)
    }

    pub fn send_otp(&self, handle: &WalletHandle) -> Result<(), WalletError> {
        let wallet = sign_in_wallet(handle, &AuthInput::Otp(String::new()))?;
        let channel = match wallet.source {
            InAppSource::Email => OtpChannel::Email,
            InAppSource::Phone => OtpChannel::Phone,
            _ => {
                return Err(WalletError::SourceMismatch {
                    expected: "email/phone",
                })
            }
        };
        let call = CoreCall::SendOtp {
            family: self.config.auth_family(),
            channel,
            handle: wallet.id,
        };
        execute(&self.core, &call, FailurePolicy::FailFast)?;
        debug!(wallet = %handle.display_name(), "otp sent");
        Ok(())
    }

    /// Login URL for an OAuth wallet. The provider redirects to `redirect_url` when done.
    pub fn fetch_oauth_login_link(
        &self,
        handle: &WalletHandle,
        redirect_url: &str,
    ) -> Result<String, WalletError> {
        let wallet = sign_in_wallet(handle, &AuthInput::OAuth(String::new()))?;
        if wallet.source.provider().is_none() {
            return Err(WalletError::SourceMismatch {
                expected: "OAuthProvider",
            });
        }
        let call = CoreCall::FetchOAuthLoginLink {
            family: self.config.auth_family(),
            handle: wallet.id,
            redirect_url: redirect_url.to_owned(),
        };
        execute(&self.core, &call, FailurePolicy::default())
    }

    /// Links `other` into `primary`, authenticating `other` with `input`. Ecosystem mode only.
    pub fn link_account(
        &self,
        primary: &WalletHandle,
        other: &WalletHandle,
        input: &AuthInput,
    ) -> Result<(), WalletError> {
        self.require_ecosystem()?;
        let primary = Self::require_valid(primary)?;
        let other_wallet = sign_in_wallet(other, input)?;
        // Reuse the sign-in pairing rules for the wallet being linked.
        let planned = self.plan_sign_in(&other_wallet, input)?;
        let mut args = LinkAccountArgs::default();
        match planned {
            CoreCall::SignInWithOtp { otp, .. } => args.otp = otp,
            CoreCall::SignInWithOAuth { auth_result, .. } => args.oauth_result = auth_result,
            CoreCall::SignInWithJwt { jwt, .. } => args.jwt = jwt,
            CoreCall::SignInWithAuthEndpoint { payload, .. } => args.payload = payload,
            CoreCall::SignInWithGuest { session_id, .. } => args.session_id = session_id,
            CoreCall::SignInWithSiwe {
                payload, signature, ..
            } => {
                args.siwe_payload = payload;
                args.siwe_signature = signature;
            }
            other => {
                return Err(WalletError::Validation(format!(
                    "cannot link with {}",
                    other.name()
                )))
            }
        }
        let call = CoreCall::LinkAccount {
            handle: primary,
            wallet_to_link: other_wallet.id,
            args,
        };
        execute(&self.core, &call, FailurePolicy::FailFast)?;
        info!(wallet_to_link = %other.display_name(), "account linked");
        Ok(())
    }

    pub fn get_linked_accounts(
        &self,
        handle: &WalletHandle,
    ) -> Result<Vec<LinkedAccount>, WalletError> {
        self.require_ecosystem()?;
        let handle = Self::require_valid(handle)?;
        let raw = execute(
            &self.core,
            &CoreCall::GetLinkedAccounts { handle },
            FailurePolicy::default(),
        )?;
        parse_linked_accounts(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_auth_result_is_decoded_once() {
        assert_eq!(
            normalize_auth_result("%7B%22token%22%3A%22abc%22%7D"),
            r#"{"token":"abc"}"#
        );
        assert_eq!(normalize_auth_result("XYZ"), "XYZ");
        assert_eq!(
            normalize_auth_result(r#"{"token":"%7B"}"#),
            r#"{"token":"%7B"}"#
        );
    }

    #[test]
    fn linked_accounts_skip_non_objects() {
        let raw = r#"[{"type":"email","details":{"email":"a@b.c"}},"junk",{"type":"guest"}]"#;
        let accounts = parse_linked_accounts(raw).expect("parse");
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].email.as_deref(), Some("a@b.c"));
        assert_eq!(accounts[1].account_type, "guest");
        assert_eq!(accounts[1].id, None);
    }
}
