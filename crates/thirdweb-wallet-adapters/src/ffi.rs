//! Bindings to the prebuilt `thirdweb` wallet core.
//!
//! Every foreign function returns an [`FfiResult`] whose message buffer is owned
//! by the library; [`OwnedResult`] copies it out and hands it back exactly once.
//! Empty strings are passed as null pointers, which the library reads as "unset".

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use thirdweb_wallet_core::{
    AuthFamily, CoreCall, HandleId, OtpChannel, RawOutcome, WalletCorePort, WalletError,
};

#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct FfiResult {
    success: bool,
    message: *const c_char,
}

mod sys {
    use std::ffi::c_char;

    use super::FfiResult;

    #[link(name = "thirdweb")]
    extern "C" {
        pub fn create_private_key_wallet(private_key: *const c_char) -> FfiResult;
        pub fn generate_private_key_wallet() -> FfiResult;
        pub fn private_key_wallet_export(handle_id: usize) -> FfiResult;

        pub fn create_in_app_wallet(
            client_id: *const c_char,
            bundle_id: *const c_char,
            secret_key: *const c_char,
            email: *const c_char,
            phone: *const c_char,
            storage_directory_path: *const c_char,
            auth_provider: *const c_char,
        ) -> FfiResult;
        pub fn in_app_wallet_send_otp_email(handle_id: usize) -> FfiResult;
        pub fn in_app_wallet_sign_in_with_otp_email(handle_id: usize, otp: *const c_char) -> FfiResult;
        pub fn in_app_wallet_send_otp_phone(handle_id: usize) -> FfiResult;
        pub fn in_app_wallet_sign_in_with_otp_phone(handle_id: usize, otp: *const c_char) -> FfiResult;
        pub fn in_app_wallet_fetch_oauth_login_link(
            handle_id: usize,
            redirect_url: *const c_char,
        ) -> FfiResult;
        pub fn in_app_wallet_sign_in_with_oauth(
            handle_id: usize,
            auth_result: *const c_char,
        ) -> FfiResult;
        pub fn in_app_wallet_sign_in_with_jwt(
            handle_id: usize,
            jwt: *const c_char,
            encryption_key: *const c_char,
        ) -> FfiResult;
        pub fn in_app_wallet_sign_in_with_auth_endpoint(
            handle_id: usize,
            payload: *const c_char,
            encryption_key: *const c_char,
        ) -> FfiResult;
        pub fn in_app_wallet_sign_in_with_guest(
            handle_id: usize,
            session_id: *const c_char,
        ) -> FfiResult;
        pub fn in_app_wallet_sign_in_with_siwe(
            handle_id: isize,
            payload: *const c_char,
            signature: *const c_char,
        ) -> FfiResult;

        pub fn create_ecosystem_wallet(
            ecosystem_id: *const c_char,
            ecosystem_partner_id: *const c_char,
            client_id: *const c_char,
            bundle_id: *const c_char,
            secret_key: *const c_char,
            email: *const c_char,
            phone: *const c_char,
            storage_directory_path: *const c_char,
            auth_provider: *const c_char,
        ) -> FfiResult;
        pub fn ecosystem_wallet_send_otp_email(handle_id: usize) -> FfiResult;
        pub fn ecosystem_wallet_sign_in_with_otp_email(
            handle_id: usize,
            otp: *const c_char,
        ) -> FfiResult;
        pub fn ecosystem_wallet_send_otp_phone(handle_id: usize) -> FfiResult;
        pub fn ecosystem_wallet_sign_in_with_otp_phone(
            handle_id: usize,
            otp: *const c_char,
        ) -> FfiResult;
        pub fn ecosystem_wallet_fetch_oauth_login_link(
            handle_id: usize,
            redirect_url: *const c_char,
        ) -> FfiResult;
        pub fn ecosystem_wallet_sign_in_with_oauth(
            handle_id: usize,
            auth_result: *const c_char,
        ) -> FfiResult;
        pub fn ecosystem_wallet_sign_in_with_jwt(handle_id: usize, jwt: *const c_char) -> FfiResult;
        pub fn ecosystem_wallet_sign_in_with_auth_endpoint(
            handle_id: usize,
            payload: *const c_char,
        ) -> FfiResult;
        pub fn ecosystem_wallet_sign_in_with_guest(
            handle_id: usize,
            session_id: *const c_char,
        ) -> FfiResult;
        pub fn ecosystem_wallet_sign_in_with_siwe(
            handle_id: isize,
            payload: *const c_char,
            signature: *const c_char,
        ) -> FfiResult;
        pub fn ecosystem_wallet_link_account(
            handle_id: usize,
            wallet_to_link_handle_id: usize,
            otp: *const c_char,
            oauth_result: *const c_char,
            jwt: *const c_char,
            payload: *const c_char,
            session_id: *const c_char,
            siwe_payload: *const c_char,
            siwe_signature: *const c_char,
        ) -> FfiResult;
        pub fn ecosystem_wallet_get_linked_accounts(handle_id: usize) -> FfiResult;

        pub fn create_smart_wallet(
            client_id: *const c_char,
            bundle_id: *const c_char,
            secret_key: *const c_char,
            personal_wallet_handle_id: usize,
            chain_id: *const c_char,
            gasless: bool,
            factory: *const c_char,
            account_override: *const c_char,
        ) -> FfiResult;
        pub fn smart_wallet_is_deployed(handle_id: usize) -> FfiResult;
        pub fn smart_wallet_get_all_admins(handle_id: usize) -> FfiResult;
        pub fn smart_wallet_get_all_active_signers(handle_id: usize) -> FfiResult;
        pub fn smart_wallet_create_session_key(
            handle_id: usize,
            signer_address: *const c_char,
            approved_targets: *const *const c_char,
            approved_targets_count: usize,
            native_token_limit_per_transaction_in_wei: *const c_char,
            permission_start_timestamp: u64,
            permission_end_timestamp: u64,
            req_validity_start_timestamp: u64,
            req_validity_end_timestamp: u64,
        ) -> FfiResult;
        pub fn smart_wallet_revoke_session_key(
            handle_id: usize,
            signer_address: *const c_char,
        ) -> FfiResult;
        pub fn smart_wallet_add_admin(handle_id: usize, signer_address: *const c_char) -> FfiResult;
        pub fn smart_wallet_remove_admin(
            handle_id: usize,
            signer_address: *const c_char,
        ) -> FfiResult;

        pub fn get_wallet_address(handle_id: usize) -> FfiResult;
        pub fn sign_message(handle_id: usize, message: *const c_char) -> FfiResult;
        pub fn is_connected(handle_id: usize) -> FfiResult;
        pub fn disconnect(handle_id: usize) -> FfiResult;

        pub fn free_wallet(handle_id: usize);
        pub fn free_ffi_result(result: FfiResult);
    }
}

/// Releases the library-owned message when dropped.
struct OwnedResult(FfiResult);

impl OwnedResult {
    fn outcome(&self) -> RawOutcome {
        let message = if self.0.message.is_null() {
            String::new()
        } else {
            // SAFETY: non-null messages are NUL-terminated and live until free_ffi_result.
            unsafe { CStr::from_ptr(self.0.message) }
                .to_string_lossy()
                .into_owned()
        };
        RawOutcome {
            success: self.0.success,
            message,
        }
    }
}

impl Drop for OwnedResult {
    fn drop(&mut self) {
        // SAFETY: each result is wrapped once, so it is released once.
        unsafe { sys::free_ffi_result(self.0) }
    }
}

/// Argument string kept alive for the duration of one foreign call.
struct Arg(Option<CString>);

impl Arg {
    fn new(value: &str) -> Result<Self, WalletError> {
        if value.is_empty() {
            return Ok(Self(None));
        }
        CString::new(value)
            .map(|s| Self(Some(s)))
            .map_err(|_| WalletError::Validation("argument contains an interior NUL byte".to_owned()))
    }

    fn ptr(&self) -> *const c_char {
        self.0.as_ref().map_or(ptr::null(), |s| s.as_ptr())
    }
}

fn id(handle: HandleId) -> usize {
    handle.0 as usize
}

/// Wallet core backed by the linked native library.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCore;

impl WalletCorePort for NativeCore {
    fn call(&self, call: &CoreCall) -> Result<RawOutcome, WalletError> {
        let result = OwnedResult(call_native(call)?);
        Ok(result.outcome())
    }

    fn free_wallet(&self, handle: HandleId) {
        // SAFETY: the library ignores ids it does not own.
        unsafe { sys::free_wallet(id(handle)) }
    }
}

fn call_native(call: &CoreCall) -> Result<FfiResult, WalletError> {
    use AuthFamily::{Ecosystem, InApp};
    use OtpChannel::{Email, Phone};

    // SAFETY (all arms): every pointer comes from an `Arg` or vector that outlives the call.
    let result = match call {
        CoreCall::CreatePrivateKeyWallet { private_key } => {
            let key = Arg::new(private_key)?;
            unsafe { sys::create_private_key_wallet(key.ptr()) }
        }
        CoreCall::GeneratePrivateKeyWallet => unsafe { sys::generate_private_key_wallet() },
        CoreCall::ExportPrivateKey { handle } => unsafe {
            sys::private_key_wallet_export(id(*handle))
        },
        CoreCall::CreateInAppWallet(args) => {
            let client_id = Arg::new(&args.client_id)?;
            let bundle_id = Arg::new(&args.bundle_id)?;
            let secret_key = Arg::new(&args.secret_key)?;
            let email = Arg::new(&args.email)?;
            let phone = Arg::new(&args.phone)?;
            let storage = Arg::new(&args.storage_directory)?;
            let provider = Arg::new(&args.auth_provider)?;
            unsafe {
                sys::create_in_app_wallet(
                    client_id.ptr(),
                    bundle_id.ptr(),
                    secret_key.ptr(),
                    email.ptr(),
                    phone.ptr(),
                    storage.ptr(),
                    provider.ptr(),
                )
            }
        }
        CoreCall::CreateEcosystemWallet {
            ecosystem_id,
            partner_id,
            args,
        } => {
            let ecosystem_id = Arg::new(ecosystem_id)?;
            let partner_id = Arg::new(partner_id)?;
            let client_id = Arg::new(&args.client_id)?;
            let bundle_id = Arg::new(&args.bundle_id)?;
            let secret_key = Arg::new(&args.secret_key)?;
            let email = Arg::new(&args.email)?;
            let phone = Arg::new(&args.phone)?;
            let storage = Arg::new(&args.storage_directory)?;
            let provider = Arg::new(&args.auth_provider)?;
            unsafe {
                sys::create_ecosystem_wallet(
                    ecosystem_id.ptr(),
                    partner_id.ptr(),
                    client_id.ptr(),
                    bundle_id.ptr(),
                    secret_key.ptr(),
                    email.ptr(),
                    phone.ptr(),
                    storage.ptr(),
                    provider.ptr(),
                )
            }
        }
        CoreCall::SendOtp {
            family,
            channel,
            handle,
        } => {
            let handle = id(*handle);
            unsafe {
                match (family, channel) {
                    (InApp, Email) => sys::in_app_wallet_send_otp_email(handle),
                    (InApp, Phone) => sys::in_app_wallet_send_otp_phone(handle),
                    (Ecosystem, Email) => sys::ecosystem_wallet_send_otp_email(handle),
                    (Ecosystem, Phone) => sys::ecosystem_wallet_send_otp_phone(handle),
                }
            }
        }
        CoreCall::SignInWithOtp {
            family,
            channel,
            handle,
            otp,
        } => {
            let handle = id(*handle);
            let otp = Arg::new(otp)?;
            unsafe {
                match (family, channel) {
                    (InApp, Email) => sys::in_app_wallet_sign_in_with_otp_email(handle, otp.ptr()),
                    (InApp, Phone) => sys::in_app_wallet_sign_in_with_otp_phone(handle, otp.ptr()),
                    (Ecosystem, Email) => {
                        sys::ecosystem_wallet_sign_in_with_otp_email(handle, otp.ptr())
                    }
                    (Ecosystem, Phone) => {
                        sys::ecosystem_wallet_sign_in_with_otp_phone(handle, otp.ptr())
                    }
                }
            }
        }
        CoreCall::FetchOAuthLoginLink {
            family,
            handle,
            redirect_url,
        } => {
            let redirect_url = Arg::new(redirect_url)?;
            unsafe {
                match family {
                    InApp => sys::in_app_wallet_fetch_oauth_login_link(id(*handle), redirect_url.ptr()),
                    Ecosystem => {
                        sys::ecosystem_wallet_fetch_oauth_login_link(id(*handle), redirect_url.ptr())
                    }
                }
            }
        }
        CoreCall::SignInWithOAuth {
            family,
            handle,
            auth_result,
        } => {
            let auth_result = Arg::new(auth_result)?;
            unsafe {
                match family {
                    InApp => sys::in_app_wallet_sign_in_with_oauth(id(*handle), auth_result.ptr()),
                    Ecosystem => {
                        sys::ecosystem_wallet_sign_in_with_oauth(id(*handle), auth_result.ptr())
                    }
                }
            }
        }
        CoreCall::SignInWithJwt {
            family,
            handle,
            jwt,
            encryption_key,
        } => {
            let jwt = Arg::new(jwt)?;
            let key = Arg::new(encryption_key.as_deref().unwrap_or_default())?;
            unsafe {
                match family {
                    InApp => sys::in_app_wallet_sign_in_with_jwt(id(*handle), jwt.ptr(), key.ptr()),
                    Ecosystem => sys::ecosystem_wallet_sign_in_with_jwt(id(*handle), jwt.ptr()),
                }
            }
        }
        CoreCall::SignInWithAuthEndpoint {
            family,
            handle,
            payload,
            encryption_key,
        } => {
            let payload = Arg::new(payload)?;
            let key = Arg::new(encryption_key.as_deref().unwrap_or_default())?;
            unsafe {
                match family {
                    InApp => sys::in_app_wallet_sign_in_with_auth_endpoint(
                        id(*handle),
                        payload.ptr(),
                        key.ptr(),
                    ),
                    Ecosystem => {
                        sys::ecosystem_wallet_sign_in_with_auth_endpoint(id(*handle), payload.ptr())
                    }
                }
            }
        }
        CoreCall::SignInWithGuest {
            family,
            handle,
            session_id,
        } => {
            let session_id = Arg::new(session_id)?;
            unsafe {
                match family {
                    InApp => sys::in_app_wallet_sign_in_with_guest(id(*handle), session_id.ptr()),
                    Ecosystem => {
                        sys::ecosystem_wallet_sign_in_with_guest(id(*handle), session_id.ptr())
                    }
                }
            }
        }
        CoreCall::SignInWithSiwe {
            family,
            handle,
            payload,
            signature,
        } => {
            // The SIWE entry points take a signed handle id.
            let handle = handle.0 as isize;
            let payload = Arg::new(payload)?;
            let signature = Arg::new(signature)?;
            unsafe {
                match family {
                    InApp => {
                        sys::in_app_wallet_sign_in_with_siwe(handle, payload.ptr(), signature.ptr())
                    }
                    Ecosystem => sys::ecosystem_wallet_sign_in_with_siwe(
                        handle,
                        payload.ptr(),
                        signature.ptr(),
                    ),
                }
            }
        }
        CoreCall::LinkAccount {
            handle,
            wallet_to_link,
            args,
        } => {
            let otp = Arg::new(&args.otp)?;
            let oauth_result = Arg::new(&args.oauth_result)?;
            let jwt = Arg::new(&args.jwt)?;
            let payload = Arg::new(&args.payload)?;
            let session_id = Arg::new(&args.session_id)?;
            let siwe_payload = Arg::new(&args.siwe_payload)?;
            let siwe_signature = Arg::new(&args.siwe_signature)?;
            unsafe {
                sys::ecosystem_wallet_link_account(
                    id(*handle),
                    id(*wallet_to_link),
                    otp.ptr(),
                    oauth_result.ptr(),
                    jwt.ptr(),
                    payload.ptr(),
                    session_id.ptr(),
                    siwe_payload.ptr(),
                    siwe_signature.ptr(),
                )
            }
        }
        CoreCall::GetLinkedAccounts { handle } => unsafe {
            sys::ecosystem_wallet_get_linked_accounts(id(*handle))
        },
        CoreCall::CreateSmartWallet(args) => {
            let client_id = Arg::new(&args.client_id)?;
            let bundle_id = Arg::new(&args.bundle_id)?;
            let secret_key = Arg::new(&args.secret_key)?;
            let chain_id = Arg::new(&args.chain_id.to_string())?;
            let factory = Arg::new(&args.factory)?;
            let account_override = Arg::new(&args.account_override)?;
            unsafe {
                sys::create_smart_wallet(
                    client_id.ptr(),
                    bundle_id.ptr(),
                    secret_key.ptr(),
                    id(args.personal_wallet),
                    chain_id.ptr(),
                    args.gasless,
                    factory.ptr(),
                    account_override.ptr(),
                )
            }
        }
        CoreCall::SmartIsDeployed { handle } => unsafe {
            sys::smart_wallet_is_deployed(id(*handle))
        },
        CoreCall::SmartGetAllAdmins { handle } => unsafe {
            sys::smart_wallet_get_all_admins(id(*handle))
        },
        CoreCall::SmartGetAllActiveSigners { handle } => unsafe {
            sys::smart_wallet_get_all_active_signers(id(*handle))
        },
        CoreCall::SmartCreateSessionKey { handle, request } => {
            let signer = Arg::new(&request.signer.to_string())?;
            let targets = request
                .approved_targets
                .iter()
                .map(|target| Arg::new(&target.to_string()))
                .collect::<Result<Vec<_>, _>>()?;
            let target_ptrs: Vec<*const c_char> = targets.iter().map(Arg::ptr).collect();
            let targets_ptr = if target_ptrs.is_empty() {
                ptr::null()
            } else {
                target_ptrs.as_ptr()
            };
            let limit = Arg::new(&request.native_token_limit_per_transaction_in_wei)?;
            unsafe {
                sys::smart_wallet_create_session_key(
                    id(*handle),
                    signer.ptr(),
                    targets_ptr,
                    target_ptrs.len(),
                    limit.ptr(),
                    request.permission_start,
                    request.permission_end,
                    request.request_validity_start,
                    request.request_validity_end,
                )
            }
        }
        CoreCall::SmartRevokeSessionKey { handle, signer } => {
            let signer = Arg::new(&signer.to_string())?;
            unsafe { sys::smart_wallet_revoke_session_key(id(*handle), signer.ptr()) }
        }
        CoreCall::SmartAddAdmin { handle, signer } => {
            let signer = Arg::new(&signer.to_string())?;
            unsafe { sys::smart_wallet_add_admin(id(*handle), signer.ptr()) }
        }
        CoreCall::SmartRemoveAdmin { handle, signer } => {
            let signer = Arg::new(&signer.to_string())?;
            unsafe { sys::smart_wallet_remove_admin(id(*handle), signer.ptr()) }
        }
        CoreCall::GetWalletAddress { handle } => unsafe { sys::get_wallet_address(id(*handle)) },
        CoreCall::SignMessage { handle, message } => {
            let message = Arg::new(message)?;
            unsafe { sys::sign_message(id(*handle), message.ptr()) }
        }
        CoreCall::IsConnected { handle } => unsafe { sys::is_connected(id(*handle)) },
        CoreCall::Disconnect { handle } => unsafe { sys::disconnect(id(*handle)) },
    };
    Ok(result)
}
