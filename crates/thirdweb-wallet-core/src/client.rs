use std::sync::{Arc, Mutex};

use alloy::primitives::Address;
use tracing::{info, warn};

use crate::dispatch::{Continuations, DispatchHandle, MainThreadDispatcher, TaskLauncher};
use crate::domain::{AuthInput, InAppSource, WalletHandle};
use crate::engine::WalletEngine;
use crate::oauth::{LoopbackKind, OAuthSession};
use crate::ports::{
    AnalyticsPort, BrowserPort, CallbackServerPort, DeviceIdPort, WalletCorePort, WalletError,
};
use crate::smart::SmartWalletOptions;

struct PendingLogin {
    session: OAuthSession,
    continuations: Continuations<WalletHandle>,
}

/// Primary-thread front end.
///
/// Every operation takes a success and a failure continuation, runs the
/// blocking part on the launcher's pool, and delivers exactly one of the two
/// continuations on the primary thread during [`WalletClient::tick`].
pub struct WalletClient<C, A, D>
where
    C: WalletCorePort + 'static,
    A: AnalyticsPort + 'static,
    D: DeviceIdPort + 'static,
{
    engine: Arc<WalletEngine<C, A, D>>,
    launcher: TaskLauncher,
    dispatcher: MainThreadDispatcher,
    server: Arc<dyn CallbackServerPort>,
    browser: Arc<dyn BrowserPort>,
    logins: Arc<Mutex<Vec<PendingLogin>>>,
}

impl<C, A, D> WalletClient<C, A, D>
where
    C: WalletCorePort + 'static,
    A: AnalyticsPort + 'static,
    D: DeviceIdPort + 'static,
{
    /// Must be called on the primary thread; that thread becomes the continuation target.
    pub fn new(
        engine: WalletEngine<C, A, D>,
        launcher: TaskLauncher,
        server: Arc<dyn CallbackServerPort>,
        browser: Arc<dyn BrowserPort>,
    ) -> Self {
        Self {
            engine: Arc::new(engine),
            launcher,
            dispatcher: MainThreadDispatcher::new(),
            server,
            browser,
            logins: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn engine(&self) -> &Arc<WalletEngine<C, A, D>> {
        &self.engine
    }

    pub fn dispatch_handle(&self) -> DispatchHandle {
        self.dispatcher.handle()
    }

    /// Runs `job` against the engine in the background.
    pub fn spawn<T, F>(
        &self,
        job: F,
        on_success: impl FnOnce(T) + Send + 'static,
        on_error: impl FnOnce(WalletError) + Send + 'static,
    ) where
        T: Send + 'static,
        F: FnOnce(&WalletEngine<C, A, D>) -> Result<T, WalletError> + Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        self.launcher.launch(
            &self.dispatcher.handle(),
            move || job(&engine),
            Continuations::new(on_success, on_error),
        );
    }

    fn reject<T: Send + 'static>(
        &self,
        error: WalletError,
        on_success: impl FnOnce(T) + Send + 'static,
        on_error: impl FnOnce(WalletError) + Send + 'static,
    ) {
        Continuations::new(on_success, on_error).deliver(&self.dispatcher.handle(), Err(error));
    }

    pub fn create_in_app_wallet(
        &self,
        source: InAppSource,
        login: String,
        on_success: impl FnOnce(WalletHandle) + Send + 'static,
        on_error: impl FnOnce(WalletError) + Send + 'static,
    ) {
        self.spawn(
            move |engine| engine.create_in_app_wallet(source, &login),
            on_success,
            on_error,
        );
    }

    pub fn create_ecosystem_wallet(
        &self,
        partner_id: String,
        source: InAppSource,
        login: String,
        on_success: impl FnOnce(WalletHandle) + Send + 'static,
        on_error: impl FnOnce(WalletError) + Send + 'static,
    ) {
        if !self.engine.config.is_ecosystem() {
            return self.reject(WalletError::EcosystemNotConfigured, on_success, on_error);
        }
        self.spawn(
            move |engine| engine.create_ecosystem_wallet(&partner_id, source, &login),
            on_success,
            on_error,
        );
    }

    pub fn create_custom_auth_wallet(
        &self,
        source: InAppSource,
        on_success: impl FnOnce(WalletHandle) + Send + 'static,
        on_error: impl FnOnce(WalletError) + Send + 'static,
    ) {
        if !matches!(
            source,
            InAppSource::Jwt | InAppSource::AuthEndpoint | InAppSource::Guest
        ) {
            return self.reject(WalletError::InvalidCustomAuthSource, on_success, on_error);
        }
        self.spawn(
            move |engine| engine.create_custom_auth_wallet(source),
            on_success,
            on_error,
        );
    }

    pub fn create_private_key_wallet(
        &self,
        private_key: String,
        on_success: impl FnOnce(WalletHandle) + Send + 'static,
        on_error: impl FnOnce(WalletError) + Send + 'static,
    ) {
        self.spawn(
            move |engine| engine.create_private_key_wallet(&private_key),
            on_success,
            on_error,
        );
    }

    pub fn generate_private_key_wallet(
        &self,
        on_success: impl FnOnce(WalletHandle) + Send + 'static,
        on_error: impl FnOnce(WalletError) + Send + 'static,
    ) {
        self.spawn(
            |engine| engine.generate_private_key_wallet(),
            on_success,
            on_error,
        );
    }

    /// Delivers the zero address when the lookup fails; see [`WalletClient::try_to_address`].
    pub fn to_address(
        &self,
        handle: WalletHandle,
        on_success: impl FnOnce(Address) + Send + 'static,
        on_error: impl FnOnce(WalletError) + Send + 'static,
    ) {
        self.spawn(
            move |engine| Ok(engine.to_address(&handle)),
            on_success,
            on_error,
        );
    }

    pub fn try_to_address(
        &self,
        handle: WalletHandle,
        on_success: impl FnOnce(Address) + Send + 'static,
        on_error: impl FnOnce(WalletError) + Send + 'static,
    ) {
        if let Err(e) = WalletEngine::<C, A, D>::require_valid(&handle) {
            return self.reject(e, on_success, on_error);
        }
        self.spawn(
            move |engine| engine.try_to_address(&handle),
            on_success,
            on_error,
        );
    }

    /// The success continuation receives the invalidated handle.
    pub fn disconnect(
        &self,
        handle: WalletHandle,
        on_success: impl FnOnce(WalletHandle) + Send + 'static,
        on_error: impl FnOnce(WalletError) + Send + 'static,
    ) {
        if let Err(e) = WalletEngine::<C, A, D>::require_valid(&handle) {
            return self.reject(e, on_success, on_error);
        }
        self.spawn(
            move |engine| {
                let mut handle = handle;
                engine.disconnect(&mut handle)?;
                Ok(handle)
            },
            on_success,
            on_error,
        );
    }

    /// Releases the core-side resources in the background. Never fails.
    pub fn free(
        &self,
        handle: WalletHandle,
        on_success: impl FnOnce(()) + Send + 'static,
        on_error: impl FnOnce(WalletError) + Send + 'static,
    ) {
        self.spawn(
            move |engine| {
                let mut handle = handle;
                engine.free(&mut handle);
                Ok(())
            },
            on_success,
            on_error,
        );
    }

    /// Validates and picks the sign-in call on this thread; only the core call runs in the background.
    pub fn sign_in(
        &self,
        handle: WalletHandle,
        input: AuthInput,
        on_success: impl FnOnce(()) + Send + 'static,
        on_error: impl FnOnce(WalletError) + Send + 'static,
    ) {
        match self.engine.prepare_sign_in(&handle, &input) {
            Ok(call) => self.spawn(
                move |engine| engine.run_sign_in(&handle, &call),
                on_success,
                on_error,
            ),
            Err(e) => self.reject(e, on_success, on_error),
        }
    }

    pub fn send_otp(
        &self,
        handle: WalletHandle,
        on_success: impl FnOnce(()) + Send + 'static,
        on_error: impl FnOnce(WalletError) + Send + 'static,
    ) {
        self.spawn(move |engine| engine.send_otp(&handle), on_success, on_error);
    }

    pub fn create_smart_wallet(
        &self,
        personal: WalletHandle,
        options: SmartWalletOptions,
        on_success: impl FnOnce(WalletHandle) + Send + 'static,
        on_error: impl FnOnce(WalletError) + Send + 'static,
    ) {
        if !matches!(&personal, WalletHandle::InApp(w) if w.is_valid()) {
            return self.reject(WalletError::InvalidPersonalWallet, on_success, on_error);
        }
        self.spawn(
            move |engine| engine.create_smart_wallet(&personal, &options),
            on_success,
            on_error,
        );
    }

    /// Smart-wallet operation with the kind check done before anything is scheduled.
    pub fn smart<T, F>(
        &self,
        handle: WalletHandle,
        job: F,
        on_success: impl FnOnce(T) + Send + 'static,
        on_error: impl FnOnce(WalletError) + Send + 'static,
    ) where
        T: Send + 'static,
        F: FnOnce(&WalletEngine<C, A, D>, &WalletHandle) -> Result<T, WalletError>
            + Send
            + 'static,
    {
        if let Err(e) = WalletEngine::<C, A, D>::require_smart(&handle) {
            return self.reject(e, on_success, on_error);
        }
        self.spawn(move |engine| job(engine, &handle), on_success, on_error);
    }

    /// Starts a browser login for an OAuth or SIWE wallet.
    ///
    /// The success continuation receives the signed-in handle.
    pub fn login_with_browser(
        &self,
        wallet: WalletHandle,
        kind: LoopbackKind,
        on_success: impl FnOnce(WalletHandle) + Send + 'static,
        on_error: impl FnOnce(WalletError) + Send + 'static,
    ) {
        let engine = Arc::clone(&self.engine);
        let server = Arc::clone(&self.server);
        let browser = Arc::clone(&self.browser);
        let logins = Arc::clone(&self.logins);
        let dispatch = self.dispatcher.handle();
        let continuations = Continuations::new(on_success, on_error);
        self.launcher.run(move || {
            let session =
                match OAuthSession::start(&*engine, server.as_ref(), browser.as_ref(), wallet, kind) {
                    Ok(session) => session,
                    Err(e) => return continuations.deliver(&dispatch, Err(e)),
                };
            match logins.lock() {
                Ok(mut pending) => {
                    info!(login_url = session.login_url(), "waiting for browser redirect");
                    pending.push(PendingLogin {
                        session,
                        continuations,
                    });
                }
                Err(e) => continuations.deliver(
                    &dispatch,
                    Err(WalletError::Transport(format!(
                        "login queue lock poisoned: {e}"
                    ))),
                ),
            }
        });
    }

    /// Polls pending logins and runs queued continuations. Call once per frame on the primary thread.
    pub fn tick(&mut self) -> usize {
        let resolved = match self.logins.lock() {
            Ok(mut pending) => {
                let mut resolved = Vec::new();
                let mut index = 0;
                while index < pending.len() {
                    match pending[index].session.poll() {
                        Some(outcome) => resolved.push((pending.swap_remove(index), outcome)),
                        None => index += 1,
                    }
                }
                resolved
            }
            Err(e) => {
                warn!(error = %e, "login queue lock poisoned");
                Vec::new()
            }
        };
        let dispatch = self.dispatcher.handle();
        for (login, outcome) in resolved {
            let PendingLogin {
                mut session,
                continuations,
            } = login;
            match outcome {
                Ok(input) => {
                    let engine = Arc::clone(&self.engine);
                    self.launcher.launch(
                        &dispatch,
                        move || {
                            session.complete(&*engine, &input)?;
                            Ok(session.wallet().clone())
                        },
                        continuations,
                    );
                }
                Err(e) => continuations.deliver(&dispatch, Err(e)),
            }
        }
        self.dispatcher.pump()
    }

    pub fn pending_logins(&self) -> usize {
        self.logins.lock().map(|p| p.len()).unwrap_or_default()
    }
}
