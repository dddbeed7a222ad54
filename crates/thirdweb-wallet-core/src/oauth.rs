//! Browser-assisted login over a loopback redirect.
//!
//! A session fetches (or builds) the login URL, binds a local listener on the
//! configured port, opens the system browser and then waits until the browser
//! is redirected back to `/callback`. The listener thread only records the
//! redirect in a [`CallbackSignal`]; signing in with the captured payload
//! happens afterwards on the caller's side.

use std::sync::{Arc, Condvar, Mutex};

use tracing::{debug, info, warn};
use url::Url;

use crate::domain::{AuthInput, InAppSource, WalletHandle};
use crate::engine::WalletEngine;
use crate::ports::{
    AnalyticsPort, BrowserPort, CallbackListener, CallbackServerPort, DeviceIdPort,
    WalletCorePort, WalletError,
};
use crate::state_machine::{login_transition, LoginAction, LoginState, StateTransition};

pub const CALLBACK_PATH: &str = "/callback";
pub const SIWE_LOGIN_URL: &str = "https://static.thirdweb.com/auth/siwe";
pub const AUTH_COMPLETE_URL: &str = "https://static.thirdweb.com/auth/complete";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopbackKind {
    OAuth,
    Siwe,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackPayload {
    OAuth(String),
    Siwe { payload: String, signature: String },
}

impl From<CallbackPayload> for AuthInput {
    fn from(payload: CallbackPayload) -> Self {
        match payload {
            CallbackPayload::OAuth(result) => AuthInput::OAuth(result),
            CallbackPayload::Siwe { payload, signature } => AuthInput::Siwe { payload, signature },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl CallbackResponse {
    fn success() -> Self {
        Self {
            status: 200,
            content_type: "text/html",
            body: format!("<script>window.location.replace('{AUTH_COMPLETE_URL}')</script>"),
        }
    }

    fn error(message: String) -> Self {
        Self {
            status: 200,
            content_type: "text/plain",
            body: message,
        }
    }

    fn not_found() -> Self {
        Self {
            status: 404,
            content_type: "text/plain",
            body: "Not Found".to_owned(),
        }
    }
}

type CallbackOutcome = Result<CallbackPayload, WalletError>;

/// Completion flag shared by the listener thread and the session.
///
/// The first completed redirect wins; later ones are answered but not recorded.
pub struct CallbackSignal {
    kind: LoopbackKind,
    outcome: Mutex<Option<CallbackOutcome>>,
    ready: Condvar,
}

impl CallbackSignal {
    pub fn new(kind: LoopbackKind) -> Self {
        Self {
            kind,
            outcome: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    pub fn kind(&self) -> LoopbackKind {
        self.kind
    }

    /// Answers one request arriving at the loopback listener. `target` is the request path with query.
    pub fn handle_request(&self, method: &str, target: &str) -> CallbackResponse {
        let url = match Url::parse(&format!("http://localhost{target}")) {
            Ok(url) => url,
            Err(_) => return CallbackResponse::not_found(),
        };
        if !method.eq_ignore_ascii_case("GET") || url.path() != CALLBACK_PATH {
            return CallbackResponse::not_found();
        }
        let query = |name: &str| {
            url.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
                .filter(|value| !value.is_empty())
        };
        let outcome = match self.kind {
            LoopbackKind::OAuth => query("authResult")
                .map(CallbackPayload::OAuth)
                .ok_or(WalletError::MissingCallbackParameter("AuthResult")),
            LoopbackKind::Siwe => match (query("signature"), query("payload")) {
                (Some(signature), Some(payload)) => Ok(CallbackPayload::Siwe {
                    payload: urlencoding::decode(&payload)
                        .map(|p| p.into_owned())
                        .unwrap_or(payload),
                    signature,
                }),
                _ => Err(WalletError::MissingCallbackParameter("Signature/Payload")),
            },
        };
        let response = match &outcome {
            Ok(_) => CallbackResponse::success(),
            Err(e) => CallbackResponse::error(e.to_string()),
        };
        if let Err(e) = self.complete(outcome) {
            warn!(error = %e, "failed to record loopback callback");
        }
        response
    }

    /// Records `outcome` unless an earlier one was recorded. Returns whether it was kept.
    pub fn complete(&self, outcome: CallbackOutcome) -> Result<bool, WalletError> {
        let mut slot = self
            .outcome
            .lock()
            .map_err(|e| WalletError::Transport(format!("callback lock poisoned: {e}")))?;
        if slot.is_some() {
            debug!("loopback callback already completed, ignoring");
            return Ok(false);
        }
        *slot = Some(outcome);
        self.ready.notify_all();
        Ok(true)
    }

    pub fn is_complete(&self) -> bool {
        self.outcome.lock().map(|slot| slot.is_some()).unwrap_or(true)
    }

    fn peek(&self) -> Result<Option<CallbackOutcome>, WalletError> {
        let slot = self
            .outcome
            .lock()
            .map_err(|e| WalletError::Transport(format!("callback lock poisoned: {e}")))?;
        Ok(slot.clone())
    }

    /// Blocks until a redirect is recorded.
    pub fn wait(&self) -> CallbackOutcome {
        let mut slot = self
            .outcome
            .lock()
            .map_err(|e| WalletError::Transport(format!("callback lock poisoned: {e}")))?;
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            slot = self
                .ready
                .wait(slot)
                .map_err(|e| WalletError::Transport(format!("callback lock poisoned: {e}")))?;
        }
    }
}

/// One in-flight browser login for a pending wallet.
pub struct OAuthSession {
    wallet: WalletHandle,
    kind: LoopbackKind,
    login_url: String,
    port: u16,
    state: LoginState,
    signal: Arc<CallbackSignal>,
    listener: Option<Box<dyn CallbackListener>>,
    transitions: Vec<StateTransition>,
}

impl OAuthSession {
    /// Fetches the login URL, binds the listener and opens the browser.
    pub fn start<C, A, D>(
        engine: &WalletEngine<C, A, D>,
        server: &dyn CallbackServerPort,
        browser: &dyn BrowserPort,
        wallet: WalletHandle,
        kind: LoopbackKind,
    ) -> Result<Self, WalletError>
    where
        C: WalletCorePort,
        A: AnalyticsPort,
        D: DeviceIdPort,
    {
        let port = engine.config.oauth_redirect_port;
        let redirect_url = engine.config.redirect_url();
        let mut session = Self {
            wallet,
            kind,
            login_url: String::new(),
            port,
            state: LoginState::Idle,
            signal: Arc::new(CallbackSignal::new(kind)),
            listener: None,
            transitions: Vec::new(),
        };

        let login_url = match kind {
            LoopbackKind::OAuth => engine.fetch_oauth_login_link(&session.wallet, &redirect_url),
            LoopbackKind::Siwe => siwe_login_url(&session.wallet, &redirect_url),
        };
        session.login_url = match login_url {
            Ok(url) => url,
            Err(e) => return Err(session.fail(e)),
        };
        session.advance(LoginAction::LinkFetched)?;

        match server.listen(port, Arc::clone(&session.signal)) {
            Ok(listener) => session.listener = Some(listener),
            Err(e) => return Err(session.fail(e)),
        }
        session.advance(LoginAction::ListenerBound)?;
        info!(port, kind = ?kind, "loopback listener ready");

        if let Err(e) = browser.open_url(&session.login_url) {
            session.teardown();
            return Err(session.fail(e));
        }
        Ok(session)
    }

    pub fn state(&self) -> LoginState {
        self.state
    }

    pub fn wallet(&self) -> &WalletHandle {
        &self.wallet
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn signal(&self) -> Arc<CallbackSignal> {
        Arc::clone(&self.signal)
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Non-blocking check, meant to be called once per tick.
    pub fn poll(&mut self) -> Option<Result<AuthInput, WalletError>> {
        if self.state != LoginState::Listening {
            return None;
        }
        match self.signal.peek() {
            Ok(Some(outcome)) => Some(self.resolve(outcome)),
            Ok(None) => None,
            Err(e) => Some(self.resolve(Err(e))),
        }
    }

    /// Blocks until the redirect arrives. Never call this on the primary thread.
    pub fn wait(&mut self) -> Result<AuthInput, WalletError> {
        if self.state != LoginState::Listening {
            return Err(WalletError::IllegalTransition(format!(
                "{:?} is not waiting for a callback",
                self.state
            )));
        }
        let outcome = self.signal.wait();
        self.resolve(outcome)
    }

    /// Signs the pending wallet in with the captured redirect payload.
    pub fn complete<C, A, D>(
        &mut self,
        engine: &WalletEngine<C, A, D>,
        input: &AuthInput,
    ) -> Result<(), WalletError>
    where
        C: WalletCorePort,
        A: AnalyticsPort,
        D: DeviceIdPort,
    {
        match engine.sign_in(&self.wallet, input) {
            Ok(()) => {
                self.advance(LoginAction::SignInFinished)?;
                info!(wallet = %self.wallet.display_name(), "browser login finished");
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn resolve(&mut self, outcome: CallbackOutcome) -> Result<AuthInput, WalletError> {
        self.advance(LoginAction::CallbackArrived)?;
        self.teardown();
        match outcome {
            Ok(payload) => {
                self.advance(LoginAction::BeginSignIn)?;
                Ok(payload.into())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn advance(&mut self, action: LoginAction) -> Result<(), WalletError> {
        let (next, transition) = login_transition(self.state, action)?;
        debug!(from = ?transition.from, to = ?transition.to, reason = transition.reason, "login transition");
        self.state = next;
        self.transitions.push(transition);
        Ok(())
    }

    fn fail(&mut self, error: WalletError) -> WalletError {
        if let Err(e) = self.advance(LoginAction::Fail) {
            warn!(error = %e, "login already finished");
        }
        warn!(error = %error, "browser login failed");
        error
    }

    fn teardown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.shutdown();
            debug!(port = self.port, "loopback listener stopped");
        }
    }
}

impl Drop for OAuthSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn siwe_login_url(wallet: &WalletHandle, redirect_url: &str) -> Result<String, WalletError> {
    match wallet {
        WalletHandle::InApp(w) if w.is_valid() && w.source == InAppSource::Siwe => Ok(format!(
            "{SIWE_LOGIN_URL}?redirectUrl={}",
            urlencoding::encode(redirect_url)
        )),
        WalletHandle::InApp(w) if !w.is_valid() => Err(WalletError::InvalidHandle),
        _ => Err(WalletError::SourceMismatch { expected: "SIWE" }),
    }
}
