#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use thirdweb_wallet_core::{
    AnalyticsPort, BrowserPort, CallbackListener, CallbackServerPort, CallbackSignal,
    ConnectEvent, CoreCall, DeviceIdPort, HandleId, InAppSource, InAppWallet, RawOutcome,
    SmartWallet, WalletConfig, WalletCorePort, WalletEngine, WalletError, WalletHandle,
};

pub const WALLET_ADDRESS: &str = "0x1000000000000000000000000000000000000001";
pub const DEVICE_ID: &str = "device-1234";

#[derive(Default)]
struct CoreState {
    calls: Mutex<Vec<CoreCall>>,
    responses: Mutex<HashMap<String, RawOutcome>>,
    freed: Mutex<Vec<HandleId>>,
}

/// Scriptable wallet core that records every call it receives.
#[derive(Clone, Default)]
pub struct MockCore {
    state: Arc<CoreState>,
}

impl MockCore {
    pub fn respond(&self, name: &str, outcome: RawOutcome) {
        self.state
            .responses
            .lock()
            .expect("responses lock")
            .insert(name.to_owned(), outcome);
    }

    pub fn calls(&self) -> Vec<CoreCall> {
        self.state.calls.lock().expect("calls lock").clone()
    }

    pub fn call_names(&self) -> Vec<String> {
        self.calls().iter().map(CoreCall::name).collect()
    }

    pub fn freed(&self) -> Vec<HandleId> {
        self.state.freed.lock().expect("freed lock").clone()
    }

    fn default_response(name: &str) -> RawOutcome {
        match name {
            "get_wallet_address" => RawOutcome::ok(WALLET_ADDRESS),
            "is_connected" | "smart_wallet_is_deployed" => RawOutcome::ok("true"),
            "create_in_app_wallet"
            | "create_ecosystem_wallet"
            | "create_private_key_wallet"
            | "generate_private_key_wallet" => RawOutcome::ok("42"),
            "create_smart_wallet" => RawOutcome::ok("99"),
            n if n.ends_with("fetch_oauth_login_link") => {
                RawOutcome::ok("https://login.example/oauth?client=test")
            }
            _ => RawOutcome::ok(""),
        }
    }
}

impl WalletCorePort for MockCore {
    fn call(&self, call: &CoreCall) -> Result<RawOutcome, WalletError> {
        let name = call.name();
        self.state
            .calls
            .lock()
            .expect("calls lock")
            .push(call.clone());
        let scripted = self
            .state
            .responses
            .lock()
            .expect("responses lock")
            .get(&name)
            .cloned();
        Ok(scripted.unwrap_or_else(|| Self::default_response(&name)))
    }

    fn free_wallet(&self, handle: HandleId) {
        self.state.freed.lock().expect("freed lock").push(handle);
    }
}

#[derive(Clone, Default)]
pub struct RecordingAnalytics {
    events: Arc<Mutex<Vec<ConnectEvent>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingAnalytics {
    pub fn events(&self) -> Vec<ConnectEvent> {
        self.events.lock().expect("events lock").clone()
    }

    pub fn fail_with_transport_error(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

impl AnalyticsPort for RecordingAnalytics {
    fn track_connect(&self, event: &ConnectEvent) -> Result<(), WalletError> {
        self.events.lock().expect("events lock").push(event.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(WalletError::Transport("analytics endpoint down".to_owned()));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FixedDevice;

impl DeviceIdPort for FixedDevice {
    fn device_id(&self) -> Result<String, WalletError> {
        Ok(DEVICE_ID.to_owned())
    }
}

#[derive(Clone, Default)]
pub struct FakeBrowser {
    opened: Arc<Mutex<Vec<String>>>,
    fail: Arc<AtomicBool>,
}

impl FakeBrowser {
    pub fn failing() -> Self {
        let browser = Self::default();
        browser.fail.store(true, Ordering::SeqCst);
        browser
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().expect("opened lock").clone()
    }
}

impl BrowserPort for FakeBrowser {
    fn open_url(&self, url: &str) -> Result<(), WalletError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(WalletError::Transport("no browser available".to_owned()));
        }
        self.opened.lock().expect("opened lock").push(url.to_owned());
        Ok(())
    }
}

/// In-process stand-in for the loopback listener. Tests drive requests through the captured signal.
#[derive(Clone, Default)]
pub struct FakeCallbackServer {
    signals: Arc<Mutex<Vec<Arc<CallbackSignal>>>>,
    ports: Arc<Mutex<Vec<u16>>>,
    shutdowns: Arc<AtomicUsize>,
    refuse_bind: Arc<AtomicBool>,
}

struct FakeListener {
    shutdowns: Arc<AtomicUsize>,
}

impl CallbackListener for FakeListener {
    fn shutdown(self: Box<Self>) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

impl FakeCallbackServer {
    pub fn refusing() -> Self {
        let server = Self::default();
        server.refuse_bind.store(true, Ordering::SeqCst);
        server
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub fn ports(&self) -> Vec<u16> {
        self.ports.lock().expect("ports lock").clone()
    }

    pub fn last_signal(&self) -> Option<Arc<CallbackSignal>> {
        self.signals.lock().expect("signals lock").last().cloned()
    }

    /// Simulates the browser being redirected to `target`.
    pub fn redirect(&self, target: &str) {
        let signal = self.last_signal().expect("listener bound");
        signal.handle_request("GET", target);
    }
}

impl CallbackServerPort for FakeCallbackServer {
    fn listen(
        &self,
        port: u16,
        signal: Arc<CallbackSignal>,
    ) -> Result<Box<dyn CallbackListener>, WalletError> {
        if self.refuse_bind.load(Ordering::SeqCst) {
            return Err(WalletError::ListenerBind {
                port,
                reason: "address in use".to_owned(),
            });
        }
        self.ports.lock().expect("ports lock").push(port);
        self.signals.lock().expect("signals lock").push(signal);
        Ok(Box::new(FakeListener {
            shutdowns: Arc::clone(&self.shutdowns),
        }))
    }
}

pub type TestEngine = WalletEngine<MockCore, RecordingAnalytics, FixedDevice>;

pub fn test_config() -> WalletConfig {
    WalletConfig {
        client_id: "client-123".to_owned(),
        bundle_id: "com.example.game".to_owned(),
        encryption_key: "enc-key".to_owned(),
        ..WalletConfig::default()
    }
}

pub fn ecosystem_config() -> WalletConfig {
    WalletConfig {
        ecosystem_id: "ecosystem.example".to_owned(),
        partner_id: "partner-1".to_owned(),
        ..test_config()
    }
}

pub fn new_engine(config: WalletConfig) -> (TestEngine, MockCore, RecordingAnalytics) {
    let core = MockCore::default();
    let analytics = RecordingAnalytics::default();
    let engine = WalletEngine::new(core.clone(), analytics.clone(), FixedDevice, config);
    (engine, core, analytics)
}

pub fn in_app(id: u64, source: InAppSource) -> WalletHandle {
    InAppWallet::new(HandleId(id), source).into()
}

pub fn smart(id: u64, signer_id: u64) -> WalletHandle {
    SmartWallet {
        id: HandleId(id),
        signer: InAppWallet::new(HandleId(signer_id), InAppSource::Email),
    }
    .into()
}

/// Re-runs `step` until it reports done or roughly two seconds pass.
pub fn eventually(mut step: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if step() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}
