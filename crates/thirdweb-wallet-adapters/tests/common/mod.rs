#![allow(dead_code)]

use std::io::Read;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tiny_http::{Response, Server, StatusCode};

use thirdweb_wallet_core::{
    AnalyticsPort, BrowserPort, ConnectEvent, CoreCall, DeviceIdPort, HandleId, RawOutcome,
    WalletCorePort, WalletError,
};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Answers every request with `status` and records it.
pub fn spawn_mock_server(
    status: u16,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
) -> (String, thread::JoinHandle<()>) {
    let server = Server::http("127.0.0.1:0").expect("start server");
    let addr = format!("http://{}", server.server_addr());

    let join = thread::spawn(move || {
        for _ in 0..4 {
            let mut req = match server.recv() {
                Ok(r) => r,
                Err(_) => break,
            };
            let mut body = String::new();
            let _ = req.as_reader().read_to_string(&mut body);
            let recorded = RecordedRequest {
                method: req.method().to_string(),
                url: req.url().to_owned(),
                headers: req
                    .headers()
                    .iter()
                    .map(|h| (h.field.to_string(), h.value.to_string()))
                    .collect(),
                body,
            };
            if let Ok(mut g) = requests.lock() {
                g.push(recorded);
            }
            let _ = req.respond(Response::from_string("{}").with_status_code(StatusCode(status)));
        }
    });

    (addr, join)
}

pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("bind ephemeral port")
        .local_addr()
        .expect("local addr")
        .port()
}

pub fn http_client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("http client")
}

pub fn eventually(mut step: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if step() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

/// Wallet core that hands out a fixed login link and accepts every sign-in.
#[derive(Clone, Default)]
pub struct StubCore {
    calls: Arc<Mutex<Vec<String>>>,
}

impl StubCore {
    pub fn call_names(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl WalletCorePort for StubCore {
    fn call(&self, call: &CoreCall) -> Result<RawOutcome, WalletError> {
        let name = call.name();
        self.calls.lock().expect("calls lock").push(name.clone());
        if name.ends_with("fetch_oauth_login_link") {
            return Ok(RawOutcome::ok("https://login.example/oauth"));
        }
        Ok(RawOutcome::ok(""))
    }

    fn free_wallet(&self, _handle: HandleId) {}
}

#[derive(Clone, Default)]
pub struct NoAnalytics;

impl AnalyticsPort for NoAnalytics {
    fn track_connect(&self, _event: &ConnectEvent) -> Result<(), WalletError> {
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FixedDevice;

impl DeviceIdPort for FixedDevice {
    fn device_id(&self) -> Result<String, WalletError> {
        Ok("device-1234".to_owned())
    }
}

#[derive(Clone, Default)]
pub struct RecordingBrowser {
    opened: Arc<Mutex<Vec<String>>>,
}

impl RecordingBrowser {
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().expect("opened lock").clone()
    }
}

impl BrowserPort for RecordingBrowser {
    fn open_url(&self, url: &str) -> Result<(), WalletError> {
        self.opened.lock().expect("opened lock").push(url.to_owned());
        Ok(())
    }
}
