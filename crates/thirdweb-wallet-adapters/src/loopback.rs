use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tiny_http::{Header, Response, Server, StatusCode};
use tracing::{debug, warn};

use thirdweb_wallet_core::{CallbackListener, CallbackServerPort, CallbackSignal, WalletError};

/// Loopback HTTP listener serving the OAuth/SIWE redirect.
///
/// The redirect URL names `localhost`, which some hosts resolve to `::1`
/// first, so the default binds `127.0.0.1` and also `::1` when the host has
/// IPv6 loopback. Only the first host is required to bind.
#[derive(Debug, Clone)]
pub struct TinyHttpCallbackServer {
    hosts: Vec<String>,
}

impl Default for TinyHttpCallbackServer {
    fn default() -> Self {
        Self {
            hosts: vec!["127.0.0.1".to_owned(), "::1".to_owned()],
        }
    }
}

impl TinyHttpCallbackServer {
    /// Binds `host` only.
    pub fn with_host(host: impl Into<String>) -> Self {
        Self {
            hosts: vec![host.into()],
        }
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }
}

impl CallbackServerPort for TinyHttpCallbackServer {
    fn listen(
        &self,
        port: u16,
        signal: Arc<CallbackSignal>,
    ) -> Result<Box<dyn CallbackListener>, WalletError> {
        let mut listener = LoopbackListener {
            port,
            workers: Vec::new(),
        };
        for (index, host) in self.hosts.iter().enumerate() {
            match bind(host, port, &signal) {
                Ok(worker) => listener.workers.push(worker),
                Err(e) if index == 0 => return Err(e),
                Err(e) => debug!(host = %host, error = %e, "optional loopback address not bound"),
            }
        }
        debug!(port, addresses = listener.workers.len(), "loopback listener bound");
        Ok(Box::new(listener))
    }
}

fn bind(host: &str, port: u16, signal: &Arc<CallbackSignal>) -> Result<Worker, WalletError> {
    let bind_error = |reason: String| WalletError::ListenerBind { port, reason };
    let server = Server::http((host, port)).map_err(|e| bind_error(e.to_string()))?;
    let server = Arc::new(server);
    let worker = Arc::clone(&server);
    let signal = Arc::clone(signal);
    let thread = thread::Builder::new()
        .name(format!("loopback-{port}"))
        .spawn(move || serve(&worker, &signal))
        .map_err(|e| bind_error(e.to_string()))?;
    Ok(Worker {
        server,
        thread: Some(thread),
    })
}

fn serve(server: &Server, signal: &CallbackSignal) {
    for request in server.incoming_requests() {
        let reply = signal.handle_request(request.method().as_str(), request.url());
        let mut response =
            Response::from_string(reply.body).with_status_code(StatusCode(reply.status));
        if let Ok(header) = Header::from_bytes("Content-Type", reply.content_type) {
            response = response.with_header(header);
        }
        if let Err(e) = request.respond(response) {
            debug!(error = %e, "loopback response not delivered");
        }
    }
}

struct Worker {
    server: Arc<Server>,
    thread: Option<JoinHandle<()>>,
}

struct LoopbackListener {
    port: u16,
    workers: Vec<Worker>,
}

impl CallbackListener for LoopbackListener {
    fn shutdown(self: Box<Self>) {
        drop(self);
    }
}

impl Drop for LoopbackListener {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.server.unblock();
        }
        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    warn!(port = self.port, "loopback listener thread panicked");
                }
            }
        }
        debug!(port = self.port, "loopback listener stopped");
    }
}
