use std::thread::{self, ThreadId};

use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{trace, warn};

use crate::ports::WalletError;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Queue of continuations owned by the primary (host) thread.
///
/// Created on the primary thread; `pump` must be called from that thread,
/// typically once per tick.
pub struct MainThreadDispatcher {
    primary: ThreadId,
    tx: UnboundedSender<Task>,
    rx: UnboundedReceiver<Task>,
}

impl MainThreadDispatcher {
    pub fn new() -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            primary: thread::current().id(),
            tx,
            rx,
        }
    }

    pub fn handle(&self) -> DispatchHandle {
        DispatchHandle {
            primary: self.primary,
            tx: self.tx.clone(),
        }
    }

    /// Runs every queued continuation and returns how many ran.
    pub fn pump(&mut self) -> usize {
        debug_assert_eq!(thread::current().id(), self.primary);
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        if ran > 0 {
            trace!(ran, "pumped primary-thread continuations");
        }
        ran
    }
}

impl Default for MainThreadDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct DispatchHandle {
    primary: ThreadId,
    tx: UnboundedSender<Task>,
}

impl DispatchHandle {
    pub fn is_primary_thread(&self) -> bool {
        thread::current().id() == self.primary
    }

    /// Runs `task` now when already on the primary thread, otherwise queues it for the next pump.
    pub fn run_on_primary(&self, task: impl FnOnce() + Send + 'static) {
        if self.is_primary_thread() {
            task();
        } else if self.tx.send(Box::new(task)).is_err() {
            warn!("primary dispatcher dropped, continuation discarded");
        }
    }
}

/// A success and a failure continuation. Exactly one of them runs, once.
pub struct Continuations<T> {
    on_success: Box<dyn FnOnce(T) + Send + 'static>,
    on_error: Box<dyn FnOnce(WalletError) + Send + 'static>,
}

impl<T: Send + 'static> Continuations<T> {
    pub fn new(
        on_success: impl FnOnce(T) + Send + 'static,
        on_error: impl FnOnce(WalletError) + Send + 'static,
    ) -> Self {
        Self {
            on_success: Box::new(on_success),
            on_error: Box::new(on_error),
        }
    }

    pub fn deliver(self, dispatch: &DispatchHandle, result: Result<T, WalletError>) {
        dispatch.run_on_primary(move || match result {
            Ok(value) => (self.on_success)(value),
            Err(error) => (self.on_error)(error),
        });
    }
}

/// Runs blocking wallet-core work on the runtime's blocking pool.
#[derive(Clone)]
pub struct TaskLauncher {
    runtime: Handle,
}

impl TaskLauncher {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    pub fn current() -> Result<Self, WalletError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| WalletError::Transport(format!("no tokio runtime: {e}")))
    }

    /// Fire-and-forget blocking job. The job reports its own outcome.
    pub fn run(&self, job: impl FnOnce() + Send + 'static) {
        self.runtime.spawn_blocking(job);
    }

    pub fn launch<T, F>(&self, dispatch: &DispatchHandle, job: F, continuations: Continuations<T>)
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, WalletError> + Send + 'static,
    {
        let dispatch = dispatch.clone();
        self.runtime.spawn_blocking(move || {
            let result = job();
            continuations.deliver(&dispatch, result);
        });
    }
}
