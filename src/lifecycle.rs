//! Process shutdown.
//!
//! [`ShutdownLatch`] is a one-shot state machine: the first caller moves it
//! from `Idle` to `ShuttingDown` and owns the close; everyone after that only
//! logs a duplicate. [`Shutdown`] pairs the latch with something to close and
//! an exit hook, and [`install_signal_handlers`] feeds it SIGINT/SIGTERM.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Idle,
    ShuttingDown,
    Terminated,
}

const IDLE: u8 = 0;
const SHUTTING_DOWN: u8 = 1;
const TERMINATED: u8 = 2;

#[derive(Debug, Default)]
pub struct ShutdownLatch {
    state: AtomicU8,
}

impl ShutdownLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true for exactly one caller.
    pub fn try_begin(&self) -> bool {
        self.state
            .compare_exchange(IDLE, SHUTTING_DOWN, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn finish(&self) {
        self.state.store(TERMINATED, Ordering::Release);
    }

    pub fn state(&self) -> ShutdownState {
        match self.state.load(Ordering::Acquire) {
            IDLE => ShutdownState::Idle,
            SHUTTING_DOWN => ShutdownState::ShuttingDown,
            _ => ShutdownState::Terminated,
        }
    }
}

/// Anything the server must release before exiting.
pub trait Closeable: Send + Sync {
    fn close(&self) -> BoxFuture<'_, ()>;
}

impl Closeable for CancellationToken {
    fn close(&self) -> BoxFuture<'_, ()> {
        self.cancel();
        Box::pin(std::future::ready(()))
    }
}

pub type ExitFn = Box<dyn Fn(i32) + Send + Sync>;

/// Exit the process after dropping `held`.
///
/// `std::process::exit` skips destructors, so anything that flushes on drop
/// (the non-blocking log writers) has to be released here first.
pub fn exit_releasing<T: Send + 'static>(held: T) -> ExitFn {
    release_then(held, |code| std::process::exit(code))
}

fn release_then<T, F>(held: T, exit: F) -> ExitFn
where
    T: Send + 'static,
    F: Fn(i32) + Send + Sync + 'static,
{
    let slot = Mutex::new(Some(held));
    Box::new(move |code| {
        if let Ok(mut slot) = slot.lock() {
            drop(slot.take());
        }
        exit(code)
    })
}

pub struct Shutdown<C> {
    latch: ShutdownLatch,
    closeable: C,
    exit: ExitFn,
}

impl<C: Closeable> Shutdown<C> {
    /// Exits the process with status 0 once `closeable` is closed.
    pub fn new(closeable: C) -> Self {
        Self::with_exit(closeable, Box::new(|code: i32| std::process::exit(code)))
    }

    pub fn with_exit(closeable: C, exit: ExitFn) -> Self {
        Self {
            latch: ShutdownLatch::new(),
            closeable,
            exit,
        }
    }

    pub fn state(&self) -> ShutdownState {
        self.latch.state()
    }

    /// Close and exit on the first call. Returns false for duplicates.
    pub async fn shutdown(&self, signal: &str) -> bool {
        if !self.latch.try_begin() {
            warn!("Shutdown already in progress (received {signal}); ignoring duplicate signal.");
            return false;
        }
        info!("Received {signal}. Shutting down...");
        self.close_and_exit().await;
        true
    }

    /// Shut down because the transport ended on its own.
    ///
    /// If a signal got there first, its task owns the exit and this waits on
    /// it without logging anything.
    pub async fn transport_closed(&self) {
        if self.latch.try_begin() {
            info!("Transport closed. Shutting down...");
            self.close_and_exit().await;
        } else {
            std::future::pending::<()>().await;
        }
    }

    async fn close_and_exit(&self) {
        self.closeable.close().await;
        self.latch.finish();
        (self.exit)(0);
    }
}

/// Route SIGINT and SIGTERM into `shutdown` for the life of the process.
#[cfg(unix)]
pub fn install_signal_handlers<C>(shutdown: Arc<Shutdown<C>>) -> std::io::Result<JoinHandle<()>>
where
    C: Closeable + 'static,
{
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    Ok(tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                Some(()) = interrupt.recv() => "SIGINT",
                Some(()) = terminate.recv() => "SIGTERM",
                else => break,
            };
            shutdown.shutdown(name).await;
        }
    }))
}

#[cfg(not(unix))]
pub fn install_signal_handlers<C>(shutdown: Arc<Shutdown<C>>) -> std::io::Result<JoinHandle<()>>
where
    C: Closeable + 'static,
{
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            shutdown.shutdown("SIGINT").await;
        }
    }))
}
