//! Session lifecycle and the process-facing `start`/`stop`/`set_debug`.

use crate::boundary::EventBoundary;
use crate::error::HookError;
use crate::forwarder::Forwarder;
use crate::logger::{self, Logger};
use crate::native::NativeHook;
use crate::queue::EventQueue;
use crate::session::HookSession;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Lifecycle phase of the capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    Idle = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl Phase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Phase::Starting,
            2 => Phase::Running,
            3 => Phase::Stopping,
            _ => Phase::Idle,
        }
    }
}

/// Phase shared with the forwarder thread. Written only under the
/// controller lock.
pub(crate) struct PhaseCell(AtomicU8);

impl PhaseCell {
    pub(crate) fn new(phase: Phase) -> Self {
        Self(AtomicU8::new(phase as u8))
    }

    pub(crate) fn get(&self) -> Phase {
        Phase::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub(crate) fn set(&self, phase: Phase) {
        self.0.store(phase as u8, Ordering::SeqCst);
    }

    /// Starting or Running: the forwarder keeps draining.
    pub(crate) fn is_active(&self) -> bool {
        matches!(self.get(), Phase::Starting | Phase::Running)
    }
}

/// Result of a successful [`SessionController::try_start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A session was already active; nothing changed.
    AlreadyActive,
}

/// Result of [`SessionController::try_stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    /// No session was running; nothing changed.
    AlreadyIdle,
}

/// Builder for a [`SessionController`].
#[derive(Default)]
pub struct SessionControllerBuilder {
    hook: Option<Arc<dyn NativeHook>>,
    log_file: Option<PathBuf>,
    debug: bool,
}

impl SessionControllerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `hook` instead of the platform hook.
    pub fn hook(mut self, hook: Arc<dyn NativeHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Mirror log output to `path` (append mode) while a session runs.
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Debug flag applied at build time. Each `start` sets it again.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Build the controller.
    pub fn build(self) -> Result<SessionController> {
        let hook = match self.hook {
            Some(hook) => hook,
            None => platform_hook()?,
        };
        let logger = logger::init();
        if self.debug {
            logger.set_debug(true);
        }
        Ok(SessionController {
            hook,
            log_file: self.log_file,
            logger,
            phase: Arc::new(PhaseCell::new(Phase::Idle)),
            inner: Mutex::new(Inner::default()),
        })
    }
}

#[cfg(target_os = "linux")]
fn platform_hook() -> Result<Arc<dyn NativeHook>> {
    Ok(Arc::new(crate::linux::EvdevHook::new()))
}

#[cfg(target_os = "macos")]
fn platform_hook() -> Result<Arc<dyn NativeHook>> {
    Ok(Arc::new(crate::macos::RdevHook::new()))
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn platform_hook() -> Result<Arc<dyn NativeHook>> {
    anyhow::bail!("Global input hooks are not supported on this platform")
}

#[derive(Default)]
struct Inner {
    producer: Option<HookSession>,
    forwarder: Option<Forwarder>,
    callback: Option<Arc<dyn EventBoundary>>,
}

/// Owns the one capture session and drives its lifecycle:
/// `Idle -> Starting -> Running -> Stopping -> Idle`.
///
/// `start` and `stop` are serialized; calling `start` while a session is
/// active, or `stop` while idle, does nothing and still reports success.
pub struct SessionController {
    hook: Arc<dyn NativeHook>,
    log_file: Option<PathBuf>,
    logger: &'static Logger,
    phase: Arc<PhaseCell>,
    inner: Mutex<Inner>,
}

impl SessionController {
    pub fn builder() -> SessionControllerBuilder {
        SessionControllerBuilder::new()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    pub fn is_running(&self) -> bool {
        self.phase() == Phase::Running
    }

    /// Start capturing and deliver every event to `callback`.
    ///
    /// Returns false only if a thread could not be spawned.
    pub fn start(&self, callback: Arc<dyn EventBoundary>, debug: bool) -> bool {
        match self.try_start(callback, debug) {
            Ok(_) => true,
            Err(e) => {
                log::error!("Failed to start hook: {}", e);
                false
            }
        }
    }

    pub fn try_start(
        &self,
        callback: Arc<dyn EventBoundary>,
        debug: bool,
    ) -> Result<StartOutcome, HookError> {
        let mut inner = self.lock();
        log::debug!("start requested");

        if self.phase.get() != Phase::Idle {
            log::debug!("Session already active, ignoring start");
            return Ok(StartOutcome::AlreadyActive);
        }
        self.phase.set(Phase::Starting);

        self.logger.set_debug(debug);
        if let Some(path) = &self.log_file {
            if let Err(e) = self.logger.open_sink(path) {
                log::warn!("Failed to open log file {}: {}", path.display(), e);
            }
        }

        let queue = Arc::new(EventQueue::new());

        let forwarder = match Forwarder::spawn(
            Arc::clone(&queue),
            Arc::clone(&self.phase),
            Arc::clone(&callback),
        ) {
            Ok(forwarder) => forwarder,
            Err(e) => {
                self.abort_start(None);
                return Err(e);
            }
        };

        let producer = match HookSession::start(Arc::clone(&self.hook), queue) {
            Ok(producer) => producer,
            Err(e) => {
                self.abort_start(Some(forwarder));
                return Err(e);
            }
        };

        inner.producer = Some(producer);
        inner.forwarder = Some(forwarder);
        inner.callback = Some(callback);
        self.phase.set(Phase::Running);
        log::info!("Hook session started");

        Ok(StartOutcome::Started)
    }

    fn abort_start(&self, forwarder: Option<Forwarder>) {
        self.phase.set(Phase::Stopping);
        if let Some(forwarder) = forwarder {
            forwarder.shutdown();
        }
        self.logger.close_sink();
        self.phase.set(Phase::Idle);
    }

    /// Stop capturing. Blocks until both session threads have exited.
    pub fn stop(&self) -> bool {
        self.try_stop();
        true
    }

    pub fn try_stop(&self) -> StopOutcome {
        let mut inner = self.lock();
        log::debug!("stop requested");

        if self.phase.get() != Phase::Running {
            log::debug!("No running session, ignoring stop");
            return StopOutcome::AlreadyIdle;
        }
        self.phase.set(Phase::Stopping);

        let producer = inner.producer.take();
        if let Some(producer) = &producer {
            producer.stop();
        }
        if let Some(forwarder) = inner.forwarder.take() {
            forwarder.shutdown();
        }
        if let Some(producer) = producer {
            producer.join();
        }

        log::info!("Hook session stopped");
        self.logger.close_sink();
        inner.callback = None;
        self.phase.set(Phase::Idle);

        StopOutcome::Stopped
    }

    /// Change log verbosity. Never affects capture or delivery.
    pub fn set_debug(&self, debug: bool) -> bool {
        self.logger.set_debug(debug);
        true
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.try_stop();
    }
}
