//! In-process hook driven through a trigger handle.
//!
//! Events sent through a [`ManualTrigger`] are dispatched on the hook thread,
//! exactly like a platform hook would dispatch captured input. Useful for
//! tests and for hosts that synthesize their own input stream.

use crate::event::{EventData, RawEvent};
use crate::native::{self, DispatchFn, LoggerFn, NativeHook, StatusCode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, PoisonError};

enum Command {
    Dispatch(RawEvent),
    Stop,
}

/// A hook whose "captured" events come from a [`ManualTrigger`].
pub struct ManualHook {
    tx: Sender<Command>,
    rx: Mutex<Receiver<Command>>,
    dispatch: Mutex<Option<DispatchFn>>,
    logger: Mutex<Option<LoggerFn>>,
    fail_with: Mutex<Option<StatusCode>>,
    runs: AtomicUsize,
}

/// Sends events to a [`ManualHook`].
#[derive(Clone)]
pub struct ManualTrigger {
    tx: Sender<Command>,
}

impl ManualHook {
    pub fn new() -> (Self, ManualTrigger) {
        let (tx, rx) = mpsc::channel();
        let hook = Self {
            tx: tx.clone(),
            rx: Mutex::new(rx),
            dispatch: Mutex::new(None),
            logger: Mutex::new(None),
            fail_with: Mutex::new(None),
            runs: AtomicUsize::new(0),
        };
        (hook, ManualTrigger { tx })
    }

    /// Make subsequent runs fail immediately with `status`.
    pub fn fail_with(&self, status: Option<StatusCode>) {
        *self.fail_with.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }

    /// Number of times `run` has been entered.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl ManualTrigger {
    /// Queue `event` for dispatch on the hook thread. Returns false once the
    /// hook has been dropped.
    pub fn send(&self, event: RawEvent) -> bool {
        self.tx.send(Command::Dispatch(event)).is_ok()
    }
}

impl NativeHook for ManualHook {
    fn arm(&self) {
        let rx = self.rx.lock().unwrap_or_else(PoisonError::into_inner);
        while rx.try_recv().is_ok() {}
    }

    fn set_logger(&self, logger: LoggerFn) {
        *self.logger.lock().unwrap_or_else(PoisonError::into_inner) = Some(logger);
    }

    fn set_dispatch(&self, dispatch: DispatchFn) {
        *self.dispatch.lock().unwrap_or_else(PoisonError::into_inner) = Some(dispatch);
    }

    fn run(&self) -> StatusCode {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let logger = self.logger.lock().unwrap_or_else(PoisonError::into_inner).take();

        let fail_with = *self.fail_with.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(status) = fail_with {
            native::emit(&logger, log::Level::Debug, "manual hook configured to fail");
            return status;
        }

        let Some(mut dispatch) = self
            .dispatch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            native::emit(&logger, log::Level::Error, "no dispatch callback registered");
            return StatusCode::Failure;
        };

        let rx = self.rx.lock().unwrap_or_else(PoisonError::into_inner);
        native::emit(&logger, log::Level::Debug, "manual hook running");
        dispatch(&RawEvent::new(0, 0, EventData::HookEnabled));

        while let Ok(command) = rx.recv() {
            match command {
                Command::Dispatch(event) => dispatch(&event),
                Command::Stop => break,
            }
        }

        dispatch(&RawEvent::new(0, 0, EventData::HookDisabled));
        native::emit(&logger, log::Level::Debug, "manual hook stopped");
        StatusCode::Success
    }

    fn stop(&self) -> StatusCode {
        match self.tx.send(Command::Stop) {
            Ok(()) => StatusCode::Success,
            Err(_) => StatusCode::Failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::MouseData;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_dispatches_on_run_thread() {
        let (hook, trigger) = ManualHook::new();
        let hook = Arc::new(hook);
        let (tx, rx) = mpsc::channel();
        hook.set_dispatch(Box::new(move |event: &RawEvent| {
            let _ = tx.send((thread::current().id(), event.kind()));
        }));

        let runner = {
            let hook = Arc::clone(&hook);
            thread::spawn(move || (thread::current().id(), hook.run()))
        };

        trigger.send(RawEvent::new(
            1,
            0,
            EventData::MouseMoved(MouseData::default()),
        ));
        hook.stop();

        let (run_thread, status) = runner.join().unwrap();
        assert_eq!(status, StatusCode::Success);
        let seen: Vec<_> = rx.try_iter().collect();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|(id, _)| *id == run_thread));
        assert_eq!(seen[1].1, crate::EventKind::MouseMoved);
        assert_eq!(hook.runs(), 1);
    }

    #[test]
    fn test_stop_before_run_returns_immediately() {
        let (hook, _trigger) = ManualHook::new();
        hook.arm();
        hook.set_dispatch(Box::new(|_: &RawEvent| {}));
        hook.stop();
        assert_eq!(hook.run(), StatusCode::Success);
    }

    #[test]
    fn test_arm_discards_stale_stop() {
        let (hook, trigger) = ManualHook::new();
        hook.stop();
        hook.arm();

        let hook = Arc::new(hook);
        hook.set_dispatch(Box::new(|_: &RawEvent| {}));
        let runner = {
            let hook = Arc::clone(&hook);
            thread::spawn(move || hook.run())
        };
        trigger.send(RawEvent::new(0, 0, EventData::MouseMoved(MouseData::default())));
        hook.stop();
        assert_eq!(runner.join().unwrap(), StatusCode::Success);
    }

    #[test]
    fn test_configured_failure() {
        let (hook, _trigger) = ManualHook::new();
        hook.fail_with(Some(StatusCode::XOpenDisplay));
        hook.set_dispatch(Box::new(|_: &RawEvent| {}));
        assert_eq!(hook.run(), StatusCode::XOpenDisplay);
    }
}
