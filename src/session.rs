//! Producer side: the thread that runs the native hook loop.

use crate::error::HookError;
use crate::event::RawEvent;
use crate::native::NativeHook;
use crate::queue::EventQueue;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Owns the thread blocked in [`NativeHook::run`].
pub(crate) struct HookSession {
    hook: Arc<dyn NativeHook>,
    handle: JoinHandle<()>,
}

impl HookSession {
    /// Spawn the hook thread. It registers the logger and dispatch callbacks
    /// and then blocks in the native loop until [`stop`](Self::stop).
    pub(crate) fn start(
        hook: Arc<dyn NativeHook>,
        queue: Arc<EventQueue>,
    ) -> Result<Self, HookError> {
        hook.arm();

        let thread_hook = Arc::clone(&hook);
        let handle = thread::Builder::new()
            .name("iohook-producer".into())
            .spawn(move || run_hook(thread_hook, queue))
            .map_err(|source| HookError::Spawn {
                thread: "producer",
                source,
            })?;

        Ok(Self { hook, handle })
    }

    /// Ask the native loop to return. Failures are logged; shutdown always
    /// proceeds.
    pub(crate) fn stop(&self) {
        let status = self.hook.stop();
        if !status.is_success() {
            log::error!("Failed to stop hook: {}", status);
        }
    }

    pub(crate) fn join(self) {
        if self.handle.join().is_err() {
            log::error!("Hook thread panicked");
        }
    }
}

fn run_hook(hook: Arc<dyn NativeHook>, queue: Arc<EventQueue>) {
    log::debug!("Hook thread running");

    hook.set_logger(Box::new(|level: log::Level, message: &str| {
        log::log!(target: "iohook_bridge::native", level, "{}", message.trim_end());
    }));
    hook.set_dispatch(Box::new(move |event: &RawEvent| dispatch(&queue, event)));

    let status = hook.run();
    if status.is_success() {
        log::debug!("Hook thread finished");
    } else {
        log::error!("Hook failed: {}", status);
    }
}

/// Runs on the hook thread for every captured event, so it only copies the
/// record into the queue.
fn dispatch(queue: &EventQueue, event: &RawEvent) {
    log::debug!(
        "dispatch event | type: {} | keycode: {:#X}",
        event.kind(),
        event.keycode()
    );

    if event.is_hook_status() {
        return;
    }
    queue.push(*event);
}
