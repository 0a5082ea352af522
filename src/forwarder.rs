//! Consumer side: the thread that drains the queue into the boundary.

use crate::boundary::EventBoundary;
use crate::controller::PhaseCell;
use crate::error::HookError;
use crate::queue::EventQueue;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub(crate) struct Forwarder {
    queue: Arc<EventQueue>,
    handle: JoinHandle<()>,
}

impl Forwarder {
    /// Spawn the forwarder thread. The thread keeps its own reference to
    /// `callback` until it exits.
    pub(crate) fn spawn(
        queue: Arc<EventQueue>,
        phase: Arc<PhaseCell>,
        callback: Arc<dyn EventBoundary>,
    ) -> Result<Self, HookError> {
        let thread_queue = Arc::clone(&queue);
        let handle = thread::Builder::new()
            .name("iohook-forwarder".into())
            .spawn(move || forward(&thread_queue, &phase, callback))
            .map_err(|source| HookError::Spawn {
                thread: "forwarder",
                source,
            })?;

        Ok(Self { queue, handle })
    }

    /// Wake the thread so it sees the phase change, then join it.
    pub(crate) fn shutdown(self) {
        self.queue.wake();
        if self.handle.join().is_err() {
            log::error!("Forwarder thread panicked");
        }
    }
}

fn forward(queue: &EventQueue, phase: &PhaseCell, callback: Arc<dyn EventBoundary>) {
    let mut forwarded = 0u64;
    let mut dropped = 0u64;

    while phase.is_active() {
        let Some(event) = queue.wait_and_pop() else {
            continue;
        };

        log::debug!(
            "received event from queue | type: {} | keycode: {:#X}",
            event.kind(),
            event.keycode()
        );

        match callback.submit(event) {
            Ok(()) => forwarded += 1,
            Err(e) => {
                dropped += 1;
                log::warn!("Dropping {} event: {}", event.kind(), e);
            }
        }
    }

    drop(callback);
    log::debug!(
        "Forwarder finished | forwarded: {} | dropped: {}",
        forwarded,
        dropped
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundaryError;
    use crate::controller::Phase;
    use crate::event::{EventData, MouseData, RawEvent};
    use std::sync::Mutex;

    fn moved(x: i16) -> RawEvent {
        RawEvent::new(
            0,
            0,
            EventData::MouseMoved(MouseData {
                x,
                ..Default::default()
            }),
        )
    }

    #[derive(Default)]
    struct Collect {
        seen: Mutex<Vec<i16>>,
        closed_at: Option<i16>,
    }

    impl EventBoundary for Collect {
        fn submit(&self, event: RawEvent) -> Result<(), BoundaryError> {
            let x = event.mouse().map(|m| m.x).unwrap_or_default();
            if Some(x) == self.closed_at {
                return Err(BoundaryError::Closed);
            }
            self.seen.lock().unwrap().push(x);
            Ok(())
        }
    }

    /// Fill the queue, then shut down once it drains.
    fn run_to_completion(callback: Arc<Collect>, events: impl IntoIterator<Item = RawEvent>) {
        let queue = Arc::new(EventQueue::new());
        let phase = Arc::new(PhaseCell::new(Phase::Running));
        for event in events {
            queue.push(event);
        }

        let forwarder = Forwarder::spawn(Arc::clone(&queue), Arc::clone(&phase), callback).unwrap();
        while !queue.is_empty() {
            thread::yield_now();
        }
        // A popped event is always submitted before the next phase check.
        phase.set(Phase::Stopping);
        forwarder.shutdown();
    }

    #[test]
    fn test_forwards_in_order() {
        let callback = Arc::new(Collect::default());
        run_to_completion(Arc::clone(&callback), (0..100).map(moved));
        assert_eq!(*callback.seen.lock().unwrap(), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_closed_boundary_drops_single_event() {
        let callback = Arc::new(Collect {
            closed_at: Some(3),
            ..Default::default()
        });
        run_to_completion(Arc::clone(&callback), (0..6).map(moved));
        assert_eq!(*callback.seen.lock().unwrap(), vec![0, 1, 2, 4, 5]);
    }

    #[test]
    fn test_releases_callback_on_exit() {
        let callback = Arc::new(Collect::default());
        run_to_completion(Arc::clone(&callback), []);
        assert_eq!(Arc::strong_count(&callback), 1);
    }

    #[test]
    fn test_idle_forwarder_exits_on_shutdown() {
        let queue = Arc::new(EventQueue::new());
        let phase = Arc::new(PhaseCell::new(Phase::Running));
        let callback = Arc::new(Collect::default());
        let forwarder = Forwarder::spawn(Arc::clone(&queue), Arc::clone(&phase), callback.clone()).unwrap();

        thread::sleep(std::time::Duration::from_millis(50));
        assert!(!forwarder.handle.is_finished());
        assert!(callback.seen.lock().unwrap().is_empty());

        phase.set(Phase::Stopping);
        forwarder.shutdown();
        assert_eq!(Arc::strong_count(&callback), 1);
    }
}
