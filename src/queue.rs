//! Handoff queue between the producer and forwarder threads.

use crate::event::RawEvent;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct State {
    events: VecDeque<RawEvent>,
    wakeups: usize,
}

/// Unbounded FIFO of raw events with a blocking pop.
///
/// `push` never blocks on capacity, so the hook thread is only ever held for
/// the duration of one record copy. `wake` lets the consumer observe a state
/// change elsewhere (session shutdown) while the queue is empty.
#[derive(Default)]
pub struct EventQueue {
    state: Mutex<State>,
    not_empty: Condvar,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Critical sections never panic midway, so the data is consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an event and wake one waiter.
    pub fn push(&self, event: RawEvent) {
        self.lock().events.push_back(event);
        self.not_empty.notify_one();
    }

    /// Block until an event or a wake is available.
    ///
    /// Returns the oldest event, or `None` if the call consumed a wake while
    /// the queue was empty. Events are served before wakes.
    pub fn wait_and_pop(&self) -> Option<RawEvent> {
        let guard = self.lock();
        let mut state = self
            .not_empty
            .wait_while(guard, |s| s.events.is_empty() && s.wakeups == 0)
            .unwrap_or_else(PoisonError::into_inner);

        match state.events.pop_front() {
            Some(event) => Some(event),
            None => {
                state.wakeups -= 1;
                None
            }
        }
    }

    /// Release a waiter without an event. A wake issued before anyone waits
    /// is kept until consumed.
    pub fn wake(&self) {
        self.lock().wakeups += 1;
        self.not_empty.notify_all();
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventData, MouseData};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn moved(x: i16) -> RawEvent {
        RawEvent::new(
            x as u64,
            0,
            EventData::MouseMoved(MouseData {
                x,
                ..Default::default()
            }),
        )
    }

    #[test]
    fn test_fifo_order() {
        let queue = EventQueue::new();
        for x in 0..10 {
            queue.push(moved(x));
        }
        assert_eq!(queue.len(), 10);
        for x in 0..10 {
            assert_eq!(queue.wait_and_pop(), Some(moved(x)));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pop_blocks_until_push() {
        let queue = Arc::new(EventQueue::new());
        let waiter = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.wait_and_pop())
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished());

        queue.push(moved(7));
        assert_eq!(waiter.join().unwrap(), Some(moved(7)));
    }

    #[test]
    fn test_wake_releases_empty_wait() {
        let queue = Arc::new(EventQueue::new());
        let waiter = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.wait_and_pop())
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished());

        queue.wake();
        assert_eq!(waiter.join().unwrap(), None);
    }

    #[test]
    fn test_wake_before_wait_is_not_lost() {
        let queue = EventQueue::new();
        queue.wake();
        assert_eq!(queue.wait_and_pop(), None);
    }

    #[test]
    fn test_events_served_before_wake() {
        let queue = EventQueue::new();
        queue.wake();
        queue.push(moved(1));
        assert_eq!(queue.wait_and_pop(), Some(moved(1)));
        assert_eq!(queue.wait_and_pop(), None);
    }
}
