//! The handoff from the forwarder thread to the async host.

use crate::decode::{decode, EventRecord};
use crate::event::RawEvent;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BoundaryError {
    /// The host side has gone away.
    #[error("boundary closed")]
    Closed,
    /// The host side is not keeping up.
    #[error("boundary rejected event")]
    Rejected,
}

/// Accepts events from the forwarder thread without blocking it.
///
/// Handles are shared as `Arc<dyn EventBoundary>`; the forwarder holds its
/// own clone for as long as it runs.
pub trait EventBoundary: Send + Sync {
    fn submit(&self, event: RawEvent) -> Result<(), BoundaryError>;
}

impl<F> EventBoundary for F
where
    F: Fn(RawEvent) -> Result<(), BoundaryError> + Send + Sync,
{
    fn submit(&self, event: RawEvent) -> Result<(), BoundaryError> {
        self(event)
    }
}

/// Boundary backed by a bounded tokio channel.
pub struct ChannelBoundary {
    tx: mpsc::Sender<RawEvent>,
}

impl EventBoundary for ChannelBoundary {
    fn submit(&self, event: RawEvent) -> Result<(), BoundaryError> {
        self.tx.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => BoundaryError::Rejected,
            TrySendError::Closed(_) => BoundaryError::Closed,
        })
    }
}

/// Host end of a [`ChannelBoundary`]. Decoding happens here, on the host
/// task, never on the hook or forwarder thread.
pub struct EventReceiver {
    rx: mpsc::Receiver<RawEvent>,
}

impl EventReceiver {
    /// Next decoded event, or `None` once the boundary is dropped.
    pub async fn recv(&mut self) -> Option<EventRecord> {
        self.rx.recv().await.map(|event| decode(&event))
    }

    /// Next raw event, or `None` once the boundary is dropped.
    pub async fn recv_raw(&mut self) -> Option<RawEvent> {
        self.rx.recv().await
    }

    /// Call `callback` for every event until the boundary is dropped.
    pub async fn for_each<F>(mut self, mut callback: F)
    where
        F: FnMut(EventRecord),
    {
        while let Some(record) = self.recv().await {
            callback(record);
        }
    }

    /// Stop accepting events. Further submissions fail with `Closed`.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

/// Create a boundary holding at most `capacity` undelivered events.
pub fn channel(capacity: usize) -> (std::sync::Arc<ChannelBoundary>, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        std::sync::Arc::new(ChannelBoundary { tx }),
        EventReceiver { rx },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventData, WheelData};
    use crate::EventKind;

    fn wheel(amount: u16) -> RawEvent {
        RawEvent::new(
            9,
            0,
            EventData::MouseWheel(WheelData {
                amount,
                ..Default::default()
            }),
        )
    }

    #[tokio::test]
    async fn test_channel_delivers_decoded() {
        let (boundary, mut receiver) = channel(4);
        boundary.submit(wheel(3)).unwrap();

        let record = receiver.recv().await.unwrap();
        assert_eq!(record.kind, EventKind::MouseWheel.code());
        assert_eq!(record.wheel.unwrap().amount, 3);
    }

    #[test]
    fn test_full_channel_rejects() {
        let (boundary, _receiver) = channel(1);
        boundary.submit(wheel(1)).unwrap();
        assert_eq!(boundary.submit(wheel(2)), Err(BoundaryError::Rejected));
    }

    #[test]
    fn test_closed_channel() {
        let (boundary, mut receiver) = channel(1);
        receiver.close();
        assert_eq!(boundary.submit(wheel(1)), Err(BoundaryError::Closed));

        let (boundary, receiver) = channel(1);
        drop(receiver);
        assert_eq!(boundary.submit(wheel(1)), Err(BoundaryError::Closed));
    }

    #[tokio::test]
    async fn test_for_each_ends_when_boundary_dropped() {
        let (boundary, receiver) = channel(8);
        for amount in 1..=3 {
            boundary.submit(wheel(amount)).unwrap();
        }
        drop(boundary);

        let mut amounts = Vec::new();
        receiver
            .for_each(|record| amounts.push(record.wheel.unwrap().amount))
            .await;
        assert_eq!(amounts, vec![1, 2, 3]);
    }

    #[test]
    fn test_closure_boundary() {
        let boundary = |_: RawEvent| -> Result<(), BoundaryError> { Err(BoundaryError::Closed) };
        assert_eq!(boundary.submit(wheel(1)), Err(BoundaryError::Closed));
    }
}
