use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::warn;

/// Minimal send surface implemented by both the unbounded and bounded channel wrappers, so
/// gateway and OMS code can be generic over which backpressure policy a given pipe uses.
pub trait Tx<T> {
    type Error: std::fmt::Debug;
    fn send(&self, item: T) -> Result<(), Self::Error>;
}

/// Unbounded mpsc sender, used for market-data fan-out where a slow consumer should never
/// stall the WebSocket read loop.
#[derive(Debug, Clone)]
pub struct UnboundedTx<T>(pub mpsc::UnboundedSender<T>);

impl<T> Tx<T> for UnboundedTx<T> {
    type Error = mpsc::error::SendError<T>;

    fn send(&self, item: T) -> Result<(), Self::Error> {
        self.0.send(item)
    }
}

/// Unbounded mpsc receiver, wrapped so it implements [`Stream`] for use with `futures`
/// combinators in the gateway's merge loop.
#[derive(Debug)]
pub struct UnboundedRx<T>(pub mpsc::UnboundedReceiver<T>);

impl<T> Stream for UnboundedRx<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.0.poll_recv(cx)
    }
}

/// Bounded mpsc sender. The OMS command queue uses this instead of [`UnboundedTx`]: per the
/// design, letting order commands queue without limit risks replaying a large backlog of
/// stale intents after a stall, so the queue is capped and a full queue is reported rather
/// than silently buffered forever.
#[derive(Debug, Clone)]
pub struct BoundedTx<T>(pub mpsc::Sender<T>);

#[derive(Debug, thiserror::Error)]
pub enum BoundedSendError {
    #[error("channel is full")]
    Full,
    #[error("receiver has been dropped")]
    Closed,
}

impl<T> Tx<T> for BoundedTx<T> {
    type Error = BoundedSendError;

    fn send(&self, item: T) -> Result<(), Self::Error> {
        self.0.try_send(item).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => BoundedSendError::Full,
            mpsc::error::TrySendError::Closed(_) => BoundedSendError::Closed,
        })
    }
}

/// State of a [`ChannelTxDroppable`]: once a send fails the channel is marked `Disabled`
/// and every subsequent send is a silent no-op instead of panicking or retrying forever.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum ChannelState {
    Enabled,
    Disabled,
}

/// A [`Tx`] wrapper that tolerates a dead receiver: after one failed send it logs a warning
/// and flips itself to `Disabled`, silently dropping everything sent afterwards rather than
/// erroring on every call. Used for the journal's audit-log tap and other best-effort
/// consumers where losing events is acceptable but crashing the producer is not.
#[derive(Debug, Clone)]
pub struct ChannelTxDroppable<Tx> {
    tx: Tx,
    state: std::sync::Arc<std::sync::atomic::AtomicBool>,
    label: &'static str,
}

impl<T> ChannelTxDroppable<T> {
    pub fn new(tx: T, label: &'static str) -> Self {
        Self {
            tx,
            state: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true)),
            label,
        }
    }

    fn state(&self) -> ChannelState {
        if self.state.load(std::sync::atomic::Ordering::Acquire) {
            ChannelState::Enabled
        } else {
            ChannelState::Disabled
        }
    }

    fn disable(&self) {
        self.state.store(false, std::sync::atomic::Ordering::Release);
    }
}

impl<Item, T> Tx<Item> for ChannelTxDroppable<T>
where
    T: Tx<Item>,
{
    type Error = std::convert::Infallible;

    fn send(&self, item: Item) -> Result<(), Self::Error> {
        if self.state() == ChannelState::Disabled {
            return Ok(());
        }
        if let Err(error) = self.tx.send(item) {
            warn!(label = self.label, ?error, "channel send failed, disabling");
            self.disable();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn droppable_channel_disables_after_first_failed_send() {
        let (tx, rx) = mpsc::unbounded_channel::<u32>();
        drop(rx);
        let droppable = ChannelTxDroppable::new(UnboundedTx(tx), "test");

        assert!(droppable.send(1).is_ok());
        assert_eq!(droppable.state(), ChannelState::Disabled);
        assert!(droppable.send(2).is_ok());
    }

    #[tokio::test]
    async fn bounded_tx_reports_full_without_blocking() {
        let (tx, mut rx) = mpsc::channel::<u32>(1);
        let bounded = BoundedTx(tx);

        bounded.send(1).unwrap();
        let err = bounded.send(2).unwrap_err();
        assert!(matches!(err, BoundedSendError::Full));

        assert_eq!(rx.recv().await, Some(1));
    }
}
