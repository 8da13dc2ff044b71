// Poll scheduling
//
// A fixed interval drives ticks; the first tick fires immediately. Fetches
// run inside one task via FuturesUnordered, so ticks can overlap without any
// state being touched from more than one place.

use super::{PollObserver, PollState, Poller};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Cancellation flag for the repeating timer (and anything tied to its lifetime)
///
/// Cloning shares the flag. Cancelling is idempotent.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation; true only for the call that actually cancelled
    pub fn cancel(&self) -> bool {
        self.tx.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        })
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as self, so this cannot fail while we wait
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the poller until its timer is cancelled
///
/// The timer is cancelled by the poller itself when the feed drains, or from
/// outside on shutdown. Fetches still in flight at that point are dropped.
pub async fn run<O: PollObserver>(mut poller: Poller<O>) -> PollState {
    let timer = poller.timer().clone();
    let mut interval = tokio::time::interval(poller.timing().interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut in_flight = FuturesUnordered::new();

    poller.announce();
    tracing::info!("Polling every {:?}", poller.timing().interval);

    loop {
        tokio::select! {
            _ = timer.cancelled() => break,

            _ = interval.tick() => {
                if let Some(seq) = poller.begin_tick() {
                    let fetch = poller.fetch();
                    in_flight.push(async move { (seq, fetch.await) });
                }
            }

            Some((seq, result)) = in_flight.next(), if !in_flight.is_empty() => {
                poller.apply(seq, result);
            }
        }
    }

    if !in_flight.is_empty() {
        tracing::debug!("Dropping {} in-flight fetches", in_flight.len());
    }
    poller.into_state()
}
