//! Async adapter over [`MessageIterator`]
//!
//! Segment reads are blocking SQLite calls, so the iterator runs on tokio's
//! blocking pool and hands items to the consumer through a bounded channel.
//! The reader never gets more than `capacity` items ahead.

use crate::iterator::{IteratorItem, MessageIterator};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A [`MessageIterator`] consumed asynchronously.
///
/// Must be created from within a tokio runtime.
#[derive(Debug)]
pub struct MessageStream {
    rx: mpsc::Receiver<IteratorItem>,
    reader: Option<JoinHandle<()>>,
}

impl MessageStream {
    pub(crate) fn spawn(mut iterator: MessageIterator, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let reader = tokio::task::spawn_blocking(move || {
            for item in iterator.by_ref() {
                if tx.blocking_send(item).is_err() {
                    tracing::debug!("Message stream receiver dropped, stopping reader");
                    break;
                }
            }
            iterator.close();
        });
        MessageStream {
            rx,
            reader: Some(reader),
        }
    }

    /// Next item, or `None` once the iterator is exhausted or closed.
    pub async fn next(&mut self) -> Option<IteratorItem> {
        self.rx.recv().await
    }

    /// Stop reading and wait for the reader to release its segments.
    pub async fn close(mut self) {
        self.rx.close();
        // Drain so a reader blocked on a full channel wakes up and exits.
        while self.rx.recv().await.is_some() {}
        if let Some(reader) = self.reader.take() {
            if let Err(e) = reader.await {
                tracing::warn!(error = %e, "Message stream reader failed");
            }
        }
    }
}

impl MessageIterator {
    /// Move this iterator onto the blocking pool and consume it as a stream.
    pub fn into_stream(self, capacity: usize) -> MessageStream {
        MessageStream::spawn(self, capacity)
    }
}
