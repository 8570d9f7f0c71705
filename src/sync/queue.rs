//! Hand-off queue: bounded FIFO between exactly one scanner and one restorer.
//!
//! Closing is the only end-of-stream signal: [`RecordSender::close`] (or
//! dropping the sender) lets the receiver drain what is left and then
//! observe `None`.

use tokio::sync::mpsc;

use crate::error::SyncError;
use crate::sync::record::SerializedRecord;

pub fn handoff(capacity: usize) -> (RecordSender, RecordReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (RecordSender { tx }, RecordReceiver { rx })
}

pub struct RecordSender {
    tx: mpsc::Sender<SerializedRecord>,
}

impl RecordSender {
    /// Waits while the queue is full.
    pub async fn push(&self, record: SerializedRecord) -> Result<(), SyncError> {
        self.tx.send(record).await.map_err(|_| SyncError::QueueClosed)
    }

    pub fn close(self) {}

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }
}

pub struct RecordReceiver {
    rx: mpsc::Receiver<SerializedRecord>,
}

impl RecordReceiver {
    /// Waits while the queue is empty and still open; `None` once closed and drained.
    pub async fn pop(&mut self) -> Option<SerializedRecord> {
        self.rx.recv().await
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
