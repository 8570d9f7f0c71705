//! Destination side: drain the queue into pipelined RESTORE ... REPLACE.

use tracing::debug;

use crate::client::Connection;
use crate::error::SyncError;
use crate::protocol::Command;
use crate::sync::queue::RecordReceiver;
use crate::sync::record::SerializedRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreStats {
    pub restored: u64,
    pub bytes: u64,
}

pub fn restore_command(record: SerializedRecord) -> Command {
    let ttl_ms = record.restore_ttl_ms();
    Command::restore_replace(record.key, ttl_ms, record.value)
}

/// Sends one RESTORE per record as records arrive, without reading replies,
/// then checks every reply in a single flush once the queue is closed and empty.
pub async fn drain_and_restore(
    destination: &mut Connection,
    mut queue: RecordReceiver,
) -> Result<RestoreStats, SyncError> {
    let mut stats = RestoreStats::default();

    while let Some(record) = queue.pop().await {
        stats.bytes += record.value.len() as u64;
        destination.feed(restore_command(record)).await?;
    }

    debug!(
        peer = %destination.peer(),
        pending = destination.pending(),
        "queue drained, collecting restore replies"
    );

    stats.restored = destination.flush_count().await? as u64;
    Ok(stats)
}
