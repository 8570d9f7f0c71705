//! Source side: cursor scan, pipelined DUMP and PTTL per batch, one record
//! per live key into the hand-off queue.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::client::{Connection, Pipeline};
use crate::error::SyncError;
use crate::protocol::{Command, Frame};
use crate::sync::queue::RecordSender;
use crate::sync::record::{Lifetime, SerializedRecord};

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// COUNT hint sent with every SCAN
    pub count: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub batches: u64,
    pub keys_listed: u64,
    pub emitted: u64,
    /// Keys listed by SCAN that were gone by the time DUMP/PTTL ran
    pub vanished: u64,
}

/// Walks the whole source keyspace and closes the queue when the cursor
/// comes back as 0. The queue is also closed (by drop) on error; the caller
/// decides what the error means for the run.
pub async fn scan_and_emit(
    mut source: Connection,
    queue: RecordSender,
    options: ScanOptions,
) -> Result<ScanStats, SyncError> {
    let mut stats = ScanStats::default();
    let mut cursor = 0u64;

    loop {
        let (next_cursor, keys) = scan_batch(&mut source, cursor, options.count).await?;
        stats.batches += 1;
        stats.keys_listed += keys.len() as u64;

        if !keys.is_empty() {
            let records = fetch_batch(&mut source, keys, &mut stats).await?;
            for record in records {
                queue.push(record).await?;
                stats.emitted += 1;
            }
        }

        debug!(
            peer = %source.peer(),
            cursor,
            next_cursor,
            emitted = stats.emitted,
            "scan batch done"
        );

        if next_cursor == 0 {
            break;
        }
        cursor = next_cursor;
    }

    queue.close();
    source.close().await;
    Ok(stats)
}

/// One SCAN round trip: `[cursor, [key...]]`.
async fn scan_batch(
    source: &mut Connection,
    cursor: u64,
    count: Option<usize>,
) -> Result<(u64, Vec<Bytes>), SyncError> {
    let reply = source.request(Command::scan(cursor, count)).await?;
    parse_scan_reply(reply)
}

pub(crate) fn parse_scan_reply(reply: Frame) -> Result<(u64, Vec<Bytes>), SyncError> {
    let malformed = |frame: &Frame| SyncError::unexpected("SCAN", frame);

    let items = match reply {
        Frame::Array(Some(items)) if items.len() == 2 => items,
        other => return Err(malformed(&other)),
    };
    let mut items = items.into_iter();
    let (cursor_frame, keys_frame) = match (items.next(), items.next()) {
        (Some(cursor), Some(keys)) => (cursor, keys),
        _ => return Err(SyncError::unexpected("SCAN", &Frame::Array(None))),
    };

    let next_cursor = match &cursor_frame {
        Frame::Bulk(Some(raw)) | Frame::Simple(raw) => std::str::from_utf8(raw)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| malformed(&cursor_frame))?,
        Frame::Integer(n) if *n >= 0 => *n as u64,
        other => return Err(malformed(other)),
    };

    let keys = match keys_frame {
        Frame::Array(Some(keys)) => keys
            .into_iter()
            .map(|key| match key {
                Frame::Bulk(Some(key)) | Frame::Simple(key) => Ok(key),
                other => Err(malformed(&other)),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Frame::Array(None) => Vec::new(),
        other => return Err(malformed(&other)),
    };

    Ok((next_cursor, keys))
}

/// Two round trips for the batch: every DUMP, then every PTTL, same key order.
async fn fetch_batch(
    source: &mut Connection,
    keys: Vec<Bytes>,
    stats: &mut ScanStats,
) -> Result<Vec<SerializedRecord>, SyncError> {
    let dumps: Pipeline = keys.iter().cloned().map(Command::dump).collect();
    let dumps = source.query(dumps).await?;

    let pttls: Pipeline = keys.iter().cloned().map(Command::pttl).collect();
    let pttls = source.query(pttls).await?;

    if dumps.len() != keys.len() || pttls.len() != keys.len() {
        return Err(SyncError::UnexpectedReply {
            command: "DUMP/PTTL".to_string(),
            reply: format!(
                "{} and {} replies for {} keys",
                dumps.len(),
                pttls.len(),
                keys.len()
            ),
        });
    }

    let mut records = Vec::with_capacity(keys.len());
    for ((key, dump), pttl) in keys.into_iter().zip(dumps).zip(pttls) {
        match build_record(key, dump, pttl)? {
            Ok(record) => records.push(record),
            Err(key) => {
                stats.vanished += 1;
                debug!(key = %String::from_utf8_lossy(&key), "key vanished before fetch, skipped");
            }
        }
    }
    Ok(records)
}

/// Outer error is fatal; inner `Err(key)` is a key that no longer exists.
pub(crate) fn build_record(
    key: Bytes,
    dump: Frame,
    pttl: Frame,
) -> Result<Result<SerializedRecord, Bytes>, SyncError> {
    let value = match dump {
        Frame::Bulk(value) => value,
        other => return Err(SyncError::unexpected("DUMP", &other)),
    };

    let pttl = match pttl.as_integer() {
        Some(ms) => ms,
        None => return Err(SyncError::unexpected("PTTL", &pttl)),
    };

    let lifetime = match Lifetime::from_pttl(&key, pttl) {
        Ok(lifetime) => lifetime,
        Err(err) => {
            warn!(key = %String::from_utf8_lossy(&key), pttl, "negative lifetime from source");
            return Err(err);
        }
    };

    match SerializedRecord::new(key.clone(), value, lifetime) {
        Some(record) => Ok(Ok(record)),
        None => Ok(Err(key)),
    }
}
