//! Run orchestration: two connections, one queue, scanner spawned, restorer
//! in the foreground, first fatal error wins.

use std::time::{Duration, Instant};

use tracing::info;

use crate::client::Connection;
use crate::config::{Config, DEFAULT_QUEUE_CAPACITY};
use crate::error::SyncError;
use crate::sync::queue::handoff;
use crate::sync::restorer::{drain_and_restore, RestoreStats};
use crate::sync::scanner::{scan_and_emit, ScanOptions, ScanStats};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub from: String,
    pub to: String,
    pub queue_capacity: usize,
    pub scan_count: Option<usize>,
    pub connect_timeout: Duration,
}

impl SyncOptions {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            scan_count: None,
            connect_timeout: Duration::from_secs(5),
        }
    }

    pub fn from_config(from: impl Into<String>, to: impl Into<String>, config: &Config) -> Self {
        Self {
            queue_capacity: config.sync.queue_capacity,
            scan_count: match config.sync.scan_count {
                0 => None,
                n => Some(n),
            },
            connect_timeout: Duration::from_millis(config.client.connect_timeout_ms),
            ..Self::new(from, to)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub batches: u64,
    pub keys_listed: u64,
    pub restored: u64,
    pub vanished: u64,
    pub bytes: u64,
    pub elapsed: Duration,
}

impl SyncReport {
    fn new(scan: ScanStats, restore: RestoreStats, elapsed: Duration) -> Self {
        Self {
            batches: scan.batches,
            keys_listed: scan.keys_listed,
            restored: restore.restored,
            vanished: scan.vanished,
            bytes: restore.bytes,
            elapsed,
        }
    }
}

/// Copies every key of `options.from` into `options.to`.
///
/// The scanner owns the source connection on its own task; the restorer
/// borrows the destination connection on the caller's task. If the scanner
/// fails its error is returned as soon as it is observed; if the restorer
/// fails the scanner task is aborted. Both connections are released on every
/// path.
pub async fn run(options: &SyncOptions) -> Result<SyncReport, SyncError> {
    let started = Instant::now();

    let source = Connection::connect(&options.from, options.connect_timeout).await?;
    let mut destination = Connection::connect(&options.to, options.connect_timeout).await?;

    info!(
        from = %source.peer(),
        to = %destination.peer(),
        queue_capacity = options.queue_capacity,
        "sync started"
    );

    let (tx, rx) = handoff(options.queue_capacity);
    let scan_options = ScanOptions {
        count: options.scan_count,
    };
    let mut scanner = tokio::spawn(scan_and_emit(source, tx, scan_options));

    let (scan, restore) = {
        let restorer = drain_and_restore(&mut destination, rx);
        tokio::pin!(restorer);

        tokio::select! {
            scanned = &mut scanner => {
                let scan = scanned??;
                (scan, restorer.await?)
            }
            restored = &mut restorer => match restored {
                Ok(restore) => (scanner.await??, restore),
                Err(err) => {
                    scanner.abort();
                    return Err(err);
                }
            },
        }
    };

    destination.close().await;

    let report = SyncReport::new(scan, restore, started.elapsed());
    info!(
        batches = report.batches,
        restored = report.restored,
        vanished = report.vanished,
        bytes = report.bytes,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "sync finished"
    );
    Ok(report)
}
