use bytes::Bytes;

use crate::error::SyncError;

/// PTTL reply for a key without expiry
pub const NO_EXPIRY: i64 = -1;
/// PTTL reply for a key that no longer exists
pub const KEY_MISSING: i64 = -2;

/// Expiry argument of RESTORE meaning "persist"
pub const RESTORE_NO_EXPIRY: u64 = 0;

/// The unit of transfer: one key, its DUMP payload and its remaining lifetime.
///
/// Built by the scanner once both replies for the key are known, handed over
/// exactly once through the queue, consumed by the restorer.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedRecord {
    pub key: Bytes,
    pub value: Bytes,
    /// Milliseconds until expiry, [`NO_EXPIRY`] when the key is persistent.
    pub remaining_lifetime_ms: i64,
}

/// Classification of a PTTL reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    Persistent,
    Expiring(u64),
    Missing,
}

impl Lifetime {
    pub fn from_pttl(key: &[u8], pttl: i64) -> Result<Self, SyncError> {
        match pttl {
            NO_EXPIRY => Ok(Lifetime::Persistent),
            KEY_MISSING => Ok(Lifetime::Missing),
            ms if ms >= 0 => Ok(Lifetime::Expiring(ms as u64)),
            ms => Err(SyncError::LifetimeAnomaly {
                key: String::from_utf8_lossy(key).into_owned(),
                ttl_ms: ms,
            }),
        }
    }
}

impl SerializedRecord {
    /// `None` when the key vanished between listing and fetching.
    pub fn new(key: Bytes, value: Option<Bytes>, lifetime: Lifetime) -> Option<Self> {
        let value = value?;
        let remaining_lifetime_ms = match lifetime {
            Lifetime::Persistent => NO_EXPIRY,
            Lifetime::Expiring(ms) => ms.min(i64::MAX as u64) as i64,
            Lifetime::Missing => return None,
        };
        Some(Self {
            key,
            value,
            remaining_lifetime_ms,
        })
    }

    /// Expiry argument for RESTORE.
    ///
    /// A key caught with 0 ms left is restored with 1 ms: RESTORE reads 0 as
    /// "no expiry", which would resurrect the key forever.
    pub fn restore_ttl_ms(&self) -> u64 {
        match self.remaining_lifetime_ms {
            NO_EXPIRY => RESTORE_NO_EXPIRY,
            ms => ms.max(1) as u64,
        }
    }
}
