//! rump: copy every key of one Redis-protocol store into another with
//! DUMP/RESTORE, keeping values byte-identical and carrying remaining TTLs.
//!
//! Pipeline: scanner (SCAN + pipelined DUMP/PTTL on the source) → bounded
//! hand-off queue → restorer (pipelined RESTORE ... REPLACE on the destination).

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod sync;

pub use error::SyncError;
pub use sync::{run, SyncOptions, SyncReport};
