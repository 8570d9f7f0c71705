//! RESP2 wire types and constants
//!
//! Every frame starts with a one byte type marker and every line ends in CRLF:
//!
//! Simple:  +OK\r\n
//! Error:   -ERR message\r\n
//! Integer: :1000\r\n
//! Bulk:    $5\r\nhello\r\n      ($-1\r\n is the null bulk)
//! Array:   *2\r\n<frame><frame> (*-1\r\n is the null array)
//!
//! Requests are always arrays of bulk strings.

use bytes::Bytes;

// ========================================
// TYPE MARKERS
// ========================================
pub const MARKER_SIMPLE: u8 = b'+';
pub const MARKER_ERROR: u8 = b'-';
pub const MARKER_INTEGER: u8 = b':';
pub const MARKER_BULK: u8 = b'$';
pub const MARKER_ARRAY: u8 = b'*';

pub const CRLF: &[u8] = b"\r\n";

// ========================================
// DECODER LIMITS
// ========================================
/// Matches the server default proto-max-bulk-len (512MB)
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;
pub const MAX_ARRAY_LEN: usize = 1024 * 1024;
pub const MAX_DEPTH: usize = 32;

// ========================================
// FRAME
// ========================================

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Simple(Bytes),
    Error(Bytes),
    Integer(i64),
    Bulk(Option<Bytes>),
    Array(Option<Vec<Frame>>),
}

impl Frame {
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Frame::Bulk(Some(data.into()))
    }

    pub fn simple(s: impl Into<Bytes>) -> Self {
        Frame::Simple(s.into())
    }

    pub fn error(s: impl Into<Bytes>) -> Self {
        Frame::Error(s.into())
    }

    pub fn array(frames: Vec<Frame>) -> Self {
        Frame::Array(Some(frames))
    }

    pub fn null() -> Self {
        Frame::Bulk(None)
    }

    /// Error text of an error reply, `None` for every other frame.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Frame::Error(msg) => Some(String::from_utf8_lossy(msg).into_owned()),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Frame::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn into_bulk(self) -> Option<Bytes> {
        match self {
            Frame::Bulk(data) => data,
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<Frame>> {
        match self {
            Frame::Array(items) => items,
            _ => None,
        }
    }

    /// Short human description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Frame::Simple(s) => format!("simple string {:?}", String::from_utf8_lossy(s)),
            Frame::Error(e) => format!("error {:?}", String::from_utf8_lossy(e)),
            Frame::Integer(n) => format!("integer {}", n),
            Frame::Bulk(None) => "null bulk".to_string(),
            Frame::Bulk(Some(data)) => format!("bulk of {} bytes", data.len()),
            Frame::Array(None) => "null array".to_string(),
            Frame::Array(Some(items)) => format!("array of {} elements", items.len()),
        }
    }
}
