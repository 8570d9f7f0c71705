use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::errors::ParseError;
use super::frame::{
    Frame, CRLF, MARKER_ARRAY, MARKER_BULK, MARKER_ERROR, MARKER_INTEGER, MARKER_SIMPLE,
    MAX_ARRAY_LEN, MAX_BULK_LEN, MAX_DEPTH,
};

/// RESP2 codec. Symmetric: decodes and encodes whole [`Frame`]s, so the same
/// type serves the client connection and the in-process test store.
#[derive(Debug, Default)]
pub struct RespCodec;

impl RespCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for RespCodec {
    type Item = Frame;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let total_len = match frame_end(&src[..], 0, 0)? {
            Some(len) => len,
            None => return Ok(None),
        };

        let frame_bytes = src.split_to(total_len).freeze();
        let mut pos = 0;
        let frame = read_frame(&frame_bytes, &mut pos)?;

        Ok(Some(frame))
    }
}

impl Encoder<Frame> for RespCodec {
    type Error = ParseError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        write_frame(&item, dst);
        Ok(())
    }
}

// ========================================
// DECODING
// ========================================

fn find_crlf(buf: &[u8], from: usize) -> Option<usize> {
    if from >= buf.len() {
        return None;
    }
    buf[from..]
        .windows(CRLF.len())
        .position(|w| w == CRLF)
        .map(|i| from + i)
}

fn parse_int(line: &[u8]) -> Result<i64, ParseError> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            ParseError::Invalid(format!("bad integer {:?}", String::from_utf8_lossy(line)))
        })
}

fn checked_len(len: i64, max: usize, kind: &str) -> Result<usize, ParseError> {
    if len < 0 {
        return Err(ParseError::Invalid(format!("negative {} length {}", kind, len)));
    }
    let len = len as usize;
    if len > max {
        return Err(ParseError::TooLarge(format!(
            "{} length {} exceeds limit {}",
            kind, len, max
        )));
    }
    Ok(len)
}

/// End offset of the frame starting at `pos`, `None` while incomplete.
fn frame_end(buf: &[u8], pos: usize, depth: usize) -> Result<Option<usize>, ParseError> {
    if depth > MAX_DEPTH {
        return Err(ParseError::TooLarge(format!("nesting deeper than {}", MAX_DEPTH)));
    }

    let marker = match buf.get(pos) {
        Some(marker) => *marker,
        None => return Ok(None),
    };
    let line_end = match find_crlf(buf, pos + 1) {
        Some(end) => end,
        None => return Ok(None),
    };
    let line = &buf[pos + 1..line_end];
    let after_line = line_end + CRLF.len();

    match marker {
        MARKER_SIMPLE | MARKER_ERROR => Ok(Some(after_line)),
        MARKER_INTEGER => {
            parse_int(line)?;
            Ok(Some(after_line))
        }
        MARKER_BULK => {
            let len = parse_int(line)?;
            if len == -1 {
                return Ok(Some(after_line));
            }
            let len = checked_len(len, MAX_BULK_LEN, "bulk")?;
            let end = after_line + len + CRLF.len();
            if buf.len() < end {
                return Ok(None);
            }
            if &buf[after_line + len..end] != CRLF {
                return Err(ParseError::Invalid("bulk not terminated by CRLF".to_string()));
            }
            Ok(Some(end))
        }
        MARKER_ARRAY => {
            let count = parse_int(line)?;
            if count == -1 {
                return Ok(Some(after_line));
            }
            let count = checked_len(count, MAX_ARRAY_LEN, "array")?;
            let mut cursor = after_line;
            for _ in 0..count {
                match frame_end(buf, cursor, depth + 1)? {
                    Some(end) => cursor = end,
                    None => return Ok(None),
                }
            }
            Ok(Some(cursor))
        }
        other => Err(ParseError::Invalid(format!("unexpected type byte 0x{:02x}", other))),
    }
}

/// Builds a frame from a buffer already validated by [`frame_end`].
/// Bulk payloads are zero-copy slices of `data`.
fn read_frame(data: &Bytes, pos: &mut usize) -> Result<Frame, ParseError> {
    let marker = data[*pos];
    let line_end = find_crlf(data, *pos + 1)
        .ok_or_else(|| ParseError::Invalid("missing CRLF".to_string()))?;
    let line = data.slice(*pos + 1..line_end);
    *pos = line_end + CRLF.len();

    match marker {
        MARKER_SIMPLE => Ok(Frame::Simple(line)),
        MARKER_ERROR => Ok(Frame::Error(line)),
        MARKER_INTEGER => Ok(Frame::Integer(parse_int(&line)?)),
        MARKER_BULK => {
            let len = parse_int(&line)?;
            if len == -1 {
                return Ok(Frame::Bulk(None));
            }
            let len = checked_len(len, MAX_BULK_LEN, "bulk")?;
            let payload = data.slice(*pos..*pos + len);
            *pos += len + CRLF.len();
            Ok(Frame::Bulk(Some(payload)))
        }
        MARKER_ARRAY => {
            let count = parse_int(&line)?;
            if count == -1 {
                return Ok(Frame::Array(None));
            }
            let count = checked_len(count, MAX_ARRAY_LEN, "array")?;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(read_frame(data, pos)?);
            }
            Ok(Frame::Array(Some(items)))
        }
        other => Err(ParseError::Invalid(format!("unexpected type byte 0x{:02x}", other))),
    }
}

// ========================================
// ENCODING
// ========================================

fn write_frame(frame: &Frame, dst: &mut BytesMut) {
    match frame {
        Frame::Simple(s) => write_line(dst, MARKER_SIMPLE, s),
        Frame::Error(e) => write_line(dst, MARKER_ERROR, e),
        Frame::Integer(n) => write_line(dst, MARKER_INTEGER, n.to_string().as_bytes()),
        Frame::Bulk(None) => write_line(dst, MARKER_BULK, b"-1"),
        Frame::Bulk(Some(data)) => {
            dst.reserve(data.len() + 16);
            write_line(dst, MARKER_BULK, data.len().to_string().as_bytes());
            dst.put_slice(data);
            dst.put_slice(CRLF);
        }
        Frame::Array(None) => write_line(dst, MARKER_ARRAY, b"-1"),
        Frame::Array(Some(items)) => {
            write_line(dst, MARKER_ARRAY, items.len().to_string().as_bytes());
            for item in items {
                write_frame(item, dst);
            }
        }
    }
}

fn write_line(dst: &mut BytesMut, marker: u8, line: &[u8]) {
    dst.put_u8(marker);
    dst.put_slice(line);
    dst.put_slice(CRLF);
}
