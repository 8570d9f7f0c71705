//! Store location strings: `redis://[[username]:password@]host[:port][/db]`

use std::fmt;

use crate::error::SyncError;

pub const SCHEME: &str = "redis://";
pub const DEFAULT_PORT: u16 = 6379;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub host: String,
    pub port: u16,
    pub db: u32,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Location {
    pub fn parse(raw: &str) -> Result<Self, SyncError> {
        let invalid = |reason: &str| SyncError::InvalidLocation {
            location: raw.to_string(),
            reason: reason.to_string(),
        };

        let rest = match raw.strip_prefix(SCHEME) {
            Some(rest) => rest,
            None if raw.contains("://") => return Err(invalid("unsupported scheme")),
            None => return Err(invalid("missing redis:// scheme")),
        };

        let rest = rest.split('?').next().unwrap_or_default();
        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx + 1..]),
            None => (rest, ""),
        };

        let (userinfo, hostport) = match authority.rsplit_once('@') {
            Some((userinfo, hostport)) => (Some(userinfo), hostport),
            None => (None, authority),
        };

        // Credentials may carry percent-escapes for '@', ':', '/' and friends
        let decode = |part: &str| -> Result<Option<String>, SyncError> {
            if !well_formed_escapes(part) {
                return Err(invalid("malformed percent-escape in credentials"));
            }
            let decoded = urlencoding::decode(part)
                .map_err(|_| invalid("credentials are not valid UTF-8 once decoded"))?;
            Ok(non_empty(&decoded))
        };

        let (username, password) = match userinfo {
            Some(info) => match info.split_once(':') {
                Some((user, pass)) => (decode(user)?, decode(pass)?),
                None => (decode(info)?, None),
            },
            None => (None, None),
        };

        let (host, port) = split_host_port(hostport).map_err(|reason| invalid(reason))?;
        if host.is_empty() {
            return Err(invalid("empty host"));
        }

        let db = match path.trim_end_matches('/') {
            "" => 0,
            db => db.parse::<u32>().map_err(|_| invalid("database must be a number"))?,
        };

        Ok(Self {
            host: host.to_string(),
            port,
            db,
            username,
            password,
        })
    }

    /// `host:port` suitable for dialing.
    pub fn addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Never prints credentials.
impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", SCHEME, self.addr(), self.db)
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn well_formed_escapes(part: &str) -> bool {
    let bytes = part.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            match bytes.get(i + 1..i + 3) {
                Some(hex) if hex.iter().all(u8::is_ascii_hexdigit) => i += 3,
                _ => return false,
            }
        } else {
            i += 1;
        }
    }
    true
}

fn split_host_port(hostport: &str) -> Result<(&str, u16), &'static str> {
    // [v6]:port
    if let Some(stripped) = hostport.strip_prefix('[') {
        let (host, tail) = stripped.split_once(']').ok_or("unterminated IPv6 literal")?;
        return match tail {
            "" => Ok((host, DEFAULT_PORT)),
            tail => match tail.strip_prefix(':') {
                Some(port) => Ok((host, parse_port(port)?)),
                None => Err("unexpected text after IPv6 literal"),
            },
        };
    }

    match hostport.rsplit_once(':') {
        Some((host, port)) => Ok((host, parse_port(port)?)),
        None => Ok((hostport, DEFAULT_PORT)),
    }
}

fn parse_port(port: &str) -> Result<u16, &'static str> {
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err("port must be between 1 and 65535"),
        Ok(port) => Ok(port),
    }
}
