//! Request builder: a command name plus binary-safe arguments.

use bytes::Bytes;

use super::frame::Frame;

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    name: &'static str,
    args: Vec<Bytes>,
}

impl Command {
    pub fn new(name: &'static str) -> Self {
        Self { name, args: Vec::new() }
    }

    pub fn arg(mut self, arg: impl Into<Bytes>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    // ===== Commands used by the transfer =====

    pub fn scan(cursor: u64, count: Option<usize>) -> Self {
        let cmd = Command::new("SCAN").arg(cursor.to_string());
        match count {
            Some(count) => cmd.arg("COUNT").arg(count.to_string()),
            None => cmd,
        }
    }

    pub fn dump(key: Bytes) -> Self {
        Command::new("DUMP").arg(key)
    }

    pub fn pttl(key: Bytes) -> Self {
        Command::new("PTTL").arg(key)
    }

    /// RESTORE with REPLACE: overwrites whatever the destination holds at `key`.
    pub fn restore_replace(key: Bytes, ttl_ms: u64, payload: Bytes) -> Self {
        Command::new("RESTORE")
            .arg(key)
            .arg(ttl_ms.to_string())
            .arg(payload)
            .arg("REPLACE")
    }

    pub fn auth(username: Option<&str>, password: &str) -> Self {
        let cmd = Command::new("AUTH");
        let cmd = match username {
            Some(user) => cmd.arg(user.to_string()),
            None => cmd,
        };
        cmd.arg(password.to_string())
    }

    pub fn select(db: u32) -> Self {
        Command::new("SELECT").arg(db.to_string())
    }
}

impl From<Command> for Frame {
    fn from(cmd: Command) -> Self {
        let mut items = Vec::with_capacity(cmd.args.len() + 1);
        items.push(Frame::bulk(Bytes::from_static(cmd.name.as_bytes())));
        items.extend(cmd.args.into_iter().map(Frame::bulk));
        Frame::array(items)
    }
}
