use crate::protocol::ParseError;

/// Every way a run can fail. All variants are fatal: the run stops and the
/// message is reported once.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("config: {0}")]
    Config(String),

    #[error("invalid location {location:?}: {reason}")]
    InvalidLocation { location: String, reason: String },

    #[error("dial {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    #[error("dial {addr}: timed out after {timeout_ms} ms")]
    ConnectTimeout { addr: String, timeout_ms: u64 },

    #[error("{peer}: {source}")]
    Protocol { peer: String, source: ParseError },

    #[error("{peer}: connection closed with {pending} replies outstanding")]
    ConnectionClosed { peer: String, pending: usize },

    #[error("{command}: {message}")]
    Server { command: String, message: String },

    #[error("{command}: unexpected reply ({reply})")]
    UnexpectedReply { command: String, reply: String },

    #[error("PTTL {key}: invalid remaining lifetime {ttl_ms}")]
    LifetimeAnomaly { key: String, ttl_ms: i64 },

    #[error("hand-off queue closed by the restorer")]
    QueueClosed,

    #[error("scanner task: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl SyncError {
    pub(crate) fn unexpected(command: &str, reply: &crate::protocol::Frame) -> Self {
        SyncError::UnexpectedReply {
            command: command.to_string(),
            reply: reply.describe(),
        }
    }
}
