//! One client connection to a store: framed RESP over TCP with deferred replies.
//!
//! Commands are written with [`Connection::feed`] without waiting for their
//! replies; [`Connection::flush_pipeline`] pushes out whatever is still
//! buffered and then reads one reply per outstanding command, in order.

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::debug;

use crate::client::location::Location;
use crate::client::pipeline::Pipeline;
use crate::error::SyncError;
use crate::protocol::{Command, Frame, ParseError, RespCodec};

pub struct Connection {
    framed: Framed<TcpStream, RespCodec>,
    peer: String,
    // Command names awaiting a reply, oldest first
    pending: VecDeque<&'static str>,
}

impl Connection {
    /// Parses `location`, dials it and runs the AUTH/SELECT handshake.
    pub async fn connect(location: &str, connect_timeout: Duration) -> Result<Self, SyncError> {
        let location = Location::parse(location)?;
        Self::open(&location, connect_timeout).await
    }

    pub async fn open(location: &Location, connect_timeout: Duration) -> Result<Self, SyncError> {
        let addr = location.addr();

        let stream = match tokio::time::timeout(connect_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(SyncError::Connect { addr, source }),
            Err(_) => {
                return Err(SyncError::ConnectTimeout {
                    addr,
                    timeout_ms: connect_timeout.as_millis() as u64,
                })
            }
        };

        if let Err(source) = stream.set_nodelay(true) {
            return Err(SyncError::Connect { addr, source });
        }

        let mut conn = Self {
            framed: Framed::new(stream, RespCodec::new()),
            peer: location.to_string(),
            pending: VecDeque::new(),
        };

        let mut handshake = Pipeline::with_capacity(2);
        if let Some(password) = &location.password {
            handshake.add(Command::auth(location.username.as_deref(), password));
        }
        if location.db != 0 {
            handshake.add(Command::select(location.db));
        }
        conn.query(handshake).await?;

        debug!(peer = %conn.peer, "connected");
        Ok(conn)
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Commands written but not yet answered.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Writes `cmd` without waiting for its reply. The codec buffer is pushed
    /// to the socket once it grows past the sink's backpressure boundary.
    pub async fn feed(&mut self, cmd: Command) -> Result<(), SyncError> {
        let name = cmd.name();
        if let Err(source) = self.framed.feed(Frame::from(cmd)).await {
            return Err(self.protocol_error(source));
        }
        self.pending.push_back(name);
        Ok(())
    }

    /// Flushes buffered commands and collects every outstanding reply.
    ///
    /// All replies are read even when one of them is an error reply, so the
    /// connection stays in step; the first error reply is then returned as
    /// [`SyncError::Server`].
    pub async fn flush_pipeline(&mut self) -> Result<Vec<Frame>, SyncError> {
        let mut replies = Vec::with_capacity(self.pending.len());
        self.drain_replies(|reply| replies.push(reply)).await?;
        Ok(replies)
    }

    /// Same as [`Connection::flush_pipeline`] but drops each reply once it
    /// has been checked, returning how many were read.
    pub async fn flush_count(&mut self) -> Result<usize, SyncError> {
        let mut count = 0;
        self.drain_replies(|_| count += 1).await?;
        Ok(count)
    }

    /// One round trip for the whole pipeline. Replies of commands fed earlier
    /// and not yet collected come first.
    pub async fn query(&mut self, pipeline: Pipeline) -> Result<Vec<Frame>, SyncError> {
        if pipeline.is_empty() && self.pending.is_empty() {
            return Ok(Vec::new());
        }
        self.pending.reserve(pipeline.len());
        for cmd in pipeline {
            self.feed(cmd).await?;
        }
        self.flush_pipeline().await
    }

    pub async fn request(&mut self, cmd: Command) -> Result<Frame, SyncError> {
        let name = cmd.name();
        let mut replies = self.query(std::iter::once(cmd).collect()).await?;
        replies.pop().ok_or_else(|| SyncError::UnexpectedReply {
            command: name.to_string(),
            reply: "no reply".to_string(),
        })
    }

    /// Shuts down the write side; dropping the connection has the same effect.
    pub async fn close(mut self) {
        let _ = self.framed.get_mut().shutdown().await;
        debug!(peer = %self.peer, "connection closed");
    }

    async fn drain_replies(&mut self, mut on_reply: impl FnMut(Frame)) -> Result<(), SyncError> {
        if let Err(source) = SinkExt::<Frame>::flush(&mut self.framed).await {
            return Err(self.protocol_error(source));
        }

        let mut first_error = None;
        while let Some(command) = self.pending.pop_front() {
            let reply = self.read_reply().await?;
            if first_error.is_none() {
                if let Some(message) = reply.error_message() {
                    first_error = Some(SyncError::Server {
                        command: command.to_string(),
                        message,
                    });
                }
            }
            on_reply(reply);
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn read_reply(&mut self) -> Result<Frame, SyncError> {
        match self.framed.next().await {
            Some(Ok(frame)) => Ok(frame),
            Some(Err(source)) => Err(self.protocol_error(source)),
            None => Err(SyncError::ConnectionClosed {
                peer: self.peer.clone(),
                pending: self.pending.len() + 1,
            }),
        }
    }

    fn protocol_error(&self, source: ParseError) -> SyncError {
        SyncError::Protocol {
            peer: self.peer.clone(),
            source,
        }
    }
}
