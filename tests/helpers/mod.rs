#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{BufMut, Bytes, BytesMut};
use dashmap::{DashMap, DashSet};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use uuid::Uuid;

use rump::protocol::{Frame, RespCodec};

// ========================================
// FAKE STORE
// ========================================

/// Prefix of every payload produced by the fake DUMP; RESTORE rejects anything else.
pub const DUMP_MAGIC: &[u8] = b"\x00FAKEDUMP\x01";

#[derive(Clone, Debug)]
struct Entry {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(at) if now >= at)
    }
}

#[derive(Default)]
struct StoreState {
    entries: DashMap<Bytes, Entry>,
    page_size: AtomicUsize,
    empty_pages: AtomicUsize,
    calls: DashMap<String, usize>,
    last_args: DashMap<String, Vec<Bytes>>,
    failing: DashSet<String>,
    vanish_on_dump: DashSet<Bytes>,
    forced_pttl: DashMap<Bytes, i64>,
}

/// In-process RESP store speaking just enough of the protocol for a sync:
/// PING, AUTH, SELECT, SCAN, DUMP, PTTL and RESTORE.
pub struct FakeStore {
    addr: SocketAddr,
    state: Arc<StoreState>,
}

impl FakeStore {
    pub async fn start() -> Self {
        Self::with_page_size(10).await
    }

    /// `page_size` keys per SCAN reply unless the client sends COUNT.
    pub async fn with_page_size(page_size: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state = Arc::new(StoreState::default());
        state.page_size.store(page_size.max(1), Ordering::SeqCst);

        let accept_state = state.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve(socket, accept_state.clone()));
            }
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("redis://{}/0", self.addr)
    }

    pub fn url_with(&self, userinfo: &str, db: u32) -> String {
        format!("redis://{}@{}/{}", userinfo, self.addr, db)
    }

    pub fn insert(&self, key: &str, value: &[u8], ttl: Option<Duration>) {
        let entry = Entry {
            value: Bytes::copy_from_slice(value),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.state.entries.insert(Bytes::copy_from_slice(key.as_bytes()), entry);
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        let entry = self.state.entries.get(key.as_bytes())?;
        if entry.is_expired(Instant::now()) {
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn pttl(&self, key: &str) -> i64 {
        self.state.pttl(key.as_bytes())
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.state
            .entries
            .iter()
            .filter(|e| !e.value().is_expired(now))
            .count()
    }

    pub fn calls(&self, command: &str) -> usize {
        self.state.calls.get(command).map(|n| *n).unwrap_or(0)
    }

    pub fn last_args(&self, command: &str) -> Option<Vec<Bytes>> {
        self.state.last_args.get(command).map(|args| args.clone())
    }

    /// Every later call of `command` gets an error reply.
    pub fn fail_on(&self, command: &str) {
        self.state.failing.insert(command.to_uppercase());
    }

    /// The key is deleted right before its DUMP runs, as if it had expired.
    pub fn vanish_on_dump(&self, key: &str) {
        self.state.vanish_on_dump.insert(Bytes::copy_from_slice(key.as_bytes()));
    }

    pub fn force_pttl(&self, key: &str, pttl: i64) {
        self.state.forced_pttl.insert(Bytes::copy_from_slice(key.as_bytes()), pttl);
    }

    /// The next `n` SCAN replies carry no keys but a non-zero cursor.
    pub fn return_empty_pages(&self, n: usize) {
        self.state.empty_pages.store(n, Ordering::SeqCst);
    }
}

// Reads and writes run on separate tasks: a client that pipelines without
// reading must never stall the command loop on a full socket.
async fn serve(socket: TcpStream, state: Arc<StoreState>) {
    let (mut sink, mut stream) = Framed::new(socket, RespCodec::new()).split::<Frame>();
    let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();

    let writer = tokio::spawn(async move {
        while let Some(reply) = rx.recv().await {
            if sink.feed(reply).await.is_err() {
                return;
            }
            while let Ok(reply) = rx.try_recv() {
                if sink.feed(reply).await.is_err() {
                    return;
                }
            }
            if sink.flush().await.is_err() {
                return;
            }
        }
    });

    while let Some(Ok(frame)) = stream.next().await {
        if tx.send(state.execute(frame)).is_err() {
            break;
        }
    }
    drop(tx);
    let _ = writer.await;
}

impl StoreState {
    fn execute(&self, frame: Frame) -> Frame {
        let args: Vec<Bytes> = match frame.into_array() {
            Some(items) => items.into_iter().filter_map(Frame::into_bulk).collect(),
            None => return Frame::error("ERR Protocol error: expected array"),
        };
        let Some((name, rest)) = args.split_first() else {
            return Frame::error("ERR empty command");
        };

        let name = String::from_utf8_lossy(name).to_uppercase();
        *self.calls.entry(name.clone()).or_insert(0) += 1;
        self.last_args.insert(name.clone(), rest.to_vec());

        if self.failing.contains(&name) {
            return Frame::error(format!("ERR injected failure on {name}"));
        }

        match name.as_str() {
            "PING" => Frame::simple("PONG"),
            "AUTH" | "SELECT" => Frame::simple("OK"),
            "SCAN" => self.scan(rest),
            "DUMP" => self.dump(rest),
            "PTTL" => match rest.first() {
                Some(key) => Frame::Integer(self.pttl(key)),
                None => wrong_arity("pttl"),
            },
            "RESTORE" => self.restore(rest),
            other => Frame::error(format!("ERR unknown command '{}'", other.to_lowercase())),
        }
    }

    // Cursor token t resumes at index t - 1 of the sorted live keys; 0 starts over.
    fn scan(&self, args: &[Bytes]) -> Frame {
        let Some(token) = args.first().and_then(|t| parse_num::<u64>(t)) else {
            return Frame::error("ERR invalid cursor");
        };
        let mut page = self.page_size.load(Ordering::SeqCst);
        if args.len() >= 3 && args[1].eq_ignore_ascii_case(b"COUNT") {
            match parse_num::<usize>(&args[2]) {
                Some(count) if count > 0 => page = count,
                _ => return Frame::error("ERR syntax error"),
            }
        }

        let start = token.saturating_sub(1) as usize;

        let empty = self
            .empty_pages
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if empty {
            return scan_reply(start as u64 + 1, Vec::new());
        }

        let now = Instant::now();
        let mut keys: Vec<Bytes> = self
            .entries
            .iter()
            .filter(|e| !e.value().is_expired(now))
            .map(|e| e.key().clone())
            .collect();
        keys.sort();

        let end = (start + page).min(keys.len());
        let batch = if start < end { keys[start..end].to_vec() } else { Vec::new() };
        let next = if end >= keys.len() { 0 } else { end as u64 + 1 };
        scan_reply(next, batch)
    }

    fn dump(&self, args: &[Bytes]) -> Frame {
        let Some(key) = args.first() else {
            return wrong_arity("dump");
        };
        if self.vanish_on_dump.remove(key).is_some() {
            self.entries.remove(key);
            return Frame::null();
        }
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(Instant::now()) => {
                let mut payload = BytesMut::with_capacity(DUMP_MAGIC.len() + entry.value.len());
                payload.put_slice(DUMP_MAGIC);
                payload.put_slice(&entry.value);
                Frame::bulk(payload.freeze())
            }
            _ => Frame::null(),
        }
    }

    fn pttl(&self, key: &[u8]) -> i64 {
        if let Some(forced) = self.forced_pttl.get(key) {
            return *forced;
        }
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => match entry.expires_at {
                None => -1,
                Some(at) => at.saturating_duration_since(now).as_millis() as i64,
            },
            _ => -2,
        }
    }

    fn restore(&self, args: &[Bytes]) -> Frame {
        if args.len() < 3 {
            return wrong_arity("restore");
        }
        let (key, ttl, payload) = (&args[0], &args[1], &args[2]);

        let ttl_ms = match parse_num::<i64>(ttl) {
            Some(ms) if ms >= 0 => ms as u64,
            _ => return Frame::error("ERR Invalid TTL value, must be >= 0"),
        };
        let Some(value) = payload.strip_prefix(DUMP_MAGIC) else {
            return Frame::error("ERR DUMP payload version or checksum are wrong");
        };
        let replace = args[3..].iter().any(|a| a.eq_ignore_ascii_case(b"REPLACE"));

        let now = Instant::now();
        let exists = matches!(self.entries.get(key), Some(entry) if !entry.is_expired(now));
        if exists && !replace {
            return Frame::error("BUSYKEY Target key name already exists.");
        }

        let entry = Entry {
            value: Bytes::copy_from_slice(value),
            expires_at: (ttl_ms > 0).then(|| now + Duration::from_millis(ttl_ms)),
        };
        self.entries.insert(key.clone(), entry);
        Frame::simple("OK")
    }
}

fn scan_reply(cursor: u64, keys: Vec<Bytes>) -> Frame {
    Frame::array(vec![
        Frame::bulk(cursor.to_string()),
        Frame::array(keys.into_iter().map(Frame::bulk).collect()),
    ])
}

fn wrong_arity(command: &str) -> Frame {
    Frame::error(format!("ERR wrong number of arguments for '{command}' command"))
}

fn parse_num<T: std::str::FromStr>(raw: &[u8]) -> Option<T> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}

// ========================================
// FIXTURES
// ========================================

pub fn unique_key(prefix: &str) -> String {
    format!("{}:{}", prefix, Uuid::new_v4())
}

/// Source with `n` persistent keys `key:{i}` → `value:{i}`, plus an empty destination.
pub async fn seeded_pair(n: usize, page_size: usize) -> (FakeStore, FakeStore) {
    let source = FakeStore::with_page_size(page_size).await;
    for i in 0..n {
        source.insert(&format!("key:{i}"), format!("value:{i}").as_bytes(), None);
    }
    let destination = FakeStore::start().await;
    (source, destination)
}

/// The `--from`/`--to` pair a test run uses against fake stores.
pub fn options_for(source: &FakeStore, destination: &FakeStore) -> rump::SyncOptions {
    let mut options = rump::SyncOptions::new(source.url(), destination.url());
    options.connect_timeout = Duration::from_secs(2);
    options
}

// ========================================
// BENCHMARK
// ========================================

pub struct Benchmark {
    pub name: String,
    pub start: Instant,
    pub count: usize,
    pub samples: Vec<Duration>,
}

impl Benchmark {
    pub fn start(name: &str, count: usize) -> Self {
        Self {
            name: name.to_string(),
            start: Instant::now(),
            count,
            samples: Vec::new(),
        }
    }

    pub fn record(&mut self, duration: Duration) {
        self.samples.push(duration);
    }

    /// Prints keys/sec over the whole run and the latency spread of the samples.
    pub fn stop(mut self) {
        let total = self.start.elapsed();
        let keys_sec = self.count as f64 / total.as_secs_f64();

        self.samples.sort();
        let pick = |pct: usize| {
            self.samples
                .get(self.samples.len() * pct / 100)
                .copied()
                .unwrap_or(Duration::ZERO)
                .as_micros()
        };
        let max = self.samples.last().copied().unwrap_or(Duration::ZERO).as_micros();

        println!("\n{}", self.name);
        println!(" Throughput:    {:.0} keys/sec", keys_sec);
        println!(" Total Time:    {:.2?}", total);
        println!(
            " Sample (µs):   p50: {} | p95: {} | p99: {} | MAX: {}",
            pick(50),
            pick(95),
            pick(99),
            max
        );
        println!(" Keys:          {}\n", self.count);
    }
}
