//! Session Module
//!
//! The concurrency core: one session owns one connection to a device and
//! multiplexes concurrent requests over it.
//!
//! ## Concurrency Model: Single-Writer / Background-Reader
//!
//! - **Sends** (any caller thread): build and authenticate the envelope,
//!   register a pending entry under the assigned sequence number, then write
//!   the frame under the writer mutex so one frame's regions are never
//!   interleaved with another's
//! - **Reads**: one background thread per session decodes inbound frames and
//!   resolves the pending entry whose sequence the response acknowledges;
//!   arrival order does not matter
//! - **Completion**: each pending entry is a single-assignment channel;
//!   exactly one of success/failure fires, and the entry is removed when it
//!   resolves, when its caller times out, or when the session closes
//!
//! ```text
//!  caller A ──┐                        ┌─► pending[seq A] ─► caller A
//!  caller B ──┼─► writer mutex ─► TCP ─┼─► pending[seq B] ─► caller B
//!  caller C ──┘                        └─► (no match: drop + log)
//!                                        ▲
//!                                reader thread
//! ```

mod device;

pub use device::{Device, Limits};

use std::collections::HashMap;
use std::fmt;
use std::io::BufReader;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use bytes::Bytes;
use crossbeam::channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::auth::{AuthenticationCredential, HmacCredential};
use crate::config::Config;
use crate::error::{CoralError, Result};
use crate::proto::{self, Builder};
use crate::protocol::{
    Batch, ChannelCommand, ChannelResponse, EmptyResponse, GetCommand, GetKeyRangeCommand,
    DeleteCommand, KeyIter, KeyRangeResponse, PutCommand, Range, RawResponse, StartBatchCommand,
    ValueResponse,
};

/// Completion slot for one in-flight request
type Pending = Sender<std::result::Result<RawResponse, CoralError>>;

// =============================================================================
// Shared state
// =============================================================================

/// State shared between caller threads and the reader thread
struct Shared {
    /// Device descriptor captured during handshake
    device: Device,

    /// Write half; the mutex is the single-writer discipline
    writer: Mutex<TcpStream>,

    /// In-flight requests keyed by sequence number
    pending: Mutex<HashMap<u64, Pending>>,

    /// Monotonically increasing command sequence; never reused
    sequence: AtomicU64,

    /// Batch id generator owned by this session, not shared across sessions
    next_batch_id: AtomicU32,

    connected: AtomicBool,
}

impl Shared {
    /// Shut the transport down and resolve every pending entry with a
    /// definitive closed error. Idempotent.
    fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            let _ = self.writer.lock().shutdown(Shutdown::Both);
        }

        let entries: Vec<(u64, Pending)> = self.pending.lock().drain().collect();
        for (sequence, tx) in entries {
            tracing::debug!(sequence, "failing pending request: session closed");
            let _ = tx.send(Err(CoralError::ConnectionClosed));
        }
    }
}

// =============================================================================
// Reader loop
// =============================================================================

/// Decode one inbound frame into a raw response
fn read_raw<R: std::io::Read>(reader: &mut R) -> Result<RawResponse> {
    let (proto_bytes, value) = crate::wire::read_frame(reader)?;
    let message = proto::decode_message(&proto_bytes)?;
    let command = proto::decode_command(&message.command_bytes)?;
    Ok(RawResponse {
        message,
        command,
        value,
    })
}

/// Background loop: read frames, dispatch completions by ack-sequence.
///
/// Any read or decode failure ends the session: framing errors mean the
/// stream is out of sync and unusable. Unsolicited responses are dropped.
fn reader_loop(shared: Arc<Shared>, stream: TcpStream) {
    let mut reader = BufReader::new(stream);

    loop {
        let raw = match read_raw(&mut reader) {
            Ok(raw) => raw,
            Err(err) => {
                if shared.connected.load(Ordering::SeqCst) {
                    tracing::warn!(error = %err, "session reader stopped");
                } else {
                    tracing::debug!("session reader stopped after close");
                }
                break;
            }
        };

        let ack_sequence = raw.ack_sequence();
        let entry = shared.pending.lock().remove(&ack_sequence);
        match entry {
            Some(tx) => {
                // The caller may have timed out and gone away already
                let _ = tx.send(Ok(raw));
            }
            None => {
                tracing::warn!(ack_sequence, "dropping response with no pending request");
            }
        }
    }

    shared.disconnect();
}

// =============================================================================
// Session
// =============================================================================

/// A session against a remote device.
///
/// Created by [`Session::connect`]; owns the connection exclusively. All
/// operations may be issued concurrently from multiple threads. Closing (or
/// dropping) the session resolves every in-flight request with a definitive
/// closed error.
pub struct Session {
    shared: Arc<Shared>,
    credential: Box<dyn AuthenticationCredential>,
    config: Config,
    reader: Option<JoinHandle<()>>,
}

impl Session {
    /// Connect with default credentials and configuration
    pub fn connect(host: &str, port: u16) -> Result<Session> {
        Self::connect_with(
            host,
            port,
            HmacCredential::default_credentials(),
            Config::default(),
        )
    }

    /// Connect to a device and capture its handshake.
    ///
    /// The device speaks first: session creation blocks until its unsolicited
    /// handshake frame arrives (bounded by the connect timeout) and fails if
    /// the frame cannot be decoded into a device descriptor.
    ///
    /// Reconnection is explicit: call this again with the same parameters to
    /// obtain a fresh session.
    pub fn connect_with(
        host: &str,
        port: u16,
        credential: impl AuthenticationCredential + 'static,
        config: Config,
    ) -> Result<Session> {
        let addr = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| CoralError::Handshake(format!("cannot resolve {host}:{port}")))?;

        let stream = TcpStream::connect_timeout(&addr, config.connect_timeout)?;

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        // Handshake happens on the caller thread, before the reader exists
        stream.set_read_timeout(Some(config.connect_timeout))?;
        let raw = read_raw(&mut &stream)?;
        let device = Device::from_handshake(&raw)?;
        stream.set_read_timeout(None)?;

        tracing::debug!(wwn = %device.wwn, connection_id = device.connection_id,
            "session established");

        let read_stream = stream.try_clone()?;
        let shared = Arc::new(Shared {
            device,
            writer: Mutex::new(stream),
            pending: Mutex::new(HashMap::new()),
            sequence: AtomicU64::new(0),
            next_batch_id: AtomicU32::new(0),
            connected: AtomicBool::new(true),
        });

        let reader_shared = Arc::clone(&shared);
        let reader = std::thread::Builder::new()
            .name("coralkv-reader".into())
            .spawn(move || reader_loop(reader_shared, read_stream))?;

        Ok(Session {
            shared,
            credential: Box::new(credential),
            config,
            reader: Some(reader),
        })
    }

    // =========================================================================
    // Send paths
    // =========================================================================

    /// Send a command and wait for its typed response.
    ///
    /// Uses the configured request timeout, if any.
    pub fn send<C: ChannelCommand>(&self, cmd: C) -> Result<C::Response> {
        self.send_with_timeout(cmd, self.config.request_timeout)
    }

    /// Send a command, bounding the wait for its response.
    ///
    /// On timeout the pending entry is removed (the table cannot grow under
    /// repeated timeouts) and `Timeout` returned; the operation is NOT
    /// cancelled on the device and may still take effect there.
    pub fn send_with_timeout<C: ChannelCommand>(
        &self,
        cmd: C,
        timeout: Option<Duration>,
    ) -> Result<C::Response> {
        let (sequence, proto_bytes, value, context) = self.prepare(&cmd)?;

        // Register before transmitting: the response could arrive before the
        // sender would otherwise get to the table
        let (tx, rx) = bounded(1);
        self.shared.pending.lock().insert(sequence, tx);

        if let Err(err) = self.write_frame(&proto_bytes, &value) {
            self.shared.pending.lock().remove(&sequence);
            // A failed transport write leaves the stream state unknown
            self.shared.disconnect();
            return Err(err);
        }

        let completion = match timeout {
            Some(timeout) => match rx.recv_timeout(timeout) {
                Ok(completion) => completion,
                Err(RecvTimeoutError::Timeout) => {
                    self.shared.pending.lock().remove(&sequence);
                    return Err(CoralError::Timeout);
                }
                Err(RecvTimeoutError::Disconnected) => return Err(CoralError::ConnectionClosed),
            },
            None => rx.recv().map_err(|_| CoralError::ConnectionClosed)?,
        };

        let raw = completion?;
        Ok(C::Response::parse(raw, context)?)
    }

    /// Send a fire-and-forget command.
    ///
    /// No pending entry is registered and no response is awaited: the command
    /// is successful once the local write completes. Used for batch
    /// sub-operations, whose only acknowledgment is the batch commit/abort.
    pub fn send_no_reply<C: ChannelCommand>(&self, cmd: C) -> Result<()> {
        debug_assert!(!C::EXPECTS_REPLY);

        let (_, proto_bytes, value, _) = self.prepare(&cmd)?;
        if let Err(err) = self.write_frame(&proto_bytes, &value) {
            self.shared.disconnect();
            return Err(err);
        }
        Ok(())
    }

    /// Build, sequence, and authenticate a command into wire-ready bytes
    fn prepare<C: ChannelCommand>(
        &self,
        cmd: &C,
    ) -> Result<(u64, Vec<u8>, Bytes, C::Context)> {
        if !self.connected() {
            return Err(CoralError::NotConnected);
        }

        let mut builder = Builder::new();
        let context = cmd.build(&mut builder, &self.shared.device);

        let sequence = self.shared.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let header = builder.header();
            header.cluster_version = self.shared.device.cluster_version;
            header.connection_id = self.shared.device.connection_id;
            header.sequence = sequence;
        }

        // The credential signs the command bytes exactly as transmitted, so
        // they are frozen before authentication runs
        builder.message.command_bytes = proto::encode_command(&builder.command)?;
        self.credential.authenticate(&mut builder.message);

        let proto_bytes = proto::encode_message(&builder.message)?;
        Ok((sequence, proto_bytes, builder.value, context))
    }

    /// Write one frame under exclusive writer ownership
    fn write_frame(&self, proto_bytes: &[u8], value: &[u8]) -> Result<()> {
        let mut writer = self.shared.writer.lock();
        crate::wire::write_frame(&mut *writer, proto_bytes, value).map_err(|err| match err {
            CoralError::Io(io) => CoralError::SendFailure(io),
            other => other,
        })
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Store a value under a key
    pub fn put(&self, key: impl Into<Vec<u8>>, value: impl Into<Bytes>) -> Result<EmptyResponse> {
        self.send(PutCommand::new(key, value))
    }

    /// Read the value stored under a key
    pub fn get(&self, key: impl Into<Vec<u8>>) -> Result<ValueResponse> {
        self.send(GetCommand::new(key))
    }

    /// Remove a key
    pub fn delete(&self, key: impl Into<Vec<u8>>) -> Result<EmptyResponse> {
        self.send(DeleteCommand::new(key))
    }

    /// Query one page of keys within a bound
    pub fn get_key_range(&self, range: Range, reverse: bool) -> Result<KeyRangeResponse> {
        self.send(GetKeyRangeCommand::new(range).reverse(reverse))
    }

    /// Iterate every key within a bound, fetching pages lazily.
    ///
    /// `page` caps keys per round trip; defaults to the device's limit.
    pub fn traverse(&self, range: Range, reverse: bool, page: Option<u32>) -> KeyIter<'_> {
        let mut cmd = GetKeyRangeCommand::new(range).reverse(reverse);
        if let Some(page) = page {
            cmd = cmd.max_returned(page);
        }
        KeyIter::new(self, cmd)
    }

    /// Open a batch: a group of puts/deletes the device applies atomically
    pub fn begin_batch(&self) -> Result<Batch<'_>> {
        let id = self.shared.next_batch_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.send(StartBatchCommand { batch_id: id })?;
        Ok(Batch::new(self, id))
    }

    // =========================================================================
    // Convenience helpers
    // =========================================================================

    /// Read-modify-write of a big-endian u32 counter stored under `key`.
    ///
    /// An absent key counts from zero. Not atomic: concurrent increments of
    /// the same key can race.
    pub fn increment(&self, key: impl Into<Vec<u8>>, delta: u32) -> Result<u32> {
        let key = key.into();
        let current = match self.get(key.clone())?.value {
            Some(value) if value.len() >= 4 => {
                u32::from_be_bytes([value[0], value[1], value[2], value[3]])
            }
            _ => 0,
        };
        let next = current.wrapping_add(delta);
        self.put(key, next.to_be_bytes().to_vec())?;
        Ok(next)
    }

    /// Atomically exchange the values stored under two keys.
    ///
    /// Both keys must exist; fails with [`CoralError::KeyNotFound`] otherwise.
    pub fn swap(&self, a: impl Into<Vec<u8>>, b: impl Into<Vec<u8>>) -> Result<()> {
        let a = a.into();
        let b = b.into();

        let value_a = self.get(a.clone())?.value.ok_or(CoralError::KeyNotFound)?;
        let value_b = self.get(b.clone())?.value.ok_or(CoralError::KeyNotFound)?;

        let mut batch = self.begin_batch()?;
        batch.put(a, value_b)?;
        batch.put(b, value_a)?;
        batch.commit()
    }

    // =========================================================================
    // Lifecycle and accessors
    // =========================================================================

    /// Whether the session can still issue commands
    pub fn connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Descriptor of the device this session talks to
    pub fn device(&self) -> &Device {
        &self.shared.device
    }

    /// Connection id assigned by the device
    pub fn connection_id(&self) -> i64 {
        self.shared.device.connection_id
    }

    /// Close the session.
    ///
    /// Shuts down both transport directions and fails every in-flight
    /// request with a definitive closed error; callers blocked in `send` are
    /// released, never left hanging. Safe to call concurrently with sends.
    pub fn close(&self) {
        self.shared.disconnect();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shared.disconnect();
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.connected() {
            write!(
                f,
                "Session {} with {}",
                self.shared.device.connection_id, self.shared.device
            )
        } else {
            write!(f, "Session not connected")
        }
    }
}
