//! Shared test harness
//!
//! An in-process mock device speaking the wire protocol over a real TCP
//! socket: sends the handshake, then serves requests against an in-memory
//! store. Behaviors cover the failure modes the engine must survive.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::thread;

use bytes::Bytes;
use coralkv::proto::{
    self, AuthType, Command, Configuration, GetLog, LimitsInfo, Message, MessageType, RangeBody,
    Status, StatusCode,
};
use coralkv::wire;

pub const MOCK_WWN: &str = "coral-mock-0001";
pub const MOCK_CONNECTION_ID: i64 = 42;
pub const MOCK_MAX_RANGE_COUNT: u32 = 200;

/// How the mock behaves after accepting a connection
pub enum Behavior {
    /// Serve requests against the in-memory store
    Normal,

    /// Read requests but never reply
    Silent,

    /// Collect this many requests, reply to them in reverse order, then
    /// serve normally
    ReplyReversed(usize),

    /// Send every reply twice; the second copy is unsolicited
    DuplicateReplies,

    /// Send 9 bytes that are not a valid frame header, then hang up
    BadMagicHandshake,
}

pub struct MockDevice {
    pub port: u16,
}

impl MockDevice {
    pub fn start(behavior: Behavior) -> MockDevice {
        Self::start_with(behavior, BTreeMap::new())
    }

    pub fn start_with(behavior: Behavior, store: BTreeMap<Vec<u8>, Vec<u8>>) -> MockDevice {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock listener");
        let port = listener.local_addr().expect("local addr").port();

        thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                serve(stream, behavior, store);
            }
        });

        MockDevice { port }
    }

    pub fn host(&self) -> &'static str {
        "127.0.0.1"
    }
}

/// Seed a store from (key, value) string pairs
pub fn store_of(pairs: &[(&str, &str)]) -> BTreeMap<Vec<u8>, Vec<u8>> {
    pairs
        .iter()
        .map(|(k, v)| (k.as_bytes().to_vec(), v.as_bytes().to_vec()))
        .collect()
}

// =============================================================================
// Serving
// =============================================================================

type Store = BTreeMap<Vec<u8>, Vec<u8>>;
type Batches = HashMap<u32, Vec<(MessageType, Vec<u8>, Bytes)>>;

fn serve(mut stream: TcpStream, behavior: Behavior, mut store: Store) {
    if matches!(behavior, Behavior::BadMagicHandshake) {
        let _ = stream.write_all(&[0xAA; 9]);
        let _ = stream.flush();
        return;
    }

    send_handshake(&mut stream);
    let mut batches: Batches = HashMap::new();

    match behavior {
        Behavior::Silent => {
            while read_request(&mut stream).is_some() {}
        }
        Behavior::ReplyReversed(n) => {
            let mut requests = Vec::new();
            while requests.len() < n {
                match read_request(&mut stream) {
                    Some(request) => requests.push(request),
                    None => return,
                }
            }
            for (command, value) in requests.into_iter().rev() {
                if let Some((response, response_value)) =
                    execute(&mut store, &mut batches, command, value)
                {
                    send_command(&mut stream, response, response_value);
                }
            }
            serve_requests(&mut stream, &mut store, &mut batches, false);
        }
        Behavior::Normal => serve_requests(&mut stream, &mut store, &mut batches, false),
        Behavior::DuplicateReplies => serve_requests(&mut stream, &mut store, &mut batches, true),
        Behavior::BadMagicHandshake => unreachable!(),
    }
}

fn serve_requests(stream: &mut TcpStream, store: &mut Store, batches: &mut Batches, twice: bool) {
    while let Some((command, value)) = read_request(stream) {
        if let Some((response, response_value)) = execute(store, batches, command, value) {
            send_command(stream, response.clone(), response_value.clone());
            if twice {
                send_command(stream, response, response_value);
            }
        }
    }
}

fn send_handshake(stream: &mut TcpStream) {
    let mut command = Command::default();
    command.header.connection_id = MOCK_CONNECTION_ID;
    command.header.message_type = MessageType::Unsolicited;
    command.body.get_log = Some(GetLog {
        configuration: Some(Configuration {
            world_wide_name: MOCK_WWN.as_bytes().to_vec(),
            model: "mock".into(),
            firmware_version: "0.0.1".into(),
        }),
        limits: Some(LimitsInfo {
            max_key_size: 4096,
            max_value_size: 1024 * 1024,
            max_key_range_count: MOCK_MAX_RANGE_COUNT,
        }),
    });
    command.status = Status::success();
    send_command(stream, command, Bytes::new());
}

fn send_command(stream: &mut TcpStream, command: Command, value: Bytes) {
    let message = Message {
        auth_type: AuthType::Unsolicited,
        hmac_auth: None,
        command_bytes: proto::encode_command(&command).expect("encode command"),
    };
    let bytes = proto::encode_message(&message).expect("encode message");
    wire::write_frame(stream, &bytes, &value).expect("write frame");
}

fn read_request(stream: &mut TcpStream) -> Option<(Command, Bytes)> {
    let (proto_bytes, value) = wire::read_frame(stream).ok()?;
    let message = proto::decode_message(&proto_bytes).ok()?;
    let command = proto::decode_command(&message.command_bytes).ok()?;
    Some((command, value))
}

// =============================================================================
// Request execution
// =============================================================================

fn not_found() -> Status {
    Status {
        code: StatusCode::NotFound,
        message: String::new(),
        detailed_message: Vec::new(),
    }
}

fn invalid_batch(message: &str) -> Status {
    Status {
        code: StatusCode::InvalidBatch,
        message: message.into(),
        detailed_message: Vec::new(),
    }
}

/// Execute one request; `None` means no reply (batched sub-operation)
fn execute(
    store: &mut Store,
    batches: &mut Batches,
    request: Command,
    value: Bytes,
) -> Option<(Command, Bytes)> {
    let batch_id = request.header.batch_id;
    let mut response = Command::default();
    response.header.ack_sequence = request.header.sequence;
    let mut response_value = Bytes::new();

    match request.header.message_type {
        MessageType::Get => {
            response.header.message_type = MessageType::GetResponse;
            let key = request.body.key_value.map(|kv| kv.key).unwrap_or_default();
            match store.get(&key) {
                Some(stored) => {
                    response.status = Status::success();
                    response_value = Bytes::from(stored.clone());
                }
                None => response.status = not_found(),
            }
        }
        MessageType::Put => {
            let key = request.body.key_value.map(|kv| kv.key).unwrap_or_default();
            if let Some(id) = batch_id {
                batches
                    .entry(id)
                    .or_default()
                    .push((MessageType::Put, key, value));
                return None;
            }
            store.insert(key, value.to_vec());
            response.header.message_type = MessageType::PutResponse;
            response.status = Status::success();
        }
        MessageType::Delete => {
            let key = request.body.key_value.map(|kv| kv.key).unwrap_or_default();
            if let Some(id) = batch_id {
                batches
                    .entry(id)
                    .or_default()
                    .push((MessageType::Delete, key, Bytes::new()));
                return None;
            }
            response.header.message_type = MessageType::DeleteResponse;
            response.status = if store.remove(&key).is_some() {
                Status::success()
            } else {
                not_found()
            };
        }
        MessageType::GetKeyRange => {
            response.header.message_type = MessageType::GetKeyRangeResponse;
            let body = request.body.range.unwrap_or_default();
            let keys = range_keys(store, &body);
            response.body.range = Some(RangeBody {
                keys,
                ..Default::default()
            });
            response.status = Status::success();
        }
        MessageType::StartBatch => {
            response.header.message_type = MessageType::StartBatchResponse;
            response.status = match batch_id {
                Some(id) => {
                    batches.insert(id, Vec::new());
                    Status::success()
                }
                None => invalid_batch("start batch without id"),
            };
        }
        MessageType::EndBatch => {
            response.header.message_type = MessageType::EndBatchResponse;
            response.status = match batch_id.and_then(|id| batches.remove(&id)) {
                Some(operations) => {
                    let count = request.body.batch.map(|b| b.count).unwrap_or(0);
                    if operations.len() as u32 != count {
                        invalid_batch("operation count mismatch")
                    } else {
                        for (kind, key, staged) in operations {
                            match kind {
                                MessageType::Put => {
                                    store.insert(key, staged.to_vec());
                                }
                                _ => {
                                    store.remove(&key);
                                }
                            }
                        }
                        Status::success()
                    }
                }
                None => invalid_batch("unknown batch"),
            };
        }
        MessageType::AbortBatch => {
            response.header.message_type = MessageType::AbortBatchResponse;
            response.status = match batch_id.and_then(|id| batches.remove(&id)) {
                Some(_) => Status::success(),
                None => invalid_batch("unknown batch"),
            };
        }
        _ => {
            response.status = Status {
                code: StatusCode::InvalidRequest,
                message: "unsupported message type".into(),
                detailed_message: Vec::new(),
            };
        }
    }

    Some((response, response_value))
}

fn range_keys(store: &Store, body: &RangeBody) -> Vec<Vec<u8>> {
    let mut keys: Vec<Vec<u8>> = store
        .keys()
        .filter(|key| {
            let key = key.as_slice();
            let after_start = if body.start_inclusive {
                key >= body.start_key.as_slice()
            } else {
                key > body.start_key.as_slice()
            };
            let before_end = if body.end_inclusive {
                key <= body.end_key.as_slice()
            } else {
                key < body.end_key.as_slice()
            };
            after_start && before_end
        })
        .cloned()
        .collect();

    if body.reverse {
        keys.reverse();
    }
    keys.truncate(body.max_returned as usize);
    keys
}
