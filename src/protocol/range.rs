//! Key-range queries
//!
//! A bounded, directional, page-capped key query, and the lazy iterator that
//! stitches pages together into one key sequence.
//!
//! ## Pagination
//!
//! The device returns at most one page of keys per request. A full page means
//! more keys may exist (a heuristic: the range may also end exactly at the
//! page boundary), so the follow-up request starts after the last returned
//! key and keeps the original end bound. An empty page, a short page, or a
//! last key equal to the end bound terminates the sequence.

use crate::error::RemoteError;
use crate::proto::{Builder, MessageType, RangeBody, StatusCode};
use crate::session::{Device, Session};

use super::{ChannelCommand, ChannelResponse, RawResponse};

// =============================================================================
// Range bounds
// =============================================================================

/// Bound specification for a key-range query
#[derive(Debug, Clone)]
pub enum Range {
    /// Keys between two bounds, each inclusive or exclusive
    FromTo {
        from: Vec<u8>,
        to: Vec<u8>,
        from_inclusive: bool,
        to_inclusive: bool,
    },

    /// Keys from a bound to the end of the keyspace
    From { from: Vec<u8>, inclusive: bool },

    /// Keys from the start of the keyspace to a bound
    To { to: Vec<u8>, inclusive: bool },

    /// Keys sharing a prefix
    Prefix(Vec<u8>),

    /// No keys
    Empty,
}

impl Range {
    /// Smallest byte string greater than every key with this prefix.
    ///
    /// Trailing 0xFF bytes cannot be incremented, so they are dropped and the
    /// preceding byte bumped; a prefix of all 0xFF has no successor.
    fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
        let mut end = prefix.to_vec();
        while let Some(last) = end.pop() {
            if last < 0xFF {
                end.push(last + 1);
                return Some(end);
            }
        }
        None
    }

    /// Apply this bound to a request's range body
    fn apply(&self, range: &mut RangeBody, device: &Device) {
        match self {
            Range::FromTo {
                from,
                to,
                from_inclusive,
                to_inclusive,
            } => {
                range.start_key = from.clone();
                range.start_inclusive = *from_inclusive;
                range.end_key = to.clone();
                range.end_inclusive = *to_inclusive;
            }
            Range::From { from, inclusive } => {
                range.start_key = from.clone();
                range.start_inclusive = *inclusive;
                range.end_key = vec![0xFF; device.limits.max_key_size as usize];
                range.end_inclusive = true;
            }
            Range::To { to, inclusive } => {
                range.start_key = Vec::new();
                range.start_inclusive = true;
                range.end_key = to.clone();
                range.end_inclusive = *inclusive;
            }
            Range::Prefix(prefix) => {
                range.start_key = prefix.clone();
                range.start_inclusive = true;
                match Self::prefix_successor(prefix) {
                    Some(end) => {
                        range.end_key = end;
                        range.end_inclusive = false;
                    }
                    // No expressible successor: run to the end of the keyspace
                    None => {
                        range.end_key = vec![0xFF; device.limits.max_key_size as usize];
                        range.end_inclusive = true;
                    }
                }
            }
            Range::Empty => {
                range.start_key = Vec::new();
                range.start_inclusive = false;
                range.end_key = Vec::new();
                range.end_inclusive = false;
            }
        }
    }

    /// Convenience constructor for a prefix bound
    pub fn prefix(prefix: impl Into<Vec<u8>>) -> Self {
        Range::Prefix(prefix.into())
    }
}

// =============================================================================
// Command
// =============================================================================

/// Query a page of keys within a bound
#[derive(Debug, Clone)]
pub struct GetKeyRangeCommand {
    pub range: Range,

    /// Iterate from the end bound backwards
    pub reverse: bool,

    /// Page cap; defaults to the device's max range-page count
    pub max_returned: Option<u32>,
}

impl GetKeyRangeCommand {
    pub fn new(range: Range) -> Self {
        Self {
            range,
            reverse: false,
            max_returned: None,
        }
    }

    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn max_returned(mut self, max: u32) -> Self {
        self.max_returned = Some(max);
        self
    }
}

/// Build-time state a range response needs to continue pagination
#[derive(Debug, Clone)]
pub struct KeyRangeContext {
    /// Page cap actually requested
    pub max_returned: u32,

    pub reverse: bool,

    /// Original end bound, kept across continuation pages
    pub end_key: Vec<u8>,
    pub end_inclusive: bool,
}

impl ChannelCommand for GetKeyRangeCommand {
    type Context = KeyRangeContext;
    type Response = KeyRangeResponse;

    fn build(&self, builder: &mut Builder, device: &Device) -> KeyRangeContext {
        builder.header().message_type = MessageType::GetKeyRange;

        let max = self
            .max_returned
            .unwrap_or(device.limits.max_key_range_count)
            .min(device.limits.max_key_range_count);

        let range = builder.range();
        self.range.apply(range, device);
        range.reverse = self.reverse;
        range.max_returned = max;

        KeyRangeContext {
            max_returned: max,
            reverse: self.reverse,
            end_key: range.end_key.clone(),
            end_inclusive: range.end_inclusive,
        }
    }
}

// =============================================================================
// Response
// =============================================================================

/// One page of a key-range query
#[derive(Debug, Clone)]
pub struct KeyRangeResponse {
    /// Keys matched, in bound order
    pub keys: Vec<Vec<u8>>,

    /// Whether a follow-up page may exist.
    ///
    /// True iff the page is full. This is a heuristic, not a guarantee: a
    /// range that ends exactly on a page boundary yields one final empty page.
    pub has_more: bool,

    context: KeyRangeContext,
}

impl KeyRangeResponse {
    /// Command for the next page, or `None` when the continuation is the
    /// empty range (no keys, no more pages, or the end bound was reached).
    pub fn next_command(&self) -> Option<GetKeyRangeCommand> {
        if !self.has_more {
            return None;
        }
        let last = self.keys.last()?;
        // Already got the last key; there is nothing past the end bound
        if *last == self.context.end_key {
            return None;
        }

        Some(GetKeyRangeCommand {
            range: Range::FromTo {
                from: last.clone(),
                to: self.context.end_key.clone(),
                from_inclusive: false,
                to_inclusive: self.context.end_inclusive,
            },
            reverse: self.context.reverse,
            max_returned: Some(self.context.max_returned),
        })
    }
}

impl ChannelResponse for KeyRangeResponse {
    type Context = KeyRangeContext;

    fn parse(raw: RawResponse, context: KeyRangeContext) -> Result<Self, RemoteError> {
        match raw.command.status.code {
            StatusCode::Success => {
                // Some devices omit the range section entirely when the
                // result is empty
                let keys = raw
                    .command
                    .body
                    .range
                    .map(|r| r.keys)
                    .unwrap_or_default();
                let has_more = keys.len() as u32 == context.max_returned;
                Ok(KeyRangeResponse {
                    keys,
                    has_more,
                    context,
                })
            }
            _ => Err(RemoteError::from(&raw.command.status)),
        }
    }
}

// =============================================================================
// Lazy key iterator
// =============================================================================

/// Lazy, finite key sequence over repeated range requests.
///
/// One remote round trip per page. Not restartable: iterating again requires
/// a fresh range query. A failed page yields its error once and ends the
/// sequence; there is no partial silent success.
pub struct KeyIter<'a> {
    session: &'a Session,
    next_command: Option<GetKeyRangeCommand>,
    page: std::vec::IntoIter<Vec<u8>>,
}

impl<'a> KeyIter<'a> {
    pub(crate) fn new(session: &'a Session, command: GetKeyRangeCommand) -> Self {
        Self {
            session,
            next_command: Some(command),
            page: Vec::new().into_iter(),
        }
    }
}

impl Iterator for KeyIter<'_> {
    type Item = crate::error::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(key) = self.page.next() {
                return Some(Ok(key));
            }

            let command = self.next_command.take()?;
            match self.session.send(command) {
                Ok(response) => {
                    self.next_command = response.next_command();
                    self.page = response.keys.into_iter();
                }
                Err(err) => return Some(Err(err)),
            }
        }
    }
}
