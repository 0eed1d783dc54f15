//! Wire protocol
//!
//! Frame:    [4 ASCII digits, zero padded: payload length 0000-9999] [payload]
//! Request:  JSON `{"request": "completion", "input": "<code>"}`
//!           (`request` defaults to "completion"; "insert" additionally takes
//!           `name` and `frequency`, "remove" takes `name`)
//! Response: JSON in GBK (or UTF-8 when configured):
//!           - completion, mutable/store backends: `[[code, name], ...]`
//!           - completion, frozen backend: `[[[c1, c2, ..., name], frequency], ...]`
//!           - insert/remove: `true` if the index changed, else `false`
//!
//! A response that would not fit the 4-digit prefix is replaced by `0002[]`.
//! A prefix that is not four digits is skipped and the next four bytes are
//! read as a prefix.

use std::borrow::Cow;
use std::io::{self, Read, Write};

use encoding_rs::GBK;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::ResponseEncoding;
use crate::error::{IndexError, Result};
use crate::trie::{Frequency, Hit};

pub const PREFIX_LEN: usize = 4;

/// Largest payload the 4-digit prefix can describe.
pub const MAX_PAYLOAD: usize = 9999;

/// Sent in place of any response whose payload exceeds [`MAX_PAYLOAD`].
pub const OVERSIZED_FRAME: &[u8] = b"0002[]";

// ============================================================================
// Framing
// ============================================================================

fn parse_prefix(prefix: &[u8; PREFIX_LEN]) -> Option<usize> {
    if !prefix.iter().all(u8::is_ascii_digit) {
        return None;
    }
    Some(
        prefix
            .iter()
            .fold(0usize, |acc, d| acc * 10 + usize::from(d - b'0')),
    )
}

/// Read one frame's payload into `buf` (cleared first).
///
/// Returns `Ok(false)` on a clean EOF before or inside a length prefix.
/// EOF inside a payload is an `UnexpectedEof` error.
pub fn read_frame<R: Read>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<bool> {
    buf.clear();
    let mut prefix = [0u8; PREFIX_LEN];
    let len = loop {
        match reader.read_exact(&mut prefix) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(false),
            Err(e) => return Err(e),
        }
        match parse_prefix(&prefix) {
            Some(len) => break len,
            None => {
                tracing::debug!(prefix = ?String::from_utf8_lossy(&prefix), "skipping non-numeric frame prefix");
            }
        }
    };

    buf.resize(len, 0);
    reader.read_exact(buf)?;
    Ok(true)
}

/// Prefix `payload` with its length, or produce [`OVERSIZED_FRAME`].
pub fn frame(payload: &[u8]) -> Vec<u8> {
    if payload.len() > MAX_PAYLOAD {
        return OVERSIZED_FRAME.to_vec();
    }
    let mut out = Vec::with_capacity(PREFIX_LEN + payload.len());
    out.extend_from_slice(format!("{:04}", payload.len()).as_bytes());
    out.extend_from_slice(payload);
    out
}

pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    writer.write_all(&frame(payload))?;
    writer.flush()
}

// ============================================================================
// Requests
// ============================================================================

fn default_request_kind() -> String {
    "completion".to_string()
}

#[derive(Debug, Deserialize)]
struct RawRequest {
    #[serde(default = "default_request_kind")]
    request: String,
    input: Option<String>,
    name: Option<String>,
    #[serde(alias = "freq")]
    frequency: Option<Frequency>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Completion { input: String },
    Insert { input: String, name: String, frequency: Frequency },
    Remove { input: String, name: String },
}

impl Request {
    pub fn input(&self) -> &str {
        match self {
            Request::Completion { input }
            | Request::Insert { input, .. }
            | Request::Remove { input, .. } => input,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Request::Completion { .. } => "completion",
            Request::Insert { .. } => "insert",
            Request::Remove { .. } => "remove",
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, Request::Completion { .. })
    }

    /// Serialize for sending (client side).
    pub fn to_json(&self) -> Value {
        match self {
            Request::Completion { input } => json!({"request": "completion", "input": input}),
            Request::Insert { input, name, frequency } => json!({
                "request": "insert",
                "input": input,
                "name": name,
                "frequency": frequency,
            }),
            Request::Remove { input, name } => json!({
                "request": "remove",
                "input": input,
                "name": name,
            }),
        }
    }
}

/// Decode a request payload. UTF-8 is tried first, then GBK.
pub fn parse_request(payload: &[u8]) -> Result<Request> {
    let text: Cow<'_, str> = match std::str::from_utf8(payload) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            let (text, had_errors) = GBK.decode_without_bom_handling(payload);
            if had_errors {
                return Err(IndexError::Protocol("payload is neither UTF-8 nor GBK".to_string()));
            }
            text
        }
    };

    let raw: RawRequest = serde_json::from_str(&text)?;
    let input = raw
        .input
        .ok_or_else(|| IndexError::Protocol("missing 'input'".to_string()))?;

    let missing = |field: &str| IndexError::Protocol(format!("'{}' request without '{}'", raw.request, field));
    match raw.request.as_str() {
        "completion" => Ok(Request::Completion { input }),
        "insert" => Ok(Request::Insert {
            input,
            name: raw.name.ok_or_else(|| missing("name"))?,
            frequency: raw.frequency.ok_or_else(|| missing("frequency"))?,
        }),
        "remove" => Ok(Request::Remove {
            input,
            name: raw.name.ok_or_else(|| missing("name"))?,
        }),
        other => Err(IndexError::Protocol(format!("unknown request '{}'", other))),
    }
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `[[code, name], ...]`
    Pairs(Vec<Hit>),
    /// `[[[c1, ..., name], frequency], ...]`
    Records(Vec<Hit>),
    /// Outcome of a write.
    Changed(bool),
}

impl Reply {
    pub fn to_json(&self) -> Value {
        match self {
            Reply::Pairs(hits) => Value::Array(
                hits.iter()
                    .map(|h| json!([h.code, h.name]))
                    .collect(),
            ),
            Reply::Records(hits) => Value::Array(
                hits.iter()
                    .map(|h| {
                        let mut symbols: Vec<Value> =
                            h.code.chars().map(|c| Value::String(c.to_string())).collect();
                        symbols.push(Value::String(h.name.clone()));
                        json!([symbols, h.frequency])
                    })
                    .collect(),
            ),
            Reply::Changed(changed) => Value::Bool(*changed),
        }
    }
}

/// Replace every non-ASCII character by its `\uXXXX` escape(s).
///
/// Only valid on serialized JSON, where non-ASCII can only occur inside
/// string literals.
fn escape_non_ascii(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut units = [0u16; 2];
    for ch in json.chars() {
        if ch.is_ascii() {
            out.push(ch);
        } else {
            for unit in ch.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}

/// Encode JSON text for the wire.
///
/// GBK output falls back to an all-ASCII escaped form when some character
/// has no GBK mapping, so the payload always decodes to the same JSON.
pub fn encode_payload(json: &str, encoding: ResponseEncoding) -> Vec<u8> {
    match encoding {
        ResponseEncoding::Utf8 => json.as_bytes().to_vec(),
        ResponseEncoding::Gbk => {
            let (bytes, _, unmappable) = GBK.encode(json);
            if unmappable {
                escape_non_ascii(json).into_bytes()
            } else {
                bytes.into_owned()
            }
        }
    }
}

pub fn decode_payload(payload: &[u8], encoding: ResponseEncoding) -> Result<String> {
    match encoding {
        ResponseEncoding::Utf8 => String::from_utf8(payload.to_vec())
            .map_err(|e| IndexError::Protocol(format!("invalid UTF-8 payload: {}", e))),
        ResponseEncoding::Gbk => {
            let (text, had_errors) = GBK.decode_without_bom_handling(payload);
            if had_errors {
                return Err(IndexError::Protocol("invalid GBK payload".to_string()));
            }
            Ok(text.into_owned())
        }
    }
}

/// Full response frame for `reply`.
pub fn encode_response(reply: &Reply, encoding: ResponseEncoding) -> Vec<u8> {
    let payload = encode_payload(&reply.to_json().to_string(), encoding);
    frame(&payload)
}
