//! Blocking client for the completion server
//!
//! Speaks the same 4-digit framing as the server. Used by the `query`
//! subcommand and by the integration tests.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde_json::Value;

use crate::config::ResponseEncoding;
use crate::error::{IndexError, Result};
use crate::protocol::{decode_payload, read_frame, write_frame, Request};
use crate::trie::Frequency;

pub struct Client {
    stream: TcpStream,
    encoding: ResponseEncoding,
    buf: Vec<u8>,
}

impl Client {
    /// Connect expecting GBK responses.
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        Self::connect_with(addr, ResponseEncoding::Gbk)
    }

    pub fn connect_with(addr: impl ToSocketAddrs, encoding: ResponseEncoding) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            encoding,
            buf: Vec::new(),
        })
    }

    /// Bound how long a call waits for its reply. `None` waits forever.
    pub fn set_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.stream.set_read_timeout(timeout)?;
        self.stream.set_write_timeout(timeout)?;
        Ok(())
    }

    /// Send a raw payload and return the decoded reply text.
    pub fn call_raw(&mut self, payload: &[u8]) -> Result<String> {
        write_frame(&mut self.stream, payload)?;
        if !read_frame(&mut self.stream, &mut self.buf)? {
            return Err(IndexError::Protocol("connection closed".to_string()));
        }
        decode_payload(&self.buf, self.encoding)
    }

    /// Send `request` and parse the reply as JSON.
    pub fn call(&mut self, request: &Request) -> Result<Value> {
        let text = self.call_raw(request.to_json().to_string().as_bytes())?;
        Ok(serde_json::from_str(&text)?)
    }

    /// `(code, name)` pairs from a mutable or store backend.
    pub fn complete(&mut self, input: &str) -> Result<Vec<(String, String)>> {
        let value = self.call(&Request::Completion { input: input.to_string() })?;
        Ok(serde_json::from_value(value)?)
    }

    /// `([c1, ..., name], frequency)` records from a frozen backend.
    pub fn complete_records(&mut self, input: &str) -> Result<Vec<(Vec<String>, Frequency)>> {
        let value = self.call(&Request::Completion { input: input.to_string() })?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn insert(&mut self, code: &str, name: &str, frequency: Frequency) -> Result<bool> {
        let request = Request::Insert {
            input: code.to_string(),
            name: name.to_string(),
            frequency,
        };
        self.expect_bool(&request)
    }

    pub fn remove(&mut self, code: &str, name: &str) -> Result<bool> {
        let request = Request::Remove {
            input: code.to_string(),
            name: name.to_string(),
        };
        self.expect_bool(&request)
    }

    fn expect_bool(&mut self, request: &Request) -> Result<bool> {
        match self.call(request)? {
            Value::Bool(changed) => Ok(changed),
            other => Err(IndexError::Protocol(format!(
                "expected a boolean reply to '{}', got {}",
                request.kind(),
                other
            ))),
        }
    }
}
