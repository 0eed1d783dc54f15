//! QueryServer - sequential TCP front end for the completion engine
//!
//! One connection is served to completion before the next is accepted, and
//! within a connection one request is read, handled and answered before the
//! next is read. The engine sits behind a mutex only so the shutdown handler
//! can flush it; each request holds the lock for its whole duration.
//!
//! After every request, and when a connection ends, the engine's flush
//! cadence gets a chance to fire. There is no background flush timer.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::config::ServerConfig;
use crate::engine::Engine;
use crate::error::Result;
use crate::protocol::{encode_payload, parse_request, read_frame, write_frame, Reply, MAX_PAYLOAD};
use crate::session::{ClientId, ClientSession};

/// Lock the engine, recovering from a poisoned mutex.
///
/// A panic mid-request leaves the trie in whatever state the last completed
/// mutation produced; serving it is preferable to refusing every request.
pub fn lock_engine(engine: &Mutex<Engine>) -> MutexGuard<'_, Engine> {
    engine.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("engine mutex poisoned, recovering");
        poisoned.into_inner()
    })
}

pub struct QueryServer {
    listener: TcpListener,
    config: ServerConfig,
    engine: Arc<Mutex<Engine>>,
    next_client_id: AtomicUsize,
}

impl QueryServer {
    pub fn bind(config: ServerConfig, engine: Arc<Mutex<Engine>>) -> Result<Self> {
        let listener = TcpListener::bind(config.bind)?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        Ok(Self {
            listener,
            config,
            engine,
            next_client_id: AtomicUsize::new(1),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept and serve connections forever.
    pub fn run(&self) -> Result<()> {
        loop {
            if let Err(e) = self.accept_one() {
                tracing::warn!(error = %e, "accept failed");
            }
        }
    }

    /// Accept one connection and serve it until it closes.
    ///
    /// Peers outside the allow-list are closed immediately.
    pub fn accept_one(&self) -> Result<()> {
        let (stream, peer) = self.listener.accept()?;
        if !self.config.is_allowed(&peer.ip()) {
            tracing::warn!(%peer, "rejecting peer outside allow-list");
            return Ok(());
        }

        let client_id = self.next_client_id.fetch_add(1, Ordering::SeqCst);
        self.handle_client(stream, client_id, peer);
        Ok(())
    }

    fn handle_client(&self, mut stream: TcpStream, client_id: ClientId, peer: SocketAddr) {
        tracing::info!(client = client_id, %peer, "client connected");
        let mut session = ClientSession::new(client_id, peer);

        loop {
            match read_frame(&mut stream, &mut session.packets) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::info!(
                        client = client_id,
                        answered = session.answered,
                        dropped = session.dropped,
                        "client disconnected"
                    );
                    break;
                }
                Err(e) => {
                    tracing::warn!(client = client_id, error = %e, "read error");
                    break;
                }
            }

            let reply = self.process(&mut session);
            session.packets.clear();

            let Some(reply) = reply else {
                session.record_dropped();
                continue;
            };

            let payload = encode_payload(&reply.to_json().to_string(), self.config.encoding);
            if payload.len() > MAX_PAYLOAD {
                tracing::warn!(
                    client = client_id,
                    bytes = payload.len(),
                    "response too large, sending empty result"
                );
            }
            if let Err(e) = write_frame(&mut stream, &payload) {
                tracing::warn!(client = client_id, error = %e, "write error");
                break;
            }
            session.record_answered();
        }

        session.interrupt();
        let mut engine = lock_engine(&self.engine);
        flush_due(&mut engine);
    }

    /// Decode and handle the request in `session.packets`.
    fn process(&self, session: &mut ClientSession) -> Option<Reply> {
        let request = match parse_request(&session.packets) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(client = session.id, error = %e, "dropping malformed request");
                return None;
            }
        };

        let started = Instant::now();
        let kind = request.kind();
        let mut engine = lock_engine(&self.engine);
        let reply = match engine.handle(request) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(client = session.id, kind, error = %e, error_kind = e.kind(), "request failed");
                None
            }
        };
        flush_due(&mut engine);

        tracing::debug!(
            client = session.id,
            kind,
            elapsed_us = started.elapsed().as_micros() as u64,
            "request handled"
        );
        reply
    }
}

/// Run the flush cadence; a failing store keeps the log for the next try.
fn flush_due(engine: &mut Engine) {
    if let Err(e) = engine.flush_if_due(Instant::now()) {
        tracing::warn!(error = %e, "flush failed, mutations kept for retry");
    }
}
