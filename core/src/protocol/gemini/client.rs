/*
 * client.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Lucciola, a browser for Gemini space.
 *
 * Lucciola is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Lucciola is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Lucciola.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Gemini session: one connection, one request, one response. `start` arms a
//! connection attempt on a background task, `send` hands it the request
//! line, and exactly one completion event is delivered per armed attempt.
//! Re-arming (or `stop`) aborts the in-flight attempt; its completion, if
//! already queued, is recognised as stale by generation tag and discarded,
//! so a cancelled attempt can never surface late.

use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::net::connect_tls;
use crate::protocol::gemini::ConnectionError;

/// The whole response is buffered; the protocol marks end-of-body by
/// half-closing the stream, so there is nothing to stream incrementally.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(60);

/// Outcome of one connection attempt.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Entire raw response (status line + body).
    Completed(Bytes),
    Failed(ConnectionError),
}

/// One-shot request engine. States: idle, armed (between `start` and the
/// completion event), then idle again. A `start` from any state first
/// force-cancels the previous attempt.
pub struct Session {
    generation: u64,
    request_tx: Option<mpsc::Sender<Vec<u8>>>,
    events_tx: mpsc::UnboundedSender<(u64, SessionEvent)>,
    events_rx: mpsc::UnboundedReceiver<(u64, SessionEvent)>,
    task: Option<JoinHandle<()>>,
}

impl Session {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            generation: 0,
            request_tx: None,
            events_tx,
            events_rx,
            task: None,
        }
    }

    /// Arm a new connection attempt, cancelling any attempt in flight. The
    /// aborted attempt never delivers a completion. When
    /// `validate_certificate` is false the TLS handshake accepts any server
    /// certificate (trust-override path).
    pub fn start(&mut self, host: &str, port: u16, validate_certificate: bool) {
        self.abort_in_flight();
        self.generation += 1;
        let generation = self.generation;
        let (request_tx, mut request_rx) = mpsc::channel::<Vec<u8>>(1);
        self.request_tx = Some(request_tx);
        let events = self.events_tx.clone();
        let host = host.to_string();
        self.task = Some(tokio::spawn(async move {
            let event = run_attempt(&host, port, validate_certificate, &mut request_rx).await;
            let _ = events.send((generation, event));
        }));
    }

    /// Hand the request line to the armed attempt. Calling this with no
    /// armed attempt is a programming error.
    pub fn send(&mut self, data: Vec<u8>) {
        match &self.request_tx {
            Some(tx) => {
                // If the attempt already failed the event is queued; the
                // unread request is simply dropped with the channel.
                let _ = tx.try_send(data);
            }
            None => panic!("Session::send called with no armed attempt; call start() first"),
        }
    }

    /// Tear down the in-flight attempt, if any. Safe in any state. No
    /// completion is delivered for the aborted attempt.
    pub fn stop(&mut self) {
        self.abort_in_flight();
        // Anything the old task managed to queue before the abort is now stale.
        self.generation += 1;
    }

    /// Await the completion of the current attempt. Exactly one event is
    /// delivered per `start`; events from earlier, cancelled attempts are
    /// discarded here. Must only be awaited after `start` + `send`.
    pub async fn completion(&mut self) -> SessionEvent {
        loop {
            match self.events_rx.recv().await {
                Some((generation, event)) if generation == self.generation => {
                    self.request_tx = None;
                    self.task = None;
                    return event;
                }
                Some(_) => {} // stale attempt, ignore
                None => {
                    return SessionEvent::Failed(ConnectionError::Other(
                        "session closed".to_string(),
                    ))
                }
            }
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    fn abort_in_flight(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.request_tx = None;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.abort_in_flight();
    }
}

/// Connect, wait for the request line, write it, read the response to EOF.
async fn run_attempt(
    host: &str,
    port: u16,
    validate_certificate: bool,
    request_rx: &mut mpsc::Receiver<Vec<u8>>,
) -> SessionEvent {
    let mut stream = match connect_tls(host, port, validate_certificate).await {
        Ok(s) => s,
        Err(e) => return SessionEvent::Failed(e),
    };

    let request = match request_rx.recv().await {
        Some(r) => r,
        // The Session handle went away before send(); nobody is listening.
        None => return SessionEvent::Failed(ConnectionError::Other("attempt dropped".to_string())),
    };
    if let Err(e) = stream.write_all(&request).await {
        return SessionEvent::Failed(ConnectionError::Other(e.to_string()));
    }
    if let Err(e) = stream.flush().await {
        return SessionEvent::Failed(ConnectionError::Other(e.to_string()));
    }

    let mut response = Vec::with_capacity(8192);
    match timeout(RESPONSE_TIMEOUT, stream.read_to_end(&mut response)).await {
        Err(_) => SessionEvent::Failed(ConnectionError::Other("response timed out".to_string())),
        Ok(Err(e)) => SessionEvent::Failed(ConnectionError::Other(e.to_string())),
        Ok(Ok(_)) => SessionEvent::Completed(Bytes::from(response)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stale_completions_are_discarded() {
        let mut session = Session::new();
        session.generation = 3;
        session
            .events_tx
            .send((2, SessionEvent::Failed(ConnectionError::ConnectionRefused)))
            .unwrap();
        session
            .events_tx
            .send((3, SessionEvent::Completed(Bytes::from_static(b"20 ok\r\n"))))
            .unwrap();
        match session.completion().await {
            SessionEvent::Completed(bytes) => assert_eq!(&bytes[..], b"20 ok\r\n"),
            other => panic!("stale event leaked: {:?}", other),
        }
    }

    #[tokio::test]
    async fn stop_stales_queued_completion() {
        let mut session = Session::new();
        session.generation = 1;
        session
            .events_tx
            .send((1, SessionEvent::Completed(Bytes::from_static(b"old"))))
            .unwrap();
        session.stop();
        // The queued event now belongs to a cancelled attempt; arm a new one
        // and verify only its event is observed.
        session.generation += 1;
        session
            .events_tx
            .send((session.generation, SessionEvent::Failed(ConnectionError::NameResolutionFailed)))
            .unwrap();
        match session.completion().await {
            SessionEvent::Failed(ConnectionError::NameResolutionFailed) => {}
            other => panic!("expected the new attempt's event, got {:?}", other),
        }
    }

    #[test]
    #[should_panic(expected = "no armed attempt")]
    fn send_without_start_panics() {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let mut session = Session::new();
            session.send(b"gemini://example.org/\r\n".to_vec());
        });
    }
}
