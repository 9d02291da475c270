//! Per-container WebSocket log stream.
//!
//! [`LogStream::open`] spawns a background task that connects to
//! `ws://<host>/api/v1/logs/{id}`, parses every text frame as a
//! [`LogPayload`] and reports the connection lifecycle through a callback.
//! The task never reconnects on its own: reconnect policy lives in
//! `logdeck-core`, which needs to see every close to make that decision.
//!
//! Event guarantees per stream:
//! - [`StreamEvent::Opened`] at most once, before any message.
//! - [`StreamEvent::Error`] at most once, right before the close.
//! - [`StreamEvent::Closed`] exactly once, always last, whatever ended the
//!   stream (server close, transport error, failed handshake, or
//!   [`LogStream::close`]).
//!
//! # Example
//!
//! ```rust,ignore
//! use logdeck_api::stream::{LogStream, StreamEvent};
//!
//! let url = transport.logs_ws_url("a1")?;
//! let stream = LogStream::open(url, "a1", |event| match event {
//!     StreamEvent::Message { payload, .. } => println!("{}", payload.msg),
//!     other => tracing::debug!(?other, "stream event"),
//! });
//! // ...
//! stream.close();
//! ```

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;

// ── LogPayload ───────────────────────────────────────────────────────

/// One message pushed by the log backend.
///
/// Only `msg` is required; everything else is kept in `extra` so nothing
/// the backend sends is silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogPayload {
    /// The log line to display.
    pub msg: String,

    /// All remaining fields the backend sends.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ── StreamEvent ──────────────────────────────────────────────────────

/// Lifecycle and data events reported by a [`LogStream`].
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The WebSocket handshake completed.
    Opened,
    /// A parsed log message, plus the exact text frame it came from.
    Message { payload: LogPayload, raw: String },
    /// A transport-level failure. Always followed by [`StreamEvent::Closed`].
    Error(String),
    /// The stream is gone. Nothing follows.
    Closed,
}

// ── LogStream ────────────────────────────────────────────────────────

/// Handle to one running log stream.
///
/// Dropping the handle closes the stream.
#[derive(Debug)]
pub struct LogStream {
    container_id: String,
    outbound: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
}

impl LogStream {
    /// Spawn the connection task for `ws_url`.
    ///
    /// Returns immediately; the handshake happens in the background and
    /// its outcome arrives through `on_event`. Must be called from within
    /// a tokio runtime.
    pub fn open<F>(ws_url: Url, container_id: impl Into<String>, on_event: F) -> Self
    where
        F: FnMut(StreamEvent) + Send + 'static,
    {
        let container_id = container_id.into();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task_cancel = cancel.clone();
        let task_container = container_id.clone();
        tokio::spawn(async move {
            run(ws_url, task_container, outbound_rx, task_cancel, on_event).await;
        });

        Self {
            container_id,
            outbound,
            cancel,
        }
    }

    /// Container this stream was opened for.
    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Queue a text frame. Returns `false` if the stream already ended.
    pub fn send(&self, raw: String) -> bool {
        !self.cancel.is_cancelled() && self.outbound.send(raw).is_ok()
    }

    /// Close the stream. Safe to call repeatedly or after the stream ended.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for LogStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Connection task ──────────────────────────────────────────────────

async fn run<F>(
    ws_url: Url,
    container_id: String,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
    mut on_event: F,
) where
    F: FnMut(StreamEvent) + Send + 'static,
{
    if let Err(e) = connect_and_read(&ws_url, &mut outbound_rx, &cancel, &mut on_event).await {
        tracing::warn!(error = %e, container = %container_id, "log stream error");
        on_event(StreamEvent::Error(e.to_string()));
    }

    tracing::debug!(container = %container_id, "log stream closed");
    on_event(StreamEvent::Closed);
}

/// Establish the WebSocket, then pump frames both ways until it drops.
///
/// `Ok(())` means the stream ended without a transport error: server close
/// frame, end of stream, or a local close.
async fn connect_and_read<F>(
    url: &Url,
    outbound_rx: &mut mpsc::UnboundedReceiver<String>,
    cancel: &CancellationToken,
    on_event: &mut F,
) -> Result<(), Error>
where
    F: FnMut(StreamEvent),
{
    tracing::info!(url = %url, "connecting log stream");

    let uri: tungstenite::http::Uri = url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;
    let request = ClientRequestBuilder::new(uri);

    let (ws_stream, _response) = tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(()),
        result = tokio_tungstenite::connect_async(request) => {
            result.map_err(|e| Error::WebSocketConnect(e.to_string()))?
        }
    };

    tracing::info!("log stream connected");
    on_event(StreamEvent::Opened);

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                // Best effort: the peer may already be gone.
                let _ = write.close().await;
                return Ok(());
            }
            Some(raw) = outbound_rx.recv() => {
                write
                    .send(tungstenite::Message::Text(raw.into()))
                    .await
                    .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        if let Some(payload) = parse_payload(text.as_str()) {
                            on_event(StreamEvent::Message {
                                payload,
                                raw: text.as_str().to_owned(),
                            });
                        }
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite answers pings itself
                        tracing::trace!("log stream ping");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(
                                code = %cf.code,
                                reason = %cf.reason,
                                "log stream close frame received"
                            );
                        } else {
                            tracing::info!("log stream close frame received (no payload)");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        return Err(Error::WebSocketConnect(e.to_string()));
                    }
                    None => {
                        tracing::info!("log stream ended");
                        return Ok(());
                    }
                    _ => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
        }
    }
}

// ── Message parsing ──────────────────────────────────────────────────

/// Parse a text frame into a [`LogPayload`], or `None` if it isn't one.
fn parse_payload(text: &str) -> Option<LogPayload> {
    match serde_json::from_str(text) {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::debug!(error = %e, "dropping malformed log frame");
            None
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
