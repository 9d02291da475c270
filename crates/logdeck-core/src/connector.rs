// ── Stream connector seam ──
//
// The controller opens streams through `Connector` so tests can swap the
// WebSocket for something scripted. Events flow back through an
// `EventSink` already tagged with the connection id they belong to.

use tokio::sync::mpsc;

use logdeck_api::{LogStream, StreamEvent, TransportConfig};

use crate::error::CoreError;
use crate::model::{ConnectionId, ContainerId};
use crate::session::Input;

/// Control surface of one open stream.
pub trait StreamHandle: Send {
    /// Queue a text frame. Returns `false` if the stream is gone.
    fn send(&self, raw: String) -> bool;

    /// Close the stream. Must be idempotent.
    fn close(&self);
}

/// Opens log streams on behalf of the controller.
pub trait Connector: Send + Sync {
    /// Start a stream for `container`. Every event it produces must go to
    /// `sink`, ending with exactly one [`StreamEvent::Closed`].
    fn open(
        &self,
        conn: ConnectionId,
        container: &ContainerId,
        sink: EventSink,
    ) -> Result<Box<dyn StreamHandle>, CoreError>;
}

// ── EventSink ────────────────────────────────────────────────────────

/// Delivers stream events into the session loop, tagged with their connection.
#[derive(Debug, Clone)]
pub struct EventSink {
    conn: ConnectionId,
    tx: mpsc::UnboundedSender<Input>,
}

impl EventSink {
    pub(crate) fn new(conn: ConnectionId, tx: mpsc::UnboundedSender<Input>) -> Self {
        Self { conn, tx }
    }

    /// Forward `event`. Silently dropped once the session loop is gone.
    pub fn emit(&self, event: StreamEvent) {
        let _ = self.tx.send(Input::Stream {
            conn: self.conn,
            event,
        });
    }
}

// ── WebSocket implementation ─────────────────────────────────────────

/// Production connector: one [`LogStream`] per connection.
#[derive(Debug, Clone)]
pub struct WsConnector {
    transport: TransportConfig,
}

impl WsConnector {
    pub fn new(transport: TransportConfig) -> Self {
        Self { transport }
    }
}

impl Connector for WsConnector {
    fn open(
        &self,
        conn: ConnectionId,
        container: &ContainerId,
        sink: EventSink,
    ) -> Result<Box<dyn StreamHandle>, CoreError> {
        let url = self.transport.logs_ws_url(container.as_str())?;
        tracing::debug!(%conn, url = %url, "opening log stream");
        let stream = LogStream::open(url, container.as_str(), move |event| sink.emit(event));
        Ok(Box::new(stream))
    }
}

impl StreamHandle for LogStream {
    fn send(&self, raw: String) -> bool {
        LogStream::send(self, raw)
    }

    fn close(&self) {
        LogStream::close(self);
    }
}
