// ── Controller ──
//
// Async shell around the `Session` state machine. One background task
// owns the session and is the only place its state is touched: user
// commands, stream events and timer fires all arrive as inputs on
// channels and are handled one at a time. Effects the session returns
// are carried out here: opening and closing streams, echoing payloads,
// arming timers, publishing updates.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use logdeck_api::{InventoryClient, StreamEvent, TransportConfig};

use crate::config::{ControllerConfig, SessionConfig};
use crate::connector::{Connector, EventSink, StreamHandle, WsConnector};
use crate::error::CoreError;
use crate::model::{ConnectionId, Container};
use crate::session::{Effect, Input, Session, SessionUpdate};

#[derive(Debug)]
enum Command {
    Select(Container),
}

/// The main entry point for consumers.
///
/// Cheaply cloneable. Create it, [`fetch_containers`](Self::fetch_containers)
/// once, [`start`](Self::start) the session loop, then drive it with
/// [`select`](Self::select).
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    inventory: InventoryClient,
    connector: Arc<dyn Connector>,
    command_tx: mpsc::UnboundedSender<Command>,
    command_rx: Mutex<Option<mpsc::UnboundedReceiver<Command>>>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Controller {
    /// Build a controller talking to the configured server over WebSocket.
    pub fn new(config: ControllerConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig::new(config.server.clone(), config.timeout)?;
        let connector = Arc::new(WsConnector::new(transport));
        Self::with_connector(config, connector)
    }

    /// Build a controller that opens streams through `connector`.
    pub fn with_connector(
        config: ControllerConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, CoreError> {
        let transport = TransportConfig::new(config.server.clone(), config.timeout)?;
        let inventory = InventoryClient::new(transport)?;
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        Ok(Self {
            inner: Arc::new(ControllerInner {
                config,
                inventory,
                connector,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel: CancellationToken::new(),
                task: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    /// One-shot fetch of the container list.
    pub async fn fetch_containers(&self) -> Result<Vec<Container>, CoreError> {
        let summaries = self.inner.inventory.list_containers().await?;
        info!(count = summaries.len(), "fetched container inventory");
        Ok(summaries.into_iter().map(Container::from).collect())
    }

    /// Spawn the session loop. Returns the stream of updates for the UI.
    ///
    /// Can only be called once per controller.
    pub async fn start(&self) -> Result<mpsc::UnboundedReceiver<SessionUpdate>, CoreError> {
        let command_rx = self
            .inner
            .command_rx
            .lock()
            .await
            .take()
            .ok_or(CoreError::AlreadyStarted)?;
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(session_task(
            self.inner.config.session.clone(),
            Arc::clone(&self.inner.connector),
            command_rx,
            update_tx,
            self.inner.cancel.clone(),
        ));
        *self.inner.task.lock().await = Some(handle);

        Ok(update_rx)
    }

    /// Switch the stream to `container`. Also restarts the current one.
    pub fn select(&self, container: Container) -> Result<(), CoreError> {
        self.inner
            .command_tx
            .send(Command::Select(container))
            .map_err(|_| CoreError::NotRunning)
    }

    /// Stop the session loop and close any open stream.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(handle) = self.inner.task.lock().await.take() {
            let _ = handle.await;
        }
        debug!("controller shut down");
    }
}

// ── Session loop ─────────────────────────────────────────────────────

async fn session_task(
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
    update_tx: mpsc::UnboundedSender<SessionUpdate>,
    cancel: CancellationToken,
) {
    let (input_tx, mut input_rx) = mpsc::unbounded_channel();
    let mut session = Session::new(&config);
    let mut driver = EffectDriver {
        connector,
        input_tx,
        update_tx,
        stream: None,
        reconnect_timer: None,
    };

    loop {
        let input = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            Some(command) = command_rx.recv() => match command {
                Command::Select(container) => Input::Select(container),
            },
            Some(input) = input_rx.recv() => input,
            else => break,
        };

        let effects = session.handle(input);
        driver.apply(effects);
    }

    driver.shutdown();
    debug!("session loop exiting");
}

// ── Effect execution ─────────────────────────────────────────────────

/// Carries out session effects. Holds the only handle to the live stream.
struct EffectDriver {
    connector: Arc<dyn Connector>,
    input_tx: mpsc::UnboundedSender<Input>,
    update_tx: mpsc::UnboundedSender<SessionUpdate>,
    stream: Option<(ConnectionId, Box<dyn StreamHandle>)>,
    reconnect_timer: Option<JoinHandle<()>>,
}

impl EffectDriver {
    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Open { conn, container } => self.open(conn, &container),
                Effect::Close { conn } => self.close(conn),
                Effect::Ack { conn, raw } => match &self.stream {
                    Some((id, handle)) if *id == conn => {
                        if !handle.send(raw) {
                            debug!(%conn, "ack dropped, stream already closing");
                        }
                    }
                    _ => debug!(%conn, "ack for a stream that is gone"),
                },
                Effect::ScheduleReconnect { ticket, delay } => {
                    self.cancel_reconnect();
                    let tx = self.input_tx.clone();
                    self.reconnect_timer = Some(tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = tx.send(Input::ReconnectDue(ticket));
                    }));
                }
                Effect::CancelReconnect => self.cancel_reconnect(),
                Effect::ScheduleReveal { ticket, delay } => {
                    let tx = self.input_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = tx.send(Input::Reveal(ticket));
                    });
                }
                Effect::Publish(update) => {
                    // No receiver just means the UI is gone.
                    let _ = self.update_tx.send(update);
                }
            }
        }
    }

    fn open(&mut self, conn: ConnectionId, container: &Container) {
        // The session closes before it opens; this only catches a leftover.
        if let Some((stale, handle)) = self.stream.take() {
            debug!(conn = %stale, "closing leftover stream");
            handle.close();
        }

        let sink = EventSink::new(conn, self.input_tx.clone());
        match self.connector.open(conn, &container.id, sink) {
            Ok(handle) => self.stream = Some((conn, handle)),
            Err(e) => {
                // Same path as a failed handshake: error, then close.
                warn!(%conn, container = %container.id, error = %e, "could not open log stream");
                let sink = EventSink::new(conn, self.input_tx.clone());
                sink.emit(StreamEvent::Error(e.to_string()));
                sink.emit(StreamEvent::Closed);
            }
        }
    }

    fn close(&mut self, conn: ConnectionId) {
        match self.stream.take() {
            Some((id, handle)) if id == conn => handle.close(),
            other => self.stream = other,
        }
    }

    fn cancel_reconnect(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
        }
    }

    fn shutdown(&mut self) {
        self.cancel_reconnect();
        if let Some((_, handle)) = self.stream.take() {
            handle.close();
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
