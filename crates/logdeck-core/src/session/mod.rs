//! Stream session state machine.
//!
//! [`Session`] owns everything that decides what the log view shows: the
//! selection, the identity of the live connection, the reconnect
//! bookkeeping and the log buffer. It performs no I/O. Every input goes
//! through [`Session::handle`], which mutates state and returns the
//! [`Effect`]s the caller has to carry out, in order.
//!
//! Staleness is decided in one place: an event counts only if it carries
//! the id of the current connection *and* that connection's target is the
//! container currently selected. Anything else is logged and dropped.

mod reconnect;

use std::fmt;
use std::time::Duration;

use logdeck_api::StreamEvent;
use tracing::{debug, info, warn};

use crate::buffer::{LineTicket, LogBuffer};
use crate::config::SessionConfig;
use crate::model::{ConnectionId, Container, ContainerId};

pub use reconnect::{ReconnectController, ReconnectDecision, ReconnectState, ReconnectTicket};

// ── SessionPhase ─────────────────────────────────────────────────────

/// Stream status as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SessionPhase {
    /// Nothing selected yet.
    #[default]
    Idle,
    /// Handshake in flight. `attempt` is 0 for a user-driven connect.
    Connecting { attempt: u32 },
    /// Stream is live.
    Open,
    /// Waiting out the reconnect delay.
    Reconnecting { attempt: u32, max: u32 },
    /// Gave up; the user has to reselect.
    Exhausted { attempts: u32 },
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Connecting { attempt: 0 } => f.write_str("connecting"),
            Self::Connecting { attempt } => write!(f, "connecting (retry {attempt})"),
            Self::Open => f.write_str("live"),
            Self::Reconnecting { attempt, max } => write!(f, "reconnecting ({attempt}/{max})"),
            Self::Exhausted { .. } => f.write_str("retries exhausted"),
        }
    }
}

// ── Inputs, effects, updates ─────────────────────────────────────────

/// Everything that can happen to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// The user picked a container.
    Select(Container),
    /// Something happened on connection `conn`.
    Stream {
        conn: ConnectionId,
        event: StreamEvent,
    },
    /// A reconnect delay elapsed.
    ReconnectDue(ReconnectTicket),
    /// A line's display delay elapsed.
    Reveal(LineTicket),
}

/// Work the driver must perform on the session's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Open a stream for `container`, tagged `conn`.
    Open {
        conn: ConnectionId,
        container: Container,
    },
    /// Close stream `conn`, if it is still around.
    Close { conn: ConnectionId },
    /// Echo `raw` back on stream `conn`.
    Ack { conn: ConnectionId, raw: String },
    /// Feed [`Input::ReconnectDue`] back after `delay`.
    ScheduleReconnect {
        ticket: ReconnectTicket,
        delay: Duration,
    },
    /// Drop any pending reconnect timer.
    CancelReconnect,
    /// Feed [`Input::Reveal`] back after `delay`.
    ScheduleReveal { ticket: LineTicket, delay: Duration },
    /// Tell the presentation layer.
    Publish(SessionUpdate),
}

/// Changes the presentation layer needs to mirror.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// A new selection; the visible log is now empty.
    Selected(Container),
    /// Stream status changed.
    Phase(SessionPhase),
    /// Lines that just became visible, in order.
    Lines(Vec<String>),
}

// ── Session ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct ActiveConnection {
    id: ConnectionId,
    target: ContainerId,
}

/// Single owner of selection, connection identity, retries and log lines.
#[derive(Debug)]
pub struct Session {
    typing_speed: Duration,
    selection: Option<Container>,
    connection: Option<ActiveConnection>,
    last_connection: ConnectionId,
    reconnect: ReconnectController,
    buffer: LogBuffer,
    phase: SessionPhase,
}

impl Session {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            typing_speed: config.typing_speed,
            selection: None,
            connection: None,
            last_connection: ConnectionId::new(0),
            reconnect: ReconnectController::new(
                config.max_reconnect_attempts,
                config.reconnect_delay,
            ),
            buffer: LogBuffer::new(),
            phase: SessionPhase::Idle,
        }
    }

    pub fn selection(&self) -> Option<&Container> {
        self.selection.as_ref()
    }

    /// Id of the connection whose events are currently honoured.
    pub fn current_connection(&self) -> Option<ConnectionId> {
        self.connection.as_ref().map(|c| c.id)
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn reconnect_state(&self) -> ReconnectState {
        self.reconnect.state()
    }

    pub fn attempts(&self) -> u32 {
        self.reconnect.attempts()
    }

    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    /// The transition function: apply `input`, return the effects.
    pub fn handle(&mut self, input: Input) -> Vec<Effect> {
        let mut effects = Vec::new();
        match input {
            Input::Select(container) => self.select(container, &mut effects),
            Input::Stream { conn, event } => self.on_stream(conn, event, &mut effects),
            Input::ReconnectDue(ticket) => self.on_reconnect_due(ticket, &mut effects),
            Input::Reveal(ticket) => self.on_reveal(ticket, &mut effects),
        }
        effects
    }

    // ── Selection ────────────────────────────────────────────────────

    /// User-driven switch. Reselecting the current container restarts its
    /// stream from scratch.
    fn select(&mut self, container: Container, effects: &mut Vec<Effect>) {
        // Old stream goes first, before anything it could be attributed to changes.
        if let Some(old) = self.connection.take() {
            debug!(conn = %old.id, container = %old.target, "closing previous log stream");
            effects.push(Effect::Close { conn: old.id });
        }
        if self.reconnect.reset() {
            effects.push(Effect::CancelReconnect);
        }

        self.buffer.clear();
        info!(container = %container.id, name = %container.name, "container selected");
        self.selection = Some(container.clone());
        effects.push(Effect::Publish(SessionUpdate::Selected(container)));

        self.connect(effects);
    }

    /// Open a stream for the current selection. Shared by select and retry.
    fn connect(&mut self, effects: &mut Vec<Effect>) {
        let Some(container) = self.selection.clone() else {
            return;
        };

        self.last_connection = self.last_connection.next();
        let conn = self.last_connection;
        self.connection = Some(ActiveConnection {
            id: conn,
            target: container.id.clone(),
        });

        effects.push(Effect::Open { conn, container });
        self.set_phase(
            SessionPhase::Connecting {
                attempt: self.reconnect.attempts(),
            },
            effects,
        );
    }

    // ── Stream events ────────────────────────────────────────────────

    /// `conn` is live and its target is still what the user wants.
    fn is_current(&self, conn: ConnectionId) -> bool {
        match (&self.connection, &self.selection) {
            (Some(active), Some(selected)) => active.id == conn && active.target == selected.id,
            _ => false,
        }
    }

    fn on_stream(&mut self, conn: ConnectionId, event: StreamEvent, effects: &mut Vec<Effect>) {
        if !self.is_current(conn) {
            match event {
                StreamEvent::Closed => {
                    debug!(%conn, "log stream closed for a different container, not reconnecting");
                }
                other => debug!(%conn, event = ?other, "ignoring event from superseded stream"),
            }
            return;
        }

        match event {
            StreamEvent::Opened => {
                info!(%conn, "log stream opened");
                self.reconnect.on_open();
                self.set_phase(SessionPhase::Open, effects);
            }
            StreamEvent::Message { payload, raw } => {
                self.append(payload.msg, effects);
                // The backend expects every frame echoed back verbatim.
                // Looks like a leftover rather than a real ack scheme; confirm
                // with the backend before relying on it or dropping it.
                effects.push(Effect::Ack { conn, raw });
            }
            StreamEvent::Error(reason) => {
                // Close it ourselves; the close that follows drives the retry.
                warn!(%conn, %reason, "log stream error, closing");
                effects.push(Effect::Close { conn });
            }
            StreamEvent::Closed => self.on_close(conn, effects),
        }
    }

    fn on_close(&mut self, conn: ConnectionId, effects: &mut Vec<Effect>) {
        self.connection = None;

        match self.reconnect.on_close(conn) {
            ReconnectDecision::Retry {
                ticket,
                attempt,
                delay,
            } => {
                let max = self.reconnect.max_attempts();
                let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                info!(%conn, attempt, max, delay_ms, "log stream dropped, reconnecting");
                effects.push(Effect::ScheduleReconnect { ticket, delay });
                self.set_phase(SessionPhase::Reconnecting { attempt, max }, effects);
            }
            ReconnectDecision::GiveUp { attempts } => {
                warn!(
                    %conn,
                    attempts,
                    "max reconnect attempts reached, stopping reconnection attempts"
                );
                self.set_phase(SessionPhase::Exhausted { attempts }, effects);
            }
        }
    }

    fn on_reconnect_due(&mut self, ticket: ReconnectTicket, effects: &mut Vec<Effect>) {
        if !self.reconnect.take_due(ticket) || self.connection.is_some() {
            debug!(cause = %ticket.cause(), "discarding stale reconnect timer");
            return;
        }
        info!(attempt = self.reconnect.attempts(), "reconnecting log stream");
        self.connect(effects);
    }

    // ── Log lines ────────────────────────────────────────────────────

    fn append(&mut self, line: String, effects: &mut Vec<Effect>) {
        if self.typing_speed.is_zero() {
            let shown = self.buffer.push(line);
            publish_lines(shown, effects);
        } else {
            let ticket = self.buffer.stage(line);
            effects.push(Effect::ScheduleReveal {
                ticket,
                delay: self.typing_speed,
            });
        }
    }

    fn on_reveal(&mut self, ticket: LineTicket, effects: &mut Vec<Effect>) {
        let shown = self.buffer.reveal(ticket);
        publish_lines(shown, effects);
    }

    fn set_phase(&mut self, phase: SessionPhase, effects: &mut Vec<Effect>) {
        if self.phase != phase {
            debug!(from = self.phase.as_ref(), to = phase.as_ref(), "session phase");
            self.phase = phase;
            effects.push(Effect::Publish(SessionUpdate::Phase(phase)));
        }
    }
}

fn publish_lines(lines: Vec<String>, effects: &mut Vec<Effect>) {
    if !lines.is_empty() {
        effects.push(Effect::Publish(SessionUpdate::Lines(lines)));
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use logdeck_api::LogPayload;
    use pretty_assertions::assert_eq;

    use super::*;

    fn instant_config() -> SessionConfig {
        SessionConfig {
            typing_speed: Duration::ZERO,
            ..SessionConfig::default()
        }
    }

    fn a1() -> Container {
        Container::new("a1", "A")
    }

    fn b2() -> Container {
        Container::new("b2", "B")
    }

    fn message(msg: &str) -> StreamEvent {
        let raw = format!(r#"{{"msg":"{msg}"}}"#);
        StreamEvent::Message {
            payload: LogPayload {
                msg: msg.to_owned(),
                extra: Default::default(),
            },
            raw,
        }
    }

    fn stream(session: &mut Session, conn: ConnectionId, event: StreamEvent) -> Vec<Effect> {
        session.handle(Input::Stream { conn, event })
    }

    fn opened_conn(effects: &[Effect]) -> Option<ConnectionId> {
        effects.iter().find_map(|e| match e {
            Effect::Open { conn, .. } => Some(*conn),
            _ => None,
        })
    }

    fn reconnect_ticket(effects: &[Effect]) -> Option<ReconnectTicket> {
        effects.iter().find_map(|e| match e {
            Effect::ScheduleReconnect { ticket, .. } => Some(*ticket),
            _ => None,
        })
    }

    /// Lines published by `effects`, in order.
    fn published(effects: &[Effect]) -> Vec<String> {
        effects
            .iter()
            .flat_map(|e| match e {
                Effect::Publish(SessionUpdate::Lines(lines)) => lines.clone(),
                _ => Vec::new(),
            })
            .collect()
    }

    /// Select `container` and return the id of the connection it opened.
    fn select(session: &mut Session, container: Container) -> ConnectionId {
        let effects = session.handle(Input::Select(container));
        opened_conn(&effects).expect("select opens a connection")
    }

    // ── Selection ──

    #[test]
    fn select_opens_stream_for_container() {
        let mut session = Session::new(&instant_config());
        let effects = session.handle(Input::Select(a1()));

        let conn = ConnectionId::new(1);
        assert_eq!(
            effects,
            vec![
                Effect::Publish(SessionUpdate::Selected(a1())),
                Effect::Open {
                    conn,
                    container: a1(),
                },
                Effect::Publish(SessionUpdate::Phase(SessionPhase::Connecting { attempt: 0 })),
            ]
        );
        assert_eq!(session.selection(), Some(&a1()));
        assert_eq!(session.current_connection(), Some(conn));
    }

    #[test]
    fn switching_containers_never_leaks_lines() {
        let mut session = Session::new(&instant_config());
        let a = select(&mut session, a1());
        stream(&mut session, a, StreamEvent::Opened);
        let mut shown = published(&stream(&mut session, a, message("boot")));
        shown.extend(published(&stream(&mut session, a, message("ready"))));
        assert_eq!(shown, ["boot", "ready"]);
        assert_eq!(session.buffer().len(), 2);

        let effects = session.handle(Input::Select(b2()));
        assert_eq!(effects.first(), Some(&Effect::Close { conn: a }));
        assert!(session.buffer().is_empty());
        let b = opened_conn(&effects).unwrap();
        assert_ne!(a, b);

        // A's late traffic and close are inert.
        assert!(stream(&mut session, a, message("late")).is_empty());
        assert!(stream(&mut session, a, StreamEvent::Closed).is_empty());
        assert!(session.buffer().is_empty());
        assert_eq!(session.reconnect_state(), ReconnectState::Idle);

        stream(&mut session, b, StreamEvent::Opened);
        let shown = published(&stream(&mut session, b, message("hello from b")));
        assert_eq!(shown, ["hello from b"]);
        assert_eq!(session.buffer().len(), 1);
    }

    #[test]
    fn reselecting_same_container_restarts_stream() {
        let mut session = Session::new(&instant_config());
        let first = select(&mut session, a1());
        stream(&mut session, first, StreamEvent::Opened);
        stream(&mut session, first, message("boot"));

        let effects = session.handle(Input::Select(a1()));
        assert_eq!(effects.first(), Some(&Effect::Close { conn: first }));
        let second = opened_conn(&effects).unwrap();
        assert_ne!(first, second);
        assert!(session.buffer().is_empty());

        // The close we caused is for a superseded connection: no retry.
        assert!(stream(&mut session, first, StreamEvent::Closed).is_empty());
        assert_eq!(session.current_connection(), Some(second));
    }

    // ── Messages ──

    #[test]
    fn messages_are_acknowledged_with_raw_payload() {
        let mut session = Session::new(&instant_config());
        let conn = select(&mut session, a1());
        stream(&mut session, conn, StreamEvent::Opened);

        let effects = stream(&mut session, conn, message("boot"));
        assert_eq!(
            effects,
            vec![
                Effect::Publish(SessionUpdate::Lines(vec!["boot".into()])),
                Effect::Ack {
                    conn,
                    raw: r#"{"msg":"boot"}"#.into(),
                },
            ]
        );
    }

    #[test]
    fn typing_delay_reveals_in_arrival_order() {
        let mut session = Session::new(&SessionConfig::default());
        let conn = select(&mut session, a1());

        let tickets: Vec<LineTicket> = ["one", "two"]
            .iter()
            .map(|m| {
                let effects = stream(&mut session, conn, message(m));
                effects
                    .iter()
                    .find_map(|e| match e {
                        Effect::ScheduleReveal { ticket, delay } => {
                            assert_eq!(*delay, Duration::from_millis(100));
                            Some(*ticket)
                        }
                        _ => None,
                    })
                    .unwrap()
            })
            .collect();
        assert!(session.buffer().is_empty());

        // Second timer fires first: nothing visible until the first one lands.
        assert!(session.handle(Input::Reveal(tickets[1])).is_empty());
        assert_eq!(
            session.handle(Input::Reveal(tickets[0])),
            vec![Effect::Publish(SessionUpdate::Lines(vec![
                "one".into(),
                "two".into()
            ]))]
        );
    }

    #[test]
    fn delayed_line_from_previous_container_is_dropped() {
        let mut session = Session::new(&SessionConfig::default());
        let a = select(&mut session, a1());
        let effects = stream(&mut session, a, message("from a"));
        let Some(Effect::ScheduleReveal { ticket, .. }) = effects.first().cloned() else {
            panic!("expected a scheduled reveal");
        };

        select(&mut session, b2());
        assert!(session.handle(Input::Reveal(ticket)).is_empty());
        assert!(session.buffer().is_empty());
    }

    // ── Reconnect ──

    #[test]
    fn drop_schedules_reconnect_without_clearing() {
        let mut session = Session::new(&instant_config());
        let conn = select(&mut session, a1());
        stream(&mut session, conn, StreamEvent::Opened);
        stream(&mut session, conn, message("boot"));

        let effects = stream(&mut session, conn, StreamEvent::Closed);
        let ticket = reconnect_ticket(&effects).unwrap();
        assert!(effects.contains(&Effect::ScheduleReconnect {
            ticket,
            delay: Duration::from_millis(3000),
        }));
        assert_eq!(
            session.phase(),
            SessionPhase::Reconnecting { attempt: 1, max: 5 }
        );

        let effects = session.handle(Input::ReconnectDue(ticket));
        let reopened = opened_conn(&effects).unwrap();
        assert_ne!(reopened, conn);
        assert_eq!(session.buffer().len(), 1);
        assert_eq!(session.phase(), SessionPhase::Connecting { attempt: 1 });
    }

    #[test]
    fn retries_are_bounded() {
        let mut session = Session::new(&instant_config());
        let mut conn = select(&mut session, a1());
        let mut scheduled = 0;

        loop {
            let effects = stream(&mut session, conn, StreamEvent::Closed);
            let Some(ticket) = reconnect_ticket(&effects) else {
                break;
            };
            scheduled += 1;
            assert!(scheduled <= 5, "scheduled a retry beyond the budget");
            conn = opened_conn(&session.handle(Input::ReconnectDue(ticket))).unwrap();
        }

        assert_eq!(scheduled, 5);
        assert_eq!(session.phase(), SessionPhase::Exhausted { attempts: 5 });
        assert_eq!(session.reconnect_state(), ReconnectState::Exhausted);
        assert_eq!(session.current_connection(), None);
    }

    #[test]
    fn successful_open_resets_attempts() {
        let mut session = Session::new(&instant_config());
        let conn = select(&mut session, a1());

        let ticket = reconnect_ticket(&stream(&mut session, conn, StreamEvent::Closed)).unwrap();
        let conn = opened_conn(&session.handle(Input::ReconnectDue(ticket))).unwrap();
        assert_eq!(session.attempts(), 1);

        stream(&mut session, conn, StreamEvent::Opened);
        assert_eq!(session.attempts(), 0);
        assert_eq!(session.phase(), SessionPhase::Open);

        stream(&mut session, conn, StreamEvent::Closed);
        assert_eq!(
            session.phase(),
            SessionPhase::Reconnecting { attempt: 1, max: 5 }
        );
    }

    #[test]
    fn error_closes_then_close_reconnects() {
        let mut session = Session::new(&instant_config());
        let conn = select(&mut session, a1());
        stream(&mut session, conn, StreamEvent::Opened);

        let effects = stream(&mut session, conn, StreamEvent::Error("reset by peer".into()));
        assert_eq!(effects, vec![Effect::Close { conn }]);

        let effects = stream(&mut session, conn, StreamEvent::Closed);
        assert!(reconnect_ticket(&effects).is_some());
    }

    #[test]
    fn select_during_retry_cancels_it() {
        let mut session = Session::new(&instant_config());
        let a = select(&mut session, a1());
        let ticket = reconnect_ticket(&stream(&mut session, a, StreamEvent::Closed)).unwrap();

        let effects = session.handle(Input::Select(b2()));
        assert!(effects.contains(&Effect::CancelReconnect));
        assert_eq!(session.attempts(), 0);
        let b = session.current_connection().unwrap();

        // A timer that fires anyway must not reconnect anything.
        assert!(session.handle(Input::ReconnectDue(ticket)).is_empty());
        assert_eq!(session.current_connection(), Some(b));
    }

    #[test]
    fn reselect_after_exhaustion_starts_fresh_sequence() {
        let config = SessionConfig {
            max_reconnect_attempts: 1,
            ..instant_config()
        };
        let mut session = Session::new(&config);
        let conn = select(&mut session, a1());
        let ticket = reconnect_ticket(&stream(&mut session, conn, StreamEvent::Closed)).unwrap();
        let conn = opened_conn(&session.handle(Input::ReconnectDue(ticket))).unwrap();
        assert!(reconnect_ticket(&stream(&mut session, conn, StreamEvent::Closed)).is_none());
        assert_eq!(session.phase(), SessionPhase::Exhausted { attempts: 1 });

        let conn = select(&mut session, a1());
        assert_eq!(session.reconnect_state(), ReconnectState::Idle);
        assert!(reconnect_ticket(&stream(&mut session, conn, StreamEvent::Closed)).is_some());
    }

    #[test]
    fn phase_display() {
        assert_eq!(SessionPhase::Open.to_string(), "live");
        assert_eq!(
            SessionPhase::Reconnecting { attempt: 2, max: 5 }.to_string(),
            "reconnecting (2/5)"
        );
        assert_eq!(SessionPhase::Exhausted { attempts: 5 }.as_ref(), "exhausted");
    }
}
