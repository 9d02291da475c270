//! Session logic between `logdeck-api` and the terminal UI.
//!
//! - **[`Controller`]**: async facade. Fetches the container inventory once,
//!   then runs a single session loop that owns all stream state and pushes
//!   [`SessionUpdate`]s to the UI.
//!
//! - **[`Session`]**: the pure state machine behind it. Selection,
//!   connection identity, bounded reconnects and the log buffer all live
//!   here; it returns [`Effect`]s instead of doing I/O.
//!
//! - **[`LogBuffer`] / [`Viewport`]**: ordered line storage with delayed
//!   reveal, and the follow-when-at-bottom scroll policy.
//!
//! - **[`Connector`]**: seam between the session loop and the WebSocket,
//!   so the loop can be driven by scripted streams in tests.

pub mod buffer;
pub mod config;
pub mod connector;
pub mod controller;
pub mod error;
pub mod model;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use buffer::{LineTicket, LogBuffer, Viewport};
pub use config::{
    ControllerConfig, DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_DELAY,
    DEFAULT_TYPING_SPEED, SessionConfig,
};
pub use connector::{Connector, EventSink, StreamHandle, WsConnector};
pub use controller::Controller;
pub use error::CoreError;
pub use model::{ConnectionId, Container, ContainerId};
pub use session::{
    Effect, Input, ReconnectController, ReconnectDecision, ReconnectState, ReconnectTicket,
    Session, SessionPhase, SessionUpdate,
};
