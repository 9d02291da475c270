//! All possible UI actions. Actions are the sole mechanism for state mutation.

use logdeck_core::{Container, SessionPhase, SessionUpdate};

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// A toast notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn info(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Info,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Error,
        }
    }
}

/// Which pane receives keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Containers,
    Logs,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Self::Containers => Self::Logs,
            Self::Logs => Self::Containers,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Lifecycle ──────────────────────────────────────────────────
    Quit,
    Tick,

    // ── Navigation ────────────────────────────────────────────────
    FocusNext,
    ToggleHelp,

    // ── Inventory ─────────────────────────────────────────────────
    ContainersLoaded(Vec<Container>),
    InventoryFailed(String),

    // ── Selection (user intent, goes to the controller) ──────────
    SelectContainer(Container),

    // ── Session updates (from the controller) ─────────────────────
    Selected(Container),
    PhaseChanged(SessionPhase),
    LinesRevealed(Vec<String>),

    // ── Notifications ─────────────────────────────────────────────
    Notify(Notification),
}

impl From<SessionUpdate> for Action {
    fn from(update: SessionUpdate) -> Self {
        match update {
            SessionUpdate::Selected(container) => Self::Selected(container),
            SessionUpdate::Phase(phase) => Self::PhaseChanged(phase),
            SessionUpdate::Lines(lines) => Self::LinesRevealed(lines),
        }
    }
}
