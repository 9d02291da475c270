// ── Runtime configuration ──
//
// Plain data handed to the controller. Loading from files and env lives
// in `logdeck-config`; this crate only sees resolved values.

use std::time::Duration;

use url::Url;

/// Default number of automatic reconnects per retry sequence.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
/// Default fixed wait before each automatic reconnect.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);
/// Default per-line display delay (the typing effect).
pub const DEFAULT_TYPING_SPEED: Duration = Duration::from_millis(100);

/// Reconnect and pacing knobs for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Automatic reconnects allowed before giving up.
    pub max_reconnect_attempts: u32,
    /// Fixed delay before every automatic reconnect. Not exponential.
    pub reconnect_delay: Duration,
    /// Delay before a received line becomes visible. Zero shows it immediately.
    pub typing_speed: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            typing_speed: DEFAULT_TYPING_SPEED,
        }
    }
}

/// Everything the [`Controller`](crate::Controller) needs to run.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Server base URL, e.g. `http://localhost:8080`.
    pub server: Url,
    /// Timeout for the inventory request.
    pub timeout: Duration,
    pub session: SessionConfig,
}
