// ── Core error types ──
//
// User-facing errors from logdeck-core. Consumers never see reqwest or
// tungstenite errors directly; `From<logdeck_api::Error>` translates them.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to log server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Log server request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Unexpected response from log server: {message}")]
    InvalidResponse { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Session already started")]
    AlreadyStarted,

    #[error("Session is not running")]
    NotRunning,
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<logdeck_api::Error> for CoreError {
    fn from(err: logdeck_api::Error) -> Self {
        match err {
            logdeck_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else if err.is_not_found() {
                    CoreError::NotFound {
                        resource: e.url().map(|u| u.path().to_string()).unwrap_or_default(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            logdeck_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            logdeck_api::Error::UnsupportedScheme { scheme } => CoreError::Config {
                message: format!("Unsupported URL scheme '{scheme}'"),
            },
            logdeck_api::Error::ClientBuild(reason) => CoreError::Config {
                message: format!("Failed to build HTTP client: {reason}"),
            },
            logdeck_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            logdeck_api::Error::Deserialization { message, body: _ } => {
                CoreError::InvalidResponse { message }
            }
        }
    }
}
