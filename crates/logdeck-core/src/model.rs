// ── Domain model ──
//
// Containers as the user sees them, plus the identity types the session
// uses to tell the live connection apart from superseded ones.

use std::fmt;

use serde::{Deserialize, Serialize};

use logdeck_api::ContainerSummary;

const SHORT_ID_LEN: usize = 8;
const SHORT_NAME_LEN: usize = 20;

// ── ContainerId ─────────────────────────────────────────────────────

/// Opaque container identifier, exactly as the inventory reports it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ContainerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContainerId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl AsRef<str> for ContainerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ── Container ───────────────────────────────────────────────────────

/// A selectable log source. Immutable once fetched.
///
/// Also serves as the session's *selection*: the `{ id, name }` pair the
/// user currently wants to watch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    pub name: String,
}

impl Container {
    pub fn new(id: impl Into<ContainerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// First 8 characters of the id, for list display.
    pub fn short_id(&self) -> &str {
        prefix_chars(self.id.as_str(), SHORT_ID_LEN)
    }

    /// First 20 characters of the name, for list display.
    pub fn short_name(&self) -> &str {
        prefix_chars(&self.name, SHORT_NAME_LEN)
    }
}

impl From<ContainerSummary> for Container {
    fn from(summary: ContainerSummary) -> Self {
        Self {
            id: ContainerId(summary.id),
            name: summary.name,
        }
    }
}

/// Longest prefix of `s` holding at most `max` chars, cut on a char boundary.
fn prefix_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ── ConnectionId ────────────────────────────────────────────────────

/// Generation number of one opened stream connection.
///
/// Every open gets a fresh id, including a reopen of the same container,
/// so an event tagged with an old id can never be mistaken for one from
/// the live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
