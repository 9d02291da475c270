// ── Reconnect controller ──
//
// Bounded, fixed-delay retry bookkeeping. Only ever consulted for closes
// the session has already judged eligible (current connection, still
// selected), so it knows nothing about containers.

use std::time::Duration;

use crate::model::ConnectionId;

/// Identifies one scheduled retry: the connection whose close caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectTicket(ConnectionId);

impl ReconnectTicket {
    pub fn cause(self) -> ConnectionId {
        self.0
    }
}

/// Where the retry sequence currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectState {
    /// No retry pending.
    Idle,
    /// A retry timer is running.
    Scheduled { attempt: u32 },
    /// The attempt budget is spent; only a user reselect restarts it.
    Exhausted,
}

/// What to do about an eligible close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    Retry {
        ticket: ReconnectTicket,
        attempt: u32,
        delay: Duration,
    },
    GiveUp {
        attempts: u32,
    },
}

#[derive(Debug)]
pub struct ReconnectController {
    max_attempts: u32,
    delay: Duration,
    attempts: u32,
    pending: Option<ReconnectTicket>,
    exhausted: bool,
}

impl ReconnectController {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            attempts: 0,
            pending: None,
            exhausted: false,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn state(&self) -> ReconnectState {
        if self.exhausted {
            ReconnectState::Exhausted
        } else if self.pending.is_some() {
            ReconnectState::Scheduled {
                attempt: self.attempts,
            }
        } else {
            ReconnectState::Idle
        }
    }

    /// The live connection closed while its container is still selected.
    pub fn on_close(&mut self, closed: ConnectionId) -> ReconnectDecision {
        if self.attempts >= self.max_attempts {
            self.pending = None;
            self.exhausted = true;
            return ReconnectDecision::GiveUp {
                attempts: self.attempts,
            };
        }

        self.attempts += 1;
        let ticket = ReconnectTicket(closed);
        self.pending = Some(ticket);
        ReconnectDecision::Retry {
            ticket,
            attempt: self.attempts,
            delay: self.delay,
        }
    }

    /// A connection opened: the sequence succeeded.
    pub fn on_open(&mut self) {
        self.attempts = 0;
        self.exhausted = false;
    }

    /// The retry timer for `ticket` fired. Returns `true` if it is still the
    /// pending one and the reconnect should go ahead.
    pub fn take_due(&mut self, ticket: ReconnectTicket) -> bool {
        if self.pending == Some(ticket) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Start over for a user-driven connect. Returns `true` if a pending
    /// retry was discarded.
    pub fn reset(&mut self) -> bool {
        self.attempts = 0;
        self.exhausted = false;
        self.pending.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> ReconnectController {
        ReconnectController::new(5, Duration::from_millis(3000))
    }

    #[test]
    fn retries_with_fixed_delay_until_budget_spent() {
        let mut rc = controller();
        let mut conn = ConnectionId::new(1);

        for expected in 1..=5 {
            match rc.on_close(conn) {
                ReconnectDecision::Retry {
                    ticket,
                    attempt,
                    delay,
                } => {
                    assert_eq!(attempt, expected);
                    assert_eq!(delay, Duration::from_millis(3000));
                    assert_eq!(rc.state(), ReconnectState::Scheduled { attempt });
                    assert!(rc.take_due(ticket));
                }
                other @ ReconnectDecision::GiveUp { .. } => panic!("gave up early: {other:?}"),
            }
            conn = conn.next();
        }

        assert_eq!(rc.on_close(conn), ReconnectDecision::GiveUp { attempts: 5 });
        assert_eq!(rc.state(), ReconnectState::Exhausted);
    }

    #[test]
    fn open_resets_attempts() {
        let mut rc = controller();
        rc.on_close(ConnectionId::new(1));
        rc.on_close(ConnectionId::new(2));
        assert_eq!(rc.attempts(), 2);

        rc.on_open();
        assert_eq!(rc.attempts(), 0);
        assert!(matches!(
            rc.on_close(ConnectionId::new(3)),
            ReconnectDecision::Retry { attempt: 1, .. }
        ));
    }

    #[test]
    fn reset_discards_pending_ticket() {
        let mut rc = controller();
        let ReconnectDecision::Retry { ticket, .. } = rc.on_close(ConnectionId::new(1)) else {
            panic!("expected retry");
        };

        assert!(rc.reset());
        assert!(!rc.take_due(ticket));
        assert_eq!(rc.state(), ReconnectState::Idle);
        assert!(!rc.reset());
    }

    #[test]
    fn stale_ticket_is_inert() {
        let mut rc = controller();
        let ReconnectDecision::Retry { ticket: old, .. } = rc.on_close(ConnectionId::new(1))
        else {
            panic!("expected retry");
        };
        let ReconnectDecision::Retry { ticket: new, .. } = rc.on_close(ConnectionId::new(2))
        else {
            panic!("expected retry");
        };

        assert!(!rc.take_due(old));
        assert!(rc.take_due(new));
        assert_eq!(old.cause(), ConnectionId::new(1));
    }

    #[test]
    fn zero_budget_gives_up_immediately() {
        let mut rc = ReconnectController::new(0, Duration::ZERO);
        assert_eq!(
            rc.on_close(ConnectionId::new(1)),
            ReconnectDecision::GiveUp { attempts: 0 }
        );
    }
}
