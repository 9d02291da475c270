//! Terminal input for the app loop.
//!
//! A background task reads crossterm events and forwards only what logdeck
//! reacts to: key presses, wheel scrolls and resizes. It also emits a
//! [`Event::Tick`] every [`TICK_RATE`], which blinks the log cursor and
//! expires toasts.

use std::time::Duration;

use crossterm::event::{
    Event as CrosstermEvent, EventStream, KeyEvent, KeyEventKind, MouseEventKind,
};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// One cursor blink phase.
pub const TICK_RATE: Duration = Duration::from_millis(500);

/// Mouse wheel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wheel {
    Up,
    Down,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Event {
    Key(KeyEvent),
    Wheel(Wheel),
    /// The terminal changed size; the next draw picks it up.
    Resize,
    Tick,
}

impl Event {
    /// Keep the crossterm events the app uses, drop the rest.
    fn translate(event: CrosstermEvent) -> Option<Self> {
        match event {
            CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Some(Self::Key(key)),
            CrosstermEvent::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollUp => Some(Self::Wheel(Wheel::Up)),
                MouseEventKind::ScrollDown => Some(Self::Wheel(Wheel::Down)),
                _ => None,
            },
            CrosstermEvent::Resize(..) => Some(Self::Resize),
            _ => None,
        }
    }
}

pub struct EventReader {
    rx: mpsc::UnboundedReceiver<Event>,
    cancel: CancellationToken,
}

impl EventReader {
    /// Start reading the terminal on a background task.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        tokio::spawn(read_terminal(tx, cancel.clone()));
        Self { rx, cancel }
    }

    /// Next event, or `None` once the reader has stopped.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for EventReader {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn read_terminal(tx: mpsc::UnboundedSender<Event>, cancel: CancellationToken) {
    let mut terminal = EventStream::new();
    let mut ticks = tokio::time::interval(TICK_RATE);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let event = tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticks.tick() => Event::Tick,
            next = terminal.next() => match next {
                Some(Ok(raw)) => match Event::translate(raw) {
                    Some(event) => event,
                    None => continue,
                },
                // Input is gone; the app sees the channel close.
                Some(Err(_)) | None => break,
            },
        };

        if tx.send(event).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyEventState, KeyModifiers, MouseEvent};
    use pretty_assertions::assert_eq;

    use super::*;

    fn mouse(kind: MouseEventKind) -> CrosstermEvent {
        CrosstermEvent::Mouse(MouseEvent {
            kind,
            column: 3,
            row: 4,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn keeps_key_presses_only() {
        let press = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(
            Event::translate(CrosstermEvent::Key(press)),
            Some(Event::Key(press))
        );

        let release = KeyEvent {
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
            ..press
        };
        assert_eq!(Event::translate(CrosstermEvent::Key(release)), None);
    }

    #[test]
    fn mouse_reduces_to_wheel() {
        assert_eq!(
            Event::translate(mouse(MouseEventKind::ScrollUp)),
            Some(Event::Wheel(Wheel::Up))
        );
        assert_eq!(
            Event::translate(mouse(MouseEventKind::ScrollDown)),
            Some(Event::Wheel(Wheel::Down))
        );
        assert_eq!(Event::translate(mouse(MouseEventKind::Moved)), None);
    }

    #[test]
    fn resize_and_focus() {
        assert_eq!(
            Event::translate(CrosstermEvent::Resize(80, 24)),
            Some(Event::Resize)
        );
        assert_eq!(Event::translate(CrosstermEvent::FocusGained), None);
    }
}
