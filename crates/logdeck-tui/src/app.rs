//! Application core: event loop, focus, action dispatch.

use std::time::{Duration, Instant};

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use logdeck_core::{Controller, SessionPhase};

use crate::action::{Action, Focus, Notification, NotificationLevel};
use crate::component::Component;
use crate::event::{Event, EventReader};
use crate::panes::{ContainersPane, LogsPane};
use crate::theme;
use crate::tui::Tui;
use crate::widgets::status_indicator;

const TOAST_TTL: Duration = Duration::from_secs(5);
const LIST_WIDTH: u16 = 42;

pub struct App {
    controller: Controller,
    containers: ContainersPane,
    logs: LogsPane,
    focus: Focus,
    running: bool,
    phase: SessionPhase,
    help_visible: bool,
    /// Active toast with the time it was raised.
    notification: Option<(Notification, Instant)>,
    data_cancel: CancellationToken,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
}

impl App {
    pub fn new(controller: Controller) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let mut containers = ContainersPane::new();
        containers.set_focused(true);

        Self {
            controller,
            containers,
            logs: LogsPane::new(),
            focus: Focus::default(),
            running: true,
            phase: SessionPhase::Idle,
            help_visible: false,
            notification: None,
            data_cancel: CancellationToken::new(),
            action_tx,
            action_rx,
        }
    }

    /// Run the main event loop until the user quits.
    ///
    /// Redraws after every terminal event or batch of actions, so session
    /// updates show up without waiting for input.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::enter()?;

        let bridge = {
            let controller = self.controller.clone();
            let tx = self.action_tx.clone();
            let cancel = self.data_cancel.clone();
            tokio::spawn(async move {
                crate::data_bridge::spawn_data_bridge(controller, tx, cancel).await;
            })
        };

        let mut events = EventReader::spawn();
        info!("TUI event loop started");

        while self.running {
            tui.draw(|frame| self.render(frame))?;

            tokio::select! {
                event = events.next() => match event {
                    Some(event) => self.handle_event(event)?,
                    None => break,
                },
                Some(action) = self.action_rx.recv() => self.process_action(&action)?,
            }

            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action)?;
            }
        }

        self.data_cancel.cancel();
        events.stop();
        let _ = bridge.await;
        drop(tui);
        info!("TUI event loop ended");
        Ok(())
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(key) => {
                if let Some(action) = self.handle_key_event(key)? {
                    self.action_tx.send(action)?;
                }
            }
            // The wheel always scrolls the log pane.
            Event::Wheel(wheel) => self.logs.scroll_wheel(wheel),
            Event::Resize => {}
            Event::Tick => self.process_action(&Action::Tick)?,
        }
        Ok(())
    }

    fn focused_pane(&mut self) -> &mut dyn Component {
        match self.focus {
            Focus::Containers => &mut self.containers,
            Focus::Logs => &mut self.logs,
        }
    }

    /// Global keys first, then the focused pane.
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.help_visible {
            return Ok(match key.code {
                KeyCode::Esc | KeyCode::Char('?') => Some(Action::ToggleHelp),
                _ => None,
            });
        }

        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c'))
            | (KeyModifiers::NONE, KeyCode::Char('q')) => return Ok(Some(Action::Quit)),
            (KeyModifiers::NONE, KeyCode::Char('?')) => return Ok(Some(Action::ToggleHelp)),
            (_, KeyCode::Tab | KeyCode::BackTab) => return Ok(Some(Action::FocusNext)),
            _ => {}
        }

        self.focused_pane().handle_key_event(key)
    }

    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => self.running = false,

            Action::FocusNext => {
                self.focus = self.focus.next();
                self.containers.set_focused(self.focus == Focus::Containers);
                self.logs.set_focused(self.focus == Focus::Logs);
            }

            Action::ToggleHelp => self.help_visible = !self.help_visible,

            Action::SelectContainer(container) => {
                debug!(container = %container.id, "selecting container");
                if let Err(e) = self.controller.select(container.clone()) {
                    warn!(error = %e, "selection rejected");
                    self.action_tx
                        .send(Action::Notify(Notification::error(e.to_string())))?;
                }
            }

            Action::PhaseChanged(phase) => self.phase = *phase,

            Action::Notify(notification) => {
                self.notification = Some((notification.clone(), Instant::now()));
            }

            Action::Tick => {
                if self
                    .notification
                    .as_ref()
                    .is_some_and(|(_, raised)| raised.elapsed() > TOAST_TTL)
                {
                    self.notification = None;
                }
                self.logs.update(action)?;
            }

            Action::ContainersLoaded(_)
            | Action::InventoryFailed(_)
            | Action::Selected(_)
            | Action::LinesRevealed(_) => {
                for pane in [
                    &mut self.containers as &mut dyn Component,
                    &mut self.logs,
                ] {
                    if let Some(follow_up) = pane.update(action)? {
                        self.action_tx.send(follow_up)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let [content, status] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(area);
        let [list, logs] =
            Layout::horizontal([Constraint::Length(LIST_WIDTH), Constraint::Min(1)])
                .areas(content);

        self.containers.render(frame, list);
        self.logs.render(frame, logs);
        self.render_status_bar(frame, status);

        if let Some((notification, _)) = &self.notification {
            render_notification(frame, area, notification);
        }
        if self.help_visible {
            render_help_overlay(frame, area);
        }
    }

    /// Stream status, server, key hints.
    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let line = Line::from(vec![
            Span::raw(" "),
            status_indicator::phase_span(&self.phase),
            Span::styled(" │ ", theme::key_hint()),
            Span::styled(
                self.controller.config().server.to_string(),
                Style::default().fg(theme::DIM_WHITE),
            ),
            Span::styled(
                " │ Tab focus  Enter stream  ? help  q quit",
                theme::key_hint(),
            ),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }
}

/// Toast in the bottom-right corner, above the status bar.
fn render_notification(frame: &mut Frame, area: Rect, notification: &Notification) {
    let msg_len = u16::try_from(notification.message.chars().count()).unwrap_or(u16::MAX);
    let width = msg_len.saturating_add(6).clamp(20, 70).min(area.width);
    let height = 3u16.min(area.height);

    let x = area.width.saturating_sub(width + 1);
    let y = area.height.saturating_sub(height + 1);
    let toast_area = Rect::new(area.x + x, area.y + y, width, height);

    let (color, icon) = match notification.level {
        NotificationLevel::Error => (theme::ERROR_RED, "✗"),
        NotificationLevel::Info => (theme::NEON_CYAN, "·"),
    };

    frame.render_widget(Clear, toast_area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
        .style(Style::default().bg(theme::BG_DARK));
    let inner = block.inner(toast_area);
    frame.render_widget(block, toast_area);

    let line = Line::from(vec![
        Span::styled(format!(" {icon} "), Style::default().fg(color)),
        Span::styled(
            notification.message.as_str(),
            Style::default().fg(theme::DIM_WHITE),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), inner);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let help_width = 52u16.min(area.width.saturating_sub(4));
    let help_height = 16u16.min(area.height.saturating_sub(2));
    let help_area = Rect::new(
        area.x + area.width.saturating_sub(help_width) / 2,
        area.y + area.height.saturating_sub(help_height) / 2,
        help_width,
        help_height,
    );

    frame.render_widget(Clear, help_area);
    let block = Block::default()
        .title(" Keyboard Shortcuts ")
        .title_style(theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border_focused())
        .style(Style::default().bg(theme::BG_DARK));
    let inner = block.inner(help_area);
    frame.render_widget(block, help_area);

    let entry = |keys: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {keys:<12}"), theme::key_hint_key()),
            Span::styled(what, theme::key_hint()),
        ])
    };

    let help_text = vec![
        Line::from(""),
        entry("j/k ↑/↓", "Move / scroll"),
        entry("Enter", "Stream selected container"),
        entry("Tab", "Switch pane"),
        entry("g/G", "Top / bottom"),
        entry("PgUp/PgDn", "Page up / down"),
        entry("Ctrl+u/d", "Page up / down"),
        entry("Wheel", "Scroll logs"),
        entry("?", "This help"),
        entry("q", "Quit"),
        Line::from(""),
        Line::from(Span::styled("  Esc or ? to close", theme::key_hint())),
    ];
    frame.render_widget(Paragraph::new(help_text), inner);
}
