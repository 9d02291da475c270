//! Log pane: holds the revealed log text and follows the tail while the user
//! is at the bottom.
//!
//! Messages are split at line breaks and soft-wrapped to the pane width. The
//! viewport scrolls over wrapped rows. One column is kept free so the cursor
//! after the last row is never clipped.

use std::borrow::Cow;
use std::cell::Cell;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};

use logdeck_core::Viewport;

use crate::action::Action;
use crate::component::Component;
use crate::event::Wheel;
use crate::theme;

const WHEEL_STEP: usize = 3;
const CURSOR: &str = "▌";

pub struct LogsPane {
    focused: bool,
    container_name: Option<String>,
    /// Text rows, one per line break in the received messages.
    lines: Vec<String>,
    /// `lines` wrapped to `wrap_width`. Zero width means unwrapped.
    rows: Vec<String>,
    wrap_width: usize,
    viewport: Viewport,
    /// Text area (width, height) seen by the last render.
    area: Cell<(usize, usize)>,
    cursor_on: bool,
}

impl LogsPane {
    pub fn new() -> Self {
        Self {
            focused: false,
            container_name: None,
            lines: Vec::new(),
            rows: Vec::new(),
            wrap_width: 0,
            viewport: Viewport::default(),
            area: Cell::new((0, 0)),
            cursor_on: true,
        }
    }

    pub fn is_following(&self) -> bool {
        self.viewport.is_at_bottom(self.rows.len())
    }

    pub fn scroll_wheel(&mut self, wheel: Wheel) {
        match wheel {
            Wheel::Up => self.scroll(|vp, _| vp.scroll_up(WHEEL_STEP)),
            Wheel::Down => self.scroll(|vp, total| vp.scroll_down(WHEEL_STEP, total)),
        }
    }

    // Picks up size changes seen by the last render.
    fn sync_layout(&mut self) {
        let (width, height) = self.area.get();
        if width != self.wrap_width {
            let before = self.rows.len();
            self.wrap_width = width;
            self.rows = wrap_all(&self.lines, width);
            self.viewport.reflow(before, self.rows.len());
        }
        if height != self.viewport.height() {
            self.viewport.resize(height, self.rows.len());
        }
    }

    fn scroll(&mut self, f: impl FnOnce(&mut Viewport, usize)) {
        self.sync_layout();
        f(&mut self.viewport, self.rows.len());
    }

    fn append(&mut self, messages: &[String]) {
        self.sync_layout();
        let before = self.rows.len();
        for msg in messages {
            if msg.is_empty() {
                self.push_line(String::new());
            }
            for line in msg.lines() {
                self.push_line(line.to_owned());
            }
        }
        self.viewport.follow(before, self.rows.len());
    }

    fn push_line(&mut self, line: String) {
        wrap_into(&line, self.wrap_width, &mut self.rows);
        self.lines.push(line);
    }

    fn clear(&mut self) {
        self.lines.clear();
        self.rows.clear();
        self.viewport.reset();
    }

    fn title(&self) -> String {
        format!(
            " Logs for Container: {} ",
            self.container_name.as_deref().unwrap_or("None")
        )
    }
}

fn wrap_all(lines: &[String], width: usize) -> Vec<String> {
    let mut rows = Vec::with_capacity(lines.len());
    for line in lines {
        wrap_into(line, width, &mut rows);
    }
    rows
}

/// Split `line` into rows of at most `width` chars.
fn wrap_into(line: &str, width: usize, rows: &mut Vec<String>) {
    if width == 0 || line.chars().count() <= width {
        rows.push(line.to_owned());
        return;
    }
    let mut chars = line.chars().peekable();
    while chars.peek().is_some() {
        rows.push(chars.by_ref().take(width).collect());
    }
}

impl Component for LogsPane {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('u') if ctrl => self.scroll(|vp, _| vp.page_up()),
            KeyCode::Char('d') if ctrl => self.scroll(Viewport::page_down),
            KeyCode::Char('j') | KeyCode::Down => {
                self.scroll(|vp, total| vp.scroll_down(1, total));
            }
            KeyCode::Char('k') | KeyCode::Up => self.scroll(|vp, _| vp.scroll_up(1)),
            KeyCode::Char('g') | KeyCode::Home => self.scroll(|vp, _| vp.scroll_to_top()),
            KeyCode::Char('G') | KeyCode::End => self.scroll(Viewport::scroll_to_bottom),
            KeyCode::PageUp => self.scroll(|vp, _| vp.page_up()),
            KeyCode::PageDown => self.scroll(Viewport::page_down),
            _ => {}
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::Selected(container) => {
                self.container_name = Some(container.name.clone());
                self.clear();
            }
            Action::LinesRevealed(messages) => self.append(messages),
            Action::Tick => self.cursor_on = !self.cursor_on,
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let follow_hint = if self.is_following() {
            Span::styled(" ↓ following ", Style::default().fg(theme::SUCCESS_GREEN))
        } else {
            Span::styled(" ↑ scrolled ", Style::default().fg(theme::ELECTRIC_YELLOW))
        };

        let block = Block::default()
            .title(self.title())
            .title(Line::from(follow_hint).right_aligned())
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_for(self.focused));

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let width = usize::from(inner.width).saturating_sub(1);
        let height = usize::from(inner.height);
        self.area.set((width, height));

        // Until the next update syncs, lay out for the size we have now.
        let rows: Cow<'_, [String]> = if width == self.wrap_width {
            Cow::Borrowed(&self.rows)
        } else {
            Cow::Owned(wrap_all(&self.lines, width))
        };
        let total = rows.len();
        let mut viewport = self.viewport;
        viewport.reflow(self.rows.len(), total);
        viewport.resize(height, total);
        let range = viewport.visible_range(total);
        let shows_tail = range.end == total;

        let cursor = Span::styled(
            if self.cursor_on { CURSOR } else { " " },
            theme::log_cursor(),
        );

        let mut text: Vec<Line> = rows
            .get(range)
            .unwrap_or_default()
            .iter()
            .map(|row| Line::from(Span::styled(row.clone(), theme::table_row())))
            .collect();

        if self.container_name.is_none() {
            text.push(Line::from(Span::styled(
                "Select a container to stream its logs",
                Style::default().fg(theme::BORDER_GRAY),
            )));
        } else if shows_tail {
            match text.last_mut() {
                Some(last) => last.push_span(cursor),
                None => text.push(Line::from(cursor)),
            }
        }

        frame.render_widget(Paragraph::new(text), inner);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }
}
