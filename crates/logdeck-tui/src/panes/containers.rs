//! Container list: pick what to stream.

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph};

use logdeck_core::{Container, ContainerId};

use crate::action::Action;
use crate::component::Component;
use crate::theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inventory {
    Loading,
    Loaded,
    Unavailable,
}

pub struct ContainersPane {
    focused: bool,
    containers: Vec<Container>,
    cursor: usize,
    streaming: Option<ContainerId>,
    inventory: Inventory,
}

impl ContainersPane {
    pub fn new() -> Self {
        Self {
            focused: false,
            containers: Vec::new(),
            cursor: 0,
            streaming: None,
            inventory: Inventory::Loading,
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        let last = self.containers.len().saturating_sub(1);
        self.cursor = self.cursor.saturating_add_signed(delta).min(last);
    }

    fn item(&self, container: &Container) -> ListItem<'static> {
        let marker = if self.streaming.as_ref() == Some(&container.id) {
            Span::styled("● ", theme::streaming_marker())
        } else {
            Span::raw("  ")
        };
        ListItem::new(Line::from(vec![
            marker,
            Span::styled(container.short_name().to_owned(), theme::table_row()),
            Span::styled(
                format!(" (ID: {})", container.short_id()),
                Style::default().fg(theme::BORDER_GRAY),
            ),
        ]))
    }
}

impl Component for ContainersPane {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_cursor(-1),
            KeyCode::Char('g') | KeyCode::Home => self.cursor = 0,
            KeyCode::Char('G') | KeyCode::End => {
                self.cursor = self.containers.len().saturating_sub(1);
            }
            KeyCode::Enter => {
                return Ok(self
                    .containers
                    .get(self.cursor)
                    .cloned()
                    .map(Action::SelectContainer));
            }
            _ => {}
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::ContainersLoaded(containers) => {
                self.containers.clone_from(containers);
                self.cursor = 0;
                self.inventory = Inventory::Loaded;
            }
            Action::InventoryFailed(_) => {
                self.containers.clear();
                self.inventory = Inventory::Unavailable;
            }
            Action::Selected(container) => {
                self.streaming = Some(container.id.clone());
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(format!(" Containers ({}) ", self.containers.len()))
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_for(self.focused));

        if self.containers.is_empty() {
            let text = match self.inventory {
                Inventory::Loading => "  Loading containers...",
                Inventory::Loaded => "  No containers",
                Inventory::Unavailable => "  Inventory unavailable",
            };
            let placeholder = Paragraph::new(Line::from(Span::styled(
                text,
                Style::default().fg(theme::BORDER_GRAY),
            )))
            .block(block);
            frame.render_widget(placeholder, area);
            return;
        }

        let items: Vec<ListItem> = self.containers.iter().map(|c| self.item(c)).collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(theme::table_selected());
        let mut state = ListState::default().with_selected(Some(self.cursor));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::panes::render_to_string;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn loaded() -> ContainersPane {
        let mut pane = ContainersPane::new();
        pane.update(&Action::ContainersLoaded(vec![
            Container::new("3f9a2c1d77e0b4aa", "postgres-primary-with-a-long-name"),
            Container::new("a1", "api"),
        ]))
        .unwrap();
        pane
    }

    #[test]
    fn enter_selects_container_under_cursor() {
        let mut pane = loaded();
        assert!(matches!(
            pane.handle_key_event(key(KeyCode::Enter)).unwrap(),
            Some(Action::SelectContainer(c)) if c.id.as_str() == "3f9a2c1d77e0b4aa"
        ));

        pane.handle_key_event(key(KeyCode::Char('j'))).unwrap();
        pane.handle_key_event(key(KeyCode::Char('j'))).unwrap();
        assert!(matches!(
            pane.handle_key_event(key(KeyCode::Enter)).unwrap(),
            Some(Action::SelectContainer(c)) if c.name == "api"
        ));
    }

    #[test]
    fn enter_on_empty_list_does_nothing() {
        let mut pane = ContainersPane::new();
        assert_eq!(pane.handle_key_event(key(KeyCode::Enter)).unwrap(), None);
    }

    #[test]
    fn renders_truncated_names_and_ids() {
        let mut pane = loaded();
        pane.update(&Action::Selected(Container::new("a1", "api")))
            .unwrap();

        let screen = render_to_string(&pane, 50, 5);
        assert!(screen.contains("postgres-primary-wit (ID: 3f9a2c1d)"));
        assert!(screen.contains("● api (ID: a1)"));
        assert!(!screen.contains("long-name"));
    }

    #[test]
    fn failed_inventory_shows_placeholder() {
        let mut pane = ContainersPane::new();
        pane.update(&Action::InventoryFailed("refused".into()))
            .unwrap();
        assert!(render_to_string(&pane, 40, 4).contains("Inventory unavailable"));
    }
}
