pub mod containers;
pub mod logs;

pub use containers::ContainersPane;
pub use logs::LogsPane;

#[cfg(test)]
pub(crate) fn render_to_string(
    component: &dyn crate::component::Component,
    width: u16,
    height: u16,
) -> String {
    use ratatui::{Terminal, backend::TestBackend};

    let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
    terminal
        .draw(|frame| component.render(frame, frame.area()))
        .unwrap();

    let buffer = terminal.backend().buffer();
    let mut out = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            out.push_str(buffer[(x, y)].symbol());
        }
        out.push('\n');
    }
    out
}
