//! Stream status indicator: ●/◐/○ with color mapping.

use ratatui::style::Style;
use ratatui::text::Span;

use logdeck_core::SessionPhase;

use crate::theme;

/// Styled dot + label for the status bar.
pub fn phase_span(phase: &SessionPhase) -> Span<'static> {
    let (symbol, color) = match phase {
        SessionPhase::Open => ("●", theme::SUCCESS_GREEN),
        SessionPhase::Connecting { .. } | SessionPhase::Reconnecting { .. } => {
            ("◐", theme::ELECTRIC_YELLOW)
        }
        SessionPhase::Exhausted { .. } => ("○", theme::ERROR_RED),
        SessionPhase::Idle => ("○", theme::DIM_WHITE),
    };
    Span::styled(format!("{symbol} {phase}"), Style::default().fg(color))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn labels_follow_phase() {
        assert_eq!(phase_span(&SessionPhase::Open).content, "● live");
        assert_eq!(
            phase_span(&SessionPhase::Reconnecting { attempt: 2, max: 5 }).content,
            "◐ reconnecting (2/5)"
        );
        let exhausted = phase_span(&SessionPhase::Exhausted { attempts: 5 });
        assert_eq!(exhausted.content, "○ retries exhausted");
        assert_eq!(exhausted.style.fg, Some(theme::ERROR_RED));
    }
}
