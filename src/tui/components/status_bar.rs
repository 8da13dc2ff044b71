// Status bar component
//
// Renders the current status message above the key hints and uptime.

use crate::tui::app::App;
use crate::tui::layout::Breakpoint;
use ratatui::{
    layout::Rect,
    style::Style,
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Render the status line and key hints
///
/// Narrow terminals get the short hint set.
pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;

    let status = match &app.status {
        Some(active) => Line::styled(
            format!(" {}", active.message.text),
            theme.status(active.message.kind),
        ),
        None => Line::raw(""),
    };

    let hints = if Breakpoint::from_width(area.width).at_least(Breakpoint::Wide) {
        format!(
            " {} │ {} rows │ q quit │ L logout │ f/s/d filters │ r reset │ ↑↓ PgUp/PgDn scroll",
            app.uptime(),
            app.row_count()
        )
    } else {
        format!(" {} │ {} rows │ q L f s d r", app.uptime(), app.row_count())
    };

    let paragraph = Paragraph::new(vec![status, Line::styled(hints, Style::default().fg(theme.muted))])
        .block(Block::default().borders(Borders::TOP).border_style(theme.block_style()));

    f.render_widget(paragraph, area);
}
