// Title bar component
//
// Renders the app title with the live indicator, the last update time and
// the logged-in user.

use crate::tui::app::App;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Render the title bar at the top of the screen
pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;

    let mut spans = vec![Span::styled(
        " 📞 CDR Dashboard",
        Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
    )];

    if app.live.visible {
        spans.push(Span::styled(
            "  ● LIVE",
            Style::default().fg(theme.live).add_modifier(Modifier::BOLD),
        ));
    } else if app.polling_stopped {
        spans.push(Span::styled("  ■ stopped", Style::default().fg(theme.muted)));
    }

    if let Some(at) = app.last_updated {
        spans.push(Span::styled(
            format!("  Last updated: {}", at.format("%H:%M:%S")),
            Style::default().fg(theme.muted),
        ));
    }

    let user = app.user.as_deref().unwrap_or("anonymous");

    let title = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(theme.border_type)
            .border_style(Style::default().fg(theme.title))
            .title_top(Line::from(format!(" 👤 {} ", user)).right_aligned()),
    );

    f.render_widget(title, area);
}
