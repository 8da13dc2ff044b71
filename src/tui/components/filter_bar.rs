// Filter bar component
//
// Shows the three selectors and whether selections are applied locally or by
// the backend.

use crate::filter::FilterMode;
use crate::tui::app::App;
use crate::tui::layout::Breakpoint;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let options = app.filters.options();
    let compact = !Breakpoint::from_width(area.width).at_least(Breakpoint::Normal);

    let sort = options.sort.map_or("None", |s| s.label());
    let service = options.service_type.map_or("All", |s| s.as_str());
    let date = options.date.label();

    let key = Style::default().fg(theme.header).add_modifier(Modifier::BOLD);
    let value = Style::default().fg(theme.fg);

    let mut spans = vec![
        Span::styled(" [f]", key),
        Span::styled(if compact { " " } else { " Filter by: " }, theme.block_style()),
        Span::styled(sort, value),
        Span::styled("  [s]", key),
        Span::styled(if compact { " " } else { " Service: " }, theme.block_style()),
        Span::styled(service, value),
        Span::styled("  [d]", key),
        Span::styled(if compact { " " } else { " Date: " }, theme.block_style()),
        Span::styled(date, value),
    ];

    if !compact {
        let mode = match app.filters.mode() {
            FilterMode::Client => "local",
            FilterMode::Server => "server",
        };
        spans.push(Span::styled(
            format!("  ({} filtering)", mode),
            Style::default().fg(theme.muted),
        ));
    }

    let bar = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(theme.border_type)
            .border_style(theme.block_style())
            .title(" Filters "),
    );

    f.render_widget(bar, area);
}
