//! Logs panel component
//!
//! Displays the most recent entries captured by the TUI log layer, newest at
//! the bottom, color-coded by level.

use crate::logging::LogEntry;
use crate::tui::app::App;
use crate::tui::theme::Theme;
use ratatui::{
    layout::Rect,
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

/// Single-line rendering of an entry
pub fn format_log_entry(entry: &LogEntry) -> String {
    format!(
        "{} {:5} {}",
        entry.timestamp.format("%H:%M:%S"),
        entry.level.as_str(),
        entry.message
    )
}

fn items<'a>(entries: &[LogEntry], theme: &Theme) -> Vec<ListItem<'a>> {
    entries
        .iter()
        .map(|entry| ListItem::new(format_log_entry(entry)).style(theme.log_level(entry.level)))
        .collect()
}

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let height = area.height.saturating_sub(2) as usize;
    let entries = app.log_buffer.recent(height);

    let list = List::new(items(&entries, &app.theme)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(app.theme.border_type)
            .border_style(app.theme.block_style())
            .title(" System Logs "),
    );

    f.render_widget(list, area);
}
