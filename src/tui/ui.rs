// Main UI render function - called on every frame
//
// Layout, top to bottom:
//   title | filters | table | charts | status | logs
// The logs panel is dropped on short terminals so the table keeps room.

use super::app::App;
use super::components::{cdr_table, charts_panel, filter_bar, logs_panel, status_bar, title_bar};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::Frame;
use std::time::Instant;

/// Below this height the logs panel is hidden
const LOGS_MIN_HEIGHT: u16 = 36;

pub fn draw(f: &mut Frame, app: &App) {
    let now = Instant::now();
    let area = f.area();
    let show_logs = area.height >= LOGS_MIN_HEIGHT;

    let mut constraints = vec![
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(6),
        Constraint::Length(9),
        Constraint::Length(3),
    ];
    if show_logs {
        constraints.push(Constraint::Length(7));
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    title_bar::render(f, chunks[0], app);
    filter_bar::render(f, chunks[1], app);
    cdr_table::render(f, chunks[2], app, now);
    charts_panel::render(f, chunks[3], app);
    status_bar::render(f, chunks[4], app);
    if show_logs {
        logs_panel::render(f, chunks[5], app);
    }

    if let Some(toast) = &app.toast {
        toast.render(f, area, &app.theme);
    }
}
