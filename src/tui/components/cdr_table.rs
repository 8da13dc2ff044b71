// CDR table component
//
// Rows come from the reconciler's last render. Rows seen for the first time
// keep a highlighted background until their highlight runs out.

use crate::dashboard::Column;
use crate::tui::app::App;
use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Row, Table},
    Frame,
};
use std::time::Instant;

fn width(column: Column) -> Constraint {
    match column {
        Column::Id => Constraint::Length(8),
        Column::Anum | Column::Bnum => Constraint::Length(16),
        Column::ServiceType => Constraint::Length(9),
        Column::Usage => Constraint::Length(10),
        Column::StartDateTime => Constraint::Min(19),
    }
}

pub fn render(f: &mut Frame, area: Rect, app: &App, now: Instant) {
    let theme = &app.theme;
    let view = app.reconciler.table();

    let header = Row::new(view.columns.iter().map(|c| Cell::from(c.header()))).style(
        Style::default()
            .fg(theme.header)
            .add_modifier(Modifier::BOLD),
    );

    // Two border rows plus the header
    let visible = area.height.saturating_sub(3) as usize;

    let rows = view
        .rows
        .iter()
        .skip(app.table_offset)
        .take(visible)
        .map(|cdr| {
            let cells = view.columns.iter().map(|column| {
                let text = column.cell(cdr);
                match (column, cdr.category()) {
                    (Column::ServiceType, Some(service)) => {
                        Cell::from(text).style(Style::default().fg(theme.service(service)))
                    }
                    _ => Cell::from(text),
                }
            });

            let style = if app.reconciler.is_new(cdr.id, now) {
                Style::default().fg(theme.fg).bg(theme.new_row_bg)
            } else {
                Style::default().fg(theme.fg)
            };
            Row::new(cells).style(style)
        });

    let position = if view.rows.is_empty() {
        " no records ".to_string()
    } else {
        format!(
            " {}-{} of {} ",
            app.table_offset + 1,
            (app.table_offset + visible).min(view.rows.len()),
            view.rows.len()
        )
    };

    let title = match app.view_data {
        Some(_) => " Call Detail Records (server filtered) ",
        None => " Call Detail Records ",
    };

    let table = Table::new(rows, view.columns.iter().map(|c| width(*c)))
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(theme.border_type)
                .border_style(theme.block_style())
                .title(title)
                .title_bottom(Line::from(position).right_aligned()),
        );

    f.render_widget(table, area);
}
