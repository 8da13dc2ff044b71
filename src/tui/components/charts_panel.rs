// Charts panel component
//
// One bar chart with the category distribution, then one gauge per category
// showing its share of the total with the info label underneath. Everything
// is drawn from the chart datasets the reconciler maintains.

use crate::dashboard::ChartId;
use crate::model::ServiceType;
use crate::tui::app::App;
use crate::tui::layout::Breakpoint;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::Line,
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Gauge, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let (distribution_area, categories_area) =
        if Breakpoint::from_width(area.width).at_least(Breakpoint::Wide) {
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            // Narrow: gauges only
            (Rect::default(), area)
        };

    if distribution_area.width > 0 {
        render_distribution(f, distribution_area, app);
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(categories_area);
    for (service, column) in ServiceType::ALL.iter().zip(columns.iter()) {
        render_category(f, *column, app, *service);
    }
}

fn render_distribution(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(theme.block_style())
        .title(format!(" {} ", ChartId::Distribution.title()));

    let Some(chart) = app.reconciler.sink().get(ChartId::Distribution) else {
        f.render_widget(block, area);
        return;
    };

    let bars: Vec<Bar> = chart
        .dataset
        .labels
        .iter()
        .zip(&chart.dataset.values)
        .zip(ServiceType::ALL.iter())
        .map(|((label, value), service)| {
            Bar::default()
                .label(Line::from(label.as_str()))
                .value(*value)
                .style(Style::default().fg(theme.service(*service)))
        })
        .collect();

    let bar_width = (area.width.saturating_sub(4) / 3).saturating_sub(1).max(1);
    let widget = BarChart::default()
        .block(block)
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width)
        .bar_gap(1);

    f.render_widget(widget, area);
}

fn render_category(f: &mut Frame, area: Rect, app: &App, service: ServiceType) {
    let theme = &app.theme;
    let id = ChartId::Category(service);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(theme.block_style())
        .title(format!(" {} ", id.title()));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(chart) = app.reconciler.sink().get(id) else {
        return;
    };

    let counts = app.reconciler.counts();
    let ratio = (counts.percent(service) / 100.0).clamp(0.0, 1.0);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(theme.service(service)))
        .ratio(ratio)
        .label(counts.percent_label(service));
    f.render_widget(gauge, rows[0]);

    // Dataset is [this category, everything else]
    let other = chart.dataset.values.get(1).copied().unwrap_or(0);
    let info = Paragraph::new(format!("{} · Other: {}", counts.info_label(service), other))
        .style(Style::default().fg(theme.muted));
    f.render_widget(info, rows[1]);
}
