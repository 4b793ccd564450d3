//! Summary view rendering.
//!
//! Displays a table of all sites with uptime, latest latency, a latency
//! trend, a tracker of recent samples and the latest state, plus a detail
//! line for the selected site.

use std::cmp::Ordering;

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::app::App;
use crate::data::{classify, SiteSeries};

/// Number of most recent samples shown in the tracker column.
pub const TRACKER_WIDTH: usize = 30;

const TRACKER_CHAR: &str = "■";

/// Number of most recent samples shown in the latency trend.
pub const TREND_WIDTH: usize = 12;

/// Sparkline characters (8 levels of height).
const SPARKLINE_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Column to sort by in the Summary view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    /// Sort by site name alphabetically.
    #[default]
    Name,
    /// Sort by recomputed uptime.
    Uptime,
    /// Sort by latest latency.
    Latency,
    /// Sort by latest state.
    Status,
}

impl SortColumn {
    /// Cycle to the next sort column.
    pub fn next(self) -> Self {
        match self {
            SortColumn::Name => SortColumn::Uptime,
            SortColumn::Uptime => SortColumn::Latency,
            SortColumn::Latency => SortColumn::Status,
            SortColumn::Status => SortColumn::Name,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortColumn::Name => "name",
            SortColumn::Uptime => "uptime",
            SortColumn::Latency => "latency",
            SortColumn::Status => "status",
        }
    }
}

/// Render the Summary view showing all sites in a sortable table.
///
/// The table scroll offset is kept in `app.table_state` so mouse clicks can
/// be mapped back to sites.
pub fn render(frame: &mut Frame, app: &mut App, area: Rect) {
    let Some(total) = app.snapshot().map(|snapshot| snapshot.len()) else {
        return;
    };
    let sites = app.visible_sites();

    let chunks = Layout::vertical([Constraint::Min(4), Constraint::Length(3)]).split(area);

    let header = Row::new(vec![
        Cell::from(format_header("Site", SortColumn::Name, app)),
        Cell::from("URL"),
        Cell::from(format_header("Uptime", SortColumn::Uptime, app)),
        Cell::from(format_header("Latency", SortColumn::Latency, app)),
        Cell::from("Trend"),
        Cell::from("Tracker"),
        Cell::from(format_header("Status", SortColumn::Status, app)),
    ])
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = sites
        .iter()
        .map(|s| {
            let latency = s
                .latest()
                .map(|sample| format_latency(sample.latency_ms))
                .unwrap_or_else(|| "-".to_string());

            Row::new(vec![
                Cell::from(s.site.display_name().to_string()),
                Cell::from(s.site.url.clone()),
                Cell::from(format!("{:.2}%", s.uptime_percent)),
                Cell::from(latency),
                Cell::from(latency_sparkline(s)),
                Cell::from(tracker_line(s, app)),
                Cell::from(s.last_state.symbol()).style(app.theme.state_style(s.last_state)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Fill(2),                        // Site
        Constraint::Fill(3),                        // URL
        Constraint::Length(8),                      // Uptime
        Constraint::Length(8),                      // Latency
        Constraint::Length(TREND_WIDTH as u16),     // Trend
        Constraint::Length(TRACKER_WIDTH as u16),   // Tracker
        Constraint::Min(6),                         // Status
    ];

    let selected = app.selected_index.min(sites.len().saturating_sub(1));

    let filter_info = if app.filter_active {
        format!(" /{}_", app.filter_text)
    } else if !app.filter_text.is_empty() {
        format!(" /{}/ [c:clear]", app.filter_text)
    } else {
        String::new()
    };

    let position_info = if !sites.is_empty() {
        format!(" [{}/{}]", selected + 1, sites.len())
    } else {
        String::new()
    };

    let title = format!(
        " Sites ({}/{}) [s:sort {}{}]{}{} ",
        sites.len(),
        total,
        app.sort_column.label(),
        if app.sort_ascending { "↑" } else { "↓" },
        filter_info,
        position_info
    );

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    render_selected(frame, app, sites.get(selected).copied(), chunks[1]);

    let selection = if sites.is_empty() { None } else { Some(selected) };
    app.table_state.select(selection);
    frame.render_stateful_widget(table, chunks[0], &mut app.table_state);
}

/// Latency of the most recent samples, oldest left, scaled to the largest.
pub fn latency_sparkline(series: &SiteSeries) -> String {
    let skip = series.statuses.len().saturating_sub(TREND_WIDTH);
    let values: Vec<f64> = series
        .statuses
        .iter()
        .skip(skip)
        .map(|sample| sample.latency_ms.max(0.0))
        .collect();

    if values.is_empty() {
        return " ".repeat(TREND_WIDTH);
    }

    let max = values.iter().copied().fold(0.0, f64::max).max(1.0);
    values
        .iter()
        .map(|v| {
            let level = ((v / max) * 7.0).round() as usize;
            SPARKLINE_CHARS[level.min(7)]
        })
        .collect()
}

/// Tracker cells for the most recent samples, oldest left.
fn tracker_line(series: &SiteSeries, app: &App) -> Line<'static> {
    let skip = series.statuses.len().saturating_sub(TRACKER_WIDTH);
    let spans: Vec<Span> = series
        .statuses
        .iter()
        .skip(skip)
        .map(|sample| {
            let state = classify(sample, &app.thresholds).state;
            Span::styled(TRACKER_CHAR, Style::default().fg(app.theme.state_color(state)))
        })
        .collect();
    Line::from(spans)
}

/// Latest sample of the selected site, with its classification label.
fn render_selected(frame: &mut Frame, app: &App, site: Option<&SiteSeries>, area: Rect) {
    let line = match site.and_then(|s| s.latest().map(|sample| (s, sample))) {
        Some((s, sample)) => {
            let classification = classify(sample, &app.thresholds);
            let mut spans = vec![
                Span::styled(
                    format!(" {} ", s.site.display_name()),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(classification.tooltip, app.theme.state_style(classification.state)),
            ];
            if let Some(message) = sample.message() {
                spans.push(Span::raw(format!(" │ {}", message)));
            }
            spans.push(Span::raw(format!(" │ {}", format_latency(sample.latency_ms))));
            if let Some(reported) = s.reported_uptime {
                spans.push(Span::styled(
                    format!(" │ server uptime {:.2}%", reported),
                    Style::default().add_modifier(Modifier::DIM),
                ));
            }
            Line::from(spans)
        }
        None => Line::from(Span::styled(
            " No samples for this site yet",
            Style::default().add_modifier(Modifier::DIM),
        )),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn format_header(name: &str, col: SortColumn, app: &App) -> Span<'static> {
    if app.sort_column == col {
        let arrow = if app.sort_ascending { "↑" } else { "↓" };
        Span::raw(format!("{}{}", name, arrow))
    } else {
        Span::raw(name.to_string())
    }
}

/// Sort sites by the given column and direction.
pub fn sort_sites_by(sites: &mut [&SiteSeries], column: SortColumn, ascending: bool) {
    sites.sort_by(|a, b| {
        let primary = match column {
            SortColumn::Name => a.site.display_name().cmp(b.site.display_name()),
            SortColumn::Uptime => a.uptime_percent.total_cmp(&b.uptime_percent),
            SortColumn::Latency => latest_latency(a).total_cmp(&latest_latency(b)),
            SortColumn::Status => a.last_state.cmp(&b.last_state),
        };

        let primary = if ascending {
            primary
        } else {
            primary.reverse()
        };

        // Secondary sort by id for stability when primary values are equal
        if primary == Ordering::Equal {
            a.site.id.cmp(&b.site.id)
        } else {
            primary
        }
    });
}

fn latest_latency(series: &SiteSeries) -> f64 {
    series.latest().map(|s| s.latency_ms).unwrap_or(0.0)
}

/// Format a latency for display (e.g., 80 -> "80 ms", 1400 -> "1.40 s").
pub fn format_latency(ms: f64) -> String {
    if ms >= 1_000.0 {
        format!("{:.2} s", ms / 1_000.0)
    } else {
        format!("{:.0} ms", ms)
    }
}
