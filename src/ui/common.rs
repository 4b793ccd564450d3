//! Common UI components.
//!
//! This module contains the banner, status bar, help overlay and the
//! placeholder screens shown before a snapshot is available.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::SampleState;
use crate::error::FeedError;

pub const ALL_OPERATIONAL: &str = "All Systems Operational";
pub const SOME_DOWN: &str = "Some Systems Are Down";

/// Render the banner with the overall state.
///
/// Displays: overall indicator, site counts by latest state.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let Some(snapshot) = app.snapshot() else {
        let line = Line::from(vec![
            Span::styled(" STATUSWATCH ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("| Loading..."),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    };

    let banner = if snapshot.all_operational {
        ALL_OPERATIONAL
    } else {
        SOME_DOWN
    };
    let banner_style = app.theme.banner_style(snapshot.all_operational);

    let mut spans = vec![
        Span::styled(" ● ", banner_style),
        Span::styled(banner, banner_style),
        Span::raw(" │ "),
    ];
    for state in [
        SampleState::Operational,
        SampleState::Degraded,
        SampleState::Down,
        SampleState::Unknown,
    ] {
        let count = snapshot.count(state);
        if count == 0 && state == SampleState::Unknown {
            continue;
        }
        let style = if count > 0 {
            app.theme.state_style(state)
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        spans.push(Span::styled(count.to_string(), style));
        spans.push(Span::raw(format!(" {} ", state.label())));
    }
    spans.push(Span::raw("│ "));
    spans.push(Span::styled(
        snapshot.len().to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::raw(" sites"));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Render the status bar at the bottom.
///
/// Shows: feed, connection state, time since last update, error marker and
/// controls. Temporary status messages take precedence.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let dim = Style::default().add_modifier(Modifier::DIM);
    let mut spans = vec![Span::styled(
        format!(" {} | {} ", app.source_description(), app.client_state()),
        dim,
    )];

    if let Some(snapshot) = app.snapshot() {
        spans.push(Span::styled(
            format!("| Updated {:.1}s ago ", snapshot.received_at.elapsed().as_secs_f64()),
            dim,
        ));
        // Unobtrusive: the last good snapshot stays on screen.
        if let Some(err) = app.display.error() {
            spans.push(Span::styled(
                format!("| ⚠ {} ", err),
                Style::default().fg(app.theme.degraded),
            ));
        }
    }

    let controls = if app.filter_active {
        "| Type to search | Enter:apply Esc:cancel"
    } else {
        "| /:search s:sort r:refresh ?:help q:quit"
    };
    spans.push(Span::styled(controls, dim));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Shown until the first snapshot arrives.
pub fn render_loading(frame: &mut Frame, app: &App, area: Rect) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("Loading...", app.theme.header)),
        Line::from(""),
        Line::from(Span::styled(
            format!("Waiting for {} ({})", app.source_description(), app.client_state()),
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];
    frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), area);
}

/// Shown when nothing was ever received and the last attempt failed.
pub fn render_unavailable(frame: &mut Frame, app: &App, err: &FeedError, area: Rect) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Status unavailable",
            Style::default().fg(app.theme.down).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(err.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "r:retry q:quit",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];
    frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Navigation",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  ↑/↓ j/k     Navigate list"),
        Line::from("  PgUp/PgDn   Jump 10 items"),
        Line::from("  Home/End    Jump to first/last"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Sites",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  /         Start filter/search"),
        Line::from("  c         Clear filter"),
        Line::from("  s         Cycle sort column"),
        Line::from("  S         Toggle sort direction"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " General",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  r         Refresh now"),
        Line::from("  e         Export to JSON"),
        Line::from("  q/Esc     Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    let help_width = 42u16.min(area.width.saturating_sub(4));
    let help_height = 23u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    frame.render_widget(ratatui::widgets::Clear, help_area);
    frame.render_widget(paragraph, help_area);
}
