//! Theme configuration for the TUI.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::data::SampleState;

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for highlights and active elements.
    pub highlight: Color,
    /// Color for operational sites and samples.
    pub operational: Color,
    /// Color for degraded (slow) samples.
    pub degraded: Color,
    /// Color for down sites and samples.
    pub down: Color,
    /// Color for sites with no samples.
    pub unknown: Color,
    /// Color for borders and separators.
    pub border: Color,
    /// Style for header rows in tables.
    pub header: Style,
    /// Style for selected/highlighted rows.
    pub selected: Style,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            operational: Color::Green,
            degraded: Color::Yellow,
            down: Color::Red,
            unknown: Color::DarkGray,
            border: Color::Gray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            operational: Color::Green,
            degraded: Color::Yellow,
            down: Color::Red,
            unknown: Color::Gray,
            border: Color::DarkGray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::LightBlue).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    pub fn state_color(&self, state: SampleState) -> Color {
        match state {
            SampleState::Operational => self.operational,
            SampleState::Degraded => self.degraded,
            SampleState::Down => self.down,
            SampleState::Unknown => self.unknown,
        }
    }

    /// Get style for a sample or site state
    pub fn state_style(&self, state: SampleState) -> Style {
        let style = Style::default().fg(self.state_color(state));
        if state == SampleState::Down {
            style.add_modifier(Modifier::BOLD)
        } else {
            style
        }
    }

    /// Style for the overall banner.
    pub fn banner_style(&self, all_operational: bool) -> Style {
        let color = if all_operational {
            self.operational
        } else {
            self.down
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }
}
