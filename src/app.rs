//! Application state and navigation logic.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use ratatui::widgets::TableState;
use tokio::sync::watch;

use crate::dashboard::{Dashboard, RefreshHandle, RefreshTrigger};
use crate::data::{SiteSeries, Snapshot, Thresholds};
use crate::source::ClientState;
use crate::store::{DisplayState, StatusStore, StoreUpdate, Subscription};
use crate::ui::summary::SortColumn;
use crate::ui::Theme;

/// Main application state.
///
/// The app only reads snapshots. Updates arrive through a store
/// subscription and are drained once per frame.
pub struct App {
    pub running: bool,
    pub show_help: bool,

    // Feed
    store: Arc<StatusStore>,
    subscription: Subscription,
    refresh: RefreshHandle,
    client_state: watch::Receiver<ClientState>,
    description: String,
    pub display: DisplayState,
    pub thresholds: Thresholds,

    // Navigation state
    pub selected_index: usize,
    /// Scroll position of the site table, written on every draw.
    pub table_state: TableState,

    // Sorting
    pub sort_column: SortColumn,
    pub sort_ascending: bool,

    // Search/filter
    pub filter_text: String,
    pub filter_active: bool,

    // UI
    pub theme: Theme,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    pub fn new(dashboard: &Dashboard, theme: Theme) -> Self {
        let store = dashboard.store().clone();
        let subscription = store.subscribe();
        let display = store.display_state();
        let thresholds = *store.thresholds();

        Self {
            running: true,
            show_help: false,
            store,
            subscription,
            refresh: dashboard.refresh_handle(),
            client_state: dashboard.watch_client_state(),
            description: dashboard.description().to_string(),
            display,
            thresholds,
            selected_index: 0,
            table_state: TableState::default(),
            sort_column: SortColumn::default(),
            sort_ascending: true,
            filter_text: String::new(),
            filter_active: false,
            theme,
            status_message: None,
        }
    }

    /// Returns a description of the feed.
    pub fn source_description(&self) -> &str {
        &self.description
    }

    pub fn client_state(&self) -> ClientState {
        *self.client_state.borrow()
    }

    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.display.snapshot()
    }

    /// Apply every pending store update.
    ///
    /// Returns true if anything changed.
    pub fn drain_updates(&mut self) -> bool {
        let mut changed = false;
        while let Some(update) = self.subscription.try_recv() {
            if let StoreUpdate::Error(err) = &update {
                tracing::debug!("Store reported: {}", err);
            }
            changed = true;
        }

        if changed {
            self.display = self.store.display_state();
            self.clamp_selection();
        }
        changed
    }

    /// Ask for a refresh.
    pub fn request_refresh(&mut self, trigger: RefreshTrigger) {
        if !self.refresh.request(trigger) {
            return;
        }
        if trigger == RefreshTrigger::Manual {
            let message = if self.client_state() == ClientState::Polling {
                "Refreshing..."
            } else {
                "Live stream active, updates arrive as they happen"
            };
            self.set_status_message(message.to_string());
        }
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired (3 seconds).
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < Duration::from_secs(3) {
                return Some(msg);
            }
        }
        None
    }

    /// Sites after filtering and sorting, in display order.
    pub fn visible_sites(&self) -> Vec<&SiteSeries> {
        let Some(snapshot) = self.snapshot() else {
            return Vec::new();
        };

        let mut sites: Vec<&SiteSeries> = snapshot
            .sites()
            .filter(|s| self.matches_filter(s.site.display_name()) || self.matches_filter(&s.site.url))
            .collect();
        crate::ui::summary::sort_sites_by(&mut sites, self.sort_column, self.sort_ascending);
        sites
    }

    pub fn selected_site(&self) -> Option<&SiteSeries> {
        self.visible_sites().get(self.selected_index).copied()
    }

    fn clamp_selection(&mut self) {
        let count = self.visible_sites().len();
        if self.selected_index >= count {
            self.selected_index = count.saturating_sub(1);
        }
    }

    /// Move selection down by one item.
    pub fn select_next(&mut self) {
        self.select_next_n(1);
    }

    /// Move selection up by one item.
    pub fn select_prev(&mut self) {
        self.select_prev_n(1);
    }

    /// Move selection down by n items.
    pub fn select_next_n(&mut self, n: usize) {
        let max = self.visible_sites().len().saturating_sub(1);
        self.selected_index = (self.selected_index + n).min(max);
    }

    /// Move selection up by n items.
    pub fn select_prev_n(&mut self, n: usize) {
        self.selected_index = self.selected_index.saturating_sub(n);
    }

    pub fn select_first(&mut self) {
        self.selected_index = 0;
    }

    pub fn select_last(&mut self) {
        self.selected_index = self.visible_sites().len().saturating_sub(1);
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Cycle to the next sort column.
    pub fn cycle_sort(&mut self) {
        self.sort_column = self.sort_column.next();
        self.selected_index = 0;
    }

    pub fn toggle_sort_direction(&mut self) {
        self.sort_ascending = !self.sort_ascending;
    }

    pub fn start_filter(&mut self) {
        self.filter_active = true;
    }

    /// Leave filter input, keeping the text.
    pub fn cancel_filter(&mut self) {
        self.filter_active = false;
    }

    pub fn clear_filter(&mut self) {
        self.filter_text.clear();
        self.filter_active = false;
        self.selected_index = 0;
    }

    pub fn filter_push(&mut self, c: char) {
        self.filter_text.push(c);
        self.selected_index = 0;
    }

    pub fn filter_pop(&mut self) {
        self.filter_text.pop();
        self.selected_index = 0;
    }

    /// Case-insensitive substring match against the filter text.
    pub fn matches_filter(&self, name: &str) -> bool {
        if self.filter_text.is_empty() {
            return true;
        }
        name.to_lowercase().contains(&self.filter_text.to_lowercase())
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Write the current snapshot as JSON.
    pub fn export_state(&self, path: &std::path::Path) -> Result<()> {
        let Some(snapshot) = self.snapshot() else {
            anyhow::bail!("no snapshot received yet");
        };
        let json = serde_json::to_string_pretty(snapshot.as_ref())?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
