use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use statuswatch::source::FeedTransport;
use statuswatch::ui::{self, Theme};
use statuswatch::{events, App, Dashboard, FeedResponse, HttpTransport, Settings, Snapshot};

/// Banner (1) + table border (1) + table header (1).
const CONTENT_START_ROW: u16 = 3;

#[derive(Parser, Debug)]
#[command(name = "statuswatch")]
#[command(version, about = "Live terminal dashboard for site status feeds")]
struct Args {
    /// Settings file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Event-stream endpoint of the status server
    #[arg(long)]
    feed_url: Option<String>,

    /// Base address of the polling endpoint
    #[arg(long)]
    upstream_url: Option<String>,

    /// Poll interval in milliseconds while the live stream is unavailable
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Latency in milliseconds above which an up sample counts as degraded
    #[arg(long = "degraded-ms")]
    degraded_ms: Option<u64>,

    /// Export one snapshot to a JSON file and exit
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Write logs to this file (the dashboard otherwise discards them)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let settings = load_settings(&args)?;
    tracing::debug!("Settings: {:?}", settings);

    let rt = Runtime::new()?;
    let transport = Arc::new(HttpTransport::new(&settings)?);

    // Handle export mode (non-interactive)
    if let Some(export_path) = args.export {
        return rt.block_on(export_to_file(&transport, &settings, &export_path));
    }

    run_tui(&rt, transport, &settings)
}

/// Logs must never reach the terminal the dashboard draws on.
fn init_logging(args: &Args) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("statuswatch=info"));

    if args.export.is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    } else if let Some(path) = &args.log_file {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = Settings::load(args.config.as_deref()).context("Failed to load settings")?;

    if let Some(url) = &args.feed_url {
        settings.feed_url = url.clone();
    }
    if let Some(url) = &args.upstream_url {
        settings.upstream_url = url.clone();
    }
    if let Some(ms) = args.poll_interval_ms {
        settings.poll_interval_ms = ms;
    }
    if let Some(ms) = args.degraded_ms {
        settings.degraded_latency_threshold_ms = ms;
    }

    settings.validate()?;
    Ok(settings)
}

/// Run the TUI against a live dashboard
fn run_tui(rt: &Runtime, transport: Arc<dyn FeedTransport>, settings: &Settings) -> Result<()> {
    let dashboard = {
        let _guard = rt.enter();
        Dashboard::start(transport, settings)
    };
    let theme = Theme::auto_detect();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableFocusChange
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic);
    }));

    let mut app = App::new(&dashboard, theme);
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableFocusChange
    )?;
    terminal.show_cursor()?;

    rt.block_on(dashboard.stop());
    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    while app.running {
        app.drain_updates();
        terminal.draw(|frame| ui::render(frame, app))?;

        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            events::handle_event(app, event, CONTENT_START_ROW);
        }
    }

    Ok(())
}

/// Fetch one document over the polling endpoint and write its snapshot.
async fn export_to_file(
    transport: &HttpTransport,
    settings: &Settings,
    export_path: &Path,
) -> Result<()> {
    let body = transport.fetch().await?;
    let feed: FeedResponse = serde_json::from_str(&body).context("Feed is not valid JSON")?;
    let snapshot = Snapshot::from_feed(feed, &settings.thresholds(), settings.history_limit);

    let json = serde_json::to_string_pretty(&snapshot)?;
    std::fs::write(export_path, json)
        .with_context(|| format!("Failed to write {}", export_path.display()))?;

    println!(
        "Exported {} sites to: {}",
        snapshot.len(),
        export_path.display()
    );
    Ok(())
}
