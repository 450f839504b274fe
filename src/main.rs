//! Stock Researcher - terminal stock research client and mock REST backend.

use anyhow::{Context, Result, bail};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::future::join_all;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::fs::{self, OpenOptions};
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use stock_researcher::api::{StockApi, StockGateway};
use stock_researcher::app::{App, Screen};
use stock_researcher::cli::{Args, Command, ExportFormat};
use stock_researcher::config::{self, Config};
use stock_researcher::export::{Report, export_reports};
use stock_researcher::recent::{FileStore, MemoryStore, RecentSearches, RecentStore};
use stock_researcher::search::SearchFlow;
use stock_researcher::store::StockStore;
use stock_researcher::view::Tab;
use stock_researcher::{server, ui};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();
    let command = args.command();

    // The TUI owns the terminal, so browse logs to a file.
    let log_file = match command {
        Command::Browse { .. } => log_file_path(),
        _ => None,
    };
    init_logging(args.verbose, matches!(command, Command::Browse { .. }), log_file.as_deref())?;

    let config = if let Some(ref path) = args.config {
        Config::load(path)?
    } else {
        Config::load_or_default()
    };

    match command {
        Command::Serve { bind, port } => run_server(&config, bind, port).await,
        Command::Browse {
            symbol,
            use_defaults,
        } => {
            let gateway = connect(&args, &config)?;
            run_interactive(gateway, &config, symbol, use_defaults).await
        }
        Command::Show {
            symbols,
            format,
            technical,
        } => {
            let gateway = connect(&args, &config)?;
            run_show(&gateway, &symbols, format, technical).await
        }
        Command::Search { symbol } => {
            let gateway = connect(&args, &config)?;
            run_search(&gateway, symbol).await
        }
    }
}

fn init_logging(verbose: bool, quiet: bool, file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    match file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory: {}", parent.display())
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None if quiet => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .with_target(false)
                .init();
        }
    }

    Ok(())
}

fn log_file_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("stock-researcher").join("stock-researcher.log"))
}

/// Build the API client, exiting when no base URL is configured.
fn connect(args: &Args, config: &Config) -> Result<StockGateway> {
    let Some(api_url) = config.api_url(args.api_url.as_deref()) else {
        error!("No API base URL configured");
        eprintln!("Error: No API base URL configured.");
        eprintln!("Set --api-url, STOCK_RESEARCHER_API_URL, or api.base_url in the config file.");
        eprintln!();
        eprintln!("Example: stock-researcher --api-url http://localhost:5000/api");
        eprintln!();
        eprintln!("Config file location: {:?}", Config::default_config_path());
        eprintln!();
        eprintln!("Sample config:");
        eprintln!("{}", config::sample_config());
        std::process::exit(1);
    };

    StockGateway::new(
        &api_url,
        config.timeout(args.timeout),
        config.rate_limit_detector(),
    )
}

fn recent_store() -> Box<dyn RecentStore> {
    match FileStore::default_path() {
        Some(path) => Box::new(FileStore::new(path)),
        None => {
            warn!("No data directory; recent searches will not persist");
            Box::new(MemoryStore::new())
        }
    }
}

async fn run_server(config: &Config, bind: Option<String>, port: Option<u16>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address: {}:{}", bind, port))?;

    info!("Starting stock-researcher server");
    server::serve(StockStore::with_mock_data(), addr).await
}

/// Print stock details and exit.
async fn run_show(
    gateway: &StockGateway,
    symbols: &[String],
    format: ExportFormat,
    technical: bool,
) -> Result<()> {
    let details = join_all(symbols.iter().map(|s| gateway.get_details(s, false))).await;

    let mut reports = Vec::new();
    for (symbol, result) in symbols.iter().zip(details) {
        match result {
            Ok(detail) => reports.push(Report::new(detail)),
            Err(e) => {
                error!(%symbol, status = ?e.status(), error = %e, "failed to load stock details");
                eprintln!("{}: {}", symbol.to_uppercase(), e.user_message());
            }
        }
    }

    if reports.is_empty() {
        bail!("No stock details could be loaded");
    }

    if technical {
        let readings = join_all(
            reports
                .iter()
                .map(|r| gateway.technical_analysis(&r.detail.symbol)),
        )
        .await;
        for (report, reading) in reports.iter_mut().zip(readings) {
            match reading {
                Ok(technical) => report.technical = Some(technical),
                Err(e) => {
                    warn!(symbol = %report.detail.symbol, error = %e, "technical analysis unavailable");
                    report.technical_error = Some(e.user_message());
                }
            }
        }
    }

    print!("{}", export_reports(&reports, format)?);
    Ok(())
}

/// Run one search, or list recent searches when no symbol is given.
async fn run_search(gateway: &StockGateway, symbol: Option<String>) -> Result<()> {
    let mut search = SearchFlow::new(RecentSearches::load(recent_store()));

    let Some(symbol) = symbol else {
        if search.recent.is_empty() {
            println!("No recent searches.");
        }
        for entry in search.recent.entries() {
            println!("{:<8} {}", entry.symbol, entry.name);
        }
        return Ok(());
    };

    search.set_input(&symbol);
    search.submit(gateway).await;

    if let Some(error) = &search.error {
        eprintln!("{}", error.message);
        if error.use_defaults {
            eprintln!(
                "Run `stock-researcher browse {} --use-defaults` to view default data.",
                search.query().unwrap_or_default()
            );
        }
        std::process::exit(1);
    }

    if search.no_results() {
        println!("No results found for {}", symbol.to_uppercase());
    }
    for stock in &search.results {
        println!(
            "{:<8} {:<30} ${:>10.2} {:>+8.2} ({:+.2}%)",
            stock.symbol, stock.name, stock.current_price, stock.change, stock.percent_change
        );
    }

    Ok(())
}

/// Run in interactive mode with TUI.
async fn run_interactive(
    gateway: StockGateway,
    config: &Config,
    symbol: Option<String>,
    use_defaults: bool,
) -> Result<()> {
    info!(base_url = gateway.base_url(), "starting browser");
    let mut app = App::new(
        gateway,
        config.fetch_options(),
        RecentSearches::load(recent_store()),
    );
    app.refresh_stocks();
    if let Some(symbol) = symbol {
        app.open_detail(&symbol, use_defaults);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

/// Main application loop.
async fn run_app<A: StockApi + 'static>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<A>,
) -> Result<()> {
    let tick_rate = Duration::from_millis(100);

    loop {
        terminal.draw(|f| ui::render(f, app))?;

        // Poll without blocking the runtime so fetch tasks keep running.
        if tokio::task::block_in_place(|| event::poll(tick_rate))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key_event(app, key.code, key.modifiers);
                }
            }
        }

        app.drain_events();

        if app.should_quit() {
            break;
        }
    }

    Ok(())
}

/// Handle keyboard input.
fn handle_key_event<A: StockApi + 'static>(app: &mut App<A>, code: KeyCode, modifiers: KeyModifiers) {
    // Close help overlay on any key
    if app.show_help {
        app.show_help = false;
        return;
    }

    // Clear error on any key
    if app.error.is_some() {
        app.error = None;
        return;
    }

    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }

    match app.screen {
        Screen::Home => match code {
            KeyCode::Char('q') => app.quit(),
            KeyCode::Esc => app.back(),
            KeyCode::Up | KeyCode::Char('k') => app.select_up(),
            KeyCode::Down | KeyCode::Char('j') => app.select_down(),
            KeyCode::Enter => app.open_selected(),
            KeyCode::Char('/') | KeyCode::Char('s') => app.open_search(),
            KeyCode::Char('r') => app.refresh_stocks(),
            KeyCode::Char('h') | KeyCode::Char('?') => app.toggle_help(),
            _ => {}
        },
        Screen::Search => match code {
            KeyCode::Esc => app.back(),
            KeyCode::Char('d') if modifiers.contains(KeyModifiers::CONTROL) => {
                app.use_default_data()
            }
            KeyCode::Enter => app.search_enter(),
            KeyCode::Down => app.search_down(),
            KeyCode::Up => app.search_up(),
            KeyCode::Backspace => {
                app.search_selected = None;
                app.search.pop_char();
            }
            KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => {
                app.search_selected = None;
                app.search.push_char(c);
            }
            _ => {}
        },
        Screen::Detail => match code {
            KeyCode::Char('q') => app.quit(),
            KeyCode::Esc | KeyCode::Backspace => app.back(),
            KeyCode::Right | KeyCode::Tab | KeyCode::Char('l') => app.next_tab(),
            KeyCode::Left | KeyCode::BackTab | KeyCode::Char('h') => app.prev_tab(),
            KeyCode::Char(c @ '1'..='7') => {
                if let Some(tab) = c
                    .to_digit(10)
                    .and_then(|d| Tab::ALL.get(d as usize - 1))
                {
                    app.select_tab(*tab);
                }
            }
            KeyCode::Down | KeyCode::Char('j') => app.scroll_down(),
            KeyCode::Up | KeyCode::Char('k') => app.scroll_up(),
            KeyCode::Char('r') => app.retry(),
            KeyCode::Char('?') => app.toggle_help(),
            _ => {}
        },
    }
}
