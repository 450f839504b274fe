//! Application state and logic.
//!
//! The terminal front end is a single cooperative loop. Every API call runs as a
//! spawned task that reports back over an unbounded channel; the loop drains the
//! channel between frames, so rendering never waits on the network.

use crate::api::{SearchOutcome, StockApi};
use crate::error::GatewayError;
use crate::models::{StockDetail, StockSummary};
use crate::recent::RecentSearches;
use crate::search::{Navigation, SearchFlow};
use crate::view::{DetailView, FetchOptions, FetchOutcome, FetchTicket, Tab, fetch_slice};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::AbortHandle;
use tracing::{debug, warn};

/// Which screen is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Search,
    Detail,
}

/// Results delivered by background tasks.
#[derive(Debug)]
pub enum AppEvent {
    StocksLoaded(Result<Vec<StockSummary>, GatewayError>),
    SearchFinished {
        id: u64,
        result: Result<SearchOutcome, GatewayError>,
    },
    DetailLoaded {
        view: u64,
        result: Result<StockDetail, GatewayError>,
    },
    SliceFetched {
        view: u64,
        outcome: FetchOutcome,
    },
}

/// Application state.
pub struct App<A> {
    api: Arc<A>,
    options: FetchOptions,
    tx: UnboundedSender<AppEvent>,
    rx: UnboundedReceiver<AppEvent>,
    /// Current screen
    pub screen: Screen,
    history: Vec<Screen>,
    /// Stocks on the home screen
    pub stocks: Vec<StockSummary>,
    pub stocks_loading: bool,
    pub last_refresh: Option<Instant>,
    /// Selected row on the home screen
    pub selected: usize,
    pub search: SearchFlow,
    /// Selected row in the search list, `None` while typing
    pub search_selected: Option<usize>,
    pub detail: Option<DetailView>,
    /// Scroll offset of the detail tab body
    pub scroll: u16,
    detail_id: u64,
    tasks: HashMap<FetchTicket, AbortHandle>,
    /// Is the app running
    pub running: bool,
    /// Error message to display
    pub error: Option<String>,
    /// Show help overlay
    pub show_help: bool,
}

impl<A: StockApi + 'static> App<A> {
    pub fn new(api: A, options: FetchOptions, recent: RecentSearches) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            api: Arc::new(api),
            options,
            tx,
            rx,
            screen: Screen::Home,
            history: Vec::new(),
            stocks: Vec::new(),
            stocks_loading: false,
            last_refresh: None,
            selected: 0,
            search: SearchFlow::new(recent),
            search_selected: None,
            detail: None,
            scroll: 0,
            detail_id: 0,
            tasks: HashMap::new(),
            running: true,
            error: None,
            show_help: false,
        }
    }

    /// Fetch the stock list for the home screen.
    pub fn refresh_stocks(&mut self) {
        if self.stocks_loading {
            return;
        }
        self.stocks_loading = true;

        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = api.list_stocks().await;
            let _ = tx.send(AppEvent::StocksLoaded(result));
        });
    }

    /// Apply every event that has already arrived. Returns true if any did.
    pub fn drain_events(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.rx.try_recv() {
            self.handle_event(event);
            changed = true;
        }
        changed
    }

    /// Wait for the next event and apply it.
    pub async fn next_event(&mut self) -> bool {
        match self.rx.recv().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::StocksLoaded(result) => {
                self.stocks_loading = false;
                match result {
                    Ok(stocks) => {
                        self.stocks = stocks;
                        self.last_refresh = Some(Instant::now());
                        self.selected = self.selected.min(self.stocks.len().saturating_sub(1));
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to load stocks");
                        self.error = Some(format!("Failed to load stocks: {}", e.user_message()));
                    }
                }
            }
            AppEvent::SearchFinished { id, result } => {
                self.search.finish(id, result);
                self.search_selected = None;
            }
            AppEvent::DetailLoaded { view, result } => {
                if view != self.detail_id {
                    debug!(view, "dropping detail for a closed view");
                    return;
                }
                let started = self
                    .detail
                    .as_mut()
                    .and_then(|detail| detail.page_loaded(result));
                if let Some(ticket) = started {
                    self.spawn_slice(ticket);
                }
            }
            AppEvent::SliceFetched { view, outcome } => {
                self.tasks.remove(&outcome.ticket);
                if view != self.detail_id {
                    return;
                }
                if let Some(detail) = self.detail.as_mut() {
                    detail.apply(outcome);
                }
            }
        }
    }

    // Navigation

    fn push_screen(&mut self, screen: Screen) {
        if self.screen != screen {
            self.history.push(self.screen);
            self.screen = screen;
        }
    }

    /// Return to the previous screen. Quits from the home screen.
    pub fn back(&mut self) {
        if self.screen == Screen::Detail {
            self.close_detail();
        }
        match self.history.pop() {
            Some(screen) => self.screen = screen,
            None if self.screen == Screen::Home => self.quit(),
            None => self.screen = Screen::Home,
        }
    }

    pub fn open_search(&mut self) {
        self.search_selected = None;
        self.push_screen(Screen::Search);
    }

    /// Open the detail page for a symbol, replacing any open one.
    pub fn open_detail(&mut self, symbol: &str, use_defaults: bool) {
        self.close_detail();
        self.detail_id += 1;
        let view = DetailView::new(symbol, use_defaults);
        let symbol = view.symbol.clone();
        self.detail = Some(view);
        self.scroll = 0;
        self.push_screen(Screen::Detail);
        self.spawn_detail(symbol, use_defaults);
    }

    fn close_detail(&mut self) {
        if let Some(detail) = self.detail.take() {
            for ticket in detail.pending() {
                self.abort(ticket);
            }
        }
    }

    pub fn navigate(&mut self, navigation: Navigation) {
        match navigation {
            Navigation::Detail {
                symbol,
                use_defaults,
            } => self.open_detail(&symbol, use_defaults),
        }
    }

    // Home screen

    pub fn select_up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    pub fn select_down(&mut self) {
        if self.selected < self.stocks.len().saturating_sub(1) {
            self.selected += 1;
        }
    }

    pub fn selected_stock(&self) -> Option<&StockSummary> {
        self.stocks.get(self.selected)
    }

    pub fn open_selected(&mut self) {
        if let Some(symbol) = self.selected_stock().map(|s| s.symbol.clone()) {
            self.open_detail(&symbol, false);
        }
    }

    // Search screen

    pub fn submit_search(&mut self) {
        self.search_selected = None;
        let Some((id, symbol)) = self.search.begin() else {
            return;
        };

        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = api.search(&symbol).await;
            let _ = tx.send(AppEvent::SearchFinished { id, result });
        });
    }

    /// Symbols listed under the search box: results once searched, recent searches before.
    pub fn search_items(&self) -> Vec<(String, String)> {
        if self.search.searched {
            self.search
                .results
                .iter()
                .map(|s| (s.symbol.clone(), s.name.clone()))
                .collect()
        } else {
            self.search
                .recent
                .entries()
                .iter()
                .map(|r| (r.symbol.clone(), r.name.clone()))
                .collect()
        }
    }

    pub fn search_down(&mut self) {
        let len = self.search_items().len();
        if len == 0 {
            return;
        }
        self.search_selected = Some(match self.search_selected {
            None => 0,
            Some(i) => (i + 1).min(len - 1),
        });
    }

    pub fn search_up(&mut self) {
        self.search_selected = match self.search_selected {
            None | Some(0) => None,
            Some(i) => Some(i - 1),
        };
    }

    /// Open the highlighted entry, or submit the input when nothing is highlighted.
    pub fn search_enter(&mut self) {
        let picked = self
            .search_selected
            .and_then(|i| self.search_items().into_iter().nth(i));
        match picked {
            Some((symbol, _)) => self.open_detail(&symbol, false),
            None => self.submit_search(),
        }
    }

    pub fn use_default_data(&mut self) {
        if let Some(navigation) = self.search.use_default_data() {
            self.navigate(navigation);
        }
    }

    // Detail screen

    pub fn select_tab(&mut self, tab: Tab) {
        let Some(detail) = self.detail.as_mut() else {
            return;
        };
        let transition = detail.select_tab(tab);
        self.scroll = 0;
        if let Some(ticket) = transition.cancelled {
            self.abort(ticket);
        }
        if let Some(ticket) = transition.started {
            self.spawn_slice(ticket);
        }
    }

    pub fn next_tab(&mut self) {
        if let Some(tab) = self.detail.as_ref().map(|d| d.active_tab.next()) {
            self.select_tab(tab);
        }
    }

    pub fn prev_tab(&mut self) {
        if let Some(tab) = self.detail.as_ref().map(|d| d.active_tab.prev()) {
            self.select_tab(tab);
        }
    }

    pub fn scroll_down(&mut self) {
        self.scroll = self.scroll.saturating_add(1);
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    /// Retry the failed page, or the active tab's failed slice.
    pub fn retry(&mut self) {
        let Some(detail) = self.detail.as_mut() else {
            return;
        };
        if detail.retry_page() {
            let (symbol, use_defaults) = (detail.symbol.clone(), detail.use_defaults);
            self.spawn_detail(symbol, use_defaults);
        } else if let Some(ticket) = detail.retry_tab() {
            self.spawn_slice(ticket);
        }
    }

    /// Number of fetch tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn should_quit(&self) -> bool {
        !self.running
    }

    /// Time since the home list was last loaded.
    pub fn time_since_refresh(&self) -> String {
        match self.last_refresh {
            Some(t) => {
                let elapsed = std::time::Duration::from_secs(t.elapsed().as_secs());
                format!("{} ago", humantime::format_duration(elapsed))
            }
            None => "never".to_string(),
        }
    }

    fn spawn_detail(&self, symbol: String, use_defaults: bool) {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        let view = self.detail_id;
        tokio::spawn(async move {
            let result = api.get_details(&symbol, use_defaults).await;
            let _ = tx.send(AppEvent::DetailLoaded { view, result });
        });
    }

    fn spawn_slice(&mut self, ticket: FetchTicket) {
        let Some(symbol) = self.detail.as_ref().map(|d| d.symbol.clone()) else {
            return;
        };
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        let view = self.detail_id;
        let options = self.options;

        debug!(%symbol, ?ticket, "fetching slice");
        let handle = tokio::spawn(async move {
            let result = fetch_slice(api.as_ref(), &symbol, ticket.kind, options).await;
            let _ = tx.send(AppEvent::SliceFetched {
                view,
                outcome: FetchOutcome { ticket, result },
            });
        });
        self.tasks.insert(ticket, handle.abort_handle());
    }

    fn abort(&mut self, ticket: FetchTicket) {
        if let Some(handle) = self.tasks.remove(&ticket) {
            debug!(?ticket, "cancelling fetch");
            handle.abort();
        }
    }
}
