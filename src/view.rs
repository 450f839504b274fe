//! Stock detail view state.
//!
//! The page itself loads once. Each data-bearing tab owns an independent slice that
//! is fetched the first time the tab is entered and then cached for the life of the
//! view. Every fetch is issued under a [`FetchTicket`]; leaving a tab while its slice
//! is still loading cancels that ticket, and outcomes carrying a ticket the slice no
//! longer waits for are dropped.

use crate::api::StockApi;
use crate::error::GatewayError;
use crate::models::{AiNarrative, EnhancedMetrics, NewsArticle, StockDetail, TechnicalReport};
use std::time::Instant;
use tracing::debug;

pub const PAGE_ERROR_MESSAGE: &str = "Error loading stock details. Please try again.";

/// Tabs of the detail view, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    Summary,
    AnalystSources,
    Technical,
    News,
    Sources,
    FilteredNoise,
    AiAnalysis,
}

impl Tab {
    pub const ALL: [Tab; 7] = [
        Tab::Summary,
        Tab::AnalystSources,
        Tab::Technical,
        Tab::News,
        Tab::Sources,
        Tab::FilteredNoise,
        Tab::AiAnalysis,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Summary => "Summary",
            Tab::AnalystSources => "Analyst Views",
            Tab::Technical => "Technical Analysis",
            Tab::News => "News",
            Tab::Sources => "Sources",
            Tab::FilteredNoise => "Filtered Noise",
            Tab::AiAnalysis => "AI Analysis",
        }
    }

    pub fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }

    /// The data slice this tab fetches on entry, if any.
    pub fn slice(self) -> Option<SliceKind> {
        match self {
            Tab::Summary => Some(SliceKind::EnhancedMetrics),
            Tab::Technical => Some(SliceKind::Technical),
            Tab::News => Some(SliceKind::News),
            Tab::AiAnalysis => Some(SliceKind::AiNarrative),
            Tab::AnalystSources | Tab::Sources | Tab::FilteredNoise => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SliceKind {
    EnhancedMetrics,
    Technical,
    News,
    AiNarrative,
}

/// Identifies one issued fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    pub kind: SliceKind,
    pub id: u64,
}

/// Load state of one slice.
#[derive(Debug, Clone, PartialEq)]
pub enum SliceState<T> {
    Idle,
    Loading(FetchTicket),
    Loaded(T),
    Errored(String),
}

impl<T> SliceState<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            SliceState::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SliceState::Loading(_))
    }

    fn ticket(&self) -> Option<FetchTicket> {
        match self {
            SliceState::Loading(ticket) => Some(*ticket),
            _ => None,
        }
    }
}

/// Fetched payload for one slice.
#[derive(Debug, Clone, PartialEq)]
pub enum SliceData {
    EnhancedMetrics(EnhancedMetrics),
    Technical(TechnicalReport),
    News(Vec<NewsArticle>),
    AiNarrative(AiNarrative),
}

/// A finished fetch, ready to be applied to the view.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub ticket: FetchTicket,
    pub result: Result<SliceData, String>,
}

/// Page-level load state.
#[derive(Debug, Clone, PartialEq)]
pub enum PageState {
    Loading,
    Loaded(Box<StockDetail>),
    Failed(String),
}

/// Fetches started and cancelled by a view transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    pub started: Option<FetchTicket>,
    pub cancelled: Option<FetchTicket>,
}

/// Parameters for slice fetches.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub lookback_days: u32,
    pub news_limit: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            lookback_days: crate::api::DEFAULT_LOOKBACK_DAYS,
            news_limit: crate::api::DEFAULT_NEWS_LIMIT,
        }
    }
}

/// State of one stock detail page.
pub struct DetailView {
    pub symbol: String,
    pub use_defaults: bool,
    pub page: PageState,
    pub active_tab: Tab,
    pub enhanced: SliceState<EnhancedMetrics>,
    pub technical: SliceState<TechnicalReport>,
    pub news: SliceState<Vec<NewsArticle>>,
    pub ai: SliceState<AiNarrative>,
    pub loaded_at: Option<Instant>,
    next_ticket: u64,
}

impl DetailView {
    pub fn new(symbol: &str, use_defaults: bool) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            use_defaults,
            page: PageState::Loading,
            active_tab: Tab::Summary,
            enhanced: SliceState::Idle,
            technical: SliceState::Idle,
            news: SliceState::Idle,
            ai: SliceState::Idle,
            loaded_at: None,
            next_ticket: 0,
        }
    }

    pub fn detail(&self) -> Option<&StockDetail> {
        match &self.page {
            PageState::Loaded(detail) => Some(detail),
            _ => None,
        }
    }

    /// Apply the page fetch. On success the active tab's slice starts loading.
    pub fn page_loaded(&mut self, result: Result<StockDetail, GatewayError>) -> Option<FetchTicket> {
        match result {
            Ok(detail) => {
                if !detail.latest_news.is_empty() {
                    self.news = SliceState::Loaded(detail.latest_news.clone());
                }
                self.page = PageState::Loaded(Box::new(detail));
                self.loaded_at = Some(Instant::now());
                self.enter(self.active_tab)
            }
            Err(e) => {
                debug!(symbol = %self.symbol, error = %e, "detail fetch failed");
                self.page = PageState::Failed(PAGE_ERROR_MESSAGE.to_string());
                None
            }
        }
    }

    /// Switch tabs. Leaving a tab with an in-flight fetch cancels it.
    pub fn select_tab(&mut self, tab: Tab) -> Transition {
        if tab == self.active_tab {
            return Transition::default();
        }

        let cancelled = self
            .active_tab
            .slice()
            .and_then(|kind| self.cancel(kind));
        self.active_tab = tab;

        Transition {
            started: self.enter(tab),
            cancelled,
        }
    }

    /// Re-issue the page fetch after a failure. Returns true if a fetch is needed.
    pub fn retry_page(&mut self) -> bool {
        if matches!(self.page, PageState::Failed(_)) {
            self.page = PageState::Loading;
            true
        } else {
            false
        }
    }

    /// Re-issue the active tab's fetch if it errored.
    pub fn retry_tab(&mut self) -> Option<FetchTicket> {
        let kind = self.active_tab.slice()?;
        if !self.is_errored(kind) {
            return None;
        }
        self.reset(kind);
        self.enter(self.active_tab)
    }

    /// Tickets of every fetch still in flight.
    pub fn pending(&self) -> Vec<FetchTicket> {
        [
            self.enhanced.ticket(),
            self.technical.ticket(),
            self.news.ticket(),
            self.ai.ticket(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Apply a finished fetch. Returns false when the ticket is stale.
    pub fn apply(&mut self, outcome: FetchOutcome) -> bool {
        let FetchOutcome { ticket, result } = outcome;
        if self.ticket_of(ticket.kind) != Some(ticket) {
            debug!(symbol = %self.symbol, ?ticket, "dropping stale fetch outcome");
            return false;
        }

        match result {
            Ok(SliceData::EnhancedMetrics(data)) => self.enhanced = SliceState::Loaded(data),
            Ok(SliceData::Technical(data)) => self.technical = SliceState::Loaded(data),
            Ok(SliceData::News(articles)) => {
                if let PageState::Loaded(detail) = &mut self.page {
                    detail.latest_news = articles.clone();
                }
                self.news = SliceState::Loaded(articles);
            }
            Ok(SliceData::AiNarrative(data)) => self.ai = SliceState::Loaded(data),
            Err(message) => self.set_error(ticket.kind, message),
        }
        true
    }

    fn enter(&mut self, tab: Tab) -> Option<FetchTicket> {
        self.detail()?;
        let kind = tab.slice()?;
        if !self.is_idle(kind) {
            return None;
        }

        self.next_ticket += 1;
        let ticket = FetchTicket {
            kind,
            id: self.next_ticket,
        };
        match kind {
            SliceKind::EnhancedMetrics => self.enhanced = SliceState::Loading(ticket),
            SliceKind::Technical => self.technical = SliceState::Loading(ticket),
            SliceKind::News => self.news = SliceState::Loading(ticket),
            SliceKind::AiNarrative => self.ai = SliceState::Loading(ticket),
        }
        Some(ticket)
    }

    fn cancel(&mut self, kind: SliceKind) -> Option<FetchTicket> {
        let ticket = self.ticket_of(kind)?;
        self.reset(kind);
        Some(ticket)
    }

    fn reset(&mut self, kind: SliceKind) {
        match kind {
            SliceKind::EnhancedMetrics => self.enhanced = SliceState::Idle,
            SliceKind::Technical => self.technical = SliceState::Idle,
            SliceKind::News => self.news = SliceState::Idle,
            SliceKind::AiNarrative => self.ai = SliceState::Idle,
        }
    }

    fn set_error(&mut self, kind: SliceKind, message: String) {
        match kind {
            SliceKind::EnhancedMetrics => self.enhanced = SliceState::Errored(message),
            SliceKind::Technical => self.technical = SliceState::Errored(message),
            SliceKind::News => self.news = SliceState::Errored(message),
            SliceKind::AiNarrative => self.ai = SliceState::Errored(message),
        }
    }

    fn ticket_of(&self, kind: SliceKind) -> Option<FetchTicket> {
        match kind {
            SliceKind::EnhancedMetrics => self.enhanced.ticket(),
            SliceKind::Technical => self.technical.ticket(),
            SliceKind::News => self.news.ticket(),
            SliceKind::AiNarrative => self.ai.ticket(),
        }
    }

    fn is_idle(&self, kind: SliceKind) -> bool {
        match kind {
            SliceKind::EnhancedMetrics => matches!(self.enhanced, SliceState::Idle),
            SliceKind::Technical => matches!(self.technical, SliceState::Idle),
            SliceKind::News => matches!(self.news, SliceState::Idle),
            SliceKind::AiNarrative => matches!(self.ai, SliceState::Idle),
        }
    }

    fn is_errored(&self, kind: SliceKind) -> bool {
        match kind {
            SliceKind::EnhancedMetrics => matches!(self.enhanced, SliceState::Errored(_)),
            SliceKind::Technical => matches!(self.technical, SliceState::Errored(_)),
            SliceKind::News => matches!(self.news, SliceState::Errored(_)),
            SliceKind::AiNarrative => matches!(self.ai, SliceState::Errored(_)),
        }
    }
}

/// Run the fetch behind a slice.
pub async fn fetch_slice<A: StockApi>(
    api: &A,
    symbol: &str,
    kind: SliceKind,
    options: FetchOptions,
) -> Result<SliceData, String> {
    let result = match kind {
        SliceKind::EnhancedMetrics => api
            .enhanced_metrics(symbol, options.lookback_days)
            .await
            .map(SliceData::EnhancedMetrics),
        SliceKind::Technical => api.technical_analysis(symbol).await.map(SliceData::Technical),
        SliceKind::News => api.news(symbol, options.news_limit).await.map(SliceData::News),
        SliceKind::AiNarrative => api.ai_analysis(symbol).await.map(SliceData::AiNarrative),
    };
    result.map_err(|e| e.user_message())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SearchOutcome;
    use crate::models::{Figure, StockSummary};
    use crate::normalize::{RawDetail, normalize};

    fn detail() -> StockDetail {
        normalize(RawDetail {
            symbol: "AAPL".to_string(),
            name: "Apple Inc.".to_string(),
            current_price: 175.34,
            high_52_week: Some(Figure::from("182.94")),
            ..RawDetail::default()
        })
    }

    fn narrative() -> AiNarrative {
        AiNarrative {
            analysis: "## Outlook\n\nSteady.".to_string(),
            timestamp: None,
        }
    }

    fn loaded_view() -> (DetailView, FetchTicket) {
        let mut view = DetailView::new("aapl", false);
        let ticket = view.page_loaded(Ok(detail())).unwrap();
        (view, ticket)
    }

    #[test]
    fn test_page_load_starts_summary_slice() {
        let (view, ticket) = loaded_view();
        assert_eq!(view.symbol, "AAPL");
        assert_eq!(ticket.kind, SliceKind::EnhancedMetrics);
        assert!(view.enhanced.is_loading());
        assert!(matches!(view.technical, SliceState::Idle));
    }

    #[test]
    fn test_page_failure_has_no_partial_content() {
        let mut view = DetailView::new("ZZZZ", false);
        assert!(view.page_loaded(Err(GatewayError::NotFound("gone".into()))).is_none());
        assert_eq!(view.page, PageState::Failed(PAGE_ERROR_MESSAGE.to_string()));
        assert!(view.select_tab(Tab::Technical).started.is_none());
        assert!(view.retry_page());
        assert_eq!(view.page, PageState::Loading);
    }

    #[test]
    fn test_tab_without_slice_starts_nothing() {
        let (mut view, _) = loaded_view();
        let transition = view.select_tab(Tab::Sources);
        assert!(transition.started.is_none());
    }

    #[test]
    fn test_leaving_loading_tab_cancels_and_refetches_on_return() {
        let (mut view, first) = loaded_view();

        let away = view.select_tab(Tab::FilteredNoise);
        assert_eq!(away.cancelled, Some(first));
        assert!(matches!(view.enhanced, SliceState::Idle));

        let back = view.select_tab(Tab::Summary);
        let second = back.started.unwrap();
        assert_ne!(first, second);

        let stale = FetchOutcome {
            ticket: first,
            result: Err("late".to_string()),
        };
        assert!(!view.apply(stale));
        assert!(view.enhanced.is_loading());
    }

    #[test]
    fn test_loaded_slice_survives_tab_switches() {
        let (mut view, _) = loaded_view();
        let ai = view.select_tab(Tab::AiAnalysis).started.unwrap();
        assert!(view.apply(FetchOutcome {
            ticket: ai,
            result: Ok(SliceData::AiNarrative(narrative())),
        }));

        view.select_tab(Tab::News);
        let again = view.select_tab(Tab::AiAnalysis);
        assert!(again.started.is_none());
        assert_eq!(again.cancelled.map(|t| t.kind), Some(SliceKind::News));
        assert_eq!(view.ai.loaded(), Some(&narrative()));
    }

    #[test]
    fn test_errored_slice_is_kept_until_retry() {
        let (mut view, _) = loaded_view();
        let technical = view.select_tab(Tab::Technical).started.unwrap();
        view.apply(FetchOutcome {
            ticket: technical,
            result: Err("Failed to fetch technical data".to_string()),
        });
        assert_eq!(
            view.technical,
            SliceState::Errored("Failed to fetch technical data".to_string())
        );

        view.select_tab(Tab::Sources);
        assert!(view.select_tab(Tab::Technical).started.is_none());

        let retry = view.retry_tab().unwrap();
        assert_eq!(retry.kind, SliceKind::Technical);
        assert!(view.technical.is_loading());
        assert!(view.retry_tab().is_none());
    }

    #[test]
    fn test_news_from_detail_skips_fetch() {
        let mut detail = detail();
        detail.latest_news = vec![NewsArticle {
            title: "Apple ships".to_string(),
            url: "https://n/1".to_string(),
            source: "Wire".to_string(),
            date: "2024-05-02".to_string(),
        }];
        let mut view = DetailView::new("AAPL", false);
        view.page_loaded(Ok(detail));

        assert!(view.select_tab(Tab::News).started.is_none());
        assert_eq!(view.news.loaded().map(Vec::len), Some(1));
    }

    #[test]
    fn test_fetched_news_merges_into_detail() {
        let (mut view, _) = loaded_view();
        let news = view.select_tab(Tab::News).started.unwrap();
        let articles = vec![NewsArticle {
            title: "Headline".to_string(),
            url: "https://n/2".to_string(),
            source: "Wire".to_string(),
            date: "2024-05-03".to_string(),
        }];
        view.apply(FetchOutcome {
            ticket: news,
            result: Ok(SliceData::News(articles.clone())),
        });
        assert_eq!(view.detail().unwrap().latest_news, articles);
    }

    #[test]
    fn test_pending_lists_in_flight_tickets() {
        let (view, ticket) = loaded_view();
        assert_eq!(view.pending(), vec![ticket]);
    }

    #[test]
    fn test_tab_cycling() {
        assert_eq!(Tab::Summary.prev(), Tab::AiAnalysis);
        assert_eq!(Tab::AiAnalysis.next(), Tab::Summary);
        assert_eq!(Tab::Technical.index(), 2);
    }

    struct FailingApi;

    impl StockApi for FailingApi {
        async fn list_stocks(&self) -> Result<Vec<StockSummary>, GatewayError> {
            Ok(Vec::new())
        }
        async fn get_details(&self, _: &str, _: bool) -> Result<StockDetail, GatewayError> {
            Ok(detail())
        }
        async fn search(&self, _: &str) -> Result<SearchOutcome, GatewayError> {
            Ok(SearchOutcome::Found(Vec::new()))
        }
        async fn enhanced_metrics(&self, s: &str, days: u32) -> Result<EnhancedMetrics, GatewayError> {
            Err(GatewayError::Status {
                error: format!("no metrics for {} over {} days", s, days),
                status: 503,
            })
        }
        async fn technical_analysis(&self, _: &str) -> Result<TechnicalReport, GatewayError> {
            Ok(TechnicalReport::default())
        }
        async fn news(&self, _: &str, limit: u32) -> Result<Vec<NewsArticle>, GatewayError> {
            Ok(vec![
                NewsArticle {
                    title: "t".to_string(),
                    url: "u".to_string(),
                    source: "s".to_string(),
                    date: "d".to_string(),
                };
                limit as usize
            ])
        }
        async fn ai_analysis(&self, _: &str) -> Result<AiNarrative, GatewayError> {
            Ok(narrative())
        }
    }

    #[tokio::test]
    async fn test_fetch_slice_dispatch() {
        let options = FetchOptions {
            lookback_days: 90,
            news_limit: 3,
        };

        let metrics = fetch_slice(&FailingApi, "AAPL", SliceKind::EnhancedMetrics, options).await;
        assert_eq!(metrics, Err("no metrics for AAPL over 90 days".to_string()));

        let news = fetch_slice(&FailingApi, "AAPL", SliceKind::News, options).await;
        assert!(matches!(news, Ok(SliceData::News(ref v)) if v.len() == 3));

        let technical = fetch_slice(&FailingApi, "AAPL", SliceKind::Technical, options).await;
        assert_eq!(technical, Ok(SliceData::Technical(TechnicalReport::default())));
    }
}
