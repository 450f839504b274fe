//! Search screen state.

use crate::api::{SearchOutcome, StockApi};
use crate::error::GatewayError;
use crate::models::StockSummary;
use crate::recent::{RecentSearch, RecentSearches};
use tracing::{error, warn};

const RATE_LIMIT_MESSAGE: &str = "API rate limit reached. Would you like to use default data instead?";
const GENERIC_ERROR_MESSAGE: &str = "An error occurred while searching. Please try again later.";

/// Message shown under the search box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchError {
    pub message: String,
    /// Offer the "use default data" action.
    pub use_defaults: bool,
}

/// Where the user asked to go next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Detail { symbol: String, use_defaults: bool },
}

/// State of the search screen.
pub struct SearchFlow {
    /// Text in the search box, always upper-case.
    pub input: String,
    pub loading: bool,
    pub error: Option<SearchError>,
    pub results: Vec<StockSummary>,
    /// A search has been submitted at least once.
    pub searched: bool,
    pub recent: RecentSearches,
    /// Id of the in-flight request; older responses are ignored.
    request: u64,
}

impl SearchFlow {
    pub fn new(recent: RecentSearches) -> Self {
        Self {
            input: String::new(),
            loading: false,
            error: None,
            results: Vec::new(),
            searched: false,
            recent,
            request: 0,
        }
    }

    /// Replace the input, upper-casing it.
    pub fn set_input(&mut self, text: &str) {
        self.input = text.to_uppercase();
    }

    pub fn push_char(&mut self, c: char) {
        self.input.extend(c.to_uppercase());
    }

    pub fn pop_char(&mut self) {
        self.input.pop();
    }

    /// The symbol that would be submitted, if any.
    pub fn query(&self) -> Option<String> {
        let trimmed = self.input.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Start a search. Returns the request id and symbol, or `None` for blank input.
    pub fn begin(&mut self) -> Option<(u64, String)> {
        let symbol = self.query()?;
        self.request += 1;
        self.searched = true;
        self.loading = true;
        self.error = None;
        self.results.clear();
        Some((self.request, symbol))
    }

    /// Apply the response for request `id`. Stale responses are dropped.
    pub fn finish(&mut self, id: u64, result: Result<SearchOutcome, GatewayError>) {
        if id != self.request {
            return;
        }
        self.loading = false;

        match result {
            Ok(SearchOutcome::Found(results)) => {
                for hit in results.iter().rev() {
                    let entry = RecentSearch {
                        symbol: hit.symbol.clone(),
                        name: hit.name.clone(),
                    };
                    if let Err(e) = self.recent.push(entry) {
                        warn!(error = %e, "failed to persist recent searches");
                    }
                }
                self.results = results;
            }
            Ok(SearchOutcome::Failed(failure)) => {
                self.error = Some(if failure.retry_with_defaults {
                    SearchError {
                        message: RATE_LIMIT_MESSAGE.to_string(),
                        use_defaults: true,
                    }
                } else {
                    SearchError {
                        message: failure.error,
                        use_defaults: false,
                    }
                });
            }
            Err(e) => {
                error!(error = %e, "error during search");
                self.error = Some(SearchError {
                    message: GENERIC_ERROR_MESSAGE.to_string(),
                    use_defaults: false,
                });
            }
        }
    }

    /// Run a search to completion.
    pub async fn submit<A: StockApi>(&mut self, api: &A) {
        if let Some((id, symbol)) = self.begin() {
            let result = api.search(&symbol).await;
            self.finish(id, result);
        }
    }

    /// Submitted, settled, no error and nothing found.
    pub fn no_results(&self) -> bool {
        self.searched && !self.loading && self.error.is_none() && self.results.is_empty()
    }

    /// The "use default data" action, when it is on offer.
    pub fn use_default_data(&self) -> Option<Navigation> {
        let offered = self.error.as_ref().is_some_and(|e| e.use_defaults);
        let symbol = self.query()?;
        offered.then_some(Navigation::Detail {
            symbol,
            use_defaults: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SearchFailure;
    use crate::models::{AiNarrative, EnhancedMetrics, NewsArticle, StockDetail, TechnicalReport};
    use crate::recent::MemoryStore;

    struct FakeApi {
        outcome: Result<SearchOutcome, GatewayError>,
    }

    impl StockApi for FakeApi {
        async fn list_stocks(&self) -> Result<Vec<StockSummary>, GatewayError> {
            Ok(Vec::new())
        }
        async fn get_details(&self, symbol: &str, _: bool) -> Result<StockDetail, GatewayError> {
            Err(GatewayError::NotFound(symbol.to_string()))
        }
        async fn search(&self, _: &str) -> Result<SearchOutcome, GatewayError> {
            self.outcome.clone()
        }
        async fn enhanced_metrics(&self, s: &str, _: u32) -> Result<EnhancedMetrics, GatewayError> {
            Err(GatewayError::NotFound(s.to_string()))
        }
        async fn technical_analysis(&self, s: &str) -> Result<TechnicalReport, GatewayError> {
            Err(GatewayError::NotFound(s.to_string()))
        }
        async fn news(&self, _: &str, _: u32) -> Result<Vec<NewsArticle>, GatewayError> {
            Ok(Vec::new())
        }
        async fn ai_analysis(&self, s: &str) -> Result<AiNarrative, GatewayError> {
            Err(GatewayError::NotFound(s.to_string()))
        }
    }

    fn flow() -> SearchFlow {
        SearchFlow::new(RecentSearches::load(Box::new(MemoryStore::new())))
    }

    fn apple() -> StockSummary {
        StockSummary {
            symbol: "AAPL".to_string(),
            name: "Apple Inc.".to_string(),
            current_price: 175.34,
            change: 2.45,
            percent_change: 1.42,
        }
    }

    fn failed(error: &str, retry_with_defaults: bool) -> Result<SearchOutcome, GatewayError> {
        Ok(SearchOutcome::Failed(SearchFailure {
            error: error.to_string(),
            retry_with_defaults,
        }))
    }

    #[test]
    fn test_input_is_upper_cased() {
        let mut search = flow();
        search.push_char('a');
        search.push_char('a');
        search.set_input(&format!("{}pl", search.input));
        assert_eq!(search.input, "AAPL");
    }

    #[test]
    fn test_blank_input_is_not_submitted() {
        let mut search = flow();
        search.set_input("   ");
        assert!(search.begin().is_none());
        assert!(!search.searched);
    }

    #[tokio::test]
    async fn test_found_populates_results_and_history() {
        let mut search = flow();
        search.set_input("aapl");
        let api = FakeApi {
            outcome: Ok(SearchOutcome::Found(vec![apple()])),
        };

        search.submit(&api).await;
        search.submit(&api).await;

        assert_eq!(search.results, vec![apple()]);
        assert!(!search.loading);
        assert_eq!(search.recent.len(), 1);
        assert_eq!(search.recent.entries()[0].symbol, "AAPL");
    }

    #[tokio::test]
    async fn test_not_found_shows_message_without_defaults() {
        let mut search = flow();
        search.set_input("zzzz");
        let api = FakeApi {
            outcome: failed("No stocks found matching ZZZZ", false),
        };

        search.submit(&api).await;

        let error = search.error.clone().unwrap();
        assert_eq!(error.message, "No stocks found matching ZZZZ");
        assert!(!error.use_defaults);
        assert!(search.results.is_empty());
        assert!(search.use_default_data().is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_offers_default_data() {
        let mut search = flow();
        search.set_input("tsla");
        let api = FakeApi {
            outcome: failed("You have exceeded your request allocation", true),
        };

        search.submit(&api).await;

        assert!(search.error.as_ref().unwrap().message.contains("rate limit"));
        assert_eq!(
            search.use_default_data(),
            Some(Navigation::Detail {
                symbol: "TSLA".to_string(),
                use_defaults: true
            })
        );
    }

    #[tokio::test]
    async fn test_gateway_error_shows_generic_message() {
        let mut search = flow();
        search.set_input("AAPL");
        let api = FakeApi {
            outcome: Err(GatewayError::Decode("bad body".to_string())),
        };

        search.submit(&api).await;

        assert_eq!(search.error.unwrap().message, GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_stale_response_is_ignored() {
        let mut search = flow();
        search.set_input("AAPL");
        let (first, _) = search.begin().unwrap();
        let (second, _) = search.begin().unwrap();

        search.finish(first, Ok(SearchOutcome::Found(vec![apple()])));
        assert!(search.loading);
        assert!(search.results.is_empty());

        search.finish(second, Ok(SearchOutcome::Found(Vec::new())));
        assert!(search.no_results());
    }
}
