//! HTTP client for the stock research API.
//!
//! Wraps the list, detail and search routes of the backend plus the external
//! analysis services (technical analysis, enhanced metrics, news, AI narrative),
//! and turns every failure into a [`GatewayError`].

use crate::error::GatewayError;
use crate::models::{
    AiNarrative, EnhancedMetrics, NewsArticle, StockDetail, StockSummary, TechnicalReport,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Default look-back window for enhanced metrics, in days.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 180;

/// Default number of news articles requested.
pub const DEFAULT_NEWS_LIMIT: u32 = 10;

const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check connection.";

/// Decides whether an error response means "quota exhausted, offer default data".
///
/// HTTP 429 always counts. Otherwise the error text is matched, case-insensitively,
/// against a configurable set of markers.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitDetector {
    markers: Vec<String>,
}

impl RateLimitDetector {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(|m| m.as_ref().trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    pub fn is_rate_limited(&self, status: Option<u16>, message: &str) -> bool {
        if status == Some(StatusCode::TOO_MANY_REQUESTS.as_u16()) {
            return true;
        }
        let message = message.to_lowercase();
        self.markers.iter().any(|m| message.contains(m.as_str()))
    }
}

impl Default for RateLimitDetector {
    fn default() -> Self {
        Self::new(["request allocation", "rate limit"])
    }
}

/// Result of a symbol search. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found(Vec<StockSummary>),
    Failed(SearchFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchFailure {
    pub error: String,
    /// The failure looks like a quota problem; the caller may fall back to default data.
    pub retry_with_defaults: bool,
}

/// Operations the views need from the stock API.
pub trait StockApi: Send + Sync {
    fn list_stocks(&self) -> impl Future<Output = Result<Vec<StockSummary>, GatewayError>> + Send;

    fn get_details(
        &self,
        symbol: &str,
        use_defaults: bool,
    ) -> impl Future<Output = Result<StockDetail, GatewayError>> + Send;

    fn search(
        &self,
        symbol: &str,
    ) -> impl Future<Output = Result<SearchOutcome, GatewayError>> + Send;

    fn enhanced_metrics(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> impl Future<Output = Result<EnhancedMetrics, GatewayError>> + Send;

    fn technical_analysis(
        &self,
        symbol: &str,
    ) -> impl Future<Output = Result<TechnicalReport, GatewayError>> + Send;

    fn news(
        &self,
        symbol: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<NewsArticle>, GatewayError>> + Send;

    fn ai_analysis(
        &self,
        symbol: &str,
    ) -> impl Future<Output = Result<AiNarrative, GatewayError>> + Send;
}

/// Stock API client.
#[derive(Debug, Clone)]
pub struct StockGateway {
    client: Client,
    base_url: String,
    rate_limit: RateLimitDetector,
}

impl StockGateway {
    /// Create a new client. `base_url` includes the `/api` prefix.
    pub fn new(base_url: &str, timeout: Duration, rate_limit: RateLimitDetector) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("stock-researcher/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limit,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Response, GatewayError> {
        debug!(%url, "GET");
        self.client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))
    }

    /// Decode a success body, or classify the failure.
    async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let message = error_message(response)
                .await
                .unwrap_or_else(|| format!("Request failed with status {}", status));
            return Err(self.classify(status, message));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    fn classify(&self, status: StatusCode, message: String) -> GatewayError {
        if status == StatusCode::NOT_FOUND {
            GatewayError::NotFound(message)
        } else if self.rate_limit.is_rate_limited(Some(status.as_u16()), &message) {
            GatewayError::RateLimited(message)
        } else if status == StatusCode::BAD_REQUEST {
            GatewayError::Validation(message)
        } else if status.is_server_error() {
            GatewayError::Server {
                status: status.as_u16(),
                message,
            }
        } else {
            GatewayError::Status {
                error: message,
                status: status.as_u16(),
            }
        }
    }

    /// Fetch an external analysis payload. Non-success responses become
    /// `Status` errors that prefer the body's `error` text over `fallback`.
    async fn fetch_status_checked<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        fallback: String,
    ) -> Result<T, GatewayError> {
        let response = match self.get(url, query).await {
            Ok(response) => response,
            Err(e) => {
                warn!(%url, error = %e, "request failed");
                return Err(GatewayError::Status {
                    error: e.user_message(),
                    status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error = error_message(response).await.unwrap_or(fallback);
            warn!(%url, status = status.as_u16(), %error, "upstream returned an error");
            return Err(GatewayError::Status {
                error,
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

impl StockApi for StockGateway {
    async fn list_stocks(&self) -> Result<Vec<StockSummary>, GatewayError> {
        let response = self.get(&self.url("stocks"), &[]).await?;
        self.decode(response).await
    }

    async fn get_details(&self, symbol: &str, use_defaults: bool) -> Result<StockDetail, GatewayError> {
        let url = self.url(&format!("stocks/{}", urlencoding::encode(symbol)));
        let query = if use_defaults {
            vec![("use_defaults", "true".to_string())]
        } else {
            Vec::new()
        };
        let response = self.get(&url, &query).await?;
        self.decode(response).await
    }

    async fn search(&self, symbol: &str) -> Result<SearchOutcome, GatewayError> {
        let url = self.url("search");
        let response = match self.get(&url, &[("symbol", symbol.to_string())]).await {
            Ok(response) => response,
            Err(e) => {
                warn!(%symbol, error = %e, "network error searching for stock");
                return Ok(SearchOutcome::Failed(SearchFailure {
                    error: NETWORK_ERROR_MESSAGE.to_string(),
                    retry_with_defaults: false,
                }));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let fallback = if status == StatusCode::NOT_FOUND {
                format!("Stock symbol {} not found", symbol)
            } else {
                "An API error occurred".to_string()
            };
            let error = error_message(response).await.unwrap_or(fallback);
            if status != StatusCode::NOT_FOUND {
                warn!(status = status.as_u16(), %error, "search API error");
            }
            let retry_with_defaults = self.rate_limit.is_rate_limited(Some(status.as_u16()), &error);
            return Ok(SearchOutcome::Failed(SearchFailure {
                error,
                retry_with_defaults,
            }));
        }

        let body: SearchBody = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        Ok(match body {
            SearchBody::Many(results) if results.is_empty() => {
                SearchOutcome::Failed(SearchFailure {
                    error: format!("No results found for symbol {}", symbol),
                    retry_with_defaults: false,
                })
            }
            SearchBody::Many(results) => SearchOutcome::Found(results),
            SearchBody::One(result) => SearchOutcome::Found(vec![result]),
        })
    }

    async fn enhanced_metrics(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> Result<EnhancedMetrics, GatewayError> {
        let url = self.url(&format!("technical/enhanced/{}", urlencoding::encode(symbol)));
        self.fetch_status_checked(
            &url,
            &[("lookback", lookback_days.to_string())],
            format!("Failed to fetch enhanced technical metrics for {}", symbol),
        )
        .await
    }

    async fn technical_analysis(&self, symbol: &str) -> Result<TechnicalReport, GatewayError> {
        let url = self.url(&format!("technical-analysis/{}", urlencoding::encode(symbol)));
        self.fetch_status_checked(&url, &[], "Failed to fetch technical data".to_string())
            .await
    }

    async fn news(&self, symbol: &str, limit: u32) -> Result<Vec<NewsArticle>, GatewayError> {
        let url = self.url(&format!("polygon/news/{}", urlencoding::encode(symbol)));
        let feed: NewsFeed = self
            .fetch_status_checked(
                &url,
                &[("limit", limit.to_string())],
                "Failed to fetch news data".to_string(),
            )
            .await?;

        Ok(feed
            .results
            .unwrap_or_default()
            .into_iter()
            .map(NewsItem::into_article)
            .collect())
    }

    async fn ai_analysis(&self, symbol: &str) -> Result<AiNarrative, GatewayError> {
        let url = self.url(&format!("ai-analysis/{}", urlencoding::encode(symbol)));
        self.fetch_status_checked(&url, &[], "Failed to fetch AI analysis".to_string())
            .await
    }
}

/// Pull `message` or `error` out of an error body.
async fn error_message(response: Response) -> Option<String> {
    let body: ErrorBody = response.json().await.ok()?;
    body.message.or(body.error).filter(|m| !m.is_empty())
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchBody {
    Many(Vec<StockSummary>),
    One(StockSummary),
}

// News service response structures

#[derive(Debug, Deserialize)]
struct NewsFeed {
    #[serde(default)]
    results: Option<Vec<NewsItem>>,
}

#[derive(Debug, Deserialize)]
struct NewsItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    article_url: String,
    #[serde(default)]
    publisher: Option<Publisher>,
    #[serde(default)]
    published_utc: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Publisher {
    #[serde(default)]
    name: String,
}

impl NewsItem {
    fn into_article(self) -> NewsArticle {
        NewsArticle {
            title: self.title,
            url: self.article_url,
            source: self.publisher.map(|p| p.name).unwrap_or_default(),
            date: self
                .published_utc
                .as_deref()
                .map(format_published)
                .unwrap_or_default(),
        }
    }
}

/// Render an RFC 3339 publish time as a calendar date, passing through anything else.
fn format_published(published: &str) -> String {
    match DateTime::parse_from_rfc3339(published) {
        Ok(dt) => dt.with_timezone(&Utc).format("%Y-%m-%d").to_string(),
        Err(_) => published.to_string(),
    }
}
