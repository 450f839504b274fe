//! Detail normalization.
//!
//! Stock detail payloads come from more than one backend generation. Some carry a
//! `sources` map instead of `reliableSources`, some spell the 52-week bounds
//! `52WeekHigh`/`52WeekLow`, and some have no summary at all. [`RawDetail`] is the
//! wire shape that accepts all of them; [`normalize`] turns it into a complete
//! [`StockDetail`].

use crate::models::{Figure, NewsArticle, ReliableSource, StockDetail, UnreliableSource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label used in synthesized summaries when the payload names no data source.
pub const DEFAULT_DATA_SOURCE: &str = "Financial APIs";

/// Wire representation of a stock detail, tolerant of both historical key spellings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDetail {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub current_price: f64,
    #[serde(default)]
    pub change: f64,
    #[serde(default)]
    pub percent_change: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<Figure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pe_ratio: Option<Figure>,
    #[serde(default, rename = "high52Week", skip_serializing_if = "Option::is_none")]
    pub high_52_week: Option<Figure>,
    #[serde(default, rename = "low52Week", skip_serializing_if = "Option::is_none")]
    pub low_52_week: Option<Figure>,
    #[serde(default, rename = "52WeekHigh", skip_serializing_if = "Option::is_none")]
    pub week_52_high: Option<Figure>,
    #[serde(default, rename = "52WeekLow", skip_serializing_if = "Option::is_none")]
    pub week_52_low: Option<Figure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliable_sources: Option<Vec<ReliableSource>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unreliable_sources: Option<Vec<UnreliableSource>>,
    /// Older payloads: display key to URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_news: Option<Vec<NewsArticle>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
}

/// Fill in every optional part of a raw detail.
pub fn normalize(raw: RawDetail) -> StockDetail {
    let reliable_sources = match (raw.reliable_sources, raw.sources) {
        (Some(sources), _) => sources,
        (None, Some(map)) => map
            .into_iter()
            .map(|(key, url)| ReliableSource {
                name: capitalize(&key),
                url,
                reliability: None,
            })
            .collect(),
        (None, None) => Vec::new(),
    };

    let summary = match raw.summary {
        Some(summary) if !summary.is_empty() => summary,
        _ => synthesize_summary(
            &raw.symbol,
            &raw.name,
            raw.current_price,
            raw.change,
            raw.percent_change,
            raw.data_source.as_deref(),
        ),
    };

    StockDetail {
        symbol: raw.symbol,
        name: raw.name,
        current_price: raw.current_price,
        change: raw.change,
        percent_change: raw.percent_change,
        market_cap: raw.market_cap,
        pe_ratio: raw.pe_ratio,
        high_52_week: reconcile(raw.high_52_week, raw.week_52_high),
        low_52_week: reconcile(raw.low_52_week, raw.week_52_low),
        reliable_sources,
        unreliable_sources: raw.unreliable_sources.unwrap_or_default(),
        summary,
        latest_news: raw.latest_news.unwrap_or_default(),
        data_source: raw.data_source,
    }
}

/// Fallback summary for payloads that ship without one.
pub fn synthesize_summary(
    symbol: &str,
    name: &str,
    price: f64,
    change: f64,
    percent_change: f64,
    data_source: Option<&str>,
) -> String {
    let sign = if change >= 0.0 { "+" } else { "" };
    format!(
        "{} ({}) is currently trading at ${}. The stock has changed by {}{} ({}%) recently. Data source: {}",
        name,
        symbol,
        price,
        sign,
        change,
        percent_change,
        data_source.unwrap_or(DEFAULT_DATA_SOURCE)
    )
}

/// Pick the canonical spelling unless it is blank and the other one is set.
fn reconcile(canonical: Option<Figure>, alternate: Option<Figure>) -> Option<Figure> {
    match canonical {
        Some(Figure::Text(ref s)) if s.trim().is_empty() && alternate.is_some() => alternate,
        Some(figure) => Some(figure),
        None => alternate,
    }
}

/// Upper-case the first character, leaving the rest untouched.
fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl From<RawDetail> for StockDetail {
    fn from(raw: RawDetail) -> Self {
        normalize(raw)
    }
}

impl From<StockDetail> for RawDetail {
    fn from(detail: StockDetail) -> Self {
        RawDetail {
            symbol: detail.symbol,
            name: detail.name,
            current_price: detail.current_price,
            change: detail.change,
            percent_change: detail.percent_change,
            market_cap: detail.market_cap,
            pe_ratio: detail.pe_ratio,
            week_52_high: detail.high_52_week.clone(),
            week_52_low: detail.low_52_week.clone(),
            high_52_week: detail.high_52_week,
            low_52_week: detail.low_52_week,
            reliable_sources: Some(detail.reliable_sources),
            unreliable_sources: Some(detail.unreliable_sources),
            sources: None,
            summary: Some(detail.summary),
            latest_news: Some(detail.latest_news),
            data_source: detail.data_source,
        }
    }
}
