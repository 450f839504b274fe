//! Data models for stock summaries, details and the externally supplied analysis payloads.

use crate::normalize::RawDetail;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A loosely typed figure. Backends send some values as numbers and others as
/// preformatted strings such as "2.7T" or "N/A".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Figure {
    Number(f64),
    Text(String),
}

impl Figure {
    /// Whether the figure carries a displayable value.
    pub fn is_available(&self) -> bool {
        match self {
            Figure::Number(n) => n.is_finite(),
            Figure::Text(s) => !s.trim().is_empty() && s != "N/A",
        }
    }

    /// Numeric value, parsing text figures when possible.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Figure::Number(n) => Some(*n),
            Figure::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Figure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Figure::Number(n) => write!(f, "{}", n),
            Figure::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Figure {
    fn from(value: f64) -> Self {
        Figure::Number(value)
    }
}

impl From<&str> for Figure {
    fn from(value: &str) -> Self {
        Figure::Text(value.to_string())
    }
}

/// Short quote as returned by the list and search endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSummary {
    /// Ticker symbol (e.g., "AAPL")
    pub symbol: String,
    /// Company name
    pub name: String,
    /// Last traded price
    pub current_price: f64,
    /// Absolute change
    pub change: f64,
    /// Percentage change
    pub percent_change: f64,
}

/// A curated, trusted source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliableSource {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliability: Option<String>,
}

/// A source that was filtered out, with the reason it was flagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnreliableSource {
    pub name: String,
    pub reason: String,
}

/// A news headline attached to a stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub url: String,
    pub source: String,
    pub date: String,
}

/// Complete stock detail. Always normalized: decoding goes through [`RawDetail`],
/// and encoding emits both 52-week key spellings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDetail", into = "RawDetail")]
pub struct StockDetail {
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub change: f64,
    pub percent_change: f64,
    pub market_cap: Option<Figure>,
    pub pe_ratio: Option<Figure>,
    pub high_52_week: Option<Figure>,
    pub low_52_week: Option<Figure>,
    pub reliable_sources: Vec<ReliableSource>,
    pub unreliable_sources: Vec<UnreliableSource>,
    pub summary: String,
    pub latest_news: Vec<NewsArticle>,
    pub data_source: Option<String>,
}

impl StockDetail {
    /// The summary view of this detail.
    pub fn to_summary(&self) -> StockSummary {
        StockSummary {
            symbol: self.symbol.clone(),
            name: self.name.clone(),
            current_price: self.current_price,
            change: self.change,
            percent_change: self.percent_change,
        }
    }
}

/// Payload of the technical-analysis service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalReport {
    #[serde(default)]
    pub technical_analysis: Option<TechnicalSnapshot>,
    #[serde(default)]
    pub relative_strength: BTreeMap<String, RelativeStrength>,
    #[serde(default)]
    pub patterns: Vec<ChartPattern>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalSnapshot {
    #[serde(default)]
    pub trend: String,
    #[serde(default)]
    pub price: Option<Figure>,
    #[serde(default)]
    pub momentum: Option<Momentum>,
    #[serde(default)]
    pub moving_averages: Option<MovingAverages>,
    #[serde(default)]
    pub volatility: Option<Volatility>,
    #[serde(default)]
    pub volume: Option<VolumeStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Momentum {
    pub rsi: f64,
    #[serde(default)]
    pub rsi_zone: Option<String>,
}

/// Price distance from each simple moving average, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovingAverages {
    #[serde(rename = "priceVsSMA20")]
    pub price_vs_sma20: f64,
    #[serde(rename = "priceVsSMA50")]
    pub price_vs_sma50: f64,
    #[serde(rename = "priceVsSMA200")]
    pub price_vs_sma200: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volatility {
    pub atr: f64,
    pub atr_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeStats {
    pub current: f64,
    #[serde(rename = "average20Day")]
    pub average_20_day: f64,
    pub ratio: f64,
}

/// Performance against the S&P 500 over one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelativeStrength {
    pub stock_performance: f64,
    pub spy_performance: f64,
    pub outperforming: bool,
    pub relative_strength: f64,
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPattern {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub price_target: Option<Figure>,
}

/// Payload of the enhanced-metrics service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedMetrics {
    pub volatility: RiskMetrics,
    pub spy_correlation: Figure,
    pub market_metrics: MarketMetrics,
    pub price_levels: PriceLevels,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskMetrics {
    pub daily: Figure,
    pub annualized: Figure,
    pub max_drawdown: Figure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketMetrics {
    pub beta: Figure,
    #[serde(rename = "forwardPE")]
    pub forward_pe: Figure,
    pub price_to_sales_ratio: Figure,
    pub price_to_book_ratio: Figure,
    #[serde(default)]
    pub dividend: Option<Dividend>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dividend {
    #[serde(rename = "yield")]
    pub dividend_yield: Figure,
    pub per_share: Figure,
    pub date: Figure,
    pub payout_ratio: Figure,
}

impl Dividend {
    /// Dividends are only worth showing with a real, non-zero yield.
    pub fn is_paying(&self) -> bool {
        match &self.dividend_yield {
            Figure::Text(s) => self.dividend_yield.is_available() && s != "0.00",
            Figure::Number(n) => *n != 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevels {
    pub current: Figure,
    pub support: LevelPair,
    pub resistance: LevelPair,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelPair {
    pub strong: Figure,
    pub weak: Figure,
}

/// AI-generated narrative for a stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiNarrative {
    pub analysis: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_figure_accepts_numbers_and_text() {
        let n: Figure = serde_json::from_str("28.5").unwrap();
        let t: Figure = serde_json::from_str("\"2.7T\"").unwrap();
        assert_eq!(n, Figure::Number(28.5));
        assert_eq!(t, Figure::Text("2.7T".to_string()));
        assert_eq!(t.to_string(), "2.7T");
    }

    #[test]
    fn test_figure_availability() {
        assert!(!Figure::from("N/A").is_available());
        assert!(!Figure::from("").is_available());
        assert!(Figure::from("182.94").is_available());
        assert_eq!(Figure::from("182.94").as_f64(), Some(182.94));
    }

    #[test]
    fn test_technical_report_wire_names() {
        let json = r#"{
            "technicalAnalysis": {
                "trend": "Bullish",
                "momentum": {"rsi": 62.4, "rsiZone": "Neutral"},
                "movingAverages": {"priceVsSMA20": 1.2, "priceVsSMA50": 3.4, "priceVsSMA200": 9.9},
                "volatility": {"atr": 3.1, "atrPercent": 1.8},
                "volume": {"current": 51000000, "average20Day": 48000000, "ratio": 1.06}
            },
            "relativeStrength": {
                "21_day": {"stock_performance": 4.0, "spy_performance": 2.0, "outperforming": true, "relative_strength": 2.0}
            },
            "patterns": [{"name": "Bull Flag", "confidence": 70, "priceTarget": 190}]
        }"#;

        let report: TechnicalReport = serde_json::from_str(json).unwrap();
        let snapshot = report.technical_analysis.unwrap();
        assert_eq!(snapshot.moving_averages.unwrap().price_vs_sma200, 9.9);
        assert_eq!(snapshot.volume.unwrap().average_20_day, 48_000_000.0);
        assert!(report.relative_strength["21_day"].outperforming);
        assert_eq!(report.patterns[0].price_target, Some(Figure::Number(190.0)));
    }

    #[test]
    fn test_dividend_is_paying() {
        let dividend = Dividend {
            dividend_yield: Figure::from("0.00"),
            per_share: Figure::from("N/A"),
            date: Figure::from("N/A"),
            payout_ratio: Figure::from("N/A"),
        };
        assert!(!dividend.is_paying());
    }
}
