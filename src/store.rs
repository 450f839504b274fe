//! In-memory stock table served by the backend.
//!
//! Read-only after construction; shared between handlers behind an `Arc`.

use crate::models::{Figure, ReliableSource, StockDetail, StockSummary, UnreliableSource};
use crate::normalize::{RawDetail, normalize};
use std::collections::BTreeMap;

/// Data source label for placeholder details.
pub const DEFAULT_DATA_LABEL: &str = "Default Data";

/// Lookup table keyed by upper-case symbol.
#[derive(Debug, Clone, Default)]
pub struct StockStore {
    stocks: BTreeMap<String, StockDetail>,
    order: Vec<String>,
}

impl StockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The three-ticker table the backend ships with.
    pub fn with_mock_data() -> Self {
        let mut store = Self::new();
        for detail in mock_details() {
            store.insert(detail);
        }
        store
    }

    /// Add or replace a stock, keeping first-insertion order for listings.
    pub fn insert(&mut self, detail: StockDetail) {
        let key = detail.symbol.to_uppercase();
        if !self.stocks.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.stocks.insert(key, detail);
    }

    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }

    /// Case-insensitive lookup.
    pub fn get(&self, symbol: &str) -> Option<&StockDetail> {
        self.stocks.get(&symbol.to_uppercase())
    }

    /// Summaries in listing order.
    pub fn summaries(&self) -> Vec<StockSummary> {
        self.order
            .iter()
            .filter_map(|symbol| self.stocks.get(symbol))
            .map(StockDetail::to_summary)
            .collect()
    }

    /// Placeholder detail for a symbol the table does not know.
    pub fn default_detail(symbol: &str) -> StockDetail {
        let symbol = symbol.to_uppercase();
        normalize(RawDetail {
            name: symbol.clone(),
            symbol,
            data_source: Some(DEFAULT_DATA_LABEL.to_string()),
            ..RawDetail::default()
        })
    }
}

struct MockStock {
    symbol: &'static str,
    name: &'static str,
    price: f64,
    change: f64,
    percent_change: f64,
    market_cap: &'static str,
    pe_ratio: &'static str,
    high_52_week: &'static str,
    low_52_week: &'static str,
    sources: [(&'static str, &'static str); 3],
    flagged: [(&'static str, &'static str); 3],
    summary: &'static str,
}

impl MockStock {
    fn into_detail(self) -> StockDetail {
        StockDetail {
            symbol: self.symbol.to_string(),
            name: self.name.to_string(),
            current_price: self.price,
            change: self.change,
            percent_change: self.percent_change,
            market_cap: Some(Figure::from(self.market_cap)),
            pe_ratio: Some(Figure::from(self.pe_ratio)),
            high_52_week: Some(Figure::from(self.high_52_week)),
            low_52_week: Some(Figure::from(self.low_52_week)),
            reliable_sources: self
                .sources
                .iter()
                .map(|(name, url)| ReliableSource {
                    name: name.to_string(),
                    url: url.to_string(),
                    reliability: Some("high".to_string()),
                })
                .collect(),
            unreliable_sources: self
                .flagged
                .iter()
                .map(|(name, reason)| UnreliableSource {
                    name: name.to_string(),
                    reason: reason.to_string(),
                })
                .collect(),
            summary: self.summary.to_string(),
            latest_news: Vec::new(),
            data_source: None,
        }
    }
}

fn mock_details() -> Vec<StockDetail> {
    vec![
        MockStock {
            symbol: "AAPL",
            name: "Apple Inc.",
            price: 175.34,
            change: 2.45,
            percent_change: 1.42,
            market_cap: "2.7T",
            pe_ratio: "28.5",
            high_52_week: "182.94",
            low_52_week: "124.17",
            sources: [
                ("Investor Relations Website", "https://investor.apple.com"),
                ("Apple Newsroom", "https://www.apple.com/newsroom/"),
                ("SEC Filings", "https://www.sec.gov/edgar/browse/?CIK=320193"),
            ],
            flagged: [
                ("StockPromoter.com", "Paid Promotion"),
                ("InvestorBuzz", "Clickbait Content"),
                ("TrendTraderDaily", "Unverified Claims"),
            ],
            summary: "Based on our analysis of reliable sources, Apple's recent product announcements and strong financial performance indicate continued growth potential. However, investors should be aware of increasing competition in key markets and potential regulatory challenges.",
        },
        MockStock {
            symbol: "MSFT",
            name: "Microsoft Corporation",
            price: 417.88,
            change: 3.25,
            percent_change: 0.78,
            market_cap: "3.1T",
            pe_ratio: "36.2",
            high_52_week: "425.31",
            low_52_week: "309.98",
            sources: [
                ("Investor Relations Website", "https://www.microsoft.com/en-us/investor"),
                ("Microsoft News", "https://news.microsoft.com/"),
                ("SEC Filings", "https://www.sec.gov/edgar/browse/?CIK=789019"),
            ],
            flagged: [
                ("TechStockGuru.com", "Paid Promotion"),
                ("MarketMoverToday", "Clickbait Content"),
                ("StockTipAlerts", "Unverified Claims"),
            ],
            summary: "Microsoft continues to show strong growth in its cloud services segment, with Azure revenue increasing significantly year-over-year. The company's diverse product portfolio and strategic acquisitions position it well for future growth in AI and enterprise solutions.",
        },
        MockStock {
            symbol: "AMZN",
            name: "Amazon.com Inc.",
            price: 182.41,
            change: -0.95,
            percent_change: -0.52,
            market_cap: "1.9T",
            pe_ratio: "42.7",
            high_52_week: "189.77",
            low_52_week: "118.35",
            sources: [
                ("Investor Relations Website", "https://ir.aboutamazon.com/"),
                ("Amazon News", "https://www.aboutamazon.com/news"),
                ("SEC Filings", "https://www.sec.gov/edgar/browse/?CIK=1018724"),
            ],
            flagged: [
                ("RetailStockBets", "Paid Promotion"),
                ("TechMomentumWatch", "Clickbait Content"),
                ("GigEconomyGurus", "Unverified Claims"),
            ],
            summary: "Amazon continues to dominate e-commerce and cloud services with AWS. Recent investments in logistics and fulfillment will likely strengthen their competitive position, though regulatory scrutiny remains a concern in multiple markets.",
        },
    ]
    .into_iter()
    .map(MockStock::into_detail)
    .collect()
}
