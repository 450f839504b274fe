//! Display classification for externally supplied technical data.
//!
//! Nothing here computes an indicator. These helpers take the numbers the analysis
//! services report and map them onto fixed bands, each with the narrative the
//! detail view shows under "What this means".

use crate::models::{Figure, MovingAverages, RelativeStrength};
use num_format::{Locale, ToFormattedString};
use std::collections::BTreeMap;

/// RSI momentum zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsiZone {
    Oversold,
    Neutral,
    Overbought,
}

impl RsiZone {
    pub fn classify(rsi: f64) -> Self {
        if rsi < 30.0 {
            RsiZone::Oversold
        } else if rsi > 70.0 {
            RsiZone::Overbought
        } else {
            RsiZone::Neutral
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RsiZone::Oversold => "Oversold",
            RsiZone::Neutral => "Neutral",
            RsiZone::Overbought => "Overbought",
        }
    }

    pub fn explanation(self) -> &'static str {
        match self {
            RsiZone::Oversold => {
                "The stock is currently oversold, which may indicate a potential buying opportunity as the price could rebound. However, in strong downtrends, oversold conditions can persist."
            }
            RsiZone::Overbought => {
                "The stock is currently overbought, which may indicate a potential selling opportunity as the price could pull back. However, in strong uptrends, overbought conditions can persist."
            }
            RsiZone::Neutral => {
                "The stock is currently in a neutral momentum zone, neither overbought nor oversold."
            }
        }
    }
}

/// Volatility tier by ATR as a percentage of price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolatilityTier {
    Low,
    Medium,
    High,
}

impl VolatilityTier {
    pub fn classify(atr_percent: f64) -> Self {
        if atr_percent < 3.0 {
            VolatilityTier::Low
        } else if atr_percent < 8.0 {
            VolatilityTier::Medium
        } else {
            VolatilityTier::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VolatilityTier::Low => "low",
            VolatilityTier::Medium => "medium",
            VolatilityTier::High => "high",
        }
    }

    pub fn explanation(self) -> &'static str {
        match self {
            VolatilityTier::Low => {
                "Low volatility suggests stable price action with smaller price swings, potentially better for conservative investors."
            }
            VolatilityTier::Medium => {
                "Medium volatility indicates moderate price fluctuations, balancing potential returns with risk."
            }
            VolatilityTier::High => {
                "High volatility shows significant price swings, offering higher potential returns but with increased risk."
            }
        }
    }
}

/// Current volume relative to its 20-day average.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeBand {
    SignificantlyBelow,
    Below,
    Near,
    Above,
    Exceptional,
}

impl VolumeBand {
    pub fn classify(ratio: f64) -> Self {
        if ratio < 0.5 {
            VolumeBand::SignificantlyBelow
        } else if ratio < 0.8 {
            VolumeBand::Below
        } else if ratio < 1.2 {
            VolumeBand::Near
        } else if ratio < 2.0 {
            VolumeBand::Above
        } else {
            VolumeBand::Exceptional
        }
    }

    pub fn explanation(self) -> &'static str {
        match self {
            VolumeBand::SignificantlyBelow => {
                "Volume is significantly below average, indicating low interest or conviction in the current price movement."
            }
            VolumeBand::Below => {
                "Volume is below average, suggesting moderate interest in current price action."
            }
            VolumeBand::Near => "Volume is near average levels, indicating typical trading activity.",
            VolumeBand::Above => {
                "Above average volume suggests strong interest and may confirm the validity of the current price trend."
            }
            VolumeBand::Exceptional => {
                "Volume is exceptionally high, indicating significant market interest and potential trend acceleration or reversal points."
            }
        }
    }
}

/// Where price sits relative to the 20/50/200-period averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaPosture {
    StrongBullish,
    StrongBearish,
    PotentialReversal,
    Mixed,
}

impl MaPosture {
    pub fn classify(ma: &MovingAverages) -> Self {
        let (short, medium, long) = (ma.price_vs_sma20, ma.price_vs_sma50, ma.price_vs_sma200);
        if short > 0.0 && medium > 0.0 && long > 0.0 {
            MaPosture::StrongBullish
        } else if short < 0.0 && medium < 0.0 && long < 0.0 {
            MaPosture::StrongBearish
        } else if short > 0.0 && medium < 0.0 {
            MaPosture::PotentialReversal
        } else {
            MaPosture::Mixed
        }
    }

    pub fn explanation(self) -> &'static str {
        match self {
            MaPosture::StrongBullish => {
                "Price is trading above all key moving averages, indicating a strong bullish trend."
            }
            MaPosture::StrongBearish => {
                "Price is trading below all key moving averages, indicating a strong bearish trend."
            }
            MaPosture::PotentialReversal => {
                "Price is above short-term but below medium-term averages, suggesting a potential trend change or rebound."
            }
            MaPosture::Mixed => {
                "Mixed signals from moving averages indicate potential consolidation or trend transition."
            }
        }
    }
}

/// Overall relative-strength reading across periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthSummary {
    AllUnderperforming,
    AllOutperforming,
    RecentStrength,
    Mixed,
}

impl StrengthSummary {
    /// `None` when there are no periods to summarize.
    pub fn classify(periods: &BTreeMap<String, RelativeStrength>) -> Option<Self> {
        if periods.is_empty() {
            return None;
        }

        let underperforming = periods.values().filter(|p| !p.outperforming).count();
        let outperforming = |key: &str| periods.get(key).map(|p| p.outperforming);

        Some(if underperforming == periods.len() {
            StrengthSummary::AllUnderperforming
        } else if underperforming == 0 {
            StrengthSummary::AllOutperforming
        } else if outperforming("21_day") == Some(true) && outperforming("63_day") == Some(false) {
            StrengthSummary::RecentStrength
        } else {
            StrengthSummary::Mixed
        })
    }

    pub fn message(self, subject: &str) -> String {
        match self {
            StrengthSummary::AllUnderperforming => format!(
                "{} is underperforming the S&P 500 across all time periods, which may indicate weakness relative to the broader market.",
                subject
            ),
            StrengthSummary::AllOutperforming => format!(
                "{} is outperforming the S&P 500 across all time periods, which may indicate strength relative to the broader market.",
                subject
            ),
            StrengthSummary::RecentStrength => format!(
                "{} is showing recent strength vs the S&P 500 in the short-term, but still underperforming in longer time frames.",
                subject
            ),
            StrengthSummary::Mixed => format!(
                "{} shows mixed performance relative to the S&P 500, outperforming in some periods while underperforming in others.",
                subject
            ),
        }
    }
}

/// Summary sentence for a relative-strength map.
pub fn relative_strength_summary(periods: &BTreeMap<String, RelativeStrength>) -> Option<String> {
    let summary = StrengthSummary::classify(periods)?;
    let subject = ordered_periods(periods)
        .first()
        .and_then(|(_, p)| p.symbol.clone())
        .unwrap_or_else(|| "This stock".to_string());
    Some(summary.message(&subject))
}

/// Periods ordered by their leading day count ("21_day" before "126_day").
pub fn ordered_periods(
    periods: &BTreeMap<String, RelativeStrength>,
) -> Vec<(&str, &RelativeStrength)> {
    let mut ordered: Vec<(&str, &RelativeStrength)> =
        periods.iter().map(|(k, v)| (k.as_str(), v)).collect();
    ordered.sort_by_key(|(key, _)| (period_days(key).unwrap_or(u32::MAX), key.to_string()));
    ordered
}

fn period_days(key: &str) -> Option<u32> {
    key.split('_').next()?.parse().ok()
}

/// Human label for a relative-strength period key.
pub fn format_period(period: &str) -> String {
    match period {
        "21_day" => "Short-term (21 days)".to_string(),
        "63_day" => "Medium-term (63 days)".to_string(),
        "126_day" => "Long-term (126 days)".to_string(),
        other => other.replacen('_', " ", 1),
    }
}

/// Compact large-number display: 1.23B, 45.60M, or a grouped integer.
pub fn format_large_number(value: Option<f64>) -> String {
    match value {
        None => "N/A".to_string(),
        Some(n) if n == 0.0 || !n.is_finite() => "N/A".to_string(),
        Some(n) if n >= 1_000_000_000.0 => format!("{:.2}B", n / 1_000_000_000.0),
        Some(n) if n >= 1_000_000.0 => format!("{:.2}M", n / 1_000_000.0),
        Some(n) => (n.round() as i64).to_formatted_string(&Locale::en),
    }
}

/// Key statistic display. Absent or "N/A" figures read "Not Available"; currency
/// values get a `$` prefix.
pub fn key_statistic(value: Option<&Figure>, currency: bool) -> String {
    match value {
        Some(figure) if figure.is_available() => {
            let text = figure.to_string();
            if currency && !text.starts_with('$') {
                format!("${}", text)
            } else {
                text
            }
        }
        _ => "Not Available".to_string(),
    }
}

/// Glyph for a detected chart pattern.
pub fn pattern_icon(name: Option<&str>) -> &'static str {
    const ICONS: [(&str, &str); 10] = [
        ("head and shoulders", "👑"),
        ("double top", "🔝🔝"),
        ("double bottom", "⏬⏬"),
        ("triangle", "◢◣"),
        ("wedge", "⊿"),
        ("channel", "‖"),
        ("flag", "🚩"),
        ("cup", "☕"),
        ("island", "🏝️"),
        ("gap", "↕️"),
    ];

    let Some(name) = name else {
        return "📊";
    };
    let name = name.to_lowercase();
    ICONS
        .iter()
        .find(|(needle, _)| name.contains(needle))
        .map(|(_, icon)| *icon)
        .unwrap_or("📊")
}

/// One rendered block of an AI narrative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrativeBlock {
    Heading(String),
    NumberedItem(String),
    Paragraph(String),
}

/// Split narrative text on blank lines and detect headings and numbered items.
pub fn narrative_blocks(text: &str) -> Vec<NarrativeBlock> {
    text.split("\n\n")
        .filter(|block| !block.trim().is_empty())
        .map(|block| {
            if block.starts_with('#') {
                let rest = block.trim_start_matches('#');
                match rest.chars().next() {
                    Some(c) if c.is_whitespace() => {
                        NarrativeBlock::Heading(rest[c.len_utf8()..].to_string())
                    }
                    _ => NarrativeBlock::Heading(block.to_string()),
                }
            } else if is_numbered(block) {
                NarrativeBlock::NumberedItem(block.to_string())
            } else {
                NarrativeBlock::Paragraph(block.to_string())
            }
        })
        .collect()
}

fn is_numbered(block: &str) -> bool {
    let digits = block.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && block[digits..].starts_with('.')
}
