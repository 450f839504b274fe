//! Batch export of stock details.
//!
//! Plain text for terminals and screen readers, JSON for other tools.

use crate::classify::{
    MaPosture, RsiZone, VolatilityTier, VolumeBand, format_large_number, format_period,
    key_statistic, ordered_periods, pattern_icon, relative_strength_summary,
};
use crate::cli::ExportFormat;
use crate::models::{StockDetail, TechnicalReport};
use anyhow::{Context, Result};
use serde::Serialize;

/// One stock in a batch export.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    #[serde(flatten)]
    pub detail: StockDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical: Option<TechnicalReport>,
    /// Set when the technical reading was requested but could not be fetched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_error: Option<String>,
}

impl Report {
    pub fn new(detail: StockDetail) -> Self {
        Self {
            detail,
            technical: None,
            technical_error: None,
        }
    }
}

/// Export reports in the specified format.
pub fn export_reports(reports: &[Report], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Text => Ok(export_text(reports)),
        ExportFormat::Json => {
            serde_json::to_string_pretty(reports).context("Failed to serialize reports")
        }
    }
}

/// Export as plain text.
fn export_text(reports: &[Report]) -> String {
    let mut output = String::new();

    for report in reports {
        let detail = &report.detail;
        output.push_str(&format!("{} ({})\n", detail.name, detail.symbol));
        output.push_str(&format!(
            "{}\n",
            "=".repeat(detail.name.len() + detail.symbol.len() + 3)
        ));
        output.push_str(&format!("Price: ${:.2}\n", detail.current_price));
        output.push_str(&format!(
            "Change: {:+.2} ({:+.2}%)\n",
            detail.change, detail.percent_change
        ));
        output.push_str(&format!(
            "Market Cap: {}\n",
            key_statistic(detail.market_cap.as_ref(), true)
        ));
        output.push_str(&format!(
            "P/E Ratio: {}\n",
            key_statistic(detail.pe_ratio.as_ref(), false)
        ));
        output.push_str(&format!(
            "52 Week High: {}\n",
            key_statistic(detail.high_52_week.as_ref(), true)
        ));
        output.push_str(&format!(
            "52 Week Low: {}\n",
            key_statistic(detail.low_52_week.as_ref(), true)
        ));
        output.push('\n');
        output.push_str(&format!("{}\n", detail.summary));

        if !detail.reliable_sources.is_empty() {
            output.push_str("\nSources:\n");
            for source in &detail.reliable_sources {
                output.push_str(&format!("  - {}: {}\n", source.name, source.url));
            }
        }

        if !detail.unreliable_sources.is_empty() {
            output.push_str("\nFiltered noise:\n");
            for source in &detail.unreliable_sources {
                output.push_str(&format!("  - {}: {}\n", source.name, source.reason));
            }
        }

        if let Some(technical) = &report.technical {
            output.push_str(&technical_text(technical));
        } else if let Some(error) = &report.technical_error {
            output.push_str(&format!("\nTechnical analysis unavailable: {}\n", error));
        }

        output.push('\n');
    }

    output
}

/// Technical reading with the derived explanations.
fn technical_text(report: &TechnicalReport) -> String {
    let mut output = String::from("\nTechnical Analysis:\n");

    if let Some(snapshot) = &report.technical_analysis {
        if !snapshot.trend.is_empty() {
            output.push_str(&format!("  Trend: {}\n", snapshot.trend));
        }
        if let Some(momentum) = &snapshot.momentum {
            let zone = RsiZone::classify(momentum.rsi);
            output.push_str(&format!("  RSI: {:.2} ({})\n", momentum.rsi, zone.label()));
            output.push_str(&format!("    {}\n", zone.explanation()));
        }
        if let Some(ma) = &snapshot.moving_averages {
            output.push_str(&format!(
                "  vs SMA20/50/200: {:+.2}% / {:+.2}% / {:+.2}%\n",
                ma.price_vs_sma20, ma.price_vs_sma50, ma.price_vs_sma200
            ));
            output.push_str(&format!("    {}\n", MaPosture::classify(ma).explanation()));
        }
        if let Some(volatility) = &snapshot.volatility {
            let tier = VolatilityTier::classify(volatility.atr_percent);
            output.push_str(&format!(
                "  ATR: {:.2} ({:.2}%, {})\n",
                volatility.atr,
                volatility.atr_percent,
                tier.label()
            ));
            output.push_str(&format!("    {}\n", tier.explanation()));
        }
        if let Some(volume) = &snapshot.volume {
            output.push_str(&format!(
                "  Volume: {} (20-day avg {}, ratio {:.2})\n",
                format_large_number(Some(volume.current)),
                format_large_number(Some(volume.average_20_day)),
                volume.ratio
            ));
            output.push_str(&format!(
                "    {}\n",
                VolumeBand::classify(volume.ratio).explanation()
            ));
        }
    }

    if !report.relative_strength.is_empty() {
        output.push_str("  Relative strength vs S&P 500:\n");
        for (period, strength) in ordered_periods(&report.relative_strength) {
            output.push_str(&format!(
                "    {}: {:+.2}% vs {:+.2}%\n",
                format_period(period),
                strength.stock_performance,
                strength.spy_performance
            ));
        }
        if let Some(summary) = relative_strength_summary(&report.relative_strength) {
            output.push_str(&format!("    {}\n", summary));
        }
    }

    for pattern in &report.patterns {
        let name = pattern.name.as_deref().unwrap_or("Unnamed pattern");
        output.push_str(&format!("  {} {}", pattern_icon(pattern.name.as_deref()), name));
        if let Some(confidence) = pattern.confidence {
            output.push_str(&format!(" ({:.0}% confidence)", confidence));
        }
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Momentum, RelativeStrength, TechnicalSnapshot, VolumeStats};
    use crate::store::StockStore;

    fn apple() -> StockDetail {
        StockStore::with_mock_data().get("AAPL").cloned().unwrap()
    }

    fn technical() -> TechnicalReport {
        let mut report = TechnicalReport {
            technical_analysis: Some(TechnicalSnapshot {
                trend: "Uptrend".to_string(),
                momentum: Some(Momentum {
                    rsi: 25.0,
                    rsi_zone: None,
                }),
                volume: Some(VolumeStats {
                    current: 1_500_000.0,
                    average_20_day: 1_000_000.0,
                    ratio: 1.5,
                }),
                ..TechnicalSnapshot::default()
            }),
            ..TechnicalReport::default()
        };
        report.relative_strength.insert(
            "21_day".to_string(),
            RelativeStrength {
                stock_performance: 4.0,
                spy_performance: 1.0,
                outperforming: true,
                relative_strength: 3.0,
                symbol: Some("AAPL".to_string()),
            },
        );
        report
    }

    #[test]
    fn test_export_text() {
        let text = export_reports(&[Report::new(apple())], ExportFormat::Text).unwrap();
        assert!(text.contains("Apple Inc. (AAPL)"));
        assert!(text.contains("Price: $175.34"));
        assert!(text.contains("Market Cap: $"));
        assert!(text.contains("52 Week High: $"));
        assert!(text.contains("Sources:"));
        assert!(!text.contains("Technical Analysis:"));
    }

    #[test]
    fn test_export_text_with_technical() {
        let mut report = Report::new(apple());
        report.technical = Some(technical());
        let text = export_reports(&[report], ExportFormat::Text).unwrap();
        assert!(text.contains("RSI: 25.00 (Oversold)"));
        assert!(text.contains("Short-term (21 days)"));
        assert!(text.contains("AAPL is outperforming the S&P 500 across all time periods"));
        assert!(text.contains("1.50M"));
    }

    #[test]
    fn test_export_text_missing_statistics() {
        let mut detail = apple();
        detail.pe_ratio = None;
        detail.low_52_week = Some("N/A".into());
        let text = export_reports(&[Report::new(detail)], ExportFormat::Text).unwrap();
        assert!(text.contains("P/E Ratio: Not Available"));
        assert!(text.contains("52 Week Low: Not Available"));
    }

    #[test]
    fn test_export_json() {
        let mut report = Report::new(apple());
        report.technical_error = Some("Failed to fetch".to_string());
        let json = export_reports(&[report], ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["symbol"], "AAPL");
        assert_eq!(value[0]["currentPrice"], 175.34);
        assert_eq!(value[0]["technical_error"], "Failed to fetch");
        assert!(value[0].get("technical").is_none());
    }
}
