//! Terminal user interface with ratatui.

use crate::api::StockApi;
use crate::app::{App, Screen};
use crate::classify::{
    MaPosture, NarrativeBlock, RsiZone, VolatilityTier, VolumeBand, format_large_number,
    format_period, key_statistic, narrative_blocks, ordered_periods, pattern_icon,
    relative_strength_summary,
};
use crate::models::{AiNarrative, EnhancedMetrics, NewsArticle, StockDetail, TechnicalReport};
use crate::view::{DetailView, PageState, SliceState, Tab};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Tabs, Wrap},
};

/// Colors for the UI.
pub struct UiColors {
    pub gain: Color,
    pub loss: Color,
    pub neutral: Color,
    pub header_bg: Color,
    pub selected_bg: Color,
    pub border: Color,
    pub accent: Color,
}

impl Default for UiColors {
    fn default() -> Self {
        Self {
            gain: Color::Green,
            loss: Color::Red,
            neutral: Color::White,
            header_bg: Color::DarkGray,
            selected_bg: Color::Rgb(40, 40, 60),
            border: Color::DarkGray,
            accent: Color::Cyan,
        }
    }
}

impl UiColors {
    fn change(&self, value: f64) -> Color {
        if value > 0.0 {
            self.gain
        } else if value < 0.0 {
            self.loss
        } else {
            self.neutral
        }
    }
}

/// Render the main UI.
pub fn render<A: StockApi + 'static>(frame: &mut Frame, app: &App<A>) {
    let colors = UiColors::default();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Body
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0], &colors);

    match app.screen {
        Screen::Home => render_home(frame, app, chunks[1], &colors),
        Screen::Search => render_search(frame, app, chunks[1], &colors),
        Screen::Detail => match &app.detail {
            Some(view) => render_detail(frame, view, app.scroll, chunks[1], &colors),
            None => render_home(frame, app, chunks[1], &colors),
        },
    }

    render_footer(frame, app, chunks[2], &colors);

    if app.show_help {
        render_help_overlay(frame, &colors);
    }

    if let Some(ref error) = app.error {
        render_error(frame, error, &colors);
    }
}

fn render_header<A: StockApi + 'static>(frame: &mut Frame, app: &App<A>, area: Rect, colors: &UiColors) {
    let subtitle = match app.screen {
        Screen::Home => format!(
            "- {} stocks  Updated: {}",
            app.stocks.len(),
            app.time_since_refresh()
        ),
        Screen::Search => "- Search".to_string(),
        Screen::Detail => match &app.detail {
            Some(view) if view.use_defaults => format!("- {} (default data)", view.symbol),
            Some(view) => format!("- {}", view.symbol),
            None => String::new(),
        },
    };

    let header = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(
                "STOCK RESEARCHER ",
                Style::default()
                    .fg(colors.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(subtitle),
        ]),
        Line::from(Span::styled(
            "Research stocks with reliable sources, technical readings and news",
            Style::default().fg(Color::Gray),
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(colors.border)),
    );

    frame.render_widget(header, area);
}

/// Home screen: the stock table.
fn render_home<A: StockApi + 'static>(frame: &mut Frame, app: &App<A>, area: Rect, colors: &UiColors) {
    if app.stocks.is_empty() {
        let text = if app.stocks_loading {
            "Loading stocks..."
        } else {
            "No stocks loaded. Press r to refresh or / to search."
        };
        frame.render_widget(Paragraph::new(text), area);
        return;
    }

    let header_cells = ["SYMBOL", "NAME", "PRICE", "CHANGE", "CHG%"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::White)));
    let header = Row::new(header_cells)
        .style(Style::default().bg(colors.header_bg))
        .height(1);

    let rows = app.stocks.iter().enumerate().map(|(i, stock)| {
        let change_color = colors.change(stock.change);
        let row_style = if i == app.selected {
            Style::default().bg(colors.selected_bg)
        } else {
            Style::default()
        };

        Row::new(vec![
            Cell::from(stock.symbol.clone()),
            Cell::from(truncate_string(&stock.name, 28)),
            Cell::from(format_price(stock.current_price)),
            Cell::from(format!("{:+.2}", stock.change)).style(Style::default().fg(change_color)),
            Cell::from(format!("{:+.2}%", stock.percent_change))
                .style(Style::default().fg(change_color)),
        ])
        .style(row_style)
    });

    let widths = [
        Constraint::Length(10),
        Constraint::Length(30),
        Constraint::Length(12),
        Constraint::Length(10),
        Constraint::Length(10),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::NONE))
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = TableState::default();
    state.select(Some(app.selected));

    frame.render_stateful_widget(table, area, &mut state);
}

/// Search screen: input box, status line and results or recent searches.
fn render_search<A: StockApi + 'static>(frame: &mut Frame, app: &App<A>, area: Rect, colors: &UiColors) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Min(3),
        ])
        .split(area);

    let typing = app.search_selected.is_none();
    let input = Paragraph::new(Line::from(vec![
        Span::raw(app.search.input.clone()),
        Span::styled(
            if typing { "_" } else { "" },
            Style::default().add_modifier(Modifier::SLOW_BLINK),
        ),
    ]))
    .block(
        Block::default()
            .title(" Enter stock symbol (e.g., AAPL, MSFT, AMZN) ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if typing { colors.accent } else { colors.border })),
    );
    frame.render_widget(input, chunks[0]);

    let status = if app.search.loading {
        Line::from("Searching...")
    } else if let Some(error) = &app.search.error {
        let mut spans = vec![Span::styled(
            error.message.clone(),
            Style::default().fg(colors.loss),
        )];
        if error.use_defaults {
            spans.push(Span::styled(
                "  [Ctrl+D] Use Default Data",
                Style::default().fg(Color::Yellow),
            ));
        }
        Line::from(spans)
    } else if app.search.no_results() {
        Line::from(format!(
            "No results found for \"{}\"",
            app.search.query().unwrap_or_default()
        ))
    } else {
        Line::from("")
    };
    frame.render_widget(Paragraph::new(status).wrap(Wrap { trim: true }), chunks[1]);

    let title = if app.search.searched {
        " Results "
    } else {
        " Recent Searches "
    };
    let lines: Vec<Line> = app
        .search_items()
        .into_iter()
        .enumerate()
        .map(|(i, (symbol, name))| {
            let style = if app.search_selected == Some(i) {
                Style::default().bg(colors.selected_bg).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(format!("{:<8}", symbol), style.fg(colors.accent)),
                Span::styled(truncate_string(&name, 40), style),
            ])
        })
        .collect();

    let list = Paragraph::new(lines).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors.border)),
    );
    frame.render_widget(list, chunks[2]);
}

/// Detail screen: quote header, tab bar and the active tab's body.
fn render_detail(frame: &mut Frame, view: &DetailView, scroll: u16, area: Rect, colors: &UiColors) {
    let detail = match &view.page {
        PageState::Loading => {
            frame.render_widget(Paragraph::new("Loading stock details..."), area);
            return;
        }
        PageState::Failed(message) => {
            let text = vec![
                Line::from(Span::styled(message.clone(), Style::default().fg(colors.loss))),
                Line::from(""),
                Line::from("Press r to retry or Esc to go back."),
            ];
            frame.render_widget(Paragraph::new(text), area);
            return;
        }
        PageState::Loaded(detail) => detail,
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Min(5),
        ])
        .split(area);

    render_quote(frame, detail, chunks[0], colors);

    let titles: Vec<String> = Tab::ALL
        .iter()
        .enumerate()
        .map(|(i, tab)| format!("{} {}", i + 1, tab.title()))
        .collect();
    let tabs = Tabs::new(titles)
        .select(view.active_tab.index())
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(colors.border)),
        );
    frame.render_widget(tabs, chunks[1]);

    let body = tab_lines(view, detail, colors);
    let paragraph = Paragraph::new(body)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(paragraph, chunks[2]);
}

fn render_quote(frame: &mut Frame, detail: &StockDetail, area: Rect, colors: &UiColors) {
    let change_color = colors.change(detail.change);
    let text = vec![
        Line::from(vec![
            Span::styled(
                format!("{} ", detail.name),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("({})", detail.symbol), Style::default().fg(colors.accent)),
        ]),
        Line::from(vec![
            Span::styled(
                format!("{}  ", format_price(detail.current_price)),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{:+.2} ({:+.2}%)", detail.change, detail.percent_change),
                Style::default().fg(change_color),
            ),
        ]),
    ];
    frame.render_widget(Paragraph::new(text), area);
}

fn tab_lines(view: &DetailView, detail: &StockDetail, colors: &UiColors) -> Vec<Line<'static>> {
    match view.active_tab {
        Tab::Summary => {
            let mut lines = summary_lines(detail);
            lines.push(Line::from(""));
            lines.extend(slice_lines(&view.enhanced, "enhanced metrics", colors, |m| {
                metrics_lines(m, colors)
            }));
            lines
        }
        Tab::AnalystSources => analyst_lines(detail),
        Tab::Technical => slice_lines(&view.technical, "technical analysis", colors, |t| {
            technical_lines(t, colors)
        }),
        Tab::News => slice_lines(&view.news, "news", colors, |n| news_lines(n, colors)),
        Tab::Sources => source_lines(detail, colors),
        Tab::FilteredNoise => noise_lines(detail, colors),
        Tab::AiAnalysis => slice_lines(&view.ai, "AI analysis", colors, |a| ai_lines(a, colors)),
    }
}

fn slice_lines<T>(
    state: &SliceState<T>,
    what: &str,
    colors: &UiColors,
    loaded: impl FnOnce(&T) -> Vec<Line<'static>>,
) -> Vec<Line<'static>> {
    match state {
        SliceState::Idle => Vec::new(),
        SliceState::Loading(_) => vec![Line::from(format!("Loading {}...", what))],
        SliceState::Errored(message) => vec![
            Line::from(Span::styled(message.clone(), Style::default().fg(colors.loss))),
            Line::from("Press r to retry."),
        ],
        SliceState::Loaded(value) => loaded(value),
    }
}

fn heading(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
    ))
}

fn field(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<22}", label), Style::default().fg(Color::Gray)),
        Span::raw(value),
    ])
}

fn explanation(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        format!("  {}", text),
        Style::default().add_modifier(Modifier::ITALIC),
    ))
}

fn summary_lines(detail: &StockDetail) -> Vec<Line<'static>> {
    let mut lines = vec![
        heading("Key Statistics"),
        field("Market Cap", key_statistic(detail.market_cap.as_ref(), true)),
        field("P/E Ratio", key_statistic(detail.pe_ratio.as_ref(), false)),
        field("52 Week High", key_statistic(detail.high_52_week.as_ref(), true)),
        field("52 Week Low", key_statistic(detail.low_52_week.as_ref(), true)),
    ];
    if let Some(source) = &detail.data_source {
        lines.push(field("Data Source", source.clone()));
    }
    lines.push(Line::from(""));
    lines.push(heading("Summary"));
    lines.push(Line::from(detail.summary.clone()));
    lines
}

fn metrics_lines(metrics: &EnhancedMetrics, colors: &UiColors) -> Vec<Line<'static>> {
    let mut lines = vec![
        heading("Risk Metrics"),
        field("Daily Volatility", format!("{}%", metrics.volatility.daily)),
        field("Annualized Volatility", format!("{}%", metrics.volatility.annualized)),
        field("Max Drawdown", format!("{}%", metrics.volatility.max_drawdown)),
        field("S&P 500 Correlation", metrics.spy_correlation.to_string()),
        Line::from(""),
        heading("Market Metrics"),
        field("Beta", metrics.market_metrics.beta.to_string()),
        field("Forward P/E", metrics.market_metrics.forward_pe.to_string()),
        field("Price/Sales", metrics.market_metrics.price_to_sales_ratio.to_string()),
        field("Price/Book", metrics.market_metrics.price_to_book_ratio.to_string()),
    ];

    if let Some(dividend) = metrics
        .market_metrics
        .dividend
        .as_ref()
        .filter(|d| d.is_paying())
    {
        lines.push(field("Dividend Yield", format!("{}%", dividend.dividend_yield)));
        lines.push(field("Dividend/Share", format!("${}", dividend.per_share)));
        lines.push(field("Payout Ratio", format!("{}%", dividend.payout_ratio)));
        lines.push(field("Ex-Dividend Date", dividend.date.to_string()));
    }

    let levels = &metrics.price_levels;
    lines.push(Line::from(""));
    lines.push(heading("Price Levels"));
    lines.push(Line::from(vec![
        Span::styled(format!("{:<22}", "Resistance"), Style::default().fg(Color::Gray)),
        Span::styled(
            format!("${} / ${}", levels.resistance.strong, levels.resistance.weak),
            Style::default().fg(colors.loss),
        ),
    ]));
    lines.push(field("Current", format!("${}", levels.current)));
    lines.push(Line::from(vec![
        Span::styled(format!("{:<22}", "Support"), Style::default().fg(Color::Gray)),
        Span::styled(
            format!("${} / ${}", levels.support.weak, levels.support.strong),
            Style::default().fg(colors.gain),
        ),
    ]));
    lines
}

fn technical_lines(report: &TechnicalReport, colors: &UiColors) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if let Some(snapshot) = &report.technical_analysis {
        lines.push(heading("Technical Indicators"));
        if !snapshot.trend.is_empty() {
            lines.push(field("Trend", snapshot.trend.clone()));
        }
        if let Some(momentum) = &snapshot.momentum {
            let zone = RsiZone::classify(momentum.rsi);
            lines.push(field("RSI (14)", format!("{:.2} ({})", momentum.rsi, zone.label())));
            lines.push(explanation(zone.explanation()));
        }
        if let Some(ma) = &snapshot.moving_averages {
            lines.push(field("Price vs SMA20", format!("{:+.2}%", ma.price_vs_sma20)));
            lines.push(field("Price vs SMA50", format!("{:+.2}%", ma.price_vs_sma50)));
            lines.push(field("Price vs SMA200", format!("{:+.2}%", ma.price_vs_sma200)));
            lines.push(explanation(MaPosture::classify(ma).explanation()));
        }
        if let Some(volatility) = &snapshot.volatility {
            let tier = VolatilityTier::classify(volatility.atr_percent);
            lines.push(field(
                "ATR",
                format!(
                    "{:.2} ({:.2}% of price, {} volatility)",
                    volatility.atr,
                    volatility.atr_percent,
                    tier.label()
                ),
            ));
            lines.push(explanation(tier.explanation()));
        }
        if let Some(volume) = &snapshot.volume {
            lines.push(field("Volume", format_large_number(Some(volume.current))));
            lines.push(field("20-Day Avg Volume", format_large_number(Some(volume.average_20_day))));
            lines.push(field("Volume Ratio", format!("{:.2}x", volume.ratio)));
            lines.push(explanation(VolumeBand::classify(volume.ratio).explanation()));
        }
        lines.push(Line::from(""));
    }

    if !report.relative_strength.is_empty() {
        lines.push(heading("Relative Strength vs S&P 500"));
        for (period, strength) in ordered_periods(&report.relative_strength) {
            let color = if strength.outperforming {
                colors.gain
            } else {
                colors.loss
            };
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{:<24}", format_period(period)),
                    Style::default().fg(Color::Gray),
                ),
                Span::raw(format!(
                    "{:+.2}% vs SPY {:+.2}%  ",
                    strength.stock_performance, strength.spy_performance
                )),
                Span::styled(
                    if strength.outperforming {
                        "Outperforming"
                    } else {
                        "Underperforming"
                    },
                    Style::default().fg(color),
                ),
            ]));
        }
        if let Some(summary) = relative_strength_summary(&report.relative_strength) {
            lines.push(explanation(&summary));
        }
        lines.push(Line::from(""));
    }

    if !report.patterns.is_empty() {
        lines.push(heading("Chart Patterns"));
        for pattern in &report.patterns {
            let mut text = format!(
                "{} {}",
                pattern_icon(pattern.name.as_deref()),
                pattern.name.as_deref().unwrap_or("Unnamed pattern")
            );
            if let Some(confidence) = pattern.confidence {
                text.push_str(&format!("  {:.0}% confidence", confidence));
            }
            if let Some(target) = pattern.price_target.as_ref().filter(|t| t.is_available()) {
                text.push_str(&format!("  target ${}", target));
            }
            lines.push(Line::from(text));
        }
    }

    if lines.is_empty() {
        lines.push(Line::from("No technical analysis available."));
    }
    lines
}

fn news_lines(articles: &[NewsArticle], colors: &UiColors) -> Vec<Line<'static>> {
    if articles.is_empty() {
        return vec![Line::from("No recent news available.")];
    }

    let mut lines = Vec::new();
    for article in articles {
        lines.push(Line::from(Span::styled(
            article.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            format!("{} | {}", article.source, article.date),
            Style::default().fg(Color::Gray),
        )));
        lines.push(Line::from(Span::styled(
            article.url.clone(),
            Style::default().fg(colors.accent),
        )));
        lines.push(Line::from(""));
    }
    lines
}

fn analyst_lines(detail: &StockDetail) -> Vec<Line<'static>> {
    let mut lines = vec![
        heading("Analyst Views"),
        Line::from(format!(
            "Coverage of {} from sources rated for reliability:",
            detail.name
        )),
        Line::from(""),
    ];
    if detail.reliable_sources.is_empty() {
        lines.push(Line::from("No analyst sources available."));
    }
    for source in &detail.reliable_sources {
        let rating = source.reliability.as_deref().unwrap_or("unrated");
        lines.push(field(&source.name, format!("reliability: {}", rating)));
    }
    lines
}

fn source_lines(detail: &StockDetail, colors: &UiColors) -> Vec<Line<'static>> {
    let mut lines = vec![heading("Reliable Sources")];
    if detail.reliable_sources.is_empty() {
        lines.push(Line::from("No reliable sources available."));
    }
    for source in &detail.reliable_sources {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<22}", source.name),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(source.url.clone(), Style::default().fg(colors.accent)),
        ]));
    }
    lines
}

fn noise_lines(detail: &StockDetail, colors: &UiColors) -> Vec<Line<'static>> {
    let mut lines = vec![
        heading("Filtered Noise"),
        Line::from("Sources excluded from this research and why:"),
        Line::from(""),
    ];
    if detail.unreliable_sources.is_empty() {
        lines.push(Line::from("Nothing filtered."));
    }
    for source in &detail.unreliable_sources {
        lines.push(Line::from(vec![
            Span::styled(format!("{:<22}", source.name), Style::default().fg(colors.loss)),
            Span::raw(source.reason.clone()),
        ]));
    }
    lines
}

const AI_DISCLAIMER: &str = "This analysis is generated by AI and should not be considered financial advice. \
Always do your own research before making investment decisions.";

fn ai_lines(narrative: &AiNarrative, colors: &UiColors) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for block in narrative_blocks(&narrative.analysis) {
        match block {
            NarrativeBlock::Heading(text) => lines.push(Line::from(Span::styled(
                text,
                Style::default()
                    .fg(colors.accent)
                    .add_modifier(Modifier::BOLD),
            ))),
            NarrativeBlock::NumberedItem(text) => lines.push(Line::from(format!("  {}", text))),
            NarrativeBlock::Paragraph(text) => {
                lines.extend(text.lines().map(|l| Line::from(l.to_string())))
            }
        }
        lines.push(Line::from(""));
    }
    if let Some(timestamp) = &narrative.timestamp {
        lines.push(Line::from(Span::styled(
            format!("Generated {}", timestamp),
            Style::default().fg(Color::Gray),
        )));
    }
    lines.push(Line::from(Span::styled(
        AI_DISCLAIMER,
        Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::ITALIC),
    )));
    lines
}

fn render_footer<A: StockApi + 'static>(frame: &mut Frame, app: &App<A>, area: Rect, colors: &UiColors) {
    let keys: &[(&str, &str)] = match app.screen {
        Screen::Home => &[
            ("q", "quit"),
            ("?", "help"),
            ("/", "search"),
            ("Enter", "details"),
            ("r", "refresh"),
        ],
        Screen::Search => &[
            ("Esc", "back"),
            ("Enter", "search/open"),
            ("↓↑", "select"),
            ("Ctrl+D", "default data"),
        ],
        Screen::Detail => &[
            ("Esc", "back"),
            ("←→", "tabs"),
            ("1-7", "jump"),
            ("↓↑", "scroll"),
            ("r", "retry"),
            ("q", "quit"),
        ],
    };

    let mut spans = Vec::new();
    for (key, action) in keys {
        spans.push(Span::styled(format!(" {}", key), Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(format!(":{}", action)));
    }

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(colors.header_bg));
    frame.render_widget(footer, area);
}

fn render_help_overlay(frame: &mut Frame, colors: &UiColors) {
    let area = centered_rect(60, 70, frame.area());

    let help_text = vec![
        Line::from(Span::styled(
            "STOCK RESEARCHER HELP",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Home:"),
        Line::from("  ↑/k ↓/j   Move selection"),
        Line::from("  Enter     Open stock details"),
        Line::from("  / or s    Search"),
        Line::from("  r         Refresh list"),
        Line::from(""),
        Line::from("Search:"),
        Line::from("  Enter     Search, or open the highlighted entry"),
        Line::from("  ↓/↑       Highlight results or recent searches"),
        Line::from("  Ctrl+D    Use default data after a rate limit"),
        Line::from(""),
        Line::from("Details:"),
        Line::from("  ←/→ Tab   Switch tabs"),
        Line::from("  1-7       Jump to tab"),
        Line::from("  ↑/↓       Scroll"),
        Line::from("  r         Retry a failed load"),
        Line::from(""),
        Line::from("  Esc       Back"),
        Line::from("  q         Quit"),
        Line::from(""),
        Line::from("Press any key to close"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors.border)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(Clear, area);
    frame.render_widget(help, area);
}

fn render_error(frame: &mut Frame, error: &str, colors: &UiColors) {
    let area = centered_rect(50, 20, frame.area());

    let error_widget = Paragraph::new(error)
        .block(
            Block::default()
                .title(" Error ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors.loss)),
        )
        .style(Style::default().fg(colors.loss))
        .wrap(Wrap { trim: true });

    frame.render_widget(Clear, area);
    frame.render_widget(error_widget, area);
}

/// Create a centered rectangle.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Format price with two decimals, more below one dollar.
fn format_price(price: f64) -> String {
    if price >= 1.0 || price == 0.0 {
        format!("${:.2}", price)
    } else {
        format!("${:.4}", price)
    }
}

/// Truncate string to max length.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        ".".repeat(max_len)
    } else {
        let mut end = max_len.saturating_sub(3);
        while !s.is_char_boundary(end) && end > 0 {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Figure, Momentum, TechnicalSnapshot};
    use crate::normalize::{RawDetail, normalize};

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Apple Inc.", 20), "Apple Inc.");
        assert_eq!(truncate_string("Amazon.com, Inc.", 10), "Amazon....");
        assert_eq!(truncate_string("abc", 2), "..");
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(175.34), "$175.34");
        assert_eq!(format_price(0.0), "$0.00");
        assert_eq!(format_price(0.1234), "$0.1234");
    }

    #[test]
    fn test_key_statistics() {
        let detail = normalize(RawDetail {
            symbol: "AAPL".to_string(),
            name: "Apple Inc.".to_string(),
            market_cap: Some(Figure::from("2.7T")),
            pe_ratio: Some(Figure::from("N/A")),
            week_52_high: Some(Figure::from("182.94")),
            ..RawDetail::default()
        });
        let text: Vec<String> = summary_lines(&detail).iter().map(|l| l.to_string()).collect();
        assert!(text.iter().any(|l| l.starts_with("Market Cap") && l.ends_with("$2.7T")));
        assert!(text.iter().any(|l| l.starts_with("P/E Ratio") && l.ends_with("Not Available")));
        assert!(text.iter().any(|l| l.starts_with("52 Week High") && l.ends_with("$182.94")));
        assert!(text.iter().any(|l| l.starts_with("52 Week Low") && l.ends_with("Not Available")));
    }

    #[test]
    fn test_ai_lines_end_with_disclaimer() {
        let narrative = AiNarrative {
            analysis: "Outlook\n\nSteady growth.".to_string(),
            timestamp: None,
        };
        let lines = ai_lines(&narrative, &UiColors::default());
        assert_eq!(lines.last().map(|l| l.to_string()).as_deref(), Some(AI_DISCLAIMER));
        assert!(lines.iter().any(|l| l.to_string() == "Steady growth."));
    }

    #[test]
    fn test_technical_lines_include_explanations() {
        let report = TechnicalReport {
            technical_analysis: Some(TechnicalSnapshot {
                momentum: Some(Momentum {
                    rsi: 75.0,
                    rsi_zone: None,
                }),
                ..TechnicalSnapshot::default()
            }),
            ..TechnicalReport::default()
        };
        let text: String = technical_lines(&report, &UiColors::default())
            .iter()
            .map(|line| line.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        assert!(text.contains("75.00 (Overbought)"));
        assert!(text.contains(RsiZone::Overbought.explanation()));
    }

    #[test]
    fn test_summary_tab_shows_slice_state() {
        let detail = normalize(RawDetail {
            symbol: "AAPL".to_string(),
            name: "Apple Inc.".to_string(),
            ..RawDetail::default()
        });
        let mut view = DetailView::new("AAPL", false);
        view.page_loaded(Ok(detail.clone()));

        let text: Vec<String> = tab_lines(&view, &detail, &UiColors::default())
            .iter()
            .map(|line| line.to_string())
            .collect();
        assert!(text.iter().any(|l| l == "Loading enhanced metrics..."));
        assert!(text.iter().any(|l| l.contains("Apple Inc. (AAPL) is currently trading at $0")));
    }
}
