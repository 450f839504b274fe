//! Command-line interface.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Research stocks from the terminal: quotes, technical readings, news and curated sources.
///
/// Without a subcommand the interactive browser starts. `serve` runs the mock REST
/// backend the other commands talk to.
#[derive(Parser, Debug, Clone)]
#[command(name = "stock-researcher")]
#[command(version)]
#[command(about = "Terminal stock research client and mock REST backend", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file path
    #[arg(short = 'c', long, global = true, env = "STOCK_RESEARCHER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Stock API base URL, including the /api prefix
    #[arg(long, global = true, env = "STOCK_RESEARCHER_API_URL")]
    pub api_url: Option<String>,

    /// API timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Verbose output - debug logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Browse stocks interactively (default)
    Browse {
        /// Open the detail page for this symbol
        symbol: Option<String>,

        /// Ask the API for placeholder data when the symbol is unknown
        #[arg(long)]
        use_defaults: bool,
    },

    /// Print stock details and exit
    Show {
        /// Symbols to print
        #[arg(required = true, value_delimiter = ',')]
        symbols: Vec<String>,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: ExportFormat,

        /// Include the technical reading
        #[arg(short = 't', long)]
        technical: bool,
    },

    /// Search for a symbol, or list recent searches
    Search {
        symbol: Option<String>,
    },

    /// Run the REST backend over the built-in stock table
    Serve {
        /// Address to bind
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on
        #[arg(short = 'p', long, env = "PORT")]
        port: Option<u16>,
    },
}

/// Export format for batch output.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ExportFormat {
    /// Plain text format
    Text,
    /// JavaScript Object Notation (JSON)
    Json,
}

impl Args {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// The subcommand to run, `browse` when none was given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Browse {
            symbol: None,
            use_defaults: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = Args::parse_from(["stock-researcher"]);
        assert!(args.command.is_none());
        assert!(!args.verbose);
        assert_eq!(
            args.command(),
            Command::Browse {
                symbol: None,
                use_defaults: false
            }
        );
    }

    #[test]
    fn test_show_symbols_parsing() {
        let args = Args::parse_from(["stock-researcher", "show", "AAPL,MSFT", "AMZN", "-f", "json"]);
        assert_eq!(
            args.command(),
            Command::Show {
                symbols: vec!["AAPL".to_string(), "MSFT".to_string(), "AMZN".to_string()],
                format: ExportFormat::Json,
                technical: false,
            }
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from([
            "stock-researcher",
            "browse",
            "TSLA",
            "--use-defaults",
            "--api-url",
            "http://localhost:5000/api",
            "--timeout",
            "3",
        ]);
        assert_eq!(args.api_url.as_deref(), Some("http://localhost:5000/api"));
        assert_eq!(args.timeout, Some(3));
        assert_eq!(
            args.command(),
            Command::Browse {
                symbol: Some("TSLA".to_string()),
                use_defaults: true
            }
        );
    }

    #[test]
    fn test_serve_port() {
        let args = Args::parse_from(["stock-researcher", "serve", "--port", "8080"]);
        assert!(matches!(args.command(), Command::Serve { port: Some(8080), .. }));
    }

    #[test]
    fn test_show_requires_symbol() {
        assert!(Args::try_parse_from(["stock-researcher", "show"]).is_err());
    }
}
