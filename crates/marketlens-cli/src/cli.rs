//! CLI argument definitions for MarketLens.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `quote` | Quotes through the provider fallback chain |
//! | `news` | Curated market or symbol news |
//! | `recommend` | Scored trade recommendations |
//! | `snapshot` | Analytics snapshot used for scoring |
//! | `sources` | Provider order, quotas and cache TTLs |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings as errors |
//! | `--offline` | `false` | Skip upstream providers entirely |
//! | `--cache` | `use` | Cache mode (use, refresh, bypass) |
//! | `--deadline-ms` | config | Total time budget per resolution |
//!
//! # Examples
//!
//! ```bash
//! marketlens quote RELIANCE TCS --pretty
//! marketlens news reliance
//! marketlens recommend HDFCBANK --format table
//! marketlens --offline --strict recommend INFY
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use marketlens_core::CacheMode;

/// MarketLens - quotes, news and recommendations for Indian equities
#[derive(Debug, Parser)]
#[command(
    name = "marketlens",
    author,
    version,
    about = "Quotes, news and trade recommendations with provider fallback",
    long_about = "MarketLens queries several market data providers in priority order, caches \
results briefly and derives BUY/SELL/HOLD recommendations from a rule-based scoring model.\n\
\n\
When every provider fails the result is synthetic and flagged as such in the output \
metadata.\n\
\n\
Use 'marketlens <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings and errors as failures (exit code 5).
    ///
    /// Synthetic data always produces a warning, so this fails whenever a
    /// provider chain was exhausted.
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Do not contact upstream providers; every value is synthetic.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    /// Configuration file (JSON). Falls back to MARKETLENS_CONFIG.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Cache interaction for this invocation.
    #[arg(long, global = true, value_enum, default_value_t = CacheArg::Use)]
    pub cache: CacheArg,

    /// Total time budget in milliseconds for one resolution across providers.
    #[arg(long, global = true)]
    pub deadline_ms: Option<u64>,

    /// Log line format on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON envelope.
    Json,
    /// Human-readable summary.
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheArg {
    /// Serve fresh cached values, resolve and store on a miss.
    Use,
    /// Always resolve, then store.
    Refresh,
    /// Always resolve, never store.
    Bypass,
}

impl From<CacheArg> for CacheMode {
    fn from(value: CacheArg) -> Self {
        match value {
            CacheArg::Use => Self::Use,
            CacheArg::Refresh => Self::Refresh,
            CacheArg::Bypass => Self::Bypass,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch quotes for one or more symbols.
    ///
    /// # Examples
    ///
    ///   marketlens quote RELIANCE
    ///   marketlens quote TCS INFY --pretty
    Quote(QuoteArgs),

    /// Fetch curated news for the market or a symbol.
    ///
    /// # Examples
    ///
    ///   marketlens news
    ///   marketlens news tcs
    News(NewsArgs),

    /// Score symbols and project trade recommendations.
    ///
    /// # Examples
    ///
    ///   marketlens recommend RELIANCE HDFCBANK
    Recommend(RecommendArgs),

    /// Show the analytics snapshot and rule outcomes for a symbol.
    Snapshot(SnapshotArgs),

    /// List provider order, quotas and cache settings.
    Sources,
}

#[derive(Debug, Args)]
pub struct QuoteArgs {
    /// One or more tickers (e.g. RELIANCE, TCS).
    #[arg(required = true, num_args = 1..)]
    pub symbols: Vec<String>,
}

#[derive(Debug, Args)]
pub struct NewsArgs {
    /// `market` (default) or a ticker.
    #[arg(default_value = "market")]
    pub topic: String,
}

#[derive(Debug, Args)]
pub struct RecommendArgs {
    #[arg(required = true, num_args = 1..)]
    pub symbols: Vec<String>,
}

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    pub symbol: String,
}
