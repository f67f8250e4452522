//! CLI argument definitions for Voltick.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `spot` | Fetch the latest spot quote for a symbol |
//! | `chain` | Fetch an option chain |
//! | `hv` | Estimate historical (realized) volatility |
//! | `price` | Price a vanilla option and report Greeks |
//! | `iv` | Solve implied volatility from an observed price |
//! | `strategy` | Evaluate a multi-leg strategy from a JSON file |
//! | `sources` | List provider capabilities and health |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings as errors |
//! | `--providers` | yahoo,polygon,alpaca | Ordered provider fallback chain |
//! | `--offline` | `false` | Deterministic synthetic data, no network |
//! | `--no-cache` | `false` | Bypass the response cache |
//! | `--timeout-ms` | `3000` | Overall request deadline in ms |
//!
//! # Examples
//!
//! ```bash
//! # Fetch a spot quote
//! voltick spot AAPL
//!
//! # Price a call with explicit market inputs (no network)
//! voltick price AAPL --strike 200 --expiry 2027-01-15 --type call \
//!     --spot 195 --vol 0.24
//!
//! # Solve implied volatility from a traded premium
//! voltick iv AAPL --strike 200 --expiry 2027-01-15 --type call --price 14.2
//!
//! # Evaluate a strategy definition
//! voltick strategy straddle.json --grid-min 50 --grid-max 150
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Voltick - options pricing and market data CLI
///
/// Prices vanilla European options, solves implied volatility, and
/// evaluates multi-leg strategies against market data fetched from
/// Yahoo Finance, Polygon, or Alpaca with ordered fallback.
#[derive(Debug, Parser)]
#[command(
    name = "voltick",
    author,
    version,
    about = "Options pricing and market data CLI",
    long_about = "Voltick prices vanilla European options and evaluates option strategies \
against live or explicitly supplied market data. Features include:\n\
\n\
  • Black-Scholes pricing with full Greeks\n\
  • Implied-volatility solving with convergence diagnostics\n\
  • Multi-provider market data (Yahoo, Polygon, Alpaca) with fallback\n\
  • Strategy payoff curves, breakevens, and net Greeks\n\
  • Structured JSON output with metadata\n\
\n\
Use 'voltick <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Output format for results.
    ///
    /// - json: Single JSON envelope (default)
    /// - table: Human-readable terminal output
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings and errors as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Ordered provider fallback chain.
    ///
    /// Comma-separated; the first provider that succeeds wins.
    #[arg(long, global = true, value_enum, value_delimiter = ',')]
    pub providers: Option<Vec<ProviderSelector>>,

    /// Use deterministic synthetic market data instead of the network.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    /// Bypass the response cache for this invocation.
    #[arg(long, global = true, default_value_t = false)]
    pub no_cache: bool,

    /// Overall request deadline in milliseconds.
    #[arg(long, global = true, default_value_t = 3000)]
    pub timeout_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable terminal output.
    Table,
    /// Single JSON envelope.
    Json,
}

/// Provider selection for the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderSelector {
    /// Yahoo Finance (no credentials required).
    Yahoo,
    /// Polygon.io (POLYGON_API_KEY).
    Polygon,
    /// Alpaca paper trading (ALPACA_PAPER_API_KEY / ALPACA_PAPER_SECRET_KEY).
    Alpaca,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the latest spot quote for a symbol.
    ///
    /// # Examples
    ///
    ///   voltick spot AAPL
    ///   voltick spot MSFT --providers polygon,yahoo --pretty
    Spot(SpotArgs),

    /// Fetch an option chain for a symbol.
    ///
    /// Without --expiry, the nearest listed expiry is returned.
    ///
    /// # Examples
    ///
    ///   voltick chain AAPL
    ///   voltick chain AAPL --expiry 2027-01-15
    Chain(ChainArgs),

    /// Estimate annualized historical volatility from daily closes.
    ///
    /// # Examples
    ///
    ///   voltick hv AAPL
    ///   voltick hv AAPL --window 90
    Hv(HvArgs),

    /// Price a vanilla European option and report Greeks.
    ///
    /// Market inputs come from the provider chain unless supplied
    /// explicitly; --spot switches to fully manual inputs.
    ///
    /// # Examples
    ///
    ///   voltick price AAPL --strike 200 --expiry 2027-01-15 --type call
    ///   voltick price AAPL --strike 200 --expiry 2027-01-15 --type put \
    ///       --spot 195 --rate 0.05 --vol 0.24
    Price(PriceArgs),

    /// Solve the implied volatility that reprices an observed premium.
    ///
    /// # Examples
    ///
    ///   voltick iv AAPL --strike 200 --expiry 2027-01-15 --type call --price 14.2
    Iv(IvArgs),

    /// Evaluate a multi-leg strategy from a JSON definition file.
    ///
    /// The file holds legs (option or underlying, direction, quantity)
    /// and the net entry cost. Output includes the expiry payoff curve,
    /// breakevens, net Greeks, and max gain/loss.
    ///
    /// # Examples
    ///
    ///   voltick strategy straddle.json
    ///   voltick strategy collar.json --grid-min 80 --grid-max 120 --grid-steps 200
    Strategy(StrategyArgs),

    /// List provider capabilities and health.
    Sources(SourcesArgs),
}

/// Arguments for the `spot` command.
#[derive(Debug, Args)]
pub struct SpotArgs {
    /// Market symbol (e.g., AAPL).
    pub symbol: String,
}

/// Arguments for the `chain` command.
#[derive(Debug, Args)]
pub struct ChainArgs {
    /// Underlying symbol.
    pub symbol: String,

    /// Expiry date (YYYY-MM-DD). Defaults to the nearest listed expiry.
    #[arg(long)]
    pub expiry: Option<String>,
}

/// Arguments for the `hv` command.
#[derive(Debug, Args)]
pub struct HvArgs {
    /// Underlying symbol.
    pub symbol: String,

    /// Lookback window in trading days (2-730).
    #[arg(long, default_value_t = 30)]
    pub window: u32,
}

/// Explicit market inputs shared by `price` and `iv`.
///
/// Supplying --spot switches to fully manual mode (no network); the
/// remaining fields then default to rate 0.05, yield 0, vol 0. Without
/// --spot, the quote is fetched and any supplied field overrides it.
#[derive(Debug, Args)]
pub struct QuoteOverrideArgs {
    /// Underlying spot price (enables manual mode).
    #[arg(long)]
    pub spot: Option<f64>,

    /// Continuously compounded risk-free rate (e.g., 0.05).
    #[arg(long)]
    pub rate: Option<f64>,

    /// Continuous dividend yield (e.g., 0.01).
    #[arg(long = "yield")]
    pub dividend_yield: Option<f64>,

    /// Annualized volatility (e.g., 0.25).
    #[arg(long)]
    pub vol: Option<f64>,
}

/// Arguments for the `price` command.
#[derive(Debug, Args)]
pub struct PriceArgs {
    /// Underlying symbol.
    pub symbol: String,

    /// Strike price.
    #[arg(long)]
    pub strike: f64,

    /// Expiry date (YYYY-MM-DD).
    #[arg(long)]
    pub expiry: String,

    /// Option type: call or put.
    #[arg(long = "type")]
    pub option_type: String,

    #[command(flatten)]
    pub quote: QuoteOverrideArgs,
}

/// Arguments for the `iv` command.
#[derive(Debug, Args)]
pub struct IvArgs {
    /// Underlying symbol.
    pub symbol: String,

    /// Strike price.
    #[arg(long)]
    pub strike: f64,

    /// Expiry date (YYYY-MM-DD).
    #[arg(long)]
    pub expiry: String,

    /// Option type: call or put.
    #[arg(long = "type")]
    pub option_type: String,

    /// Observed option premium to invert.
    #[arg(long)]
    pub price: f64,

    #[command(flatten)]
    pub quote: QuoteOverrideArgs,
}

/// Arguments for the `strategy` command.
#[derive(Debug, Args)]
pub struct StrategyArgs {
    /// Path to the JSON strategy definition.
    pub file: std::path::PathBuf,

    /// Lower edge of the payoff price grid. Defaults to 0.5 x spot.
    #[arg(long)]
    pub grid_min: Option<f64>,

    /// Upper edge of the payoff price grid. Defaults to 1.5 x spot.
    #[arg(long)]
    pub grid_max: Option<f64>,

    /// Number of grid intervals.
    #[arg(long, default_value_t = 100)]
    pub grid_steps: usize,

    #[command(flatten)]
    pub quote: QuoteOverrideArgs,
}

/// Arguments for the `sources` command.
#[derive(Debug, Args)]
pub struct SourcesArgs {
    /// Include the full capability matrix per provider.
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
}
