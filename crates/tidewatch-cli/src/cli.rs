//! CLI argument definitions for Tidewatch.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fetch` | Fetch one feed once and print the result |
//! | `watch` | Poll one feed and print every new report |
//!
//! # Examples
//!
//! ```bash
//! # Latest significant earthquake report
//! tidewatch fetch seismic-normal --pretty
//!
//! # One weather station, bypassing the cache
//! tidewatch fetch station-observation-by-id --selector 466920 --refresh
//!
//! # Watch Taipei metro alerts every two minutes
//! tidewatch watch transit-status-by-system --selector TRTC --interval-secs 120
//! ```

use clap::{Args, Parser, Subcommand};
use tidewatch_core::Feed;

/// Tidewatch - resilient public-alert feed ingestion
///
/// Fetches seismic, tsunami, weather-station and transit feeds, falling back to cached
/// or placeholder data whenever a provider misbehaves.
#[derive(Debug, Parser)]
#[command(
    name = "tidewatch",
    author,
    version,
    about = "Resilient public-alert feed ingestion",
    long_about = "Tidewatch fetches public seismic, tsunami, weather-station and transit feeds.\n\
\n\
Every command prints a result, even when the provider is down: output is labelled\n\
live, stale or backup. Credentials are read from TIDEWATCH_* environment variables.\n\
\n\
Use 'tidewatch <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Request timeout in milliseconds; overrides TIDEWATCH_TIMEOUT_MS.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch a feed once.
    ///
    /// Exits with code 3 when the printed record is stale or a placeholder.
    ///
    /// # Examples
    ///
    ///   tidewatch fetch seismic-normal
    ///   tidewatch fetch station-observation-by-region --selector 臺北市
    Fetch(FetchArgs),

    /// Poll a feed until interrupted, printing each new report.
    ///
    /// # Examples
    ///
    ///   tidewatch watch tsunami
    ///   tidewatch watch seismic-small-area --interval-secs 60
    Watch(WatchArgs),
}

/// Feed selection shared by every command.
#[derive(Debug, Args)]
pub struct FeedArgs {
    /// Feed name, e.g. seismic-normal or station-observation-by-id.
    pub feed: Feed,

    /// Station id, region name or transit system code, for feeds that take one.
    #[arg(long)]
    pub selector: Option<String>,
}

/// Arguments for the `fetch` command.
#[derive(Debug, Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub feed: FeedArgs,

    /// Skip a fresh cache entry and ask the provider.
    #[arg(long, default_value_t = false)]
    pub refresh: bool,
}

/// Arguments for the `watch` command.
#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub feed: FeedArgs,

    /// Seconds between polls; defaults to TIDEWATCH_POLL_INTERVAL_SECS or 300.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fetch_with_selector() {
        let cli = Cli::parse_from([
            "tidewatch",
            "fetch",
            "station-observation-by-id",
            "--selector",
            "466920",
            "--refresh",
            "--pretty",
        ]);

        assert!(cli.pretty);
        let Command::Fetch(args) = cli.command else {
            panic!("expected fetch command");
        };
        assert_eq!(args.feed.feed, Feed::StationObservationById);
        assert_eq!(args.feed.selector.as_deref(), Some("466920"));
        assert!(args.refresh);
    }

    #[test]
    fn rejects_unknown_feed() {
        let parsed = Cli::try_parse_from(["tidewatch", "fetch", "weather-radar"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn rejects_zero_interval() {
        let parsed = Cli::try_parse_from(["tidewatch", "watch", "tsunami", "--interval-secs", "0"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn command_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
