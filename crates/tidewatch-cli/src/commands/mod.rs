mod fetch;
mod watch;

use std::process::ExitCode;
use std::time::Duration;

use tidewatch_core::{FeedKey, Settings};

use crate::cli::{Cli, Command, FeedArgs};
use crate::error::CliError;

/// Exit code when the printed record is not live provider data.
const OUTDATED_EXIT_CODE: u8 = 3;

pub async fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    let settings = settings(cli)?;

    match &cli.command {
        Command::Fetch(args) => fetch::run(args, settings, cli.pretty).await,
        Command::Watch(args) => watch::run(args, settings, cli.pretty).await,
    }
}

fn settings(cli: &Cli) -> Result<Settings, CliError> {
    let settings = Settings::from_env()?;
    Ok(match cli.timeout_ms {
        Some(timeout_ms) => settings.with_timeout(Duration::from_millis(timeout_ms)),
        None => settings,
    })
}

fn feed_key(args: &FeedArgs) -> Result<FeedKey, CliError> {
    Ok(FeedKey::new(args.feed, args.selector.as_deref())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidewatch_core::{Feed, ValidationError};

    #[test]
    fn selector_rules_surface_as_validation_errors() {
        let args = FeedArgs {
            feed: Feed::StationObservationById,
            selector: None,
        };

        let error = feed_key(&args).expect_err("station feed needs a selector");

        assert!(matches!(
            error,
            CliError::Validation(ValidationError::MissingSelector { .. })
        ));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn plain_feed_builds_key() {
        let args = FeedArgs {
            feed: Feed::Tsunami,
            selector: None,
        };

        assert_eq!(feed_key(&args).unwrap().to_string(), "tsunami");
    }
}
