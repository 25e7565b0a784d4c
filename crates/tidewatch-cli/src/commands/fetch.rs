use std::process::ExitCode;

use tidewatch_core::{CacheMode, IngestService, Settings};
use tracing::debug;

use crate::cli::FetchArgs;
use crate::error::CliError;
use crate::output;

use super::{feed_key, OUTDATED_EXIT_CODE};

pub async fn run(args: &FetchArgs, settings: Settings, pretty: bool) -> Result<ExitCode, CliError> {
    let key = feed_key(&args.feed)?;
    let mode = if args.refresh {
        CacheMode::Refresh
    } else {
        CacheMode::Use
    };

    let service = IngestService::from_settings(settings);
    let result = service.orchestrator().fetch_feed_with(&key, mode).await;
    service.shutdown();

    debug!(feed = %key, source = result.source.as_str(), "fetch finished");
    output::render(&result, pretty)?;

    if result.is_outdated() {
        return Ok(ExitCode::from(OUTDATED_EXIT_CODE));
    }
    Ok(ExitCode::SUCCESS)
}
