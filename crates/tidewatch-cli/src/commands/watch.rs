use std::process::ExitCode;
use std::time::Duration;

use tidewatch_core::{IngestService, Settings};
use tracing::info;

use crate::cli::WatchArgs;
use crate::error::CliError;
use crate::output;

use super::feed_key;

/// Polls until Ctrl-C; the service is dropped on every exit path, closing the pool.
pub async fn run(args: &WatchArgs, settings: Settings, pretty: bool) -> Result<ExitCode, CliError> {
    let key = feed_key(&args.feed)?;
    let interval = args
        .interval_secs
        .map(Duration::from_secs)
        .unwrap_or(settings.poll_interval);

    let mut service = IngestService::from_settings(settings);
    let mut reports = service.watch(key.clone(), interval);

    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            signal = &mut interrupted => {
                signal?;
                info!(feed = %key, "interrupted; stopping watch");
                break;
            }
            changed = reports.changed() => {
                if changed.is_err() {
                    break;
                }
                let report = reports.borrow_and_update().clone();
                if let Some(result) = report {
                    output::render(&result, pretty)?;
                }
            }
        }
    }

    service.shutdown();
    Ok(ExitCode::SUCCESS)
}
