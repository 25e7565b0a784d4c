use std::io::Write;

use tidewatch_core::FetchResult;

use crate::error::CliError;

/// Writes `result` as JSON to stdout and its notice, if any, to stderr.
pub fn render(result: &FetchResult, pretty: bool) -> Result<(), CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{json}")?;
    stdout.flush()?;

    if let Some(notice) = result.notice() {
        eprintln!("notice ({}): {notice}", result.source.as_str());
    }
    Ok(())
}
