use std::sync::Arc;

use dispatch_core::{ClientConfig, Connectivity, SubmissionOutcome, Submitter};

use crate::commands::common::{delivery_client, open_database, probe_once, resolve_report_text};
use crate::error::CliError;
use crate::terminal::{connectivity_banner, TerminalPresenter};

pub async fn run_submit(
    config: &ClientConfig,
    text_parts: &[String],
    offline: bool,
) -> Result<SubmissionOutcome, CliError> {
    let text = resolve_report_text(text_parts)?;
    let db = open_database(config).await?;

    let connectivity = if offline {
        Connectivity::Offline
    } else {
        probe_once(config).await?
    };
    if !connectivity.is_online() {
        eprintln!("{}", connectivity_banner(connectivity));
    }

    let submitter = Submitter::new(
        &db,
        delivery_client(config)?,
        Arc::new(TerminalPresenter::new()),
    );
    match submitter.submit(&text, connectivity).await? {
        SubmissionOutcome::Failed(message) => Err(CliError::SubmissionFailed(message)),
        outcome => Ok(outcome),
    }
}
