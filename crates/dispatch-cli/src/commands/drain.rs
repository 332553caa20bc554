use dispatch_core::{ClientConfig, DrainOutcome};

use crate::commands::common::{open_database, synchronizer};
use crate::error::CliError;

pub async fn run_drain(config: &ClientConfig) -> Result<DrainOutcome, CliError> {
    let db = open_database(config).await?;
    let sync = synchronizer(config, &db, "manual")?;

    let outcome = sync.drain().await;
    match outcome {
        DrainOutcome::Failed { .. } => Err(CliError::DrainFailed(outcome.to_string())),
        _ => {
            println!("Drain {outcome}");
            Ok(outcome)
        }
    }
}
