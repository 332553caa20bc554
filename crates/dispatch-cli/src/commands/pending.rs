use dispatch_core::db::QueueStore;
use dispatch_core::ClientConfig;

use crate::commands::common::{format_pending_lines, open_database, pending_to_list_item};
use crate::error::CliError;

pub async fn run_pending(config: &ClientConfig, as_json: bool) -> Result<(), CliError> {
    let queue = QueueStore::new(open_database(config).await?);
    let items = queue.list_all().await?;

    if as_json {
        let json_items = items.iter().map(pending_to_list_item).collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if items.is_empty() {
        println!("No pending reports");
    } else {
        for line in format_pending_lines(&items) {
            println!("{line}");
        }
    }

    Ok(())
}
