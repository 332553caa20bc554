use std::sync::Arc;

use dispatch_core::db::SyncRegistry;
use dispatch_core::sync::{BackgroundHandler, SyncWorker};
use dispatch_core::{ClientConfig, ConnectivityMonitor};

use crate::commands::common::{connectivity_probe, open_database, synchronizer};
use crate::error::CliError;

pub async fn run_worker(config: &ClientConfig, once: bool) -> Result<(), CliError> {
    let db = open_database(config).await?;
    let registry = SyncRegistry::new(db.clone());
    let sync = Arc::new(synchronizer(config, &db, "worker")?);
    let handler = BackgroundHandler::new(sync, registry.clone(), config.sync_budget);

    let probe = connectivity_probe(config)?;
    let monitor = ConnectivityMonitor::new(probe.check().await);
    let mut worker = SyncWorker::new(handler, registry, monitor.subscribe());

    if once {
        let handled = worker.poll().await?;
        if handled.is_empty() {
            println!("No background sync due");
        }
        for (registration, outcome) in handled {
            println!("{}: {outcome}", registration.tag);
        }
        return Ok(());
    }

    tracing::info!(db = %config.db_path.display(), "Background sync worker started");
    let prober = tokio::spawn(probe.run(monitor.clone(), config.probe_interval));
    tokio::select! {
        () = worker.run(config.probe_interval) => {}
        result = tokio::signal::ctrl_c() => result?,
    }
    prober.abort();
    Ok(())
}
