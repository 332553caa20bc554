use std::sync::Arc;

use dispatch_core::presentation::Presenter;
use dispatch_core::sync::{forward_reconnects, DrainCoordinator, DrainTrigger, TriggerSource};
use dispatch_core::{ClientConfig, Connectivity, ConnectivityMonitor, DeliveryClient, Submitter};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use crate::commands::common::{connectivity_probe, delivery_client, open_database, synchronizer};
use crate::error::CliError;
use crate::terminal::TerminalPresenter;

/// Line that requests a drain instead of submitting a report
pub const DRAIN_COMMAND: &str = "/drain";

pub async fn run_foreground(config: &ClientConfig) -> Result<(), CliError> {
    let db = open_database(config).await?;
    let presenter = Arc::new(TerminalPresenter::new());

    let probe = connectivity_probe(config)?;
    let monitor = ConnectivityMonitor::new(probe.check().await);
    presenter.show_connectivity(monitor.current());

    let sync = Arc::new(synchronizer(config, &db, "foreground")?);
    let (coordinator, trigger) = DrainCoordinator::new(sync);
    let coordinator = tokio::spawn(coordinator.run_with(|source, outcome| {
        tracing::info!(%source, "Drain {outcome}");
    }));

    let background = [
        tokio::spawn(forward_reconnects(monitor.subscribe(), trigger.clone())),
        tokio::spawn(show_banners(monitor.subscribe(), presenter.clone())),
        tokio::spawn(probe.run(monitor.clone(), config.probe_interval)),
    ];

    let submitter = Submitter::new(&db, delivery_client(config)?, presenter);
    println!("Type a report and press Enter ({DRAIN_COMMAND} to sync now, Ctrl-D to quit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            result = tokio::signal::ctrl_c() => {
                result?;
                None
            }
        };
        let Some(line) = line else {
            break;
        };
        handle_line(&line, &submitter, &trigger, &monitor).await;
    }

    for task in background {
        task.abort();
    }
    drop(trigger);
    if let Err(error) = coordinator.await {
        tracing::warn!("Drain coordinator ended abnormally: {error}");
    }
    Ok(())
}

async fn handle_line<D: DeliveryClient>(
    line: &str,
    submitter: &Submitter<D>,
    trigger: &DrainTrigger,
    monitor: &ConnectivityMonitor,
) {
    if line.trim() == DRAIN_COMMAND {
        if !trigger.request(TriggerSource::Manual) {
            println!("A drain is already pending");
        }
        return;
    }

    if let Err(error) = submitter.submit(line, monitor.current()).await {
        tracing::warn!("Could not stage report: {error}");
    }
}

async fn show_banners(mut rx: watch::Receiver<Connectivity>, presenter: Arc<TerminalPresenter>) {
    while rx.changed().await.is_ok() {
        let state = *rx.borrow_and_update();
        presenter.show_connectivity(state);
    }
}
