use clap::Parser;
use dispatch_core::db::{Database, QueueStore, SyncRegistry, SYNC_TAG};
use dispatch_core::{ClientConfig, Connectivity, DrainOutcome, QueueItem, SubmissionOutcome};
use pretty_assertions::assert_eq;
use tempfile::{tempdir, TempDir};

use crate::cli::{AssetsCommand, Cli, Commands};
use crate::commands::common::{format_pending_lines, normalize_report_text};
use crate::commands::drain::run_drain;
use crate::commands::submit::run_submit;
use crate::error::CliError;
use crate::terminal::connectivity_banner;

fn test_config() -> (TempDir, ClientConfig) {
    let dir = tempdir().unwrap();
    let config = ClientConfig::from_lookup(|_| None)
        .unwrap()
        .with_db_path(dir.path().join("dispatch.db"));
    (dir, config)
}

fn unreachable_api() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

#[test]
fn submit_collects_trailing_words() {
    let cli = Cli::try_parse_from(["dispatch", "submit", "--offline", "pothole", "on", "5th"])
        .unwrap();
    match cli.command {
        Commands::Submit { offline, text } => {
            assert!(offline);
            assert_eq!(text, vec!["pothole", "on", "5th"]);
        }
        _ => panic!("expected submit"),
    }
}

#[test]
fn global_flags_follow_subcommand() {
    let cli = Cli::try_parse_from([
        "dispatch",
        "pending",
        "--json",
        "--db-path",
        "/tmp/q.db",
        "--api-url",
        "http://localhost:9000",
    ])
    .unwrap();
    assert!(matches!(cli.command, Commands::Pending { json: true }));
    assert_eq!(cli.db_path.unwrap().to_string_lossy(), "/tmp/q.db");
    assert_eq!(cli.api_url.as_deref(), Some("http://localhost:9000"));
}

#[test]
fn assets_fetch_takes_path_and_output() {
    let cli = Cli::try_parse_from(["dispatch", "assets", "fetch", "/app.js", "-o", "app.js"])
        .unwrap();
    match cli.command {
        Commands::Assets {
            action: AssetsCommand::Fetch { path, output },
        } => {
            assert_eq!(path, "/app.js");
            assert_eq!(output.unwrap().to_string_lossy(), "app.js");
        }
        _ => panic!("expected assets fetch"),
    }
}

#[test]
fn normalize_report_text_trims_and_rejects_empty() {
    assert_eq!(
        normalize_report_text("  hello  "),
        Some("hello".to_string())
    );
    assert_eq!(normalize_report_text(" \n\t "), None);
}

#[test]
fn pending_lines_show_sequence_and_preview() {
    let items = vec![QueueItem {
        sequence: 3,
        payload: "broken streetlight\nnear the park".to_string(),
    }];
    assert_eq!(
        format_pending_lines(&items),
        vec!["#3     broken streetlight".to_string()]
    );
}

#[test]
fn banners_match_connectivity() {
    assert_eq!(
        connectivity_banner(Connectivity::Online),
        "Connected to the Internet"
    );
    assert_eq!(
        connectivity_banner(Connectivity::Offline),
        "No Internet connection"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn offline_submit_stages_and_registers() {
    let (_dir, config) = test_config();
    let text = vec!["flooded".to_string(), "underpass".to_string()];

    let outcome = run_submit(&config, &text, true).await.unwrap();
    assert!(matches!(outcome, SubmissionOutcome::Queued(ref item) if item.payload == "flooded underpass"));

    let db = Database::open(&config.db_path).await.unwrap();
    assert_eq!(QueueStore::new(db.clone()).pending_count().await.unwrap(), 1);
    let registrations = SyncRegistry::new(db).pending().await.unwrap();
    assert_eq!(registrations[0].tag, SYNC_TAG);
}

#[tokio::test(flavor = "multi_thread")]
async fn drain_on_empty_store_is_idle() {
    let (_dir, config) = test_config();
    let config = config.with_api_base_url(unreachable_api()).unwrap();
    assert_eq!(run_drain(&config).await.unwrap(), DrainOutcome::Idle);
}

#[tokio::test(flavor = "multi_thread")]
async fn drain_failure_keeps_reports() {
    let (_dir, config) = test_config();
    let config = config.with_api_base_url(unreachable_api()).unwrap();
    run_submit(&config, &["queued".to_string()], true)
        .await
        .unwrap();

    let error = run_drain(&config).await.unwrap_err();
    assert!(matches!(error, CliError::DrainFailed(_)));

    let db = Database::open(&config.db_path).await.unwrap();
    assert_eq!(QueueStore::new(db).pending_count().await.unwrap(), 1);
}
