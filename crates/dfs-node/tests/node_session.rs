//! # Node Session Tests
//!
//! Drive a `NodeRuntime` through its JSON-lines transport the way a client
//! on stdin would, including a restart on a durable journal.

use dfs_file_registry::prelude::{
    FileId, FileRegistryApi, RegistryEvent, RegistryResponse, ResponseBody,
};
use dfs_node::{NodeConfig, NodeRuntime};
use dfs_telemetry::TelemetryConfig;

const ALICE: &str = "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1";
const BOB: &str = "0xb0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0";

fn line(caller: &str, request: &str) -> String {
    format!(r#"{{"caller":"{caller}","request":{request}}}"#)
}

async fn serve(runtime: &NodeRuntime, lines: &[String]) -> Vec<RegistryResponse> {
    let input = lines.join("\n");
    let mut output = Vec::new();
    runtime.serve(input.as_bytes(), &mut output).await.unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[tokio::test]
async fn test_share_and_delete_over_transport() {
    let runtime = NodeRuntime::new(NodeConfig::default()).unwrap();

    let responses = serve(
        &runtime,
        &[
            line(ALICE, r#"{"op":"register","reference":"bafy-report"}"#),
            String::new(),
            line(ALICE, &format!(r#"{{"op":"grant_access","id":"1","grantee":"{BOB}"}}"#)),
            line(BOB, &format!(r#"{{"op":"has_access","id":1,"identity":"{BOB}"}}"#)),
            line(BOB, r#"{"op":"delete_record","id":1}"#),
            line(ALICE, r#"{"op":"delete_record","id":1}"#),
            line(ALICE, r#"{"op":"get_record","id":1}"#),
            "garbage".to_string(),
        ],
    )
    .await;

    // The blank line produces no response.
    assert_eq!(responses.len(), 7);

    assert!(matches!(
        responses[0].result,
        Some(ResponseBody::Committed { id: FileId(1), sequence: 1, .. })
    ));
    assert!(matches!(
        responses[1].result,
        Some(ResponseBody::Committed {
            sequence: 2,
            notification: RegistryEvent::AccessGranted { .. },
            ..
        })
    ));
    assert!(matches!(
        responses[2].result,
        Some(ResponseBody::Access { allowed: true, .. })
    ));
    assert_eq!(responses[3].error_code(), Some(403));
    assert!(responses[4].is_ok());
    assert_eq!(responses[5].error_code(), Some(404));
    assert_eq!(responses[6].error_code(), Some(400));

    assert_eq!(runtime.bus().last_sequence(), 3);
}

#[tokio::test]
async fn test_monitor_sees_every_notification() {
    let runtime = NodeRuntime::new(NodeConfig::default()).unwrap();
    let monitor = runtime.start();

    serve(
        &runtime,
        &[
            line(ALICE, r#"{"op":"register","reference":"a"}"#),
            line(ALICE, r#"{"op":"register","reference":"b"}"#),
            line(BOB, r#"{"op":"delete_record","id":1}"#),
        ],
    )
    .await;

    runtime.shutdown();
    assert_eq!(monitor.await.unwrap(), 2);
}

#[tokio::test]
async fn test_restart_replays_journal() {
    let dir = tempfile::tempdir().unwrap();
    let config = NodeConfig {
        journal_path: Some(dir.path().join("registry.jsonl")),
        check_invariants: true,
        ..NodeConfig::default()
    };

    {
        let runtime = NodeRuntime::new(config.clone()).unwrap();
        let responses = serve(
            &runtime,
            &[
                line(ALICE, r#"{"op":"register","reference":"first"}"#),
                line(ALICE, r#"{"op":"register","reference":"second"}"#),
                line(ALICE, &format!(r#"{{"op":"grant_access","id":2,"grantee":"{BOB}"}}"#)),
                line(ALICE, r#"{"op":"delete_record","id":1}"#),
            ],
        )
        .await;
        assert!(responses.iter().all(RegistryResponse::is_ok));
    }

    let runtime = NodeRuntime::new(config).unwrap();
    assert_eq!(runtime.bus().last_sequence(), 4);

    let stats = runtime.service().registry_stats().await;
    assert_eq!(stats.total_registered, 2);
    assert_eq!(stats.active_records, 1);
    assert_eq!(stats.active_grants, 1);

    let responses = serve(
        &runtime,
        &[
            line(ALICE, r#"{"op":"register","reference":"third"}"#),
            line(BOB, r#"{"op":"list_shared_with","grantee":"0xb0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0"}"#),
            line(BOB, r#"{"op":"list_active"}"#),
        ],
    )
    .await;

    // Ids are never reused across restarts.
    assert!(matches!(
        responses[0].result,
        Some(ResponseBody::Committed { id: FileId(3), sequence: 5, .. })
    ));
    match &responses[1].result {
        Some(ResponseBody::Records { records }) => {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].id, FileId(2));
        }
        other => panic!("unexpected response: {other:?}"),
    }
    match &responses[2].result {
        Some(ResponseBody::Records { records }) => {
            let ids: Vec<FileId> = records.iter().map(|r| r.id).collect();
            assert_eq!(ids, vec![FileId(2), FileId(3)]);
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn test_metrics_exported_after_shutdown() {
    dfs_telemetry::register_metrics().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dfs.prom");
    let runtime = NodeRuntime::new(NodeConfig {
        telemetry: TelemetryConfig {
            metrics_path: Some(path.clone()),
            ..TelemetryConfig::default()
        },
        ..NodeConfig::default()
    })
    .unwrap();
    let monitor = runtime.start();

    serve(&runtime, &[line(ALICE, r#"{"op":"register","reference":"a"}"#)]).await;
    runtime.shutdown();
    monitor.await.unwrap();

    assert_eq!(runtime.export_metrics().unwrap(), Some(path.as_path()));
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("dfs_registry_operations_total"));
    assert!(text.contains("dfs_registry_active_records"));
}

#[tokio::test]
async fn test_metrics_export_disabled_by_default() {
    let runtime = NodeRuntime::new(NodeConfig::default()).unwrap();
    assert_eq!(runtime.export_metrics().unwrap(), None);
}
