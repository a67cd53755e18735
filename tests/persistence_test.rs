use assert_cmd::cargo_bin;
use rust_decimal_macros::dec;
use scolpay_offline::application::connectivity::ConnectivityTracker;
use scolpay_offline::application::queue::{OfflineQueue, SyncOutcome, SyncReport};
use scolpay_offline::config::QueueConfig;
use scolpay_offline::infrastructure::file::JsonFileStore;
use std::process::Command;
use tempfile::tempdir;

mod common;

#[test]
fn test_queue_file_survives_restarts() {
    let dir = tempdir().unwrap();
    let queue_file = dir.path().join("queue.json");

    // 1. First run: queue a payment while offline
    let output1 = Command::new(cargo_bin!("scolpay-offline"))
        .arg("--queue-file")
        .arg(&queue_file)
        .arg("--offline")
        .args(["save", "--student-id", "STU-001", "--amount", "15000", "--type", "scolarite"])
        .output()
        .expect("Failed to execute command");
    assert!(output1.status.success());

    // 2. Second run: queue another one against the same file
    let output2 = Command::new(cargo_bin!("scolpay-offline"))
        .arg("--queue-file")
        .arg(&queue_file)
        .arg("--offline")
        .args(["save", "--student-id", "STU-002", "--amount", "5000", "--type", "cantine"])
        .output()
        .expect("Failed to execute command");
    assert!(output2.status.success());

    // 3. Both survive
    let output3 = Command::new(cargo_bin!("scolpay-offline"))
        .arg("--queue-file")
        .arg(&queue_file)
        .arg("--offline")
        .arg("pending")
        .output()
        .expect("Failed to execute command");
    assert!(output3.status.success());
    let stdout = String::from_utf8_lossy(&output3.stdout);
    assert_eq!(stdout.lines().count(), 3);
    assert!(stdout.contains("STU-001"));
    assert!(stdout.contains("STU-002"));
}

#[tokio::test]
async fn test_reopened_store_syncs_earlier_records() {
    let dir = tempdir().unwrap();
    let queue_file = dir.path().join("queue.json");

    {
        let queue = OfflineQueue::new(
            Box::new(JsonFileStore::new(&queue_file)),
            Box::new(common::ScriptedGateway::new()),
            ConnectivityTracker::new(false),
            QueueConfig::default(),
        );
        queue.save(common::payment("STU-001", dec!(15000))).await.unwrap();
        queue.save(common::payment("STU-002", dec!(7500))).await.unwrap();
    }

    let gateway = common::ScriptedGateway::new();
    let queue = OfflineQueue::new(
        Box::new(JsonFileStore::new(&queue_file)),
        Box::new(gateway.clone()),
        ConnectivityTracker::new(true),
        QueueConfig::default(),
    );

    let outcome = queue.sync_now().await.unwrap();

    assert_eq!(
        outcome,
        SyncOutcome::Completed(SyncReport {
            success_count: 2,
            failure_count: 0
        })
    );
    assert_eq!(gateway.call_count(), 2);
    assert_eq!(queue.pending_count().await.unwrap(), 0);
}
