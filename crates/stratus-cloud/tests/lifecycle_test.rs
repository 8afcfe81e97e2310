//! Controller lifecycle flows against the fake platform.

use serde_json::json;
use std::time::Duration;
use stratus_cloud::{
    AttrMap, CloudError, Controller, KindSpec, Phase, PollPolicy, RemoteApi, ResourceRecord,
    Timeouts,
};
use stratus_testkit::{FakePlatform, Op};

const SERVER: KindSpec = KindSpec {
    name: "server",
    status_attr: Some("status"),
    ready_values: &["running"],
    failed_values: &["error"],
    projected: &["name", "status"],
    managed: &["name"],
};

fn declared(name: &str) -> AttrMap {
    [("name".to_string(), json!(name))].into_iter().collect()
}

fn controller<'a>(platform: &'a FakePlatform) -> Controller<'a, FakePlatform> {
    stratus_testkit::init_tracing();
    Controller::new(platform, "eu-de")
        .with_poll_policy(PollPolicy::immediate())
        .with_timeouts(Timeouts {
            create: Duration::from_secs(60),
            delete: Duration::from_secs(60),
        })
}

#[tokio::test]
async fn create_polls_until_the_platform_reports_ready() {
    let platform = FakePlatform::new();
    platform.script_status_after("server", "building", "running", 2);
    let ctl = controller(&platform);

    let record = ctl.create(&SERVER, &declared("web-1")).await.unwrap();

    assert_eq!(record.phase, Phase::Active);
    assert!(record.has_identity());
    assert_eq!(record.attr_str("status"), Some("running"));
    assert_eq!(record.attr_str("name"), Some("web-1"));
    assert_eq!(record.region, "eu-de");
    // two pending reads plus the ready one
    assert!(platform.counters().gets >= 3);
}

#[tokio::test]
async fn create_fails_once_the_deadline_passes() {
    let platform = FakePlatform::new();
    platform.script_status_after("server", "building", "running", 1000);
    let ctl = Controller::new(&platform, "eu-de")
        .with_poll_policy(PollPolicy::immediate())
        .with_timeouts(Timeouts {
            create: Duration::ZERO,
            delete: Duration::from_secs(60),
        });

    let err = ctl.create(&SERVER, &declared("web-1")).await.unwrap_err();
    assert!(matches!(err, CloudError::ProvisioningTimeout { .. }));
}

#[tokio::test]
async fn failed_status_aborts_the_create() {
    let platform = FakePlatform::new();
    platform.script_status("server", "error");
    let ctl = controller(&platform);

    let err = ctl.create(&SERVER, &declared("web-1")).await.unwrap_err();
    match err {
        CloudError::Api(message) => assert!(message.contains("failed status")),
        other => panic!("expected an API failure, got {other}"),
    }
}

#[tokio::test]
async fn reconcile_updates_only_drifted_fields_once() {
    let platform = FakePlatform::new();
    platform.script_status("server", "running");
    let ctl = controller(&platform);

    let mut record = ctl.create(&SERVER, &declared("web-1")).await.unwrap();
    let remote_id = record.id.clone();

    // Converged: no mutation at all.
    let plan = ctl
        .reconcile(&SERVER, &mut record, &declared("web-1"))
        .await
        .unwrap();
    assert!(!plan.has_changes);
    assert_eq!(platform.counters().updates, 0);

    // Rename: exactly one update, touching only the name.
    let plan = ctl
        .reconcile(&SERVER, &mut record, &declared("web-2"))
        .await
        .unwrap();
    assert!(plan.has_changes);
    let updates = platform.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].patch.len(), 1);
    assert_eq!(updates[0].patch.get("name"), Some(&json!("web-2")));
    assert_eq!(record.id, remote_id);

    // Re-running with no further change is a no-op again.
    let plan = ctl
        .reconcile(&SERVER, &mut record, &declared("web-2"))
        .await
        .unwrap();
    assert!(!plan.has_changes);
    assert_eq!(platform.updates().len(), 1);
}

#[tokio::test]
async fn reconcile_creates_when_nothing_was_allocated() {
    let platform = FakePlatform::new();
    platform.script_status("server", "running");
    let ctl = controller(&platform);

    let mut record = ResourceRecord::new("server", "eu-de");
    let plan = ctl
        .reconcile(&SERVER, &mut record, &declared("web-1"))
        .await
        .unwrap();

    assert!(plan.has_changes);
    assert_eq!(record.phase, Phase::Active);
    assert!(record.has_identity());
    assert_eq!(platform.counters().creates, 1);
}

#[tokio::test]
async fn delete_accepts_absence_on_the_first_poll() {
    let platform = FakePlatform::new();
    platform.script_status("server", "running");
    let ctl = controller(&platform);

    let mut record = ctl.create(&SERVER, &declared("web-1")).await.unwrap();
    ctl.delete(&SERVER, &mut record).await.unwrap();

    assert_eq!(record.phase, Phase::Gone);
    let err = platform.get("server", &record.id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn delete_polls_until_the_object_vanishes() {
    let platform = FakePlatform::new();
    platform.script_status("server", "running");
    platform.script_delete_after("server", 2);
    let ctl = controller(&platform);

    let mut record = ctl.create(&SERVER, &declared("web-1")).await.unwrap();
    ctl.delete(&SERVER, &mut record).await.unwrap();

    assert_eq!(record.phase, Phase::Gone);
}

#[tokio::test]
async fn delete_fails_once_the_deadline_passes() {
    let platform = FakePlatform::new();
    platform.script_status("server", "running");
    platform.script_delete_after("server", 1000);
    let ctl = Controller::new(&platform, "eu-de")
        .with_poll_policy(PollPolicy::immediate())
        .with_timeouts(Timeouts {
            create: Duration::from_secs(60),
            delete: Duration::ZERO,
        });

    let mut record = ctl.create(&SERVER, &declared("web-1")).await.unwrap();
    let err = ctl.delete(&SERVER, &mut record).await.unwrap_err();

    assert!(matches!(err, CloudError::DeletionTimeout { .. }));
    // Absence was never confirmed, so the record must not claim it.
    assert_eq!(record.phase, Phase::Deleting);
}

#[tokio::test]
async fn transport_faults_during_delete_polling_are_not_absence() {
    let platform = FakePlatform::new();
    platform.script_status("server", "running");
    platform.script_delete_after("server", 5);
    let ctl = controller(&platform);

    let mut record = ctl.create(&SERVER, &declared("web-1")).await.unwrap();
    platform.fail("server", Op::Get, || {
        CloudError::Transport("tls handshake failed".to_string())
    });

    let err = ctl.delete(&SERVER, &mut record).await.unwrap_err();
    assert!(matches!(err, CloudError::Transport(_)));
    assert_eq!(record.phase, Phase::Deleting);
}
