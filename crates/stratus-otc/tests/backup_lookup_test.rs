//! VBS backup lookup scenarios.

use serde_json::json;
use stratus_cloud::{CloudError, Phase, RemoteObject};
use stratus_otc::{BackupCriteria, lookup_backup};
use stratus_testkit::{FakePlatform, Op};

fn backup(id: &str, name: &str, volume_id: &str) -> RemoteObject {
    RemoteObject::new(id)
        .with_attribute("name", json!(name))
        .with_attribute("description", json!("nightly volume backup"))
        .with_attribute("status", json!("available"))
        .with_attribute("availability_zone", json!("eu-de-01"))
        .with_attribute("size", json!(40))
        .with_attribute("container", json!("container-0001"))
        .with_attribute("volume_id", json!(volume_id))
        .with_attribute("snapshot_id", json!("snap-0001"))
}

fn share(id: &str, backup_id: &str, project_id: &str) -> RemoteObject {
    RemoteObject::new(id)
        .with_attribute("backup_id", json!(backup_id))
        .with_attribute("to_project_id", json!(project_id))
}

#[tokio::test]
async fn lookup_projects_attributes_and_share_sets() {
    let platform = FakePlatform::new();
    platform.insert("backup", backup("b-1", "nightly", "v-1"));
    platform.insert("share", share("s-1", "b-1", "p-1"));
    platform.insert("share", share("s-2", "b-1", "p-1"));
    platform.insert("share", share("s-3", "b-9", "p-2"));

    let criteria = BackupCriteria {
        name: Some("nightly".to_string()),
        ..Default::default()
    };
    let record = lookup_backup(&platform, "eu-de", &criteria).await.unwrap();

    assert_eq!(record.id, "b-1");
    assert_eq!(record.phase, Phase::Active);
    assert_eq!(record.region, "eu-de");
    assert_eq!(record.attr_str("status"), Some("available"));
    assert_eq!(record.attr_str("availability_zone"), Some("eu-de-01"));
    assert_eq!(record.get_attribute::<i64>("size"), Some(40));
    assert_eq!(record.attr_str("container"), Some("container-0001"));

    let share_ids = record.string_set("share_ids");
    assert_eq!(share_ids.len(), 2);
    assert!(share_ids.contains("s-1") && share_ids.contains("s-2"));

    // Both shares authorize the same project: the set collapses them.
    let project_ids = record.string_set("to_project_ids");
    assert_eq!(project_ids.len(), 1);
    assert!(project_ids.contains("p-1"));
}

#[tokio::test]
async fn criteria_narrow_down_same_named_backups() {
    let platform = FakePlatform::new();
    platform.insert("backup", backup("b-1", "nightly", "v-1"));
    platform.insert("backup", backup("b-2", "nightly", "v-2"));

    let criteria = BackupCriteria {
        name: Some("nightly".to_string()),
        volume_id: Some("v-2".to_string()),
        ..Default::default()
    };
    let record = lookup_backup(&platform, "eu-de", &criteria).await.unwrap();
    assert_eq!(record.id, "b-2");
}

#[tokio::test]
async fn no_matching_backup_reports_no_results() {
    let platform = FakePlatform::new();
    platform.insert("backup", backup("b-1", "nightly", "v-1"));

    let criteria = BackupCriteria {
        name: Some("monthly".to_string()),
        ..Default::default()
    };
    let err = lookup_backup(&platform, "eu-de", &criteria)
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(err.to_string().contains("query returned no results"));
}

#[tokio::test]
async fn two_backups_with_the_same_name_are_ambiguous() {
    let platform = FakePlatform::new();
    platform.insert("backup", backup("b-1", "nightly", "v-1"));
    platform.insert("backup", backup("b-2", "nightly", "v-2"));

    let criteria = BackupCriteria {
        name: Some("nightly".to_string()),
        ..Default::default()
    };
    let err = lookup_backup(&platform, "eu-de", &criteria)
        .await
        .unwrap_err();

    assert!(matches!(err, CloudError::Ambiguous { count: 2, .. }));
}

#[tokio::test]
async fn share_fetch_failure_commits_nothing() {
    let platform = FakePlatform::new();
    platform.insert("backup", backup("b-1", "nightly", "v-1"));
    platform.fail("share", Op::List, || {
        CloudError::Transport("gateway unavailable".to_string())
    });

    let criteria = BackupCriteria {
        name: Some("nightly".to_string()),
        ..Default::default()
    };
    let err = lookup_backup(&platform, "eu-de", &criteria)
        .await
        .unwrap_err();

    assert!(matches!(err, CloudError::RelatedFetch { .. }));
    assert!(err.to_string().contains("unable to retrieve share"));
}
