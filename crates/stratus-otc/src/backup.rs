//! VBS backup lookup
//!
//! Backups are read-only from the engine's point of view: a criteria set
//! resolves to exactly one existing backup, whose attributes (and the
//! identity sets derived from its shares) project into local state.

use stratus_cloud::{
    Criteria, KindSpec, Phase, RelatedSpec, RemoteApi, ResourceRecord, Result, commit_expansion,
    expand_related, find_one, project_fields,
};

pub const BACKUP: KindSpec = KindSpec {
    name: "backup",
    status_attr: Some("status"),
    ready_values: &["available"],
    failed_values: &["error"],
    projected: &[
        "name",
        "description",
        "status",
        "availability_zone",
        "snapshot_id",
        "service_metadata",
        "size",
        "container",
        "volume_id",
    ],
    managed: &[],
};

/// Shares reference their backup through `backup_id`; each share
/// contributes its own identity and the project it authorizes.
pub const BACKUP_SHARES: RelatedSpec = RelatedSpec {
    kind: "share",
    parent_attr: "backup_id",
    projections: &[("id", "share_ids"), ("to_project_id", "to_project_ids")],
};

/// Caller-supplied match criteria. Unset fields impose no constraint;
/// set fields combine conjunctively.
#[derive(Debug, Clone, Default)]
pub struct BackupCriteria {
    pub id: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
    pub volume_id: Option<String>,
    pub snapshot_id: Option<String>,
}

impl BackupCriteria {
    fn to_criteria(&self) -> Criteria {
        Criteria::new()
            .with("id", self.id.clone())
            .with("name", self.name.clone())
            .with("status", self.status.clone())
            .with("volume_id", self.volume_id.clone())
            .with("snapshot_id", self.snapshot_id.clone())
    }
}

/// Resolve the criteria to exactly one backup and project it, shares
/// included, into a fresh local record tagged with the region.
///
/// The share expansion runs before anything is committed: when it fails,
/// no record is produced at all rather than one with fresh primary
/// fields next to stale derived sets.
pub async fn lookup_backup<A: RemoteApi + ?Sized>(
    api: &A,
    region: &str,
    criteria: &BackupCriteria,
) -> Result<ResourceRecord> {
    let object = find_one(api, BACKUP.name, &criteria.to_criteria()).await?;

    let sets = expand_related(api, BACKUP.name, &object.id, &BACKUP_SHARES).await?;

    let mut record = ResourceRecord::new(BACKUP.name, region).with_id(&object.id);
    project_fields(&mut record, &object, BACKUP.projected);
    commit_expansion(&mut record, &sets);
    record.phase = Phase::Active;

    tracing::debug!(id = %record.id, region, "projected backup into local state");
    Ok(record)
}
