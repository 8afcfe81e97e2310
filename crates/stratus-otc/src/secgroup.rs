//! Networking security group lifecycle
//!
//! Security groups are managed resources: created with (or without) the
//! platform's default egress rules, renamed and re-described in place,
//! and deleted with confirmed absence. The platform reports no lifecycle
//! status for them; a group is ready as soon as it can be read.

use serde_json::json;
use stratus_cloud::{
    Action, AttrMap, Controller, Filter, KindSpec, Phase, Plan, RemoteApi, RemoteObject,
    ResourceRecord, Result, assert_collection_len, project_fields,
};

pub const SECURITY_GROUP: KindSpec = KindSpec {
    name: "security_group",
    status_attr: None,
    ready_values: &[],
    failed_values: &[],
    projected: &["name", "description", "rules"],
    managed: &["name", "description"],
};

pub const SECURITY_GROUP_RULE: KindSpec = KindSpec {
    name: "security_group_rule",
    status_attr: None,
    ready_values: &[],
    failed_values: &[],
    projected: &["direction", "ethertype", "protocol", "security_group_id"],
    managed: &[],
};

/// Attribute on rules referencing their group.
pub const RULE_PARENT_ATTR: &str = "security_group_id";

/// Declared configuration for one security group.
#[derive(Debug, Clone, Default)]
pub struct SecurityGroupConfig {
    pub name: String,
    pub description: String,

    /// Remove the default rules the platform seeds into new groups,
    /// leaving a verifiably empty rule collection. Must be requested
    /// explicitly; the engine never assumes what the platform seeds.
    pub delete_default_rules: bool,
}

impl SecurityGroupConfig {
    fn declared(&self) -> AttrMap {
        [
            ("name".to_string(), json!(self.name)),
            ("description".to_string(), json!(self.description)),
        ]
        .into_iter()
        .collect()
    }
}

/// Create the group and wait for it to be readable.
///
/// With `delete_default_rules` set, every rule the platform seeded is
/// deleted and the group is re-read to confirm the collection really is
/// empty before the record is returned.
pub async fn create_security_group<A: RemoteApi + ?Sized>(
    ctl: &Controller<'_, A>,
    config: &SecurityGroupConfig,
) -> Result<ResourceRecord> {
    let mut record = ctl.create(&SECURITY_GROUP, &config.declared()).await?;

    if config.delete_default_rules {
        delete_group_rules(ctl.api(), &record.id).await?;

        let object = ctl.api().get(SECURITY_GROUP.name, &record.id).await?;
        assert_collection_len(&object, "rules", 0)?;
        project_fields(&mut record, &object, SECURITY_GROUP.projected);
    }

    Ok(record)
}

/// Converge an existing group toward its declared configuration.
///
/// Re-entrant: a record the platform never allocated takes the create
/// path, including default-rule suppression; otherwise only the drifted
/// managed fields are sent, and a converged group issues no mutation at
/// all.
pub async fn reconcile_security_group<A: RemoteApi + ?Sized>(
    ctl: &Controller<'_, A>,
    record: &mut ResourceRecord,
    config: &SecurityGroupConfig,
) -> Result<Plan> {
    if !record.has_identity() || record.phase == Phase::Gone {
        *record = create_security_group(ctl, config).await?;
        return Ok(Plan::new(vec![Action::create(
            SECURITY_GROUP.name,
            &record.id,
        )]));
    }
    ctl.reconcile(&SECURITY_GROUP, record, &config.declared())
        .await
}

/// Delete the group and wait until the platform confirms absence.
pub async fn delete_security_group<A: RemoteApi + ?Sized>(
    ctl: &Controller<'_, A>,
    record: &mut ResourceRecord,
) -> Result<()> {
    ctl.delete(&SECURITY_GROUP, record).await
}

/// Exact rule count as the platform reports it; a missing collection
/// counts as empty.
pub fn rule_count(object: &RemoteObject) -> usize {
    object.attr_array("rules").map_or(0, Vec::len)
}

async fn delete_group_rules<A: RemoteApi + ?Sized>(api: &A, group_id: &str) -> Result<()> {
    let mut filter = Filter::new();
    filter.insert(RULE_PARENT_ATTR, group_id);
    let rules = api.list(SECURITY_GROUP_RULE.name, &filter).await?;

    for rule in rules {
        tracing::debug!(group = group_id, rule = %rule.id, "removing seeded rule");
        api.delete(SECURITY_GROUP_RULE.name, &rule.id).await?;
    }
    Ok(())
}
