//! Open Telekom Cloud resource bindings
//!
//! Per-kind bindings over the stratus engine: each binding pins down a
//! kind descriptor (status semantics, projected and managed fields) and
//! the flows the kind supports.
//!
//! - [`backup`]: VBS backup lookup with share expansion (read-only)
//! - [`secgroup`]: networking security group lifecycle (managed)
//!
//! The transport client implementing
//! [`RemoteApi`](stratus_cloud::RemoteApi) is constructed elsewhere from
//! region and credentials; bindings receive the ready handle.

pub mod backup;
pub mod secgroup;

pub use backup::{BACKUP, BACKUP_SHARES, BackupCriteria, lookup_backup};
pub use secgroup::{
    RULE_PARENT_ATTR, SECURITY_GROUP, SECURITY_GROUP_RULE, SecurityGroupConfig,
    create_security_group, delete_security_group, reconcile_security_group, rule_count,
};
