//! Persisted local state for managed resources and lookups
//!
//! The engine records remote identities and last-projected attributes in
//! `.stratus/state.json` so later reconciliations can diff against what
//! was observed before.

use crate::error::{CloudError, Result};
use crate::object::AttrMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tokio::fs;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".stratus";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const LOCK_FILE: &str = "lock.json";

/// Lifecycle phase of a managed resource instance.
///
/// A record in `Active` always carries a non-empty remote identity and a
/// successful last-read snapshot. A record only reaches `Gone` after the
/// platform confirmed absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Declared locally, not yet confirmed ready remotely.
    Pending,
    /// Converged: remote object exists and was read successfully.
    Active,
    /// A partial update is in flight.
    Updating,
    /// A delete was submitted, absence not yet confirmed.
    Deleting,
    /// Absence confirmed by the platform.
    Gone,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Pending => write!(f, "pending"),
            Phase::Active => write!(f, "active"),
            Phase::Updating => write!(f, "updating"),
            Phase::Deleting => write!(f, "deleting"),
            Phase::Gone => write!(f, "gone"),
        }
    }
}

/// Local record of one remote object: identity, region tag and the
/// last-projected attribute set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Platform-assigned identity; empty until the platform allocates one.
    pub id: String,

    /// Resource kind.
    pub kind: String,

    /// Region the object lives in.
    pub region: String,

    pub phase: Phase,

    /// Last-projected attributes, including derived set-valued fields.
    pub attributes: AttrMap,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceRecord {
    pub fn new(kind: impl Into<String>, region: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            kind: kind.into(),
            region: region.into(),
            phase: Phase::Pending,
            attributes: AttrMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value) {
        self.attributes.insert(key.into(), value);
        self.updated_at = Utc::now();
    }

    pub fn get_attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// Whether the platform has assigned this record an identity.
    pub fn has_identity(&self) -> bool {
        !self.id.is_empty()
    }

    /// Read a derived set-valued field. Missing fields read as empty.
    pub fn string_set(&self, key: &str) -> BTreeSet<String> {
        self.attributes
            .get(key)
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Store a derived set as a sorted, deduplicated array so state files
    /// stay deterministic and set equality ignores insertion order.
    pub fn set_string_set(&mut self, key: impl Into<String>, set: &BTreeSet<String>) {
        let values: Vec<Value> = set.iter().cloned().map(Value::String).collect();
        self.set_attribute(key, Value::Array(values));
    }
}

/// Build the state key for a locally-named resource instance.
pub fn record_key(region: &str, kind: &str, name: &str) -> String {
    format!("{region}:{kind}:{name}")
}

/// On-disk state: every tracked record keyed by `region:kind:name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    pub resources: HashMap<String, ResourceRecord>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: HashMap::new(),
        }
    }
}

impl StateFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_record(&mut self, key: String, record: ResourceRecord) {
        self.resources.insert(key, record);
        self.updated_at = Utc::now();
    }

    pub fn remove_record(&mut self, key: &str) -> Option<ResourceRecord> {
        let removed = self.resources.remove(key);
        if removed.is_some() {
            self.updated_at = Utc::now();
        }
        removed
    }

    pub fn get_record(&self, key: &str) -> Option<&ResourceRecord> {
        self.resources.get(key)
    }

    pub fn get_record_mut(&mut self, key: &str) -> Option<&mut ResourceRecord> {
        self.resources.get_mut(key)
    }

    /// Records of one kind, for verification sweeps after a destroy.
    pub fn records_of_kind(&self, kind: &str) -> Vec<(&String, &ResourceRecord)> {
        self.resources
            .iter()
            .filter(|(_, r)| r.kind == kind)
            .collect()
    }
}

/// Reads and writes the state file under a project root.
pub struct StateStore {
    project_root: PathBuf,
}

impl StateStore {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR)
    }

    fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(STATE_BACKUP)
    }

    fn lock_path(&self) -> PathBuf {
        self.state_dir().join(LOCK_FILE)
    }

    async fn ensure_state_dir(&self) -> Result<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("created state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the current state. A missing file is an empty state.
    pub async fn load(&self) -> Result<StateFile> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("state file not found, returning empty state");
            return Ok(StateFile::new());
        }

        let content = fs::read_to_string(&path).await?;
        let state: StateFile = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(CloudError::State(format!(
                "state file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("loaded state with {} records", state.resources.len());
        Ok(state)
    }

    /// Save the state, keeping the previous file as a backup.
    pub async fn save(&self, state: &StateFile) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        let backup = self.backup_path();

        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!("rotated state backup");
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;

        tracing::debug!("saved state with {} records", state.resources.len());
        Ok(())
    }

    /// Acquire the exclusive state lock. Locks older than an hour are
    /// treated as stale and taken over.
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        self.ensure_state_dir().await?;

        let lock_path = self.lock_path();

        if lock_path.exists() {
            let content = fs::read_to_string(&lock_path).await?;
            let lock_info: LockInfo = serde_json::from_str(&content)?;

            let age = Utc::now().signed_duration_since(lock_info.acquired_at);
            if age.num_hours() < 1 {
                return Err(CloudError::Lock(format!(
                    "state is locked by {} since {}",
                    lock_info.holder, lock_info.acquired_at
                )));
            }

            tracing::warn!("removing stale lock from {}", lock_info.holder);
        }

        let lock_info = LockInfo {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            acquired_at: Utc::now(),
        };

        let content = serde_json::to_string_pretty(&lock_info)?;
        fs::write(&lock_path, content).await?;

        tracing::debug!("acquired state lock");
        Ok(StateLock {
            lock_path,
            released: false,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    acquired_at: DateTime<Utc>,
}

/// RAII guard for the state lock.
pub struct StateLock {
    lock_path: PathBuf,
    released: bool,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        if !self.released {
            if self.lock_path.exists() {
                fs::remove_file(&self.lock_path).await?;
                tracing::debug!("released state lock");
            }
            self.released = true;
        }
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released && self.lock_path.exists() {
            // Synchronous cleanup in drop - not ideal but necessary
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}
