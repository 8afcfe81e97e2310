//! CRUD lifecycle controller
//!
//! Drives one managed resource instance through
//! create → poll-until-ready → read → diff-update → delete →
//! poll-until-gone, tolerating the platform's eventual consistency.
//! Operations within one instance are strictly sequential; instances may
//! reconcile concurrently through the shared read-only API handle.

use crate::api::RemoteApi;
use crate::error::{CloudError, Result};
use crate::kind::KindSpec;
use crate::object::{AttrMap, RemoteObject};
use crate::plan::{Action, Plan, diff_attrs};
use crate::policy::{PollPolicy, Timeouts};
use crate::project::project_fields;
use crate::state::{Phase, ResourceRecord};
use chrono::Utc;
use std::time::Instant;

/// Reconciles managed resources of one region against the platform.
///
/// The controller receives its collaborators explicitly (a typed API
/// handle, the region tag and the polling configuration) and keeps no
/// other state, so one controller serves any number of records.
pub struct Controller<'a, A: RemoteApi + ?Sized> {
    api: &'a A,
    region: String,
    timeouts: Timeouts,
    poll: PollPolicy,
}

impl<'a, A: RemoteApi + ?Sized> Controller<'a, A> {
    pub fn new(api: &'a A, region: impl Into<String>) -> Self {
        Self {
            api,
            region: region.into(),
            timeouts: Timeouts::default(),
            poll: PollPolicy::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn api(&self) -> &A {
        self.api
    }

    /// Create the resource from its declared attributes and wait for the
    /// platform to report it ready.
    ///
    /// The platform allocates identity asynchronously; the returned
    /// record is `Active` and carries the projection of the first ready
    /// read. Exceeding the create deadline fails with
    /// `ProvisioningTimeout`; the operation is safe to retry as a whole.
    pub async fn create(&self, kind: &KindSpec, declared: &AttrMap) -> Result<ResourceRecord> {
        tracing::info!(kind = kind.name, "creating resource");
        let id = self.api.create(kind.name, declared).await?;

        let object = self.wait_ready(kind, &id).await?;

        let mut record = ResourceRecord::new(kind.name, &self.region).with_id(&object.id);
        project_fields(&mut record, &object, kind.projected);
        record.phase = Phase::Active;
        tracing::info!(kind = kind.name, id = %record.id, "resource ready");
        Ok(record)
    }

    /// Converge the record toward its declared configuration.
    ///
    /// Re-entrant: a record the platform never allocated (or one already
    /// confirmed gone) takes the create path; an existing one is read,
    /// projected and diffed over the kind's managed fields. Only changed
    /// fields are sent, in a single partial update. A no-op diff issues
    /// zero mutation calls.
    pub async fn reconcile(
        &self,
        kind: &KindSpec,
        record: &mut ResourceRecord,
        declared: &AttrMap,
    ) -> Result<Plan> {
        if !record.has_identity() || record.phase == Phase::Gone {
            *record = self.create(kind, declared).await?;
            return Ok(Plan::new(vec![Action::create(kind.name, &record.id)]));
        }

        let object = self.api.get(kind.name, &record.id).await?;
        project_fields(record, &object, kind.projected);

        let changes = diff_attrs(declared, &record.attributes, kind.managed);
        if changes.is_empty() {
            record.phase = Phase::Active;
            tracing::debug!(kind = kind.name, id = %record.id, "already converged");
            return Ok(Plan::empty());
        }

        record.phase = Phase::Updating;
        let action = Action::update(kind.name, &record.id, changes);
        let patch = action.patch();
        let changed: Vec<&str> = action.changes.iter().map(|c| c.field.as_str()).collect();
        tracing::info!(
            kind = kind.name,
            id = %record.id,
            fields = %changed.join(", "),
            "updating drifted fields"
        );
        self.api.update(kind.name, &record.id, &patch).await?;

        for (field, value) in &patch {
            record.attributes.insert(field.clone(), value.clone());
        }
        record.phase = Phase::Active;
        record.updated_at = Utc::now();
        Ok(Plan::new(vec![action]))
    }

    /// Delete the resource and wait until the platform confirms absence.
    ///
    /// A not-found on the very first poll counts as immediate success;
    /// the platform deletes some kinds synchronously. The record reaches
    /// `Gone` only after confirmed absence, never speculatively; on a
    /// deadline the record stays `Deleting` and the caller may retry.
    pub async fn delete(&self, kind: &KindSpec, record: &mut ResourceRecord) -> Result<()> {
        if !record.has_identity() {
            record.phase = Phase::Gone;
            return Ok(());
        }

        record.phase = Phase::Deleting;
        tracing::info!(kind = kind.name, id = %record.id, "deleting resource");
        self.api.delete(kind.name, &record.id).await?;

        self.wait_gone(kind, &record.id).await?;
        record.phase = Phase::Gone;
        record.updated_at = Utc::now();
        tracing::info!(kind = kind.name, id = %record.id, "deletion confirmed");
        Ok(())
    }

    /// Poll reads until the kind's ready predicate holds.
    async fn wait_ready(&self, kind: &KindSpec, id: &str) -> Result<RemoteObject> {
        let started = Instant::now();
        let mut interval = self.poll.initial_interval;

        loop {
            match self.api.get(kind.name, id).await {
                Ok(object) => {
                    if kind.is_failed(&object) {
                        let status = kind
                            .status_attr
                            .and_then(|attr| object.attr_str(attr))
                            .unwrap_or("unknown");
                        return Err(CloudError::Api(format!(
                            "{} {} entered failed status {}",
                            kind.name, id, status
                        )));
                    }
                    if kind.is_ready(&object) {
                        return Ok(object);
                    }
                    tracing::debug!(kind = kind.name, id, "waiting for readiness");
                }
                // The identity can lag behind the create call.
                Err(e) if e.is_not_found() => {
                    tracing::debug!(kind = kind.name, id, "created object not visible yet");
                }
                Err(e) => return Err(e),
            }

            if started.elapsed() >= self.timeouts.create {
                return Err(CloudError::ProvisioningTimeout {
                    kind: kind.name.to_string(),
                    id: id.to_string(),
                    waited: started.elapsed(),
                });
            }
            tokio::time::sleep(interval).await;
            interval = self.poll.next_interval(interval);
        }
    }

    /// Poll reads until the platform reports the object gone.
    async fn wait_gone(&self, kind: &KindSpec, id: &str) -> Result<()> {
        let started = Instant::now();
        let mut interval = self.poll.initial_interval;

        loop {
            match self.api.get(kind.name, id).await {
                Err(e) if e.is_not_found() => return Ok(()),
                // Transport faults are not absence.
                Err(e) => return Err(e),
                Ok(_) => {
                    tracing::debug!(kind = kind.name, id, "still present after delete");
                }
            }

            if started.elapsed() >= self.timeouts.delete {
                return Err(CloudError::DeletionTimeout {
                    kind: kind.name.to_string(),
                    id: id.to_string(),
                    waited: started.elapsed(),
                });
            }
            tokio::time::sleep(interval).await;
            interval = self.poll.next_interval(interval);
        }
    }
}
