//! Read-side existence and invariant checks
//!
//! Used after lifecycle operations to confirm the platform agrees with
//! the local record: absence after a destroy, presence and structural
//! invariants after a create. All checks are pure reads.

use crate::api::RemoteApi;
use crate::error::{CloudError, Result};
use crate::object::RemoteObject;
use crate::state::StateFile;
use serde_json::Value;

/// Read-only checker over the platform API.
pub struct Verifier<'a, A: RemoteApi + ?Sized> {
    api: &'a A,
}

impl<'a, A: RemoteApi + ?Sized> Verifier<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Confirm the object no longer exists. A successful read after a
    /// claimed destroy is a hard failure, not a pass.
    pub async fn assert_absent(&self, kind: &str, id: &str) -> Result<()> {
        match self.api.get(kind, id).await {
            Ok(_) => Err(CloudError::Verification(format!("{kind} {id} still exists"))),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Confirm absence for every identity of `kind` the state still
    /// tracks. The first surviving object fails the whole sweep.
    pub async fn assert_all_absent(&self, state: &StateFile, kind: &str) -> Result<()> {
        for (_, record) in state.records_of_kind(kind) {
            if record.has_identity() {
                self.assert_absent(kind, &record.id).await?;
            }
        }
        Ok(())
    }

    /// Confirm the object exists and the platform returns the identity
    /// that was asked for.
    pub async fn fetch_existing(&self, kind: &str, id: &str) -> Result<RemoteObject> {
        let found = self.api.get(kind, id).await?;
        if found.id != id {
            return Err(CloudError::Verification(format!(
                "{kind} lookup for {id} returned {}",
                found.id
            )));
        }
        Ok(found)
    }
}

/// Check one attribute for equality, reporting expected and actual on
/// mismatch.
pub fn assert_attr(object: &RemoteObject, field: &str, expected: &Value) -> Result<()> {
    match object.attr(field) {
        Some(actual) if actual == expected => Ok(()),
        actual => Err(CloudError::Verification(format!(
            "unexpected {} on {}: expected {}, got {}",
            field,
            object.id,
            expected,
            actual.map_or_else(|| "nothing".to_string(), Value::to_string)
        ))),
    }
}

/// Check the exact length of a sub-collection attribute. A missing
/// collection counts as empty.
pub fn assert_collection_len(object: &RemoteObject, field: &str, expected: usize) -> Result<()> {
    let got = object.attr_array(field).map_or(0, Vec::len);
    if got == expected {
        return Ok(());
    }
    Err(CloudError::Verification(format!(
        "unexpected number of {} in {}: expected {}, got {}",
        field, object.id, expected, got
    )))
}
