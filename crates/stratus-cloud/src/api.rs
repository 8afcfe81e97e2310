//! Logical platform API surface

use crate::error::Result;
use crate::object::{AttrMap, Filter, RemoteObject};
use async_trait::async_trait;

/// Logical calls the engine issues against the remote platform.
///
/// Implementations are constructed elsewhere from region and credentials;
/// the engine receives a ready handle and never touches authentication,
/// TLS or wire serialization. The handle is safe for concurrent use;
/// multiple resource instances may reconcile against it at once.
///
/// The implementation owns retries for transport-level faults. The engine
/// owns polling for platform-level asynchronous completion, so `create`
/// returning an identity does not imply the resource is ready, and
/// `delete` returning does not imply it is gone.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// List the collection of `kind`, scoped by the conjunctive filter.
    async fn list(&self, kind: &str, filter: &Filter) -> Result<Vec<RemoteObject>>;

    /// Read one object by identity. Fails with `NotFound` when absent.
    async fn get(&self, kind: &str, id: &str) -> Result<RemoteObject>;

    /// Submit a create and return the platform-assigned identity.
    async fn create(&self, kind: &str, attrs: &AttrMap) -> Result<String>;

    /// Apply a partial attribute update to an existing object.
    async fn update(&self, kind: &str, id: &str, patch: &AttrMap) -> Result<()>;

    /// Submit a delete for an existing object.
    async fn delete(&self, kind: &str, id: &str) -> Result<()>;
}
