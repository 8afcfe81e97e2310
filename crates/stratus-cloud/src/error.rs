//! Engine error types

use std::time::Duration;
use thiserror::Error;

/// Errors produced by the reconciliation and lookup engine.
///
/// Transport-level faults raised by the platform client are carried
/// opaquely in [`CloudError::Transport`]; the engine never reinterprets
/// them as absence.
#[derive(Error, Debug)]
pub enum CloudError {
    /// A filtered lookup matched nothing.
    #[error("{kind} query returned no results, adjust the search criteria and try again")]
    NoMatches { kind: String },

    /// A filtered lookup matched more than one object.
    #[error("{kind} query returned {count} results, refine the search criteria")]
    Ambiguous { kind: String, count: usize },

    /// An identity-based read found nothing. Also the signal that confirms
    /// absence after a delete.
    #[error("{kind} {id} not found")]
    NotFound { kind: String, id: String },

    /// Fetching a related collection failed while projecting a parent
    /// object. The parent projection is aborted, nothing is committed.
    #[error("unable to retrieve {related} for {kind} {id}: {source}")]
    RelatedFetch {
        kind: String,
        id: String,
        related: String,
        #[source]
        source: Box<CloudError>,
    },

    /// The platform did not report the resource ready before the deadline.
    #[error("timed out after {waited:?} waiting for {kind} {id} to become ready")]
    ProvisioningTimeout {
        kind: String,
        id: String,
        waited: Duration,
    },

    /// The platform did not confirm deletion before the deadline.
    #[error("timed out after {waited:?} waiting for {kind} {id} to be deleted")]
    DeletionTimeout {
        kind: String,
        id: String,
        waited: Duration,
    },

    /// A read-side invariant check failed. The message carries expected
    /// and actual values.
    #[error("verification failed: {0}")]
    Verification(String),

    /// Opaque transport or authentication fault from the platform client.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The platform rejected a request.
    #[error("API error: {0}")]
    Api(String),

    #[error("state file error: {0}")]
    State(String),

    #[error("lock acquisition failed: {0}")]
    Lock(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        CloudError::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Whether this error means "the resource is absent": either a
    /// filtered lookup matched nothing or an identity read missed.
    /// Callers that tolerate absence branch on this; transport faults
    /// never qualify.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CloudError::NoMatches { .. } | CloudError::NotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_covers_both_read_misses() {
        let miss = CloudError::not_found("backup", "b-1");
        let empty = CloudError::NoMatches {
            kind: "backup".to_string(),
        };
        let fault = CloudError::Transport("connection reset".to_string());

        assert!(miss.is_not_found());
        assert!(empty.is_not_found());
        assert!(!fault.is_not_found());
    }

    #[test]
    fn messages_carry_diagnostic_context() {
        let err = CloudError::Ambiguous {
            kind: "backup".to_string(),
            count: 3,
        };
        assert_eq!(
            err.to_string(),
            "backup query returned 3 results, refine the search criteria"
        );
    }
}
