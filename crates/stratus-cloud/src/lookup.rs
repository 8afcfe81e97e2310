//! Exactly-one lookup over a remote collection
//!
//! Declarative references must bind deterministically: an ambiguous
//! lookup would otherwise attach local state to an arbitrary remote
//! object. The matcher therefore insists on exactly one result.

use crate::api::RemoteApi;
use crate::error::{CloudError, Result};
use crate::object::{Criteria, RemoteObject};

/// Resolve a criteria set to exactly one remote object.
///
/// Every concrete criterion scopes the list call; wildcards impose no
/// constraint. Zero matches fail with `NoMatches`, more than one with
/// `Ambiguous`. Purely read-only.
pub async fn find_one<A: RemoteApi + ?Sized>(
    api: &A,
    kind: &str,
    criteria: &Criteria,
) -> Result<RemoteObject> {
    let filter = criteria.to_filter();
    tracing::debug!(kind, ?filter, "listing remote collection");

    let mut matches = api.list(kind, &filter).await?;

    match matches.len() {
        0 => Err(CloudError::NoMatches {
            kind: kind.to_string(),
        }),
        1 => {
            let object = matches.remove(0);
            tracing::debug!(kind, id = %object.id, "retrieved object using given filter");
            Ok(object)
        }
        count => Err(CloudError::Ambiguous {
            kind: kind.to_string(),
            count,
        }),
    }
}
