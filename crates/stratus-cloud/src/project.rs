//! Projection of remote snapshots onto local records

use crate::api::RemoteApi;
use crate::error::{CloudError, Result};
use crate::kind::RelatedSpec;
use crate::object::{Filter, RemoteObject};
use crate::state::ResourceRecord;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};

/// Copy the listed fields from a remote snapshot onto the record,
/// name for name.
///
/// A field the remote side does not report (or reports as null) keeps
/// its prior local value; a remote omission never clobbers known state
/// with emptiness. Sub-collection values are copied whole.
pub fn project_fields(record: &mut ResourceRecord, object: &RemoteObject, fields: &[&str]) {
    for &field in fields {
        match object.attr(field) {
            Some(value) if !value.is_null() => {
                record.attributes.insert(field.to_string(), value.clone());
            }
            _ => {}
        }
    }
    record.updated_at = Utc::now();
}

/// Derived sets produced by one related-collection expansion, keyed by
/// the local set field they belong to.
pub type DerivedSets = HashMap<String, BTreeSet<String>>;

/// Expand a related collection into derived identity sets.
///
/// Lists the related kind scoped by the parent reference and extracts
/// one value per projection pair from every entry. Duplicates across
/// entries collapse at the set boundary; order is irrelevant. A fetch
/// failure surfaces as `RelatedFetch` and yields nothing. Callers only
/// commit the sets on success, so the parent record is never left with
/// stale derived fields next to fresh primary ones.
pub async fn expand_related<A: RemoteApi + ?Sized>(
    api: &A,
    parent_kind: &str,
    parent_id: &str,
    related: &RelatedSpec,
) -> Result<DerivedSets> {
    let mut filter = Filter::new();
    filter.insert(related.parent_attr, parent_id);

    let entries = api
        .list(related.kind, &filter)
        .await
        .map_err(|source| CloudError::RelatedFetch {
            kind: parent_kind.to_string(),
            id: parent_id.to_string(),
            related: related.kind.to_string(),
            source: Box::new(source),
        })?;

    let mut sets: DerivedSets = related
        .projections
        .iter()
        .map(|&(_, target)| (target.to_string(), BTreeSet::new()))
        .collect();

    for entry in &entries {
        for &(source_attr, target) in related.projections {
            let value = if source_attr == "id" {
                Some(entry.id.as_str())
            } else {
                entry.attr_str(source_attr)
            };
            if let Some(value) = value {
                if let Some(set) = sets.get_mut(target) {
                    set.insert(value.to_string());
                }
            }
        }
    }

    tracing::debug!(
        parent = parent_id,
        related = related.kind,
        entries = entries.len(),
        "expanded related collection"
    );
    Ok(sets)
}

/// Commit derived sets onto the record as sorted array fields.
pub fn commit_expansion(record: &mut ResourceRecord, sets: &DerivedSets) {
    for (field, set) in sets {
        record.set_string_set(field.clone(), set);
    }
}
