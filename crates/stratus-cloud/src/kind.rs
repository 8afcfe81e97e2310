//! Static resource kind descriptors

use crate::object::RemoteObject;

/// Describes one kind of platform resource to the engine.
///
/// Kind descriptors are plain constants owned by the platform binding
/// crate; there is no runtime registry.
#[derive(Debug, Clone, Copy)]
pub struct KindSpec {
    /// Kind name used in API calls, state keys and error messages.
    pub name: &'static str,

    /// Attribute carrying the platform lifecycle status, when the kind
    /// reports one. Kinds without a status attribute are ready as soon as
    /// a read succeeds.
    pub status_attr: Option<&'static str>,

    /// Status values meaning the resource is ready for use.
    pub ready_values: &'static [&'static str],

    /// Status values meaning provisioning failed for good.
    pub failed_values: &'static [&'static str],

    /// Attributes projected from remote snapshots into the local record.
    pub projected: &'static [&'static str],

    /// Declared attributes the controller converges through partial
    /// updates. A subset of `projected`.
    pub managed: &'static [&'static str],
}

impl KindSpec {
    pub fn is_ready(&self, object: &RemoteObject) -> bool {
        match self.status_attr {
            None => true,
            Some(attr) => object
                .attr_str(attr)
                .is_some_and(|status| self.ready_values.contains(&status)),
        }
    }

    pub fn is_failed(&self, object: &RemoteObject) -> bool {
        match self.status_attr {
            None => false,
            Some(attr) => object
                .attr_str(attr)
                .is_some_and(|status| self.failed_values.contains(&status)),
        }
    }
}

/// Describes a collection related to a parent kind, e.g. the shares of a
/// backup, and how its entries project into derived set-valued fields.
#[derive(Debug, Clone, Copy)]
pub struct RelatedSpec {
    /// Kind name of the related collection.
    pub kind: &'static str,

    /// Attribute on each entry referencing the parent object id; used to
    /// scope the list call.
    pub parent_attr: &'static str,

    /// `(entry attribute, local set field)` extraction pairs. The
    /// reserved entry attribute `id` extracts the entry's own identity.
    pub projections: &'static [(&'static str, &'static str)],
}
