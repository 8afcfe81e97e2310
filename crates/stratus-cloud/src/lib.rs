//! Stratus reconciliation engine
//!
//! Reconciles declarative resource descriptions against the live state of
//! a remote cloud platform: read-only lookups that must resolve to
//! exactly one remote object, and managed resources driven through a
//! create / poll / diff-update / delete lifecycle until declared and
//! remote state converge.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │             platform bindings (per kind)          │
//! │        lookups, managed resource flows            │
//! └─────────────────┬────────────────────────────────┘
//!                   │
//! ┌─────────────────▼────────────────────────────────┐
//! │               stratus-cloud                       │
//! │  ┌────────────┐ ┌────────────┐ ┌──────────────┐  │
//! │  │   lookup    │ │  project   │ │  lifecycle   │  │
//! │  │ exactly-one │ │ attributes │ │ create/poll/ │  │
//! │  │   matcher   │ │ + related  │ │ diff/delete  │  │
//! │  └────────────┘ └────────────┘ └──────────────┘  │
//! │  ┌────────────┐ ┌────────────┐ ┌──────────────┐  │
//! │  │   verify    │ │   state    │ │     plan     │  │
//! │  └────────────┘ └────────────┘ └──────────────┘  │
//! └─────────────────┬────────────────────────────────┘
//!                   │ trait RemoteApi
//! ┌─────────────────▼────────────────────────────────┐
//! │      transport client (external collaborator)     │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! The transport client, schema validation and credential handling are
//! external collaborators: the engine receives a typed [`RemoteApi`]
//! handle and validated attribute maps, and owns only the reconciliation
//! logic in between.

pub mod api;
pub mod error;
pub mod kind;
pub mod lifecycle;
pub mod lookup;
pub mod object;
pub mod plan;
pub mod policy;
pub mod project;
pub mod state;
pub mod verify;

// Re-exports
pub use api::RemoteApi;
pub use error::{CloudError, Result};
pub use kind::{KindSpec, RelatedSpec};
pub use lifecycle::Controller;
pub use lookup::find_one;
pub use object::{AttrMap, Criteria, Filter, RemoteObject};
pub use plan::{Action, ActionKind, FieldChange, Plan, PlanSummary, diff_attrs};
pub use policy::{PollPolicy, Timeouts};
pub use project::{DerivedSets, commit_expansion, expand_related, project_fields};
pub use state::{Phase, ResourceRecord, StateFile, StateLock, StateStore, record_key};
pub use verify::{Verifier, assert_attr, assert_collection_len};
