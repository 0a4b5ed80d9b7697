//! A TimescaleDB-aware PostgreSQL schema diff engine.
//!
//! [`compare`] takes two snapshots, the observed CURRENT schema and the
//! target DESIRED schema, and produces an ordered, severity-annotated
//! [`Plan`] of structural changes that transforms the first into the
//! second. The engine performs no I/O; building snapshots and emitting
//! migration SQL belong to callers.

pub mod api;
pub(crate) mod comparators;
pub(crate) mod depends;
pub mod options;
pub mod plan;
pub(crate) mod recreate;
pub(crate) mod resolver;

pub use api::compare;
pub use options::CompareOptions;
pub use pgdrift_lib_core::change::{
    Change, ChangeDetails, ChangeKind, ObjectKind, RecreatedObject, Severity,
};
pub use pgdrift_lib_core::errors::ComparisonError;
pub use pgdrift_lib_core::model;
pub use plan::{Plan, Stats};
