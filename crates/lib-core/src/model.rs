//! Snapshot types: an immutable structural description of a database at a
//! point in time. No rows, only definitions. Snapshots are inputs to the
//! diff engine and are never mutated by it.

pub mod aggregate;
pub mod database;
pub mod function;
pub mod hypertable;
pub mod table;
pub mod trigger;
pub mod view;

pub use aggregate::{ContinuousAggregate, RefreshPolicy};
pub use database::{CustomType, CustomTypeKind, Database, Extension, SchemaDef, Sequence};
pub use function::Function;
pub use hypertable::{
    CompressionSettings, Hypertable, OrderByColumn, RetentionPolicy, SortDirection,
};
pub use table::{
    Column, Constraint, ConstraintKind, Index, IndexKind, Partition, PartitionStrategy, Table,
};
pub use trigger::{Trigger, TriggerEvent, TriggerTiming};
pub use view::{MaterializedView, View};
