//! Per-kind comparators. Every comparator follows the same skeleton:
//! build a current-key map and a desired-key map, then detect objects
//! present only in desired (add), only in current (drop), or in both but
//! unequal under the kind-specific equality (modify).

pub(crate) mod column;
pub(crate) mod constraint;
pub(crate) mod continuous_aggregate;
pub(crate) mod custom_type;
pub(crate) mod extension;
pub(crate) mod function;
pub(crate) mod hypertable;
pub(crate) mod index;
pub(crate) mod partition;
pub(crate) mod schema;
pub(crate) mod sequence;
pub(crate) mod table;
pub(crate) mod trigger;
pub(crate) mod view;

use pgdrift_lib_core::change::Change;
use pgdrift_lib_core::helpers::IndexMap;
use pgdrift_lib_core::model::Database;

use crate::options::CompareOptions;

/// Shared state threaded through one comparison run.
pub(crate) struct CompareContext<'a> {
    pub(crate) current: &'a Database,
    pub(crate) desired: &'a Database,
    pub(crate) options: &'a CompareOptions,
    pub(crate) changes: Vec<Change>,
    pub(crate) warnings: Vec<String>,
}

impl<'a> CompareContext<'a> {
    pub(crate) fn new(
        current: &'a Database,
        desired: &'a Database,
        options: &'a CompareOptions,
    ) -> Self {
        CompareContext {
            current,
            desired,
            options,
            changes: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, change: Change) {
        tracing::debug!(kind = %change.kind, object = %change.object_name, "change detected");
        self.changes.push(change);
    }

    pub(crate) fn warn(&mut self, warning: String) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }
}

/// The aggregator's fixed invocation order.
pub(crate) fn comparators() -> Vec<fn(&mut CompareContext)> {
    vec![
        schema::compare,
        extension::compare,
        custom_type::compare,
        sequence::compare,
        table::compare,
        index::compare,
        view::compare_views,
        view::compare_materialized_views,
        function::compare,
        trigger::compare,
        hypertable::compare,
        continuous_aggregate::compare,
    ]
}

/// Keyed lookup preserving the snapshot's declaration order, so change
/// emission order is deterministic.
pub(crate) fn by_key<'a, T>(
    items: &'a [T],
    key: impl Fn(&T) -> String,
) -> IndexMap<String, &'a T> {
    items.iter().map(|item| (key(item), item)).collect()
}
