//! The public entry point: run every comparator in the fixed order, filter
//! duplicates, apply the recreation passes, resolve dependencies, sort,
//! and compute statistics.

use ahash::AHashSet;
use pgdrift_lib_core::change::{Change, ChangeDetails};
use pgdrift_lib_core::errors::ComparisonError;
use pgdrift_lib_core::model::Database;

use crate::comparators::{self, CompareContext};
use crate::options::CompareOptions;
use crate::plan::{Plan, Stats};
use crate::{recreate, resolver};

/// Compares two snapshots and produces the ordered plan that transforms
/// `current` into `desired`. The snapshots are never mutated. An empty
/// plan is a successful result; the only failure is an unresolvable
/// dependency cycle.
pub fn compare(
    current: &Database,
    desired: &Database,
    options: &CompareOptions,
) -> Result<Plan, ComparisonError> {
    let mut ctx = CompareContext::new(current, desired, options);
    for comparator in comparators::comparators() {
        comparator(&mut ctx);
    }
    let CompareContext {
        mut changes,
        warnings,
        ..
    } = ctx;

    drop_duplicates(&mut changes);
    recreate::rewrite_views(&mut changes, current, desired);
    recreate::rewrite_aggregates(&mut changes, current, desired);
    resolver::resolve(&mut changes)?;
    changes.sort_by_key(|change| change.order);
    debug_assert!(
        changes
            .iter()
            .enumerate()
            .all(|(position, change)| change.order == position),
        "resolver must assign a dense order"
    );

    let stats = Stats::from_changes(&changes);
    tracing::debug!(changes = changes.len(), warnings = warnings.len(), "plan ready");
    Ok(Plan {
        changes,
        warnings,
        stats,
    })
}

/// A second comparator reaching the same object (e.g. an index listed both
/// under a materialized view and its backing table) must not double-count.
fn drop_duplicates(changes: &mut Vec<Change>) {
    let mut seen = AHashSet::new();
    changes.retain(|change| {
        let fingerprint = (
            change.kind,
            change.object_name.clone(),
            detail_fingerprint(&change.details),
        );
        seen.insert(fingerprint)
    });
}

/// Distinct enough to keep different changes on the same object apart
/// while collapsing a genuinely repeated one.
fn detail_fingerprint(details: &ChangeDetails) -> String {
    format!("{details:?}")
}
