//! The recreation rewriter: a post-pass that converts certain view and
//! continuous-aggregate modifications into drop-plus-recreate pairs when an
//! underlying column change forces the dependent object to be rebuilt.
//! Matching is purely over each object's declared dependencies, so a table
//! reached only through a set-returning function does not trigger a
//! rebuild.

use ahash::AHashSet;
use pgdrift_lib_core::change::{
    Change, ChangeDetails, ChangeKind, ObjectKind, RecreatedObject, Severity,
};
use pgdrift_lib_core::model::Database;
use pgdrift_lib_core::normalize::ident;

use crate::comparators::continuous_aggregate;
use crate::depends::extract_dependencies;

/// Lower-cased object names of changes with any of `kinds`.
fn tables_with(changes: &[Change], kinds: &[ChangeKind]) -> AHashSet<String> {
    changes
        .iter()
        .filter(|change| kinds.contains(&change.kind))
        .map(|change| change.object_name.to_lowercase())
        .collect()
}

fn references_affected_table(deps: &[String], affected: &AHashSet<String>) -> bool {
    deps.iter()
        .any(|dep| affected.iter().any(|table| ident::same_qualified(dep, table)))
}

/// The change kinds and severities for one recreatable object family.
struct RecreationKinds {
    object_kind: ObjectKind,
    modify: ChangeKind,
    drop: ChangeKind,
    add: ChangeKind,
    drop_severity: Severity,
    label: &'static str,
}

fn drop_change(
    kinds: &RecreationKinds,
    name: &str,
    deps: Vec<String>,
    original: Option<Change>,
) -> Change {
    let mut change = Change::new(
        kinds.drop,
        kinds.drop_severity,
        kinds.object_kind,
        name,
        format!("drop {} {name} for column change", kinds.label),
    );
    change.depends_on = deps;
    change.details = ChangeDetails::Recreation {
        object: recreated(kinds, name),
        for_type_change: true,
        original_change: original.map(Box::new),
    };
    change
}

fn add_change(kinds: &RecreationKinds, name: &str, deps: Vec<String>) -> Change {
    let mut change = Change::new(
        kinds.add,
        Severity::Safe,
        kinds.object_kind,
        name,
        format!("recreate {} {name}", kinds.label),
    );
    change.depends_on = deps;
    change.details = ChangeDetails::Recreation {
        object: recreated(kinds, name),
        for_type_change: true,
        original_change: None,
    };
    change
}

fn recreated(kinds: &RecreationKinds, name: &str) -> RecreatedObject {
    if kinds.object_kind == ObjectKind::ContinuousAggregate {
        RecreatedObject::Aggregate(name.to_owned())
    } else {
        RecreatedObject::View(name.to_owned())
    }
}

/// Replaces an existing MODIFY in place, or appends a drop-plus-add pair
/// for an otherwise untouched dependent.
fn rewrite_one(
    changes: &mut Vec<Change>,
    kinds: &RecreationKinds,
    name: &str,
    exists_in_current: bool,
    current_deps: Option<Vec<String>>,
    desired_deps: Vec<String>,
) {
    let position = changes.iter().position(|change| {
        change.kind == kinds.modify
            && change.object_name == name
            && !change.details.is_comment_only()
    });
    match position {
        Some(position) => {
            let original = changes[position].clone();
            changes[position] = drop_change(
                kinds,
                name,
                current_deps.unwrap_or_else(|| desired_deps.clone()),
                Some(original),
            );
            changes.push(add_change(kinds, name, desired_deps));
        }
        None if exists_in_current => {
            changes.push(drop_change(
                kinds,
                name,
                current_deps.unwrap_or_else(|| desired_deps.clone()),
                None,
            ));
            changes.push(add_change(kinds, name, desired_deps));
        }
        None => {}
    }
}

/// Views and materialized views whose dependencies name a table with a
/// column-type change are rebuilt.
pub(crate) fn rewrite_views(changes: &mut Vec<Change>, current: &Database, desired: &Database) {
    let affected = tables_with(changes, &[ChangeKind::ModifyColumnType]);
    if affected.is_empty() {
        return;
    }

    let view_kinds = RecreationKinds {
        object_kind: ObjectKind::View,
        modify: ChangeKind::ModifyView,
        drop: ChangeKind::DropView,
        add: ChangeKind::AddView,
        drop_severity: Severity::PotentiallyBreaking,
        label: "view",
    };
    for view in &desired.views {
        let desired_deps = extract_dependencies(&view.definition);
        if !references_affected_table(&desired_deps, &affected) {
            continue;
        }
        let name = view.qualified_name();
        let existing = current
            .views
            .iter()
            .find(|candidate| candidate.qualified_name() == name);
        rewrite_one(
            changes,
            &view_kinds,
            &name,
            existing.is_some(),
            existing.map(|view| extract_dependencies(&view.definition)),
            desired_deps,
        );
    }

    let materialized_kinds = RecreationKinds {
        object_kind: ObjectKind::MaterializedView,
        modify: ChangeKind::ModifyMaterializedView,
        drop: ChangeKind::DropMaterializedView,
        add: ChangeKind::AddMaterializedView,
        drop_severity: Severity::PotentiallyBreaking,
        label: "materialized view",
    };
    for view in &desired.materialized_views {
        let desired_deps = extract_dependencies(&view.definition);
        if !references_affected_table(&desired_deps, &affected) {
            continue;
        }
        let name = view.qualified_name();
        let existing = current
            .materialized_views
            .iter()
            .find(|candidate| candidate.qualified_name() == name);
        rewrite_one(
            changes,
            &materialized_kinds,
            &name,
            existing.is_some(),
            existing.map(|view| extract_dependencies(&view.definition)),
            desired_deps,
        );
    }
}

/// Continuous aggregates are rebuilt when their hypertable has a
/// column-type or nullability change. Dropping one discards materialized
/// history, hence the harsher severity.
pub(crate) fn rewrite_aggregates(changes: &mut Vec<Change>, current: &Database, desired: &Database) {
    let affected = tables_with(
        changes,
        &[
            ChangeKind::ModifyColumnType,
            ChangeKind::ModifyColumnNullability,
        ],
    );
    if affected.is_empty() {
        return;
    }

    let aggregate_kinds = RecreationKinds {
        object_kind: ObjectKind::ContinuousAggregate,
        modify: ChangeKind::ModifyContinuousAggregate,
        drop: ChangeKind::DropContinuousAggregate,
        add: ChangeKind::AddContinuousAggregate,
        drop_severity: Severity::Breaking,
        label: "continuous aggregate",
    };
    for aggregate in &desired.continuous_aggregates {
        let hypertable = aggregate.qualified_hypertable();
        let matched = affected
            .iter()
            .any(|table| ident::same_qualified(table, &hypertable));
        if !matched {
            continue;
        }
        let name = aggregate.qualified_name();
        let existing = current
            .continuous_aggregates
            .iter()
            .find(|candidate| candidate.qualified_name() == name);
        rewrite_one(
            changes,
            &aggregate_kinds,
            &name,
            existing.is_some(),
            existing.map(continuous_aggregate::dependencies),
            continuous_aggregate::dependencies(aggregate),
        );
    }
}

#[cfg(test)]
mod tests {
    use pgdrift_lib_core::model::View;
    use pretty_assertions::assert_eq;

    use super::*;

    fn type_change(table: &str) -> Change {
        Change::new(
            ChangeKind::ModifyColumnType,
            Severity::DataMigrationRequired,
            ObjectKind::Column,
            table,
            format!("modify type of a column on {table}"),
        )
    }

    fn database_with_view(definition: &str) -> Database {
        Database {
            views: vec![View {
                schema: "public".into(),
                name: "v".into(),
                definition: definition.into(),
                ..View::default()
            }],
            ..Database::default()
        }
    }

    #[test]
    fn untouched_dependent_view_gets_a_drop_add_pair() {
        let current = database_with_view("SELECT id, category FROM products");
        let desired = current.clone();
        let mut changes = vec![type_change("public.products")];
        rewrite_views(&mut changes, &current, &desired);

        let kinds: Vec<ChangeKind> = changes.iter().map(|change| change.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ChangeKind::ModifyColumnType,
                ChangeKind::DropView,
                ChangeKind::AddView
            ]
        );
        assert_eq!(changes[1].severity, Severity::PotentiallyBreaking);
        assert_eq!(changes[2].severity, Severity::Safe);
        assert!(changes[1].details.is_recreation());
    }

    #[test]
    fn existing_modify_is_replaced_in_place() {
        let current = database_with_view("SELECT id FROM products");
        let desired = database_with_view("SELECT id, category FROM products");
        let mut modify = Change::new(
            ChangeKind::ModifyView,
            Severity::PotentiallyBreaking,
            ObjectKind::View,
            "public.v",
            "modify view public.v",
        );
        modify.depends_on = vec!["products".into()];
        let mut changes = vec![type_change("public.products"), modify.clone()];
        rewrite_views(&mut changes, &current, &desired);

        assert_eq!(changes.len(), 3);
        assert_eq!(changes[1].kind, ChangeKind::DropView);
        match &changes[1].details {
            ChangeDetails::Recreation {
                original_change: Some(original),
                for_type_change,
                ..
            } => {
                assert!(*for_type_change);
                assert_eq!(original.kind, ChangeKind::ModifyView);
            }
            details => panic!("expected recreation details, got {details:?}"),
        }
        assert_eq!(changes[2].kind, ChangeKind::AddView);
    }

    #[test]
    fn views_over_other_tables_are_left_alone() {
        let current = database_with_view("SELECT id FROM orders");
        let desired = current.clone();
        let mut changes = vec![type_change("public.products")];
        rewrite_views(&mut changes, &current, &desired);
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn nullability_changes_rebuild_aggregates_but_not_views() {
        let current = database_with_view("SELECT id FROM products");
        let desired = current.clone();
        let nullability = Change::new(
            ChangeKind::ModifyColumnNullability,
            Severity::DataMigrationRequired,
            ObjectKind::Column,
            "public.products",
            "set not null",
        );
        let mut changes = vec![nullability];
        rewrite_views(&mut changes, &current, &desired);
        assert_eq!(changes.len(), 1);
    }
}
