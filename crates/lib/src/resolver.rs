//! The dependency resolver: builds a directed graph over the plan's
//! changes (explicit "provides" edges plus a catalog of implicit
//! cross-kind rules), topologically sorts it with a stable tie-break, and
//! assigns each change its execution order. A cycle fails the whole run
//! with a readable path.

use ahash::AHashSet;
use pgdrift_lib_core::change::{Change, ChangeDetails, ChangeKind, ObjectKind};
use pgdrift_lib_core::errors::ComparisonError;
use pgdrift_lib_core::graph;
use pgdrift_lib_core::model::{Constraint, Index};
use pgdrift_lib_core::normalize::ident;

use crate::comparators::index::normalize_index_column;

/// An ADD that creates the named object, exactly or with default-schema
/// elision in either direction.
fn provides(change: &Change, dependency: &str) -> bool {
    matches!(
        change.kind,
        ChangeKind::AddTable
            | ChangeKind::AddView
            | ChangeKind::AddMaterializedView
            | ChangeKind::AddFunction
            | ChangeKind::AddHypertable
    ) && ident::same_qualified(&change.object_name, dependency)
}

fn depends_on_contains(change: &Change, name: &str) -> bool {
    change
        .depends_on
        .iter()
        .any(|dependency| ident::same_qualified(dependency, name))
}

fn index_mentions_column(index: &Index, column: &str) -> bool {
    let column = ident::normalize_ident(column);
    index
        .columns
        .iter()
        .chain(&index.include_columns)
        .any(|expression| normalize_index_column(expression) == column)
}

fn constraint_mentions_column(constraint: &Constraint, column: &str) -> bool {
    let column = ident::normalize_ident(column);
    constraint
        .columns
        .iter()
        .any(|name| ident::normalize_ident(name) == column)
}

fn added_column_name(change: &Change) -> Option<&str> {
    match &change.details {
        ChangeDetails::ColumnAdd { column } => Some(&column.name),
        _ => None,
    }
}

fn dropped_column_name(change: &Change) -> Option<&str> {
    match &change.details {
        ChangeDetails::ColumnDrop { column } => Some(&column.name),
        _ => None,
    }
}

/// The implicit cross-kind rule catalog: `true` adds edge `change` →
/// `prerequisite`, meaning the prerequisite must execute first.
fn implicit_edge(change: &Change, prerequisite: &Change) -> bool {
    use ChangeKind::*;

    // Everything in a schema waits for the schema itself.
    if prerequisite.kind == AddSchema && change.object_kind != ObjectKind::Schema {
        let (schema, _) = ident::split_qualified(&change.object_name);
        if schema == ident::normalize_ident(&prerequisite.object_name) {
            return true;
        }
    }
    // Extensions come before everything else.
    if matches!(prerequisite.kind, AddExtension | ModifyExtension)
        && change.object_kind != ObjectKind::Extension
    {
        return true;
    }
    // Columns may use enum types.
    if change.kind == AddTable && prerequisite.kind == AddCustomType {
        return true;
    }
    // Indexes and constraints wait for their table.
    if matches!(change.kind, AddIndex | AddConstraint)
        && prerequisite.kind == AddTable
        && ident::same_qualified(&change.object_name, &prerequisite.object_name)
    {
        return true;
    }
    // Views wait for the tables they read.
    if matches!(change.kind, AddView | AddMaterializedView)
        && prerequisite.kind == AddTable
        && depends_on_contains(change, &prerequisite.object_name)
    {
        return true;
    }
    // Triggers wait for their function.
    if change.kind == AddTrigger
        && prerequisite.kind == AddFunction
        && depends_on_contains(change, &prerequisite.object_name)
    {
        return true;
    }
    // A hypertable is made from its table.
    if change.kind == AddHypertable
        && prerequisite.kind == AddTable
        && ident::same_qualified(&change.object_name, &prerequisite.object_name)
    {
        return true;
    }
    // Policies wait for their hypertable.
    if matches!(change.kind, AddCompressionPolicy | AddRetentionPolicy)
        && prerequisite.kind == AddHypertable
        && ident::same_qualified(&change.object_name, &prerequisite.object_name)
    {
        return true;
    }
    // Drops run dependents-first.
    if change.kind == DropTable
        && matches!(prerequisite.kind, DropView | DropMaterializedView)
        && depends_on_contains(prerequisite, &change.object_name)
    {
        return true;
    }
    if change.kind == DropFunction
        && prerequisite.kind == DropTrigger
        && depends_on_contains(prerequisite, &change.object_name)
    {
        return true;
    }
    if change.kind == DropTable
        && prerequisite.kind == DropConstraint
        && depends_on_contains(prerequisite, &change.object_name)
    {
        return true;
    }
    if change.kind == DropHypertable
        && matches!(
            prerequisite.kind,
            DropCompressionPolicy | DropRetentionPolicy
        )
        && ident::same_qualified(&change.object_name, &prerequisite.object_name)
    {
        return true;
    }
    // Comments land on objects that exist.
    if change.kind == ModifyTableComment
        && prerequisite.kind == AddTable
        && ident::same_qualified(&change.object_name, &prerequisite.object_name)
    {
        return true;
    }
    if change.kind == ModifyColumnComment {
        if prerequisite.kind == AddTable
            && ident::same_qualified(&change.object_name, &prerequisite.object_name)
        {
            return true;
        }
        if prerequisite.kind == AddColumn
            && ident::same_qualified(&change.object_name, &prerequisite.object_name)
        {
            if let (
                ChangeDetails::ColumnComment { column_name, .. },
                Some(added),
            ) = (&change.details, added_column_name(prerequisite))
            {
                if ident::normalize_ident(added) == *column_name {
                    return true;
                }
            }
        }
    }
    // Comment-only modifies follow the ADD they decorate.
    if change.details.is_comment_only() {
        let pair = matches!(
            (change.kind, prerequisite.kind),
            (ModifyView, AddView)
                | (ModifyMaterializedView, AddMaterializedView)
                | (ModifyFunction, AddFunction)
                | (ModifyContinuousAggregate, AddContinuousAggregate)
        );
        if pair && ident::same_qualified(&change.object_name, &prerequisite.object_name) {
            return true;
        }
    }
    // Views using a new column wait for it.
    if matches!(
        change.kind,
        ModifyView | ModifyMaterializedView | AddView | AddMaterializedView
    ) && prerequisite.kind == AddColumn
        && depends_on_contains(change, &prerequisite.object_name)
    {
        return true;
    }
    // Dependent views and aggregates release the column before it is
    // dropped.
    if change.kind == DropColumn
        && matches!(
            prerequisite.kind,
            ModifyView
                | ModifyMaterializedView
                | DropView
                | DropMaterializedView
                | DropContinuousAggregate
        )
        && depends_on_contains(prerequisite, &change.object_name)
    {
        return true;
    }
    // Indexes and constraints using a new column wait for it.
    if matches!(change.kind, AddIndex | ModifyIndex)
        && prerequisite.kind == AddColumn
        && ident::same_qualified(&change.object_name, &prerequisite.object_name)
    {
        if let (ChangeDetails::IndexDef { desired: Some(index), .. }, Some(column)) =
            (&change.details, added_column_name(prerequisite))
        {
            if index_mentions_column(index, column) {
                return true;
            }
        }
    }
    if matches!(change.kind, AddConstraint | ModifyConstraint)
        && prerequisite.kind == AddColumn
        && ident::same_qualified(&change.object_name, &prerequisite.object_name)
    {
        if let (
            ChangeDetails::ConstraintDef { desired: Some(constraint), .. },
            Some(column),
        ) = (&change.details, added_column_name(prerequisite))
        {
            if constraint_mentions_column(constraint, column) {
                return true;
            }
        }
    }
    // Indexes and constraints release a column before it is dropped.
    if change.kind == DropColumn
        && prerequisite.kind == DropIndex
        && ident::same_qualified(&change.object_name, &prerequisite.object_name)
    {
        if let (
            Some(column),
            ChangeDetails::IndexDef { current: Some(index), .. },
        ) = (dropped_column_name(change), &prerequisite.details)
        {
            if index_mentions_column(index, column) {
                return true;
            }
        }
    }
    if change.kind == DropColumn
        && prerequisite.kind == DropConstraint
        && ident::same_qualified(&change.object_name, &prerequisite.object_name)
    {
        if let (
            Some(column),
            ChangeDetails::ConstraintDef { current: Some(constraint), .. },
        ) = (dropped_column_name(change), &prerequisite.details)
        {
            if constraint_mentions_column(constraint, column) {
                return true;
            }
        }
    }
    // Recreation ordering: the drop precedes the column modification, the
    // add follows it.
    if matches!(
        change.kind,
        AddView | AddMaterializedView | AddContinuousAggregate
    ) && matches!(
        prerequisite.kind,
        ModifyColumnType | ModifyColumnNullability
    ) && depends_on_contains(change, &prerequisite.object_name)
    {
        return true;
    }
    if matches!(change.kind, ModifyColumnType | ModifyColumnNullability)
        && matches!(
            prerequisite.kind,
            DropView | DropMaterializedView | DropContinuousAggregate
        )
        && depends_on_contains(prerequisite, &change.object_name)
    {
        return true;
    }
    // Aggregates wait for their hypertable and the tables they read.
    if change.kind == AddContinuousAggregate
        && matches!(prerequisite.kind, AddTable | AddHypertable)
        && depends_on_contains(change, &prerequisite.object_name)
    {
        return true;
    }
    if change.kind == DropHypertable
        && prerequisite.kind == DropContinuousAggregate
        && depends_on_contains(prerequisite, &change.object_name)
    {
        return true;
    }

    false
}

/// Builds the graph, topologically sorts it (Kahn with a stable priority
/// queue), and writes each change's order. Ties break by
/// (object-name-for-sorting, change-kind priority, original index).
pub(crate) fn resolve(changes: &mut [Change]) -> Result<(), ComparisonError> {
    let node_count = changes.len();
    let mut dependencies: Vec<AHashSet<usize>> = vec![AHashSet::new(); node_count];

    for (node, change) in changes.iter().enumerate() {
        for dependency in &change.depends_on {
            for (provider, candidate) in changes.iter().enumerate() {
                if node != provider && provides(candidate, dependency) {
                    dependencies[node].insert(provider);
                }
            }
        }
    }
    for node in 0..node_count {
        for prerequisite in 0..node_count {
            if node != prerequisite && implicit_edge(&changes[node], &changes[prerequisite]) {
                dependencies[node].insert(prerequisite);
            }
        }
    }
    let edge_count: usize = dependencies.iter().map(|set| set.len()).sum();
    tracing::debug!(nodes = node_count, edges = edge_count, "dependency graph built");

    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut remaining: Vec<usize> = dependencies.iter().map(|set| set.len()).collect();
    for (node, prerequisites) in dependencies.iter().enumerate() {
        for &prerequisite in prerequisites {
            dependents[prerequisite].push(node);
        }
    }

    let sort_keys: Vec<(String, u32, usize)> = changes
        .iter()
        .enumerate()
        .map(|(index, change)| {
            (
                change.sort_name().to_lowercase(),
                change.kind.priority(),
                index,
            )
        })
        .collect();

    let mut ready: Vec<usize> = (0..node_count)
        .filter(|&node| remaining[node] == 0)
        .collect();
    let mut emitted = 0;
    while !ready.is_empty() {
        // Total order restored on every queue change; descending so the
        // smallest key pops off the back.
        ready.sort_by(|&a, &b| sort_keys[b].cmp(&sort_keys[a]));
        let Some(node) = ready.pop() else { break };
        changes[node].order = emitted;
        emitted += 1;
        for &dependent in &dependents[node] {
            remaining[dependent] -= 1;
            if remaining[dependent] == 0 {
                ready.push(dependent);
            }
        }
    }

    if emitted < node_count {
        let residual: Vec<usize> = (0..node_count)
            .filter(|&node| remaining[node] > 0)
            .collect();
        let mut neighbors = |node: usize| {
            dependencies[node]
                .iter()
                .copied()
                .filter(|&prerequisite| remaining[prerequisite] > 0)
                .collect::<Vec<_>>()
        };
        let cycle = graph::find_cycle(&residual, &mut neighbors).unwrap_or(residual);
        let path = graph::format_cycle(&cycle, |node| changes[node].display_label());
        return Err(ComparisonError::CircularDependency { path });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pgdrift_lib_core::change::Severity;
    use pretty_assertions::assert_eq;

    use super::*;

    fn change(kind: ChangeKind, object_kind: ObjectKind, name: &str) -> Change {
        Change::new(kind, Severity::Safe, object_kind, name, format!("{kind} {name}"))
    }

    fn order_of<'a>(changes: &'a [Change], name: &str, kind: ChangeKind) -> usize {
        changes
            .iter()
            .find(|candidate| candidate.object_name == name && candidate.kind == kind)
            .map(|candidate| candidate.order)
            .unwrap_or(usize::MAX)
    }

    #[test]
    fn explicit_provides_edges_order_views_after_tables() {
        let mut view = change(ChangeKind::AddView, ObjectKind::View, "public.user_view");
        view.depends_on = vec!["users".into()];
        let mut changes = vec![
            view,
            change(ChangeKind::AddTable, ObjectKind::Table, "public.users"),
        ];
        resolve(&mut changes).unwrap();
        assert!(
            order_of(&changes, "public.users", ChangeKind::AddTable)
                < order_of(&changes, "public.user_view", ChangeKind::AddView)
        );
    }

    #[test]
    fn schemas_come_first_and_ties_break_by_name() {
        let mut changes = vec![
            change(ChangeKind::AddTable, ObjectKind::Table, "zeta.b"),
            change(ChangeKind::AddTable, ObjectKind::Table, "zeta.a"),
            change(ChangeKind::AddSchema, ObjectKind::Schema, "zeta"),
        ];
        resolve(&mut changes).unwrap();
        assert_eq!(order_of(&changes, "zeta", ChangeKind::AddSchema), 0);
        assert!(
            order_of(&changes, "zeta.a", ChangeKind::AddTable)
                < order_of(&changes, "zeta.b", ChangeKind::AddTable)
        );
    }

    #[test]
    fn mutual_view_references_report_a_cycle() {
        let mut a = change(ChangeKind::AddView, ObjectKind::View, "public.a");
        a.depends_on = vec!["public.b".into()];
        let mut b = change(ChangeKind::AddView, ObjectKind::View, "public.b");
        b.depends_on = vec!["public.a".into()];
        let mut changes = vec![a, b];
        let error = resolve(&mut changes).unwrap_err();
        let message = error.to_string();
        assert!(message.contains("circular dependency detected"), "{message}");
        assert!(message.contains(" -> "), "{message}");
    }

    #[test]
    fn self_dependency_is_suppressed() {
        let mut table = change(ChangeKind::AddTable, ObjectKind::Table, "public.node");
        // a self-referential foreign key leaves the table depending on itself
        table.depends_on = vec!["public.node".into()];
        let mut changes = vec![table];
        resolve(&mut changes).unwrap();
        assert_eq!(changes[0].order, 0);
    }

    #[test]
    fn stable_tie_break_prefers_kind_priority_within_a_name() {
        let mut comment = change(
            ChangeKind::ModifyTableComment,
            ObjectKind::Table,
            "public.t",
        );
        comment.details = ChangeDetails::CommentOnly {
            old_comment: String::new(),
            new_comment: "t".into(),
        };
        let mut changes = vec![
            comment,
            change(ChangeKind::AddTable, ObjectKind::Table, "public.t"),
        ];
        resolve(&mut changes).unwrap();
        assert_eq!(order_of(&changes, "public.t", ChangeKind::AddTable), 0);
        assert_eq!(
            order_of(&changes, "public.t", ChangeKind::ModifyTableComment),
            1
        );
    }
}
