use pgdrift_lib_core::change::{Change, ChangeKind, ObjectKind, Severity};
use pgdrift_lib_core::model::{Partition, Table};
use pgdrift_lib_core::normalize::ident;

use crate::comparators::{by_key, CompareContext};

/// Partition changes are name-set diffs within one partitioned table;
/// bound definitions compare verbatim after trimming.
pub(crate) fn compare_tables(ctx: &mut CompareContext, current: &Table, desired: &Table) {
    let table = desired.qualified_name();
    let none = Vec::new();
    let current_parts = current
        .partitioning
        .as_ref()
        .map_or(&none, |strategy| &strategy.partitions);
    let desired_parts = desired
        .partitioning
        .as_ref()
        .map_or(&none, |strategy| &strategy.partitions);

    let current_map = by_key(current_parts, |partition: &Partition| {
        ident::normalize_ident(&partition.name)
    });
    let desired_map = by_key(desired_parts, |partition: &Partition| {
        ident::normalize_ident(&partition.name)
    });

    for (name, partition) in &desired_map {
        match current_map.get(name) {
            None => push_add(ctx, &table, desired, name),
            Some(existing)
                if existing.definition.trim() != partition.definition.trim() =>
            {
                // No MODIFY for partitions; a changed bound is a rebuild.
                push_drop(ctx, &table, desired, name);
                push_add(ctx, &table, desired, name);
            }
            Some(_) => {}
        }
    }
    for name in current_map.keys() {
        if !desired_map.contains_key(name) {
            push_drop(ctx, &table, desired, name);
        }
    }
}

fn push_add(ctx: &mut CompareContext, table: &str, owner: &Table, name: &str) {
    let mut change = Change::new(
        ChangeKind::AddPartition,
        Severity::Safe,
        ObjectKind::Partition,
        ident::qualified_name(&owner.schema, name),
        format!("add partition {name} to {table}"),
    );
    change.depends_on = vec![table.to_owned()];
    ctx.push(change);
}

fn push_drop(ctx: &mut CompareContext, table: &str, owner: &Table, name: &str) {
    ctx.push(Change::new(
        ChangeKind::DropPartition,
        Severity::Breaking,
        ObjectKind::Partition,
        ident::qualified_name(&owner.schema, name),
        format!("drop partition {name} of {table}"),
    ));
}

#[cfg(test)]
mod tests {
    use pgdrift_lib_core::model::{Database, PartitionStrategy};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::options::CompareOptions;

    fn partitioned(names: &[(&str, &str)]) -> Table {
        Table {
            schema: "public".into(),
            name: "events".into(),
            partitioning: Some(PartitionStrategy {
                definition: "RANGE (ts)".into(),
                partitions: names
                    .iter()
                    .map(|(name, bound)| Partition {
                        name: (*name).to_string(),
                        definition: (*bound).to_string(),
                    })
                    .collect(),
            }),
            ..Table::default()
        }
    }

    fn run(current: Table, desired: Table) -> Vec<Change> {
        let empty = Database::default();
        let options = CompareOptions::default();
        let mut ctx = CompareContext::new(&empty, &empty, &options);
        compare_tables(&mut ctx, &current, &desired);
        ctx.changes
    }

    #[test]
    fn partition_sets_diff_by_name() {
        let current = partitioned(&[("events_2023", "FOR VALUES FROM ('2023') TO ('2024')")]);
        let desired = partitioned(&[
            ("events_2023", "FOR VALUES FROM ('2023') TO ('2024')"),
            ("events_2024", "FOR VALUES FROM ('2024') TO ('2025')"),
        ]);
        let changes = run(current.clone(), desired.clone());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::AddPartition);
        assert_eq!(changes[0].severity, Severity::Safe);

        let drops = run(desired, current);
        assert_eq!(drops[0].kind, ChangeKind::DropPartition);
        assert_eq!(drops[0].severity, Severity::Breaking);
    }

    #[test]
    fn changed_bound_is_a_rebuild() {
        let current = partitioned(&[("events_2023", "FOR VALUES FROM ('2023') TO ('2024')")]);
        let desired = partitioned(&[("events_2023", "FOR VALUES FROM ('2023') TO ('2025')")]);
        let changes = run(current, desired);
        let kinds: Vec<ChangeKind> = changes.iter().map(|change| change.kind).collect();
        assert_eq!(kinds, vec![ChangeKind::DropPartition, ChangeKind::AddPartition]);
    }

    #[test]
    fn bound_whitespace_is_cosmetic() {
        let current = partitioned(&[("p1", "FOR VALUES IN (1)")]);
        let desired = partitioned(&[("p1", "  FOR VALUES IN (1)  ")]);
        assert_eq!(run(current, desired), vec![]);
    }
}
