use pgdrift_lib_core::change::{Change, ChangeKind, ObjectKind, Severity};
use pgdrift_lib_core::model::{Database, Trigger};
use pgdrift_lib_core::normalize::{expr, ident};

use crate::comparators::{by_key, CompareContext};

/// Triggers are unique per (schema, table, name): partitions inherit their
/// parent's trigger under the same name.
fn trigger_key(trigger: &Trigger) -> String {
    format!(
        "{}.{}",
        trigger.qualified_table(),
        ident::normalize_ident(&trigger.name)
    )
}

fn same_trigger(a: &Trigger, b: &Trigger) -> bool {
    a.qualified_table() == b.qualified_table()
        && a.timing == b.timing
        && a.event_set() == b.event_set()
        && a.for_each_row == b.for_each_row
        && a.qualified_function() == b.qualified_function()
        && expr::same_expression(&a.when_condition, &b.when_condition)
}

/// Every function key in `db` matching the trigger's target, or the bare
/// qualified name when the snapshot has none.
fn function_dependencies(db: &Database, trigger: &Trigger) -> Vec<String> {
    let target = trigger.qualified_function();
    let signatures: Vec<String> = db
        .functions
        .iter()
        .filter(|function| function.qualified_name() == target)
        .map(|function| function.signature())
        .collect();
    if signatures.is_empty() {
        vec![target]
    } else {
        signatures
    }
}

fn dependencies(db: &Database, trigger: &Trigger, include_table: bool) -> Vec<String> {
    let mut deps = function_dependencies(db, trigger);
    if include_table {
        deps.push(trigger.qualified_table());
    }
    deps.dedup();
    deps
}

/// A trigger recorded on a child partition that was actually declared on
/// the parent partitioned table: the parent carries a same-named trigger
/// and lists the child among its partitions.
fn is_inherited_partition_trigger(desired: &Database, trigger: &Trigger) -> bool {
    let table_name = ident::normalize_ident(&trigger.table);
    let schema = ident::normalize_schema(&trigger.schema);
    for parent in &desired.tables {
        if ident::normalize_schema(&parent.schema) != schema {
            continue;
        }
        let Some(strategy) = &parent.partitioning else {
            continue;
        };
        let is_parent = strategy
            .partitions
            .iter()
            .any(|partition| ident::normalize_ident(&partition.name) == table_name);
        if !is_parent {
            continue;
        }
        let parent_table = parent.qualified_name();
        let parent_has_trigger = desired.triggers.iter().any(|candidate| {
            candidate.qualified_table() == parent_table
                && ident::normalize_ident(&candidate.name) == ident::normalize_ident(&trigger.name)
        });
        if parent_has_trigger {
            return true;
        }
    }
    false
}

pub(crate) fn compare(ctx: &mut CompareContext) {
    let current = by_key(&ctx.current.triggers, trigger_key);
    let desired = by_key(&ctx.desired.triggers, trigger_key);

    for (key, trigger) in &desired {
        let name = trigger.qualified_name();
        match current.get(key) {
            None => {
                let mut change = Change::new(
                    ChangeKind::AddTrigger,
                    Severity::Safe,
                    ObjectKind::Trigger,
                    &name,
                    format!("add trigger {} on {}", trigger.name, trigger.qualified_table()),
                );
                change.depends_on = dependencies(ctx.desired, trigger, true);
                ctx.push(change);
            }
            Some(existing) if !same_trigger(existing, trigger) => {
                let mut change = Change::new(
                    ChangeKind::ModifyTrigger,
                    Severity::Breaking,
                    ObjectKind::Trigger,
                    &name,
                    format!("modify trigger {} on {}", trigger.name, trigger.qualified_table()),
                );
                change.depends_on = dependencies(ctx.desired, trigger, true);
                ctx.push(change);
            }
            Some(_) => {}
        }
    }
    for (key, trigger) in &current {
        if desired.contains_key(key) {
            continue;
        }
        if is_inherited_partition_trigger(ctx.desired, trigger) {
            continue;
        }
        let mut change = Change::new(
            ChangeKind::DropTrigger,
            Severity::Breaking,
            ObjectKind::Trigger,
            trigger.qualified_name(),
            format!("drop trigger {} on {}", trigger.name, trigger.qualified_table()),
        );
        change.depends_on = dependencies(ctx.current, trigger, false);
        ctx.push(change);
    }
}
