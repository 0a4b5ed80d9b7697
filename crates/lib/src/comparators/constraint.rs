use itertools::Itertools;
use pgdrift_lib_core::change::{Change, ChangeDetails, ChangeKind, ObjectKind, Severity};
use pgdrift_lib_core::model::{Constraint, ConstraintKind, Table};
use pgdrift_lib_core::normalize::{expr, ident};

use crate::comparators::{by_key, CompareContext};

fn normalized_columns(constraint: &Constraint) -> Vec<String> {
    constraint
        .columns
        .iter()
        .map(|column| ident::normalize_ident(column))
        .collect()
}

/// Structural key used when constraint names are ignored: the constraint is
/// identified by what it does rather than what it is called.
fn structural_key(constraint: &Constraint) -> String {
    let mut parts = vec![
        format!("{:?}", constraint.kind),
        normalized_columns(constraint).into_iter().sorted().join(","),
    ];
    if constraint.kind == ConstraintKind::ForeignKey {
        parts.push(constraint.referenced_qualified());
        parts.push(
            constraint
                .referenced_columns
                .iter()
                .map(|column| ident::normalize_ident(column))
                .sorted()
                .join(","),
        );
    }
    if constraint.kind == ConstraintKind::Check {
        parts.push(expr::normalize_expression(&constraint.check_expression));
    }
    parts.join("|")
}

fn same_constraint(a: &Constraint, b: &Constraint) -> bool {
    if a.kind != b.kind
        || a.deferrable != b.deferrable
        || a.initially_deferred != b.initially_deferred
    {
        return false;
    }
    // CHECK columns carry no order; everything else is order-significant.
    let columns_equal = if a.kind == ConstraintKind::Check {
        normalized_columns(a).into_iter().sorted().collect::<Vec<_>>()
            == normalized_columns(b).into_iter().sorted().collect::<Vec<_>>()
    } else {
        normalized_columns(a) == normalized_columns(b)
    };
    if !columns_equal {
        return false;
    }
    if a.kind == ConstraintKind::ForeignKey {
        if a.referenced_qualified() != b.referenced_qualified() {
            return false;
        }
        let a_refs: Vec<String> = a
            .referenced_columns
            .iter()
            .map(|column| ident::normalize_ident(column))
            .collect();
        let b_refs: Vec<String> = b
            .referenced_columns
            .iter()
            .map(|column| ident::normalize_ident(column))
            .collect();
        if a_refs != b_refs {
            return false;
        }
        if Constraint::normalized_action(&a.on_delete) != Constraint::normalized_action(&b.on_delete)
            || Constraint::normalized_action(&a.on_update)
                != Constraint::normalized_action(&b.on_update)
        {
            return false;
        }
    }
    if a.kind == ConstraintKind::Check
        && !expr::same_expression(&a.check_expression, &b.check_expression)
    {
        return false;
    }
    true
}

fn add_severity(constraint: &Constraint) -> Severity {
    match constraint.kind {
        // Rows violating the new reference must be fixed up first.
        ConstraintKind::ForeignKey => Severity::DataMigrationRequired,
        ConstraintKind::Check
            if expr::normalize_expression(&constraint.check_expression).contains("not null") =>
        {
            Severity::DataMigrationRequired
        }
        _ => Severity::Safe,
    }
}

fn drop_severity(constraint: &Constraint) -> Severity {
    match constraint.kind {
        ConstraintKind::PrimaryKey | ConstraintKind::Unique => Severity::Breaking,
        _ => Severity::PotentiallyBreaking,
    }
}

fn dependencies(constraint: &Constraint, table: &str) -> Vec<String> {
    let mut deps = vec![table.to_owned()];
    if constraint.kind == ConstraintKind::ForeignKey && !constraint.referenced_table.trim().is_empty()
    {
        let referenced = constraint.referenced_qualified();
        // A self-referential foreign key is not a dependency.
        if !ident::same_qualified(&referenced, table) {
            deps.push(referenced);
        }
    }
    deps
}

pub(crate) fn compare_tables(ctx: &mut CompareContext, current: &Table, desired: &Table) {
    let table = desired.qualified_name();
    let ignore_names = ctx.options.ignore_constraint_names;
    let key = move |constraint: &Constraint| {
        if ignore_names {
            structural_key(constraint)
        } else {
            ident::normalize_ident(&constraint.name)
        }
    };
    let current_map = by_key(&current.constraints, key);
    let desired_map = by_key(&desired.constraints, key);

    for (constraint_key, constraint) in &desired_map {
        match current_map.get(constraint_key) {
            None => {
                let mut change = Change::new(
                    ChangeKind::AddConstraint,
                    add_severity(constraint),
                    ObjectKind::Constraint,
                    &table,
                    format!("add constraint {} on {table}", constraint.name),
                );
                change.details = ChangeDetails::ConstraintDef {
                    current: None,
                    desired: Some((*constraint).clone()),
                };
                change.depends_on = dependencies(constraint, &table);
                ctx.push(change);
            }
            Some(existing) if !same_constraint(existing, constraint) => {
                let mut change = Change::new(
                    ChangeKind::ModifyConstraint,
                    Severity::PotentiallyBreaking,
                    ObjectKind::Constraint,
                    &table,
                    format!("modify constraint {} on {table}", constraint.name),
                );
                change.details = ChangeDetails::ConstraintDef {
                    current: Some((*existing).clone()),
                    desired: Some((*constraint).clone()),
                };
                change.depends_on = dependencies(constraint, &table);
                ctx.push(change);
            }
            Some(_) => {}
        }
    }
    for (constraint_key, constraint) in &current_map {
        if !desired_map.contains_key(constraint_key) {
            let mut change = Change::new(
                ChangeKind::DropConstraint,
                drop_severity(constraint),
                ObjectKind::Constraint,
                &table,
                format!("drop constraint {} on {table}", constraint.name),
            );
            change.details = ChangeDetails::ConstraintDef {
                current: Some((*constraint).clone()),
                desired: None,
            };
            change.depends_on = dependencies(constraint, &table);
            ctx.push(change);
        }
    }
}
