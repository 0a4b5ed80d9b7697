use pgdrift_lib_core::change::{Change, ChangeDetails, ChangeKind, ObjectKind, Severity};
use pgdrift_lib_core::model::{ConstraintKind, Table};
use pgdrift_lib_core::normalize::{comment, ident};

use crate::comparators::{by_key, column, constraint, partition, CompareContext};

pub(crate) fn compare(ctx: &mut CompareContext) {
    let current = by_key(&ctx.current.tables, Table::qualified_name);
    let desired = by_key(&ctx.desired.tables, Table::qualified_name);

    for (name, table) in &desired {
        match current.get(name) {
            None => add_table(ctx, table),
            Some(existing) => {
                column::compare_tables(ctx, existing, table);
                constraint::compare_tables(ctx, existing, table);
                partition::compare_tables(ctx, existing, table);
                compare_comment(ctx, existing, table);
            }
        }
    }
    for name in current.keys() {
        if !desired.contains_key(name) {
            ctx.push(Change::new(
                ChangeKind::DropTable,
                Severity::Breaking,
                ObjectKind::Table,
                name,
                format!("drop table {name}"),
            ));
        }
    }
}

fn add_table(ctx: &mut CompareContext, table: &Table) {
    let name = table.qualified_name();
    let mut change = Change::new(
        ChangeKind::AddTable,
        Severity::Safe,
        ObjectKind::Table,
        &name,
        format!("add table {name}"),
    );
    // Referenced tables of foreign keys must exist first; a self-reference
    // is not a dependency.
    for fk in &table.constraints {
        if fk.kind != ConstraintKind::ForeignKey || fk.referenced_table.trim().is_empty() {
            continue;
        }
        let referenced = fk.referenced_qualified();
        if !ident::same_qualified(&referenced, &name) && !change.depends_on.contains(&referenced) {
            change.depends_on.push(referenced);
        }
    }
    ctx.push(change);

    if ctx.options.ignore_comments {
        return;
    }
    if !comment::normalize_comment(&table.comment).is_empty() {
        let mut change = Change::new(
            ChangeKind::ModifyTableComment,
            Severity::Safe,
            ObjectKind::Table,
            &name,
            format!("set comment on table {name}"),
        );
        change.details = ChangeDetails::CommentOnly {
            old_comment: String::new(),
            new_comment: table.comment.clone(),
        };
        ctx.push(change);
    }
    for col in &table.columns {
        if comment::normalize_comment(&col.comment).is_empty() {
            continue;
        }
        let mut change = Change::new(
            ChangeKind::ModifyColumnComment,
            Severity::Safe,
            ObjectKind::Column,
            &name,
            format!("set comment on column {name}.{}", col.name),
        );
        change.details = ChangeDetails::ColumnComment {
            column_name: ident::normalize_ident(&col.name),
            old_comment: String::new(),
            new_comment: col.comment.clone(),
        };
        ctx.push(change);
    }
}

fn compare_comment(ctx: &mut CompareContext, current: &Table, desired: &Table) {
    if ctx.options.ignore_comments || comment::same_comment(&current.comment, &desired.comment) {
        return;
    }
    let name = desired.qualified_name();
    let mut change = Change::new(
        ChangeKind::ModifyTableComment,
        Severity::Safe,
        ObjectKind::Table,
        &name,
        format!("modify comment on table {name}"),
    );
    change.details = ChangeDetails::CommentOnly {
        old_comment: current.comment.clone(),
        new_comment: desired.comment.clone(),
    };
    ctx.push(change);
}
