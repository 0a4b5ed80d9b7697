use pgdrift_lib_core::change::{Change, ChangeDetails, ChangeKind, ObjectKind, Severity};
use pgdrift_lib_core::model::{Column, Table};
use pgdrift_lib_core::normalize::{comment, ident, types};

use crate::comparators::{by_key, CompareContext};

pub(crate) fn compare_tables(ctx: &mut CompareContext, current: &Table, desired: &Table) {
    let table = desired.qualified_name();
    let current_columns = by_key(&current.columns, |column| {
        ident::normalize_ident(&column.name)
    });
    let desired_columns = by_key(&desired.columns, |column| {
        ident::normalize_ident(&column.name)
    });

    for (name, column) in &desired_columns {
        match current_columns.get(name) {
            None => add_column(ctx, &table, column),
            Some(existing) => modify_column(ctx, &table, existing, column),
        }
    }
    for (name, column) in &current_columns {
        if !desired_columns.contains_key(name) {
            let severity = if column.nullable {
                Severity::PotentiallyBreaking
            } else {
                Severity::Breaking
            };
            let mut change = Change::new(
                ChangeKind::DropColumn,
                severity,
                ObjectKind::Column,
                &table,
                format!("drop column {table}.{name}"),
            );
            change.details = ChangeDetails::ColumnDrop {
                column: (*column).clone(),
            };
            ctx.push(change);
        }
    }
}

fn add_column(ctx: &mut CompareContext, table: &str, column: &Column) {
    let name = ident::normalize_ident(&column.name);
    // A NOT NULL column without a default cannot be added to populated
    // tables without backfilling.
    let severity = if column.nullable || !column.default.trim().is_empty() {
        Severity::Safe
    } else {
        Severity::DataMigrationRequired
    };
    let mut change = Change::new(
        ChangeKind::AddColumn,
        severity,
        ObjectKind::Column,
        table,
        format!("add column {table}.{name}"),
    );
    change.details = ChangeDetails::ColumnAdd {
        column: column.clone(),
    };
    ctx.push(change);

    if !ctx.options.ignore_comments && !comment::normalize_comment(&column.comment).is_empty() {
        let mut change = Change::new(
            ChangeKind::ModifyColumnComment,
            Severity::Safe,
            ObjectKind::Column,
            table,
            format!("set comment on column {table}.{name}"),
        );
        change.details = ChangeDetails::ColumnComment {
            column_name: name,
            old_comment: String::new(),
            new_comment: column.comment.clone(),
        };
        ctx.push(change);
    }
}

fn modify_column(ctx: &mut CompareContext, table: &str, current: &Column, desired: &Column) {
    let name = ident::normalize_ident(&desired.name);

    if !current.same_type(desired) {
        let severity = if current.widens_to(desired) {
            Severity::Safe
        } else {
            Severity::DataMigrationRequired
        };
        let old_type = types::normalize_type(&current.data_type);
        let new_type = types::normalize_type(&desired.data_type);
        let mut change = Change::new(
            ChangeKind::ModifyColumnType,
            severity,
            ObjectKind::Column,
            table,
            format!("modify type of column {table}.{name}: {old_type} -> {new_type}"),
        );
        change.details = ChangeDetails::ColumnType {
            column_name: name.clone(),
            old_type,
            new_type,
        };
        ctx.push(change);
    }

    if current.nullable != desired.nullable {
        let severity = if desired.nullable {
            Severity::Safe
        } else {
            Severity::DataMigrationRequired
        };
        let direction = if desired.nullable {
            "drop not null"
        } else {
            "set not null"
        };
        let mut change = Change::new(
            ChangeKind::ModifyColumnNullability,
            severity,
            ObjectKind::Column,
            table,
            format!("{direction} on column {table}.{name}"),
        );
        change.details = ChangeDetails::ColumnNullability {
            column_name: name.clone(),
            old_nullable: current.nullable,
            new_nullable: desired.nullable,
        };
        ctx.push(change);
    }

    if !current.same_default(desired) {
        let mut change = Change::new(
            ChangeKind::ModifyColumnDefault,
            Severity::Safe,
            ObjectKind::Column,
            table,
            format!("modify default of column {table}.{name}"),
        );
        change.details = ChangeDetails::ColumnDefault {
            column_name: name.clone(),
            old_default: current.default.clone(),
            new_default: desired.default.clone(),
        };
        ctx.push(change);
    }

    if !ctx.options.ignore_comments && !comment::same_comment(&current.comment, &desired.comment) {
        let mut change = Change::new(
            ChangeKind::ModifyColumnComment,
            Severity::Safe,
            ObjectKind::Column,
            table,
            format!("modify comment on column {table}.{name}"),
        );
        change.details = ChangeDetails::ColumnComment {
            column_name: name,
            old_comment: current.comment.clone(),
            new_comment: desired.comment.clone(),
        };
        ctx.push(change);
    }
}

#[cfg(test)]
mod tests {
    use pgdrift_lib_core::model::Database;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::options::CompareOptions;

    fn run(current: Table, desired: Table) -> Vec<Change> {
        let empty = Database::default();
        let options = CompareOptions::default();
        let mut ctx = CompareContext::new(&empty, &empty, &options);
        compare_tables(&mut ctx, &current, &desired);
        ctx.changes
    }

    fn table(columns: Vec<Column>) -> Table {
        Table {
            schema: "public".into(),
            name: "t".into(),
            columns,
            ..Table::default()
        }
    }

    fn column(name: &str, data_type: &str, nullable: bool) -> Column {
        Column {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            ..Column::default()
        }
    }

    #[test]
    fn adding_a_not_null_column_without_default_requires_migration() {
        let changes = run(
            table(vec![]),
            table(vec![column("category", "varchar(50)", false)]),
        );
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::AddColumn);
        assert_eq!(changes[0].severity, Severity::DataMigrationRequired);
    }

    #[test]
    fn adding_a_nullable_column_is_safe() {
        let changes = run(table(vec![]), table(vec![column("note", "text", true)]));
        assert_eq!(changes[0].severity, Severity::Safe);
    }

    #[test]
    fn widening_is_safe_but_narrowing_migrates() {
        let widen = run(
            table(vec![column("n", "integer", true)]),
            table(vec![column("n", "bigint", true)]),
        );
        assert_eq!(widen[0].kind, ChangeKind::ModifyColumnType);
        assert_eq!(widen[0].severity, Severity::Safe);

        let narrow = run(
            table(vec![column("n", "bigint", true)]),
            table(vec![column("n", "integer", true)]),
        );
        assert_eq!(narrow[0].severity, Severity::DataMigrationRequired);
    }

    #[test]
    fn type_aliases_are_not_changes() {
        let changes = run(
            table(vec![column("n", "int4", true)]),
            table(vec![column("n", "integer", true)]),
        );
        assert_eq!(changes, vec![]);
    }

    #[test]
    fn nullability_direction_sets_severity() {
        let loosen = run(
            table(vec![column("n", "integer", false)]),
            table(vec![column("n", "integer", true)]),
        );
        assert_eq!(loosen[0].kind, ChangeKind::ModifyColumnNullability);
        assert_eq!(loosen[0].severity, Severity::Safe);

        let tighten = run(
            table(vec![column("n", "integer", true)]),
            table(vec![column("n", "integer", false)]),
        );
        assert_eq!(tighten[0].severity, Severity::DataMigrationRequired);
    }

    #[test]
    fn dropping_a_non_nullable_column_is_breaking() {
        let changes = run(table(vec![column("n", "integer", false)]), table(vec![]));
        assert_eq!(changes[0].kind, ChangeKind::DropColumn);
        assert_eq!(changes[0].severity, Severity::Breaking);

        let soft = run(table(vec![column("n", "integer", true)]), table(vec![]));
        assert_eq!(soft[0].severity, Severity::PotentiallyBreaking);
    }

    #[test]
    fn equivalent_defaults_are_not_changes() {
        let mut with_now = column("ts", "timestamptz", true);
        with_now.default = "now()".into();
        let mut with_current = column("ts", "timestamptz", true);
        with_current.default = "CURRENT_TIMESTAMP".into();
        let changes = run(table(vec![with_now]), table(vec![with_current]));
        assert_eq!(changes, vec![]);
    }
}
