use itertools::Itertools;
use pgdrift_lib_core::change::{Change, ChangeDetails, ChangeKind, ObjectKind, Severity};
use pgdrift_lib_core::helpers::IndexMap;
use pgdrift_lib_core::model::{ConstraintKind, Database, Index};
use pgdrift_lib_core::normalize::{expr, ident};

use crate::comparators::CompareContext;

/// Column expressions compare after trimming, lower-casing, unquoting,
/// removing redundant outer parens and recognized casts.
pub(crate) fn normalize_index_column(raw: &str) -> String {
    let text = raw.trim().to_lowercase().replace('"', "");
    let text = expr::strip_outer_parens(&text);
    let text = expr::strip_known_casts(&text);
    text.split_whitespace().join(" ")
}

fn same_index(a: &Index, b: &Index) -> bool {
    a.kind == b.kind
        && a.unique == b.unique
        && a.qualified_table() == b.qualified_table()
        && a.columns.iter().map(|column| normalize_index_column(column)).collect::<Vec<_>>()
            == b.columns.iter().map(|column| normalize_index_column(column)).collect::<Vec<_>>()
        && a.include_columns.iter().map(|column| normalize_index_column(column)).collect::<Vec<_>>()
            == b.include_columns.iter().map(|column| normalize_index_column(column)).collect::<Vec<_>>()
        && expr::same_expression(&a.predicate, &b.predicate)
}

fn structural_key(index: &Index) -> String {
    format!(
        "{}|{}|{:?}|{}|{}",
        index.qualified_table(),
        index.columns.iter().map(|column| normalize_index_column(column)).join(","),
        index.kind,
        index.unique,
        expr::normalize_expression(&index.predicate),
    )
}

/// One map spanning table, materialized-view, and continuous-aggregate
/// indexes. Constraint-backed indexes (the primary-key index, or one named
/// after a primary-key/unique constraint) are excluded: their lifecycle
/// belongs to the constraint.
fn add<'a>(
    map: &mut IndexMap<String, &'a Index>,
    index: &'a Index,
    backed: bool,
    ignore_names: bool,
) {
    if backed {
        return;
    }
    let key = if ignore_names {
        structural_key(index)
    } else {
        index.qualified_name()
    };
    map.entry(key).or_insert(index);
}

fn collect(db: &Database, ignore_names: bool) -> IndexMap<String, &Index> {
    let mut map = IndexMap::default();
    for table in &db.tables {
        let backing_names: Vec<String> = table
            .constraints
            .iter()
            .filter(|constraint| {
                matches!(
                    constraint.kind,
                    ConstraintKind::PrimaryKey | ConstraintKind::Unique
                )
            })
            .map(|constraint| ident::normalize_ident(&constraint.name))
            .collect();
        for index in &table.indexes {
            let backed = index.primary
                || backing_names.contains(&ident::normalize_ident(&index.name));
            add(&mut map, index, backed, ignore_names);
        }
    }
    for view in &db.materialized_views {
        for index in &view.indexes {
            add(&mut map, index, index.primary, ignore_names);
        }
    }
    for aggregate in &db.continuous_aggregates {
        for index in &aggregate.indexes {
            add(&mut map, index, index.primary, ignore_names);
        }
    }
    map
}

pub(crate) fn compare(ctx: &mut CompareContext) {
    let ignore_names = ctx.options.ignore_index_names;
    let current = collect(ctx.current, ignore_names);
    let desired = collect(ctx.desired, ignore_names);

    for (key, index) in &desired {
        let table = index.qualified_table();
        match current.get(key) {
            None => {
                let mut change = Change::new(
                    ChangeKind::AddIndex,
                    Severity::Safe,
                    ObjectKind::Index,
                    &table,
                    format!("add index {} on {table}", index.name),
                );
                change.details = ChangeDetails::IndexDef {
                    current: None,
                    desired: Some((*index).clone()),
                };
                change.depends_on = vec![table.clone()];
                ctx.push(change);
            }
            Some(existing) if !same_index(existing, index) => {
                let mut change = Change::new(
                    ChangeKind::ModifyIndex,
                    Severity::PotentiallyBreaking,
                    ObjectKind::Index,
                    &table,
                    format!("modify index {} on {table}", index.name),
                );
                change.details = ChangeDetails::IndexDef {
                    current: Some((*existing).clone()),
                    desired: Some((*index).clone()),
                };
                change.depends_on = vec![table.clone()];
                ctx.push(change);
            }
            Some(_) => {}
        }
    }
    for (key, index) in &current {
        if !desired.contains_key(key) {
            let table = index.qualified_table();
            // Losing a unique index can break writers relying on it.
            let severity = if index.unique {
                Severity::Breaking
            } else {
                Severity::PotentiallyBreaking
            };
            let mut change = Change::new(
                ChangeKind::DropIndex,
                severity,
                ObjectKind::Index,
                &table,
                format!("drop index {} on {table}", index.name),
            );
            change.details = ChangeDetails::IndexDef {
                current: Some((*index).clone()),
                desired: None,
            };
            change.depends_on = vec![table];
            ctx.push(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use pgdrift_lib_core::model::{Constraint, Table};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::options::CompareOptions;

    fn index(name: &str, table: &str, columns: &[&str], unique: bool) -> Index {
        Index {
            schema: "public".into(),
            name: name.into(),
            table: table.into(),
            columns: columns.iter().map(|column| (*column).to_string()).collect(),
            unique,
            ..Index::default()
        }
    }

    fn database(indexes: Vec<Index>, constraints: Vec<Constraint>) -> Database {
        Database {
            tables: vec![Table {
                schema: "public".into(),
                name: "t".into(),
                indexes,
                constraints,
                ..Table::default()
            }],
            ..Database::default()
        }
    }

    fn run(current: Database, desired: Database) -> Vec<Change> {
        let options = CompareOptions::default();
        let mut ctx = CompareContext::new(&current, &desired, &options);
        compare(&mut ctx);
        ctx.changes
    }

    #[test]
    fn column_expression_cosmetics_do_not_differ() {
        assert_eq!(normalize_index_column("(\"email\")"), "email");
        assert_eq!(normalize_index_column("(lower(email))"), "lower(email)");
        assert_eq!(normalize_index_column("name::text"), "name");
        let a = index("i", "t", &["(email)"], false);
        let b = index("i", "t", &["email"], false);
        assert!(same_index(&a, &b));
    }

    #[test]
    fn constraint_backed_indexes_are_excluded() {
        let pk_index = Index {
            primary: true,
            ..index("t_pkey", "t", &["id"], true)
        };
        let unique_backed = index("t_email_key", "t", &["email"], true);
        let constraint = Constraint {
            name: "t_email_key".into(),
            kind: ConstraintKind::Unique,
            columns: vec!["email".into()],
            ..Constraint::default()
        };
        let current = database(vec![pk_index, unique_backed], vec![constraint]);
        let changes = run(current, database(vec![], vec![]));
        assert_eq!(changes, vec![]);
    }

    #[test]
    fn dropping_a_unique_index_is_breaking() {
        let current = database(vec![index("u", "t", &["a"], true)], vec![]);
        let changes = run(current, database(vec![], vec![]));
        assert_eq!(changes[0].kind, ChangeKind::DropIndex);
        assert_eq!(changes[0].severity, Severity::Breaking);

        let current = database(vec![index("i", "t", &["a"], false)], vec![]);
        let changes = run(current, database(vec![], vec![]));
        assert_eq!(changes[0].severity, Severity::PotentiallyBreaking);
    }

    #[test]
    fn renamed_index_is_invisible_under_structural_keys() {
        let current = database(vec![index("old_name", "t", &["a"], false)], vec![]);
        let desired = database(vec![index("new_name", "t", &["a"], false)], vec![]);
        let options = CompareOptions {
            ignore_index_names: true,
            ..CompareOptions::default()
        };
        let mut ctx = CompareContext::new(&current, &desired, &options);
        compare(&mut ctx);
        assert_eq!(ctx.changes, vec![]);
    }

    #[test]
    fn include_columns_and_predicate_participate() {
        let mut a = index("i", "t", &["a"], false);
        a.predicate = "active = true".into();
        let mut b = index("i", "t", &["a"], false);
        b.predicate = "(active = true)".into();
        assert!(same_index(&a, &b));

        b.include_columns = vec!["b".into()];
        assert!(!same_index(&a, &b));
    }
}
