use pgdrift_lib_core::change::{Change, ChangeKind, ObjectKind, Severity};
use pgdrift_lib_core::normalize::ident;

use crate::comparators::{by_key, CompareContext};

pub(crate) fn compare(ctx: &mut CompareContext) {
    let current = by_key(&ctx.current.schemas, |schema| {
        ident::normalize_schema(&schema.name)
    });
    let desired = by_key(&ctx.desired.schemas, |schema| {
        ident::normalize_schema(&schema.name)
    });

    for name in desired.keys() {
        if !current.contains_key(name) {
            ctx.push(Change::new(
                ChangeKind::AddSchema,
                Severity::Safe,
                ObjectKind::Schema,
                name,
                format!("add schema {name}"),
            ));
        }
    }
    for name in current.keys() {
        if !desired.contains_key(name) {
            ctx.push(Change::new(
                ChangeKind::DropSchema,
                Severity::Breaking,
                ObjectKind::Schema,
                name,
                format!("drop schema {name}"),
            ));
        }
    }
}
