use ahash::AHashSet;
use pgdrift_lib_core::change::{Change, ChangeDetails, ChangeKind, ObjectKind, Severity};
use pgdrift_lib_core::model::{CustomType, CustomTypeKind};

use crate::comparators::{by_key, CompareContext};

pub(crate) fn compare(ctx: &mut CompareContext) {
    let current = by_key(&ctx.current.custom_types, CustomType::qualified_name);
    let desired = by_key(&ctx.desired.custom_types, CustomType::qualified_name);

    for (name, custom_type) in &desired {
        match current.get(name) {
            None => ctx.push(Change::new(
                ChangeKind::AddCustomType,
                Severity::Safe,
                ObjectKind::CustomType,
                name,
                format!("add type {name}"),
            )),
            Some(existing) => compare_values(ctx, existing, custom_type),
        }
    }
    for name in current.keys() {
        if !desired.contains_key(name) {
            ctx.push(Change::new(
                ChangeKind::DropCustomType,
                Severity::Breaking,
                ObjectKind::CustomType,
                name,
                format!("drop type {name}"),
            ));
        }
    }
}

/// Enum value-set diff: an added label is SAFE, a removed one BREAKING.
fn compare_values(ctx: &mut CompareContext, current: &CustomType, desired: &CustomType) {
    if current.kind != CustomTypeKind::Enum || desired.kind != CustomTypeKind::Enum {
        return;
    }
    let name = desired.qualified_name();
    let current_values: AHashSet<&str> = current.values.iter().map(String::as_str).collect();
    let desired_values: AHashSet<&str> = desired.values.iter().map(String::as_str).collect();

    let added: Vec<String> = desired
        .values
        .iter()
        .filter(|value| !current_values.contains(value.as_str()))
        .cloned()
        .collect();
    let removed: Vec<String> = current
        .values
        .iter()
        .filter(|value| !desired_values.contains(value.as_str()))
        .cloned()
        .collect();

    if !added.is_empty() {
        let mut change = Change::new(
            ChangeKind::ModifyCustomType,
            Severity::Safe,
            ObjectKind::CustomType,
            &name,
            format!("add values to type {name}: {}", added.join(", ")),
        );
        change.details = ChangeDetails::TypeValues {
            added,
            removed: Vec::new(),
        };
        ctx.push(change);
    }
    if !removed.is_empty() {
        let mut change = Change::new(
            ChangeKind::ModifyCustomType,
            Severity::Breaking,
            ObjectKind::CustomType,
            &name,
            format!("remove values from type {name}: {}", removed.join(", ")),
        );
        change.details = ChangeDetails::TypeValues {
            added: Vec::new(),
            removed,
        };
        ctx.push(change);
    }
}
