use pgdrift_lib_core::change::{Change, ChangeDetails, ChangeKind, ObjectKind, Severity};
use pgdrift_lib_core::model::Extension;
use pgdrift_lib_core::normalize::ident;

use crate::comparators::{by_key, CompareContext};

fn render(extension: &Extension) -> String {
    format!(
        "schema={} version={}",
        ident::normalize_schema(&extension.schema),
        extension.version.trim()
    )
}

/// An extension needs an update when its desired schema differs under
/// normalization, or a non-empty desired version differs from the
/// current one.
fn needs_update(current: &Extension, desired: &Extension) -> bool {
    if ident::normalize_schema(&current.schema) != ident::normalize_schema(&desired.schema) {
        return true;
    }
    !desired.version.trim().is_empty() && desired.version.trim() != current.version.trim()
}

pub(crate) fn compare(ctx: &mut CompareContext) {
    let current = by_key(&ctx.current.extensions, |extension| {
        ident::normalize_ident(&extension.name)
    });
    let desired = by_key(&ctx.desired.extensions, |extension| {
        ident::normalize_ident(&extension.name)
    });

    for (name, extension) in &desired {
        match current.get(name) {
            None => ctx.push(Change::new(
                ChangeKind::AddExtension,
                Severity::Safe,
                ObjectKind::Extension,
                name,
                format!("add extension {name}"),
            )),
            Some(existing) if needs_update(existing, extension) => {
                let mut change = Change::new(
                    ChangeKind::ModifyExtension,
                    Severity::PotentiallyBreaking,
                    ObjectKind::Extension,
                    name,
                    format!("modify extension {name}"),
                );
                change.details = ChangeDetails::Definition {
                    current: render(existing),
                    desired: render(extension),
                };
                ctx.push(change);
            }
            Some(_) => {}
        }
    }
    for name in current.keys() {
        if !desired.contains_key(name) {
            ctx.push(Change::new(
                ChangeKind::DropExtension,
                Severity::Breaking,
                ObjectKind::Extension,
                name,
                format!("drop extension {name}"),
            ));
        }
    }
}
