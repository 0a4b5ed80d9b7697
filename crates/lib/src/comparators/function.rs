use pgdrift_lib_core::change::{Change, ChangeDetails, ChangeKind, ObjectKind, Severity};
use pgdrift_lib_core::model::{Database, Function};
use pgdrift_lib_core::normalize::{comment, types};

use crate::comparators::{by_key, CompareContext};

/// Definition equality; comments are handled separately.
fn same_function(a: &Function, b: &Function) -> bool {
    types::normalize_type(&a.return_type) == types::normalize_type(&b.return_type)
        && a.language.eq_ignore_ascii_case(&b.language)
        && a.volatility.eq_ignore_ascii_case(&b.volatility)
        && a.security_definer == b.security_definer
        && a.strict == b.strict
        && a.normalized_body() == b.normalized_body()
}

/// A function backing a trigger cannot be replaced without firing risk.
fn backs_trigger(db: &Database, function: &Function) -> bool {
    let name = function.qualified_name();
    db.triggers
        .iter()
        .any(|trigger| trigger.qualified_function() == name)
}

pub(crate) fn compare(ctx: &mut CompareContext) {
    let current = by_key(&ctx.current.functions, Function::signature);
    let desired = by_key(&ctx.desired.functions, Function::signature);

    for (signature, function) in &desired {
        match current.get(signature) {
            None => {
                ctx.push(Change::new(
                    ChangeKind::AddFunction,
                    Severity::Safe,
                    ObjectKind::Function,
                    signature,
                    format!("add function {signature}"),
                ));
                if !ctx.options.ignore_comments
                    && !comment::normalize_comment(&function.comment).is_empty()
                {
                    ctx.push(comment_change(signature, "", &function.comment));
                }
            }
            Some(existing) => {
                if !same_function(existing, function) {
                    let severity = if backs_trigger(ctx.desired, function) {
                        Severity::Breaking
                    } else {
                        Severity::PotentiallyBreaking
                    };
                    let mut change = Change::new(
                        ChangeKind::ModifyFunction,
                        severity,
                        ObjectKind::Function,
                        signature,
                        format!("modify function {signature}"),
                    );
                    change.details = ChangeDetails::Definition {
                        current: existing.body.clone(),
                        desired: function.body.clone(),
                    };
                    ctx.push(change);
                }
                if !ctx.options.ignore_comments
                    && !comment::same_comment(&existing.comment, &function.comment)
                {
                    ctx.push(comment_change(signature, &existing.comment, &function.comment));
                }
            }
        }
    }
    for signature in current.keys() {
        if !desired.contains_key(signature) {
            ctx.push(Change::new(
                ChangeKind::DropFunction,
                Severity::Breaking,
                ObjectKind::Function,
                signature,
                format!("drop function {signature}"),
            ));
        }
    }
}

/// A comment-only change is a second MODIFY with SAFE severity.
fn comment_change(signature: &str, old: &str, new: &str) -> Change {
    let mut change = Change::new(
        ChangeKind::ModifyFunction,
        Severity::Safe,
        ObjectKind::Function,
        signature,
        format!("modify comment on function {signature}"),
    );
    change.details = ChangeDetails::CommentOnly {
        old_comment: old.to_owned(),
        new_comment: new.to_owned(),
    };
    change
}
