use pgdrift_lib_core::change::{Change, ChangeDetails, ChangeKind, ObjectKind, Severity};
use pgdrift_lib_core::model::{MaterializedView, View};
use pgdrift_lib_core::normalize::{comment, view_body};

use crate::comparators::{by_key, CompareContext};
use crate::depends::extract_dependencies;

struct ViewKinds {
    object: ObjectKind,
    add: ChangeKind,
    drop: ChangeKind,
    modify: ChangeKind,
    label: &'static str,
}

const VIEW: ViewKinds = ViewKinds {
    object: ObjectKind::View,
    add: ChangeKind::AddView,
    drop: ChangeKind::DropView,
    modify: ChangeKind::ModifyView,
    label: "view",
};

const MATERIALIZED: ViewKinds = ViewKinds {
    object: ObjectKind::MaterializedView,
    add: ChangeKind::AddMaterializedView,
    drop: ChangeKind::DropMaterializedView,
    modify: ChangeKind::ModifyMaterializedView,
    label: "materialized view",
};

/// The per-view attributes the generic comparator needs.
struct ViewFacts<'a> {
    name: String,
    definition: &'a str,
    check_option: &'a str,
    comment: &'a str,
}

impl<'a> From<&'a View> for ViewFacts<'a> {
    fn from(view: &'a View) -> Self {
        ViewFacts {
            name: view.qualified_name(),
            definition: &view.definition,
            check_option: &view.check_option,
            comment: &view.comment,
        }
    }
}

impl<'a> From<&'a MaterializedView> for ViewFacts<'a> {
    fn from(view: &'a MaterializedView) -> Self {
        ViewFacts {
            name: view.qualified_name(),
            definition: &view.definition,
            check_option: "",
            comment: &view.comment,
        }
    }
}

pub(crate) fn compare_views(ctx: &mut CompareContext) {
    let current: Vec<ViewFacts> = ctx.current.views.iter().map(ViewFacts::from).collect();
    let desired: Vec<ViewFacts> = ctx.desired.views.iter().map(ViewFacts::from).collect();
    compare_facts(ctx, &VIEW, &current, &desired);
}

pub(crate) fn compare_materialized_views(ctx: &mut CompareContext) {
    let current: Vec<ViewFacts> = ctx
        .current
        .materialized_views
        .iter()
        .map(ViewFacts::from)
        .collect();
    let desired: Vec<ViewFacts> = ctx
        .desired
        .materialized_views
        .iter()
        .map(ViewFacts::from)
        .collect();
    compare_facts(ctx, &MATERIALIZED, &current, &desired);
}

fn compare_facts(
    ctx: &mut CompareContext,
    kinds: &ViewKinds,
    current: &[ViewFacts],
    desired: &[ViewFacts],
) {
    let current_map = by_key(current, |view| view.name.clone());
    let desired_map = by_key(desired, |view| view.name.clone());

    for (name, view) in &desired_map {
        match current_map.get(name) {
            None => {
                let mut change = Change::new(
                    kinds.add,
                    Severity::Safe,
                    kinds.object,
                    name,
                    format!("add {} {name}", kinds.label),
                );
                change.depends_on = extract_dependencies(view.definition);
                ctx.push(change);
                if !ctx.options.ignore_comments
                    && !comment::normalize_comment(view.comment).is_empty()
                {
                    ctx.push(comment_change(kinds, name, "", view.comment));
                }
            }
            Some(existing) => {
                let definition_changed = !view_body::same_view_body(
                    existing.definition,
                    view.definition,
                ) || existing.check_option.trim().to_lowercase()
                    != view.check_option.trim().to_lowercase();
                if definition_changed {
                    let mut change = Change::new(
                        kinds.modify,
                        Severity::PotentiallyBreaking,
                        kinds.object,
                        name,
                        format!("modify {} {name}", kinds.label),
                    );
                    change.details = ChangeDetails::Definition {
                        current: existing.definition.to_owned(),
                        desired: view.definition.to_owned(),
                    };
                    change.depends_on = extract_dependencies(view.definition);
                    ctx.push(change);
                }
                if !ctx.options.ignore_comments
                    && !comment::same_comment(existing.comment, view.comment)
                {
                    ctx.push(comment_change(kinds, name, existing.comment, view.comment));
                }
            }
        }
    }
    for (name, view) in &current_map {
        if !desired_map.contains_key(name) {
            let mut change = Change::new(
                kinds.drop,
                Severity::Breaking,
                kinds.object,
                name,
                format!("drop {} {name}", kinds.label),
            );
            change.depends_on = extract_dependencies(view.definition);
            ctx.push(change);
        }
    }
}

fn comment_change(kinds: &ViewKinds, name: &str, old: &str, new: &str) -> Change {
    let mut change = Change::new(
        kinds.modify,
        Severity::Safe,
        kinds.object,
        name,
        format!("modify comment on {} {name}", kinds.label),
    );
    change.details = ChangeDetails::CommentOnly {
        old_comment: old.to_owned(),
        new_comment: new.to_owned(),
    };
    change
}
