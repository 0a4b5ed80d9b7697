use pgdrift_lib_core::change::{Change, ChangeDetails, ChangeKind, ObjectKind, Severity};
use pgdrift_lib_core::model::{ContinuousAggregate, RefreshPolicy};
use pgdrift_lib_core::normalize::{comment, ident, interval, view_body};

use crate::comparators::{by_key, CompareContext};
use crate::depends::extract_dependencies;

fn same_refresh_policy(a: Option<&RefreshPolicy>, b: Option<&RefreshPolicy>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            interval::same_interval(&a.start_offset, &b.start_offset)
                && interval::same_interval(&a.end_offset, &b.end_offset)
                && interval::same_interval(&a.schedule_interval, &b.schedule_interval)
        }
        _ => false,
    }
}

fn same_definition(a: &ContinuousAggregate, b: &ContinuousAggregate) -> bool {
    view_body::same_view_body(&a.query, &b.query)
        && a.qualified_hypertable() == b.qualified_hypertable()
        && same_refresh_policy(a.refresh_policy.as_ref(), b.refresh_policy.as_ref())
        && a.materialized_only == b.materialized_only
}

pub(crate) fn dependencies(aggregate: &ContinuousAggregate) -> Vec<String> {
    let mut deps = extract_dependencies(&aggregate.query);
    let hypertable = aggregate.qualified_hypertable();
    if !deps.iter().any(|dep| ident::same_qualified(dep, &hypertable)) {
        deps.push(hypertable);
    }
    deps
}

pub(crate) fn compare(ctx: &mut CompareContext) {
    let current = by_key(
        &ctx.current.continuous_aggregates,
        ContinuousAggregate::qualified_name,
    );
    let desired = by_key(
        &ctx.desired.continuous_aggregates,
        ContinuousAggregate::qualified_name,
    );

    for (name, aggregate) in &desired {
        match current.get(name) {
            None => {
                let mut change = Change::new(
                    ChangeKind::AddContinuousAggregate,
                    Severity::Safe,
                    ObjectKind::ContinuousAggregate,
                    name,
                    format!("add continuous aggregate {name}"),
                );
                change.depends_on = dependencies(aggregate);
                ctx.push(change);
            }
            Some(existing) => {
                if !same_definition(existing, aggregate) {
                    let mut change = Change::new(
                        ChangeKind::ModifyContinuousAggregate,
                        Severity::Breaking,
                        ObjectKind::ContinuousAggregate,
                        name,
                        format!("modify continuous aggregate {name}"),
                    );
                    change.details = ChangeDetails::Definition {
                        current: existing.query.clone(),
                        desired: aggregate.query.clone(),
                    };
                    change.depends_on = dependencies(aggregate);
                    ctx.push(change);
                }
                if !ctx.options.ignore_comments
                    && !comment::same_comment(&existing.comment, &aggregate.comment)
                {
                    let mut change = Change::new(
                        ChangeKind::ModifyContinuousAggregate,
                        Severity::Safe,
                        ObjectKind::ContinuousAggregate,
                        name,
                        format!("modify comment on continuous aggregate {name}"),
                    );
                    change.details = ChangeDetails::CommentOnly {
                        old_comment: existing.comment.clone(),
                        new_comment: aggregate.comment.clone(),
                    };
                    ctx.push(change);
                }
            }
        }
    }
    for (name, aggregate) in &current {
        if !desired.contains_key(name) {
            let mut change = Change::new(
                ChangeKind::DropContinuousAggregate,
                Severity::Breaking,
                ObjectKind::ContinuousAggregate,
                name,
                format!("drop continuous aggregate {name}"),
            );
            change.depends_on = dependencies(aggregate);
            ctx.push(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use pgdrift_lib_core::model::Database;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::options::CompareOptions;

    fn aggregate(query: &str) -> ContinuousAggregate {
        ContinuousAggregate {
            schema: "public".into(),
            view_name: "events_daily".into(),
            hypertable_schema: "public".into(),
            hypertable_name: "events".into(),
            query: query.into(),
            ..ContinuousAggregate::default()
        }
    }

    fn run(current: Database, desired: Database) -> Vec<Change> {
        let options = CompareOptions::default();
        let mut ctx = CompareContext::new(&current, &desired, &options);
        compare(&mut ctx);
        ctx.changes
    }

    #[test]
    fn refresh_policies_compare_under_interval_normalization() {
        let colon = RefreshPolicy {
            start_offset: "02:00:00".into(),
            end_offset: "01:00:00".into(),
            schedule_interval: "01:00:00".into(),
        };
        let spelled = RefreshPolicy {
            start_offset: "2 hours".into(),
            end_offset: "1 hour".into(),
            schedule_interval: "1 hour".into(),
        };
        assert!(same_refresh_policy(Some(&colon), Some(&spelled)));
        assert!(!same_refresh_policy(Some(&colon), None));
    }

    #[test]
    fn query_cosmetics_are_not_changes() {
        let current = Database {
            continuous_aggregates: vec![aggregate(
                "SELECT time_bucket('01:00:00', ts) AS bucket, count(*) FROM events GROUP BY bucket",
            )],
            ..Database::default()
        };
        let desired = Database {
            continuous_aggregates: vec![aggregate(
                "select time_bucket('1 hour', ts) as bucket, count(*) from events group by time_bucket('1 hour', ts);",
            )],
            ..Database::default()
        };
        assert_eq!(run(current, desired), vec![]);
    }

    #[test]
    fn query_change_is_breaking_and_declares_the_hypertable() {
        let current = Database {
            continuous_aggregates: vec![aggregate("SELECT count(*) FROM events")],
            ..Database::default()
        };
        let desired = Database {
            continuous_aggregates: vec![aggregate("SELECT sum(v) FROM events")],
            ..Database::default()
        };
        let changes = run(current, desired);
        assert_eq!(changes[0].kind, ChangeKind::ModifyContinuousAggregate);
        assert_eq!(changes[0].severity, Severity::Breaking);
        assert_eq!(changes[0].depends_on, vec!["events"]);
    }
}
