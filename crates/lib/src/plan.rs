//! The plan: an ordered sequence of changes plus summary statistics and
//! non-fatal warnings.

use std::fmt;

use ahash::AHashSet;
use itertools::Itertools;
use pgdrift_lib_core::change::{Change, ChangeKind, Severity};

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Plan {
    /// Changes sorted by execution order.
    pub changes: Vec<Change>,
    /// Non-fatal observations, e.g. a partition-interval difference on an
    /// existing hypertable.
    pub warnings: Vec<String>,
    pub stats: Stats,
}

impl Plan {
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// True iff any change is BREAKING or DATA_MIGRATION_REQUIRED.
    pub fn has_breaking_changes(&self) -> bool {
        self.changes
            .iter()
            .any(|change| change.severity.is_breaking())
    }

    pub fn changes_by_severity(&self, severity: Severity) -> Vec<&Change> {
        self.changes
            .iter()
            .filter(|change| change.severity == severity)
            .collect()
    }

    pub fn changes_by_kind(&self, kind: ChangeKind) -> Vec<&Change> {
        self.changes
            .iter()
            .filter(|change| change.kind == kind)
            .collect()
    }

    /// Human-readable multi-line rendering of the whole plan.
    pub fn summary(&self) -> String {
        if self.changes.is_empty() && self.warnings.is_empty() {
            return "no changes".to_owned();
        }
        let breaking = self
            .changes
            .iter()
            .filter(|change| change.severity.is_breaking())
            .count();
        let mut lines = vec![format!(
            "{} change{} ({} breaking)",
            self.changes.len(),
            if self.changes.len() == 1 { "" } else { "s" },
            breaking
        )];
        for (severity, group) in &self
            .changes
            .iter()
            .map(|change| change.severity)
            .sorted()
            .chunk_by(|severity| *severity)
        {
            lines.push(format!("  {severity}: {}", group.count()));
        }
        for change in &self.changes {
            lines.push(format!("  {change}"));
        }
        if !self.warnings.is_empty() {
            lines.push("warnings:".to_owned());
            for warning in &self.warnings {
                lines.push(format!("  - {warning}"));
            }
        }
        lines.join("\n")
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Counters computed after ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stats {
    pub tables_added: usize,
    pub tables_dropped: usize,
    /// Distinct tables with column, constraint, or comment modifications.
    pub tables_modified: usize,
    pub columns_added: usize,
    pub columns_dropped: usize,
    pub columns_modified: usize,
    pub indexes_added: usize,
    pub indexes_dropped: usize,
    pub indexes_modified: usize,
    pub constraints_added: usize,
    pub constraints_dropped: usize,
    pub constraints_modified: usize,
    pub views_added: usize,
    pub views_dropped: usize,
    pub views_modified: usize,
    pub functions_added: usize,
    pub functions_dropped: usize,
    pub functions_modified: usize,
}

impl Stats {
    pub fn from_changes(changes: &[Change]) -> Stats {
        use ChangeKind::*;

        let mut stats = Stats::default();
        let mut touched_tables = AHashSet::new();
        for change in changes {
            match change.kind {
                AddTable => stats.tables_added += 1,
                DropTable => stats.tables_dropped += 1,
                AddColumn => stats.columns_added += 1,
                DropColumn => stats.columns_dropped += 1,
                ModifyColumnType | ModifyColumnNullability | ModifyColumnDefault
                | ModifyColumnComment => stats.columns_modified += 1,
                AddIndex => stats.indexes_added += 1,
                DropIndex => stats.indexes_dropped += 1,
                ModifyIndex => stats.indexes_modified += 1,
                AddConstraint => stats.constraints_added += 1,
                DropConstraint => stats.constraints_dropped += 1,
                ModifyConstraint => stats.constraints_modified += 1,
                AddView | AddMaterializedView => stats.views_added += 1,
                DropView | DropMaterializedView => stats.views_dropped += 1,
                ModifyView | ModifyMaterializedView => stats.views_modified += 1,
                AddFunction => stats.functions_added += 1,
                DropFunction => stats.functions_dropped += 1,
                ModifyFunction => stats.functions_modified += 1,
                _ => {}
            }
            if matches!(
                change.kind,
                ModifyTableComment
                    | AddColumn
                    | DropColumn
                    | ModifyColumnType
                    | ModifyColumnNullability
                    | ModifyColumnDefault
                    | ModifyColumnComment
                    | AddConstraint
                    | DropConstraint
                    | ModifyConstraint
            ) {
                touched_tables.insert(change.object_name.clone());
            }
        }
        stats.tables_modified = touched_tables.len();
        stats
    }
}

#[cfg(test)]
mod tests {
    use pgdrift_lib_core::change::{ObjectKind, Severity};
    use pretty_assertions::assert_eq;

    use super::*;

    fn change(kind: ChangeKind, severity: Severity, name: &str) -> Change {
        Change::new(kind, severity, ObjectKind::Table, name, format!("{kind} {name}"))
    }

    #[test]
    fn breaking_threshold_counts_data_migrations() {
        let plan = Plan {
            changes: vec![change(
                ChangeKind::AddColumn,
                Severity::DataMigrationRequired,
                "public.t",
            )],
            ..Plan::default()
        };
        assert!(plan.has_changes());
        assert!(plan.has_breaking_changes());
    }

    #[test]
    fn empty_plan_reads_as_no_changes() {
        let plan = Plan::default();
        assert!(!plan.has_changes());
        assert!(!plan.has_breaking_changes());
        assert_eq!(plan.summary(), "no changes");
    }

    #[test]
    fn stats_group_column_changes_by_table() {
        let changes = vec![
            change(ChangeKind::AddColumn, Severity::Safe, "public.a"),
            change(ChangeKind::ModifyColumnDefault, Severity::Safe, "public.a"),
            change(ChangeKind::AddColumn, Severity::Safe, "public.b"),
            change(ChangeKind::AddTable, Severity::Safe, "public.c"),
        ];
        let stats = Stats::from_changes(&changes);
        assert_eq!(stats.columns_added, 2);
        assert_eq!(stats.columns_modified, 1);
        assert_eq!(stats.tables_modified, 2);
        assert_eq!(stats.tables_added, 1);
    }
}
