//! The tagged change model: one atomic decision the engine commits to,
//! carrying severity, a typed detail payload, declared dependencies, and
//! the execution position assigned by the resolver.

use std::fmt;

use strum_macros::{AsRefStr, Display, EnumIter};

use crate::model::{Column, CompressionSettings, Constraint, Index, RetentionPolicy};

/// How disruptive a change is to a running system, from harmless to
/// requiring a data migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    Safe,
    PotentiallyBreaking,
    Breaking,
    DataMigrationRequired,
}

impl Severity {
    /// Whether a plan containing this severity needs explicit sign-off.
    pub fn is_breaking(self) -> bool {
        matches!(self, Severity::Breaking | Severity::DataMigrationRequired)
    }
}

/// The kind of database object a change touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ObjectKind {
    Schema,
    Extension,
    CustomType,
    Sequence,
    Table,
    Column,
    Constraint,
    Index,
    View,
    MaterializedView,
    Function,
    Trigger,
    Hypertable,
    CompressionPolicy,
    RetentionPolicy,
    ContinuousAggregate,
    Partition,
}

/// The exhaustive change catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChangeKind {
    AddSchema,
    DropSchema,
    AddExtension,
    DropExtension,
    ModifyExtension,
    AddCustomType,
    DropCustomType,
    ModifyCustomType,
    AddSequence,
    DropSequence,
    ModifySequence,
    AddTable,
    DropTable,
    ModifyTableComment,
    AddColumn,
    DropColumn,
    ModifyColumnType,
    ModifyColumnNullability,
    ModifyColumnDefault,
    ModifyColumnComment,
    RenameColumn,
    AddConstraint,
    DropConstraint,
    ModifyConstraint,
    AddIndex,
    DropIndex,
    ModifyIndex,
    AddView,
    DropView,
    ModifyView,
    AddMaterializedView,
    DropMaterializedView,
    ModifyMaterializedView,
    AddFunction,
    DropFunction,
    ModifyFunction,
    AddTrigger,
    DropTrigger,
    ModifyTrigger,
    AddHypertable,
    DropHypertable,
    AddCompressionPolicy,
    DropCompressionPolicy,
    ModifyCompressionPolicy,
    AddRetentionPolicy,
    DropRetentionPolicy,
    ModifyRetentionPolicy,
    AddContinuousAggregate,
    DropContinuousAggregate,
    ModifyContinuousAggregate,
    AddPartition,
    DropPartition,
}

impl ChangeKind {
    /// Tie-break priority for the resolver's ready queue; lower runs first
    /// among otherwise-unordered changes.
    pub fn priority(self) -> u32 {
        use ChangeKind::*;
        match self {
            AddSchema => 1,
            AddExtension => 2,
            AddCustomType => 3,
            AddSequence => 4,
            AddTable => 10,
            ModifyTableComment => 11,
            AddColumn => 20,
            ModifyColumnComment => 21,
            ModifyColumnType => 22,
            ModifyColumnNullability => 23,
            ModifyColumnDefault => 24,
            AddConstraint => 30,
            AddIndex => 40,
            AddView => 50,
            ModifyView => 51,
            AddMaterializedView => 60,
            ModifyMaterializedView => 61,
            AddFunction => 70,
            ModifyFunction => 71,
            AddTrigger => 80,
            AddHypertable => 90,
            AddCompressionPolicy => 91,
            AddRetentionPolicy => 92,
            AddContinuousAggregate => 100,
            _ => 1000,
        }
    }
}

/// Which object a recreation pair rebuilds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RecreatedObject {
    View(String),
    Aggregate(String),
}

/// Typed per-kind payload. The string-keyed detail map of the plan's wire
/// form becomes one variant per detail shape.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChangeDetails {
    #[default]
    None,
    /// Old and new rendering of a definition-level modification.
    Definition { current: String, desired: String },
    /// A comment-only modification; the definition is untouched.
    CommentOnly {
        old_comment: String,
        new_comment: String,
    },
    ColumnAdd {
        column: Column,
    },
    ColumnDrop {
        column: Column,
    },
    ColumnType {
        column_name: String,
        old_type: String,
        new_type: String,
    },
    ColumnNullability {
        column_name: String,
        old_nullable: bool,
        new_nullable: bool,
    },
    ColumnDefault {
        column_name: String,
        old_default: String,
        new_default: String,
    },
    ColumnComment {
        column_name: String,
        old_comment: String,
        new_comment: String,
    },
    ConstraintDef {
        current: Option<Constraint>,
        desired: Option<Constraint>,
    },
    IndexDef {
        current: Option<Index>,
        desired: Option<Index>,
    },
    CompressionDef {
        current: Option<CompressionSettings>,
        desired: Option<CompressionSettings>,
    },
    RetentionDef {
        current: Option<RetentionPolicy>,
        desired: Option<RetentionPolicy>,
    },
    /// Enum label additions and removals on a custom type.
    TypeValues {
        added: Vec<String>,
        removed: Vec<String>,
    },
    /// One half of a drop-plus-recreate pair synthesized because an
    /// underlying column changed.
    Recreation {
        object: RecreatedObject,
        for_type_change: bool,
        original_change: Option<Box<Change>>,
    },
}

impl ChangeDetails {
    /// Whether this payload marks a comment-only modification (detail keys
    /// `old_comment` + `new_comment` without `current`/`desired`).
    pub fn is_comment_only(&self) -> bool {
        matches!(self, ChangeDetails::CommentOnly { .. })
    }

    pub fn is_recreation(&self) -> bool {
        matches!(self, ChangeDetails::Recreation { .. })
    }
}

/// One atomic, ordered decision in a plan.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Change {
    pub kind: ChangeKind,
    pub severity: Severity,
    pub description: String,
    pub object_kind: ObjectKind,
    /// Qualified object name; for column, constraint, and index changes
    /// this is the owning table.
    pub object_name: String,
    pub details: ChangeDetails,
    /// Names of objects this change needs to exist first.
    pub depends_on: Vec<String>,
    /// Execution position, assigned by the resolver.
    pub order: usize,
}

impl Change {
    pub fn new(
        kind: ChangeKind,
        severity: Severity,
        object_kind: ObjectKind,
        object_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Change {
            kind,
            severity,
            description: description.into(),
            object_kind,
            object_name: object_name.into(),
            details: ChangeDetails::None,
            depends_on: Vec::new(),
            order: 0,
        }
    }

    /// The name used by the resolver's stable tie-break: the object name,
    /// falling back to the object-kind tag, then the change-kind tag.
    pub fn sort_name(&self) -> &str {
        if !self.object_name.is_empty() {
            &self.object_name
        } else {
            let tag: &str = self.object_kind.as_ref();
            if !tag.is_empty() { tag } else { self.kind.as_ref() }
        }
    }

    /// Cycle-diagnostic label: `description (object-name)`.
    pub fn display_label(&self) -> String {
        format!("{} ({})", self.description, self.object_name)
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.description)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn severity_ordering_and_breaking_threshold() {
        assert!(Severity::Safe < Severity::PotentiallyBreaking);
        assert!(Severity::Breaking < Severity::DataMigrationRequired);
        assert!(!Severity::PotentiallyBreaking.is_breaking());
        assert!(Severity::Breaking.is_breaking());
        assert!(Severity::DataMigrationRequired.is_breaking());
    }

    #[test]
    fn kind_tags_render_like_the_catalog() {
        assert_eq!(ChangeKind::AddTable.to_string(), "ADD_TABLE");
        assert_eq!(
            ChangeKind::ModifyColumnNullability.to_string(),
            "MODIFY_COLUMN_NULLABILITY"
        );
        assert_eq!(Severity::DataMigrationRequired.to_string(), "DATA_MIGRATION_REQUIRED");
    }

    #[test]
    fn unlisted_kinds_sort_last() {
        assert_eq!(ChangeKind::AddSchema.priority(), 1);
        assert_eq!(ChangeKind::AddContinuousAggregate.priority(), 100);
        assert_eq!(ChangeKind::DropTable.priority(), 1000);
    }
}
