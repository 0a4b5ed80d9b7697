use crate::normalize::{default, ident, types};

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Table {
    pub schema: String,
    pub name: String,
    pub columns: Vec<Column>,
    pub constraints: Vec<Constraint>,
    pub indexes: Vec<Index>,
    pub partitioning: Option<PartitionStrategy>,
    pub comment: String,
}

impl Table {
    pub fn qualified_name(&self) -> String {
        ident::qualified_name(&self.schema, &self.name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        let key = ident::normalize_ident(name);
        self.columns
            .iter()
            .find(|column| ident::normalize_ident(&column.name) == key)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub max_length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub nullable: bool,
    pub default: String,
    pub is_array: bool,
    pub position: u32,
    pub comment: String,
}

impl Column {
    /// Type equality: normalized type name, max length, precision, scale,
    /// and array flag must all match.
    pub fn same_type(&self, other: &Column) -> bool {
        types::normalize_type(&self.data_type) == types::normalize_type(&other.data_type)
            && self.max_length == other.max_length
            && self.precision == other.precision
            && self.scale == other.scale
            && self.is_array == other.is_array
    }

    /// Whether changing this column to `other` loses no data.
    pub fn widens_to(&self, other: &Column) -> bool {
        !self.is_array
            && !other.is_array
            && types::is_safe_widening(
                &self.data_type,
                &other.data_type,
                self.max_length,
                other.max_length,
                self.precision,
                other.precision,
                self.scale,
                other.scale,
            )
    }

    pub fn same_default(&self, other: &Column) -> bool {
        default::same_default(&self.default, &other.default)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    ForeignKey,
    #[default]
    Check,
    Exclude,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Constraint {
    pub name: String,
    pub kind: ConstraintKind,
    pub columns: Vec<String>,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    pub on_delete: String,
    pub on_update: String,
    pub check_expression: String,
    pub deferrable: bool,
    pub initially_deferred: bool,
    /// Raw definition as reported by the database, kept for diagnostics.
    pub definition: String,
}

impl Constraint {
    /// Referential actions compare with the empty string meaning NO ACTION.
    pub fn normalized_action(action: &str) -> String {
        let normalized = action.trim().to_uppercase();
        if normalized.is_empty() {
            "NO ACTION".to_owned()
        } else {
            normalized
        }
    }

    pub fn referenced_qualified(&self) -> String {
        ident::normalize_referenced_table(&self.referenced_schema, &self.referenced_table)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IndexKind {
    #[default]
    BTree,
    Hash,
    Gin,
    Gist,
    SpGist,
    Brin,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Index {
    pub schema: String,
    pub name: String,
    pub table: String,
    /// Ordered column expressions; plain names or arbitrary expressions.
    pub columns: Vec<String>,
    pub include_columns: Vec<String>,
    pub kind: IndexKind,
    pub unique: bool,
    pub primary: bool,
    pub predicate: String,
}

impl Index {
    pub fn qualified_name(&self) -> String {
        ident::qualified_name(&self.schema, &self.name)
    }

    pub fn qualified_table(&self) -> String {
        ident::qualified_name(&self.schema, &self.table)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartitionStrategy {
    /// RANGE / LIST / HASH plus the key columns, verbatim.
    pub definition: String,
    pub partitions: Vec<Partition>,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Partition {
    pub name: String,
    /// Bound clause, e.g. `FOR VALUES FROM ('2024-01-01') TO ('2024-02-01')`.
    pub definition: String,
}
