use crate::model::{
    ContinuousAggregate, Function, Hypertable, MaterializedView, Table, Trigger, View,
};
use crate::normalize::ident;

/// A full schema snapshot. Object sequences keep the order they were
/// observed or declared in; the comparators preserve that order when
/// emitting changes.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Database {
    pub schemas: Vec<SchemaDef>,
    pub extensions: Vec<Extension>,
    pub custom_types: Vec<CustomType>,
    pub sequences: Vec<Sequence>,
    pub tables: Vec<Table>,
    pub views: Vec<View>,
    pub materialized_views: Vec<MaterializedView>,
    pub functions: Vec<Function>,
    pub triggers: Vec<Trigger>,
    pub hypertables: Vec<Hypertable>,
    pub continuous_aggregates: Vec<ContinuousAggregate>,
}

impl Database {
    pub fn table(&self, schema: &str, name: &str) -> Option<&Table> {
        let key = ident::qualified_name(schema, name);
        self.tables.iter().find(|table| table.qualified_name() == key)
    }
}

/// A named schema (namespace).
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchemaDef {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Extension {
    pub name: String,
    pub schema: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CustomTypeKind {
    #[default]
    Enum,
    Composite,
    Domain,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CustomType {
    pub schema: String,
    pub name: String,
    pub kind: CustomTypeKind,
    /// Enum labels in declaration order; empty for other kinds.
    pub values: Vec<String>,
    /// Raw definition for composite and domain types.
    pub definition: String,
}

impl CustomType {
    pub fn qualified_name(&self) -> String {
        ident::qualified_name(&self.schema, &self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sequence {
    pub schema: String,
    pub name: String,
    pub increment: i64,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub start: Option<i64>,
    pub cycle: bool,
    /// `schema.table.column` of the owning column, when recorded.
    pub owned_by: String,
}

impl Sequence {
    pub fn qualified_name(&self) -> String {
        ident::qualified_name(&self.schema, &self.name)
    }
}
