use crate::model::Index;
use crate::normalize::ident;

/// A TimescaleDB continuous aggregate: a materialized, incrementally
/// refreshed view over a hypertable.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContinuousAggregate {
    pub schema: String,
    pub view_name: String,
    pub hypertable_schema: String,
    pub hypertable_name: String,
    pub query: String,
    pub materialized_only: bool,
    pub refresh_policy: Option<RefreshPolicy>,
    pub comment: String,
    pub indexes: Vec<Index>,
}

impl ContinuousAggregate {
    pub fn qualified_name(&self) -> String {
        ident::qualified_name(&self.schema, &self.view_name)
    }

    pub fn qualified_hypertable(&self) -> String {
        ident::qualified_name(&self.hypertable_schema, &self.hypertable_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RefreshPolicy {
    pub start_offset: String,
    pub end_offset: String,
    pub schedule_interval: String,
}
