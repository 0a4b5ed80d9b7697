use itertools::Itertools;

use crate::normalize::ident;

/// A TimescaleDB hypertable: a time-partitioned table enriched with
/// compression and retention policies.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hypertable {
    pub schema: String,
    pub table: String,
    pub time_column: String,
    pub partition_interval: String,
    pub compression_enabled: bool,
    pub compression: Option<CompressionSettings>,
    pub retention: Option<RetentionPolicy>,
}

impl Hypertable {
    pub fn qualified_name(&self) -> String {
        ident::qualified_name(&self.schema, &self.table)
    }

    /// Compression settings count only while compression is enabled.
    pub fn effective_compression(&self) -> Option<&CompressionSettings> {
        if self.compression_enabled {
            self.compression.as_ref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompressionSettings {
    pub segment_by: Vec<String>,
    pub order_by: Vec<OrderByColumn>,
}

impl CompressionSettings {
    /// De-duplicated, case-normalized segment-by set, sorted for set
    /// comparison.
    pub fn segment_by_set(&self) -> Vec<String> {
        self.segment_by
            .iter()
            .map(|column| ident::normalize_ident(column))
            .sorted()
            .dedup()
            .collect()
    }

    /// Ordered order-by list with case-normalized names and explicit
    /// directions.
    pub fn order_by_normalized(&self) -> Vec<(String, SortDirection)> {
        self.order_by
            .iter()
            .map(|column| (ident::normalize_ident(&column.name), column.direction()))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderByColumn {
    pub name: String,
    /// Raw direction string; empty means ASC.
    pub direction: String,
}

impl OrderByColumn {
    pub fn direction(&self) -> SortDirection {
        if self.direction.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetentionPolicy {
    pub drop_after: String,
}
