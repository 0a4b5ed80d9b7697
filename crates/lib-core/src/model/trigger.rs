use crate::normalize::ident;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TriggerTiming {
    #[default]
    Before,
    After,
    InsteadOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
    Truncate,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trigger {
    pub schema: String,
    pub name: String,
    pub table: String,
    pub timing: TriggerTiming,
    pub events: Vec<TriggerEvent>,
    pub for_each_row: bool,
    pub function_schema: String,
    pub function_name: String,
    pub when_condition: String,
}

impl Trigger {
    pub fn qualified_name(&self) -> String {
        ident::qualified_name(&self.schema, &self.name)
    }

    pub fn qualified_table(&self) -> String {
        ident::qualified_name(&self.schema, &self.table)
    }

    pub fn qualified_function(&self) -> String {
        ident::qualified_name(&self.function_schema, &self.function_name)
    }

    /// Event sets compare order-insensitively.
    pub fn event_set(&self) -> Vec<TriggerEvent> {
        let mut events = self.events.clone();
        events.sort();
        events.dedup();
        events
    }
}
