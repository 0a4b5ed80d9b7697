use crate::model::Index;
use crate::normalize::ident;

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct View {
    pub schema: String,
    pub name: String,
    /// The SELECT text, as written or as reported by the database.
    pub definition: String,
    pub check_option: String,
    pub comment: String,
}

impl View {
    pub fn qualified_name(&self) -> String {
        ident::qualified_name(&self.schema, &self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaterializedView {
    pub schema: String,
    pub name: String,
    pub definition: String,
    pub comment: String,
    pub indexes: Vec<Index>,
}

impl MaterializedView {
    pub fn qualified_name(&self) -> String {
        ident::qualified_name(&self.schema, &self.name)
    }
}
