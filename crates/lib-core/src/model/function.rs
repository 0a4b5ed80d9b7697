use itertools::Itertools;

use crate::normalize::{ident, types};

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Function {
    pub schema: String,
    pub name: String,
    /// Argument type names, in order.
    pub arguments: Vec<String>,
    pub return_type: String,
    pub language: String,
    pub volatility: String,
    pub security_definer: bool,
    pub strict: bool,
    pub body: String,
    pub comment: String,
}

impl Function {
    pub fn qualified_name(&self) -> String {
        ident::qualified_name(&self.schema, &self.name)
    }

    /// `schema.name(type, type)` with normalized argument types; the unique
    /// key for a function within a snapshot.
    pub fn signature(&self) -> String {
        let args = self
            .arguments
            .iter()
            .map(|arg| types::normalize_type(arg))
            .join(", ");
        format!("{}({})", self.qualified_name(), args)
    }

    /// Function bodies compare with dollar quoting stripped and whitespace
    /// collapsed, case-insensitively.
    pub fn normalized_body(&self) -> String {
        strip_dollar_quotes(&self.body)
            .to_lowercase()
            .split_whitespace()
            .join(" ")
    }
}

/// Strips `$$...$$` or `$tag$...$tag$` delimiters from a function body.
fn strip_dollar_quotes(body: &str) -> &str {
    let trimmed = body.trim();
    if !trimmed.starts_with('$') {
        return trimmed;
    }
    if let Some(tag_end) = trimmed[1..].find('$') {
        let tag = &trimmed[..tag_end + 2];
        if let Some(inner) = trimmed
            .strip_prefix(tag)
            .and_then(|content| content.strip_suffix(tag))
        {
            return inner;
        }
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn signatures_normalize_argument_types() {
        let function = Function {
            schema: String::new(),
            name: "Add_Numbers".to_owned(),
            arguments: vec!["int".to_owned(), "INT8".to_owned()],
            ..Function::default()
        };
        assert_eq!(function.signature(), "public.add_numbers(integer, bigint)");
    }

    #[test]
    fn dollar_quoting_is_invisible_to_body_equality() {
        let plain = Function {
            body: "BEGIN RETURN 42; END;".to_owned(),
            ..Function::default()
        };
        let quoted = Function {
            body: "$$BEGIN\n  RETURN 42;\nEND;$$".to_owned(),
            ..Function::default()
        };
        let tagged = Function {
            body: "$fn$ BEGIN RETURN 42; END; $fn$".to_owned(),
            ..Function::default()
        };
        assert_eq!(plain.normalized_body(), quoted.normalized_body());
        assert_eq!(plain.normalized_body(), tagged.normalized_body());
    }
}
