//! Identifier and schema-name normalization. Object names are
//! case-insensitive; an empty schema means the default schema, and a bare
//! name compares equal to its `public.`-qualified spelling.

pub const DEFAULT_SCHEMA: &str = "public";

/// Lower-cases, trims, and strips one pair of surrounding double quotes.
pub fn normalize_ident(name: &str) -> String {
    let trimmed = name.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed);
    unquoted.to_lowercase()
}

/// Like [`normalize_ident`], substituting the default schema for an empty one.
pub fn normalize_schema(schema: &str) -> String {
    let ident = normalize_ident(schema);
    if ident.is_empty() {
        DEFAULT_SCHEMA.to_owned()
    } else {
        ident
    }
}

/// Splits an optionally qualified `schema.object` name into normalized parts.
pub fn split_qualified(name: &str) -> (String, String) {
    match name.split_once('.') {
        Some((schema, object)) => (normalize_schema(schema), normalize_ident(object)),
        None => (DEFAULT_SCHEMA.to_owned(), normalize_ident(name)),
    }
}

/// The canonical `schema.object` form.
pub fn qualified_name(schema: &str, name: &str) -> String {
    format!("{}.{}", normalize_schema(schema), normalize_ident(name))
}

/// Qualified-name equality with default-schema elision in either direction:
/// `users` == `public.users` == `"Public"."Users"`.
pub fn same_qualified(a: &str, b: &str) -> bool {
    split_qualified(a) == split_qualified(b)
}

/// `normalize(schema).normalize(name)` for a referenced table, from separate
/// schema and name fields rather than a dotted string.
pub fn normalize_referenced_table(schema: &str, name: &str) -> String {
    qualified_name(schema, name)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn idents_are_case_insensitive_and_unquoted() {
        assert_eq!(normalize_ident("Users"), "users");
        assert_eq!(normalize_ident("  \"Users\"  "), "users");
        assert_eq!(normalize_ident("\"WeirdCase\""), "weirdcase");
    }

    #[test]
    fn empty_schema_becomes_public() {
        assert_eq!(normalize_schema(""), "public");
        assert_eq!(normalize_schema("  "), "public");
        assert_eq!(normalize_schema("Analytics"), "analytics");
    }

    #[test]
    fn bare_names_equal_public_qualified_names() {
        assert!(same_qualified("users", "public.users"));
        assert!(same_qualified("public.users", "users"));
        assert!(same_qualified("\"Users\"", "public.users"));
        assert!(!same_qualified("analytics.users", "users"));
    }

    #[test]
    fn split_recognizes_two_part_names() {
        assert_eq!(
            split_qualified("analytics.events"),
            ("analytics".to_owned(), "events".to_owned())
        );
        assert_eq!(
            split_qualified("events"),
            ("public".to_owned(), "events".to_owned())
        );
    }
}
