//! Syntactic dependency extraction from view, materialized-view, and
//! continuous-aggregate bodies: the identifiers following `FROM` or `JOIN`
//! are the tables the body reads. Purely textual; a table reached only
//! through a set-returning function is not found, and that limitation is
//! part of the engine's observable behavior.

use ahash::AHashSet;
use itertools::Itertools;
use lazy_regex::regex;

/// Tokens the FROM/JOIN scan may capture that are not table names.
const RESERVED: &[&str] = &[
    "select",
    "where",
    "group",
    "order",
    "having",
    "limit",
    "offset",
    "union",
    "except",
    "intersect",
    "unnest",
    "generate_series",
    "values",
];

/// Lower-cased, de-duplicated table names referenced by `definition`,
/// in first-occurrence order.
pub(crate) fn extract_dependencies(definition: &str) -> Vec<String> {
    let pattern = regex!(
        r#"(?i)\b(?:from|join)\s+(?:lateral\s+)?(?:only\s+)?("?[a-zA-Z_][\w$]*"?(?:\s*\.\s*"?[a-zA-Z_][\w$]*"?)?)"#
    );
    let mut seen = AHashSet::new();
    let mut out = Vec::new();
    for caps in pattern.captures_iter(definition) {
        let name = caps[1]
            .split('.')
            .map(|part| part.trim().trim_matches('"').to_lowercase())
            .join(".");
        if RESERVED.contains(&name.as_str()) {
            continue;
        }
        if seen.insert(name.clone()) {
            out.push(name);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn from_and_join_targets_are_found_once() {
        let deps = extract_dependencies(
            "SELECT u.id, o.total FROM users u JOIN orders o ON o.user_id = u.id JOIN users friends ON friends.id = o.gift_for",
        );
        assert_eq!(deps, vec!["users", "orders"]);
    }

    #[test]
    fn schema_qualified_and_quoted_names_normalize() {
        let deps = extract_dependencies("SELECT * FROM analytics.\"Events\"");
        assert_eq!(deps, vec!["analytics.events"]);
    }

    #[test]
    fn lateral_and_only_are_skipped() {
        assert_eq!(
            extract_dependencies("SELECT * FROM ONLY measurements"),
            vec!["measurements"]
        );
        assert_eq!(
            extract_dependencies("SELECT * FROM a JOIN LATERAL b ON true"),
            vec!["a", "b"]
        );
    }

    #[test]
    fn reserved_words_and_srfs_are_filtered() {
        assert_eq!(
            extract_dependencies("SELECT * FROM unnest(ids), generate_series(1, 10)"),
            Vec::<String>::new()
        );
        assert_eq!(
            extract_dependencies("SELECT 1 FROM (VALUES (1)) v"),
            Vec::<String>::new()
        );
    }

    #[test]
    fn subselects_contribute_their_inner_tables() {
        assert_eq!(
            extract_dependencies("SELECT * FROM (SELECT id FROM events) e"),
            vec!["events"]
        );
    }
}
