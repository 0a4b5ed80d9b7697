//! Comment normalization: multi-line comments compare equal to their
//! single-line rendering.

use itertools::Itertools;

/// Strips CR/LF, collapses internal whitespace to single spaces, trims ends.
pub fn normalize_comment(raw: &str) -> String {
    raw.split_whitespace().join(" ")
}

/// Comment equality on normalized forms; two empty comments are equal.
pub fn same_comment(a: &str, b: &str) -> bool {
    normalize_comment(a) == normalize_comment(b)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn newlines_collapse_to_spaces() {
        assert_eq!(
            normalize_comment("stores\r\nuser   accounts\n"),
            "stores user accounts"
        );
        assert!(same_comment("a  b", "a b"));
        assert!(same_comment("", "  "));
        assert!(!same_comment("a", "b"));
    }
}
