//! Default-expression normalization. The database decorates stored
//! defaults with casts and rewrites the "now" family of functions; both
//! sides of a diff meet at one canonical spelling.

use lazy_regex::{regex, Lazy};
use regex::Regex;

static CAST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)::(
            text
            | character\ varying
            | varchar
            | integer
            | bigint
            | boolean
            | timestamp\ with\ time\ zone
            | timestamp\ without\ time\ zone
            | timestamptz
            | timestamp
            | jsonb
            | json
            | [a-z_][a-z0-9_]*\[\]
        )",
    )
    .unwrap()
});

static NOW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(now\(\)|current_timestamp\(\)|localtimestamp|transaction_timestamp\(\)|statement_timestamp\(\)|clock_timestamp\(\))",
    )
    .unwrap()
});

/// Canonical form of a column default expression.
pub fn normalize_default(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let uncast = CAST_RE.replace_all(&lowered, "");
    let now = NOW_RE.replace_all(&uncast, "current_timestamp");
    let booleans = regex!(r"\b(true|false)\b").replace_all(&now, |caps: &regex::Captures| {
        if &caps[1] == "true" { "'t'" } else { "'f'" }
    });
    booleans.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Default equality on normalized forms; two empty defaults are equal.
pub fn same_default(a: &str, b: &str) -> bool {
    normalize_default(a) == normalize_default(b)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn recognized_casts_are_stripped() {
        assert_eq!(normalize_default("'active'::text"), "'active'");
        assert_eq!(normalize_default("'{}'::jsonb"), "'{}'");
        assert_eq!(normalize_default("0::integer"), "0");
        assert_eq!(normalize_default("'{}'::my_enum[]"), "'{}'");
        assert_eq!(
            normalize_default("'2020-01-01'::timestamp with time zone"),
            "'2020-01-01'"
        );
    }

    #[test]
    fn now_family_collapses_to_current_timestamp() {
        assert!(same_default("now()", "CURRENT_TIMESTAMP"));
        assert!(same_default("now()", "clock_timestamp()"));
        assert!(same_default("transaction_timestamp()", "statement_timestamp()"));
        assert!(same_default("localtimestamp", "now()"));
    }

    #[test]
    fn boolean_literals_match_their_letter_forms() {
        assert!(same_default("true", "'t'"));
        assert!(same_default("FALSE", "'f'"));
        assert!(!same_default("true", "'f'"));
    }

    #[test]
    fn whitespace_and_empty_defaults() {
        assert!(same_default("", ""));
        assert!(same_default("1  +  2", "1 + 2"));
        assert!(!same_default("", "0"));
    }
}
