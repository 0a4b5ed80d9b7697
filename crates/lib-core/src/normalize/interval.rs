//! Interval normalization. TimescaleDB reports intervals in colon form
//! (`01:00:00`) while schema files usually spell them out (`1 hour`); both
//! map to one canonical form.

use lazy_regex::regex;

/// Canonical form of a single interval value. `HH:MM:SS` with zero minutes
/// and seconds becomes `N hour`; spelled-out units lose their plural `s`.
pub fn normalize_interval(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('\'').trim();
    if let Some(caps) = regex!(r"^(\d+):(\d{2}):(\d{2})$").captures(trimmed) {
        if &caps[2] == "00" && &caps[3] == "00" {
            let hours: u64 = caps[1].parse().unwrap_or(0);
            return format!("{hours} hour");
        }
    }
    let lowered = trimmed.to_lowercase();
    let collapsed = regex!(r"\b(hours|minutes|seconds|days|weeks|months|years)\b")
        .replace_all(&lowered, |caps: &regex::Captures| {
            let unit = &caps[1];
            unit[..unit.len() - 1].to_owned()
        });
    let stripped = regex!(r"\b0+(\d)").replace_all(&collapsed, "$1");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Interval equality under normalization; two empty strings are equal.
pub fn same_interval(a: &str, b: &str) -> bool {
    normalize_interval(a) == normalize_interval(b)
}

/// Rewrites every quoted interval literal inside a larger SQL text to the
/// canonical quoted form, so `'1 hour'` and `'01:00:00'` meet in the middle.
pub fn canonicalize_interval_literals(text: &str) -> String {
    let colon = regex!(r"'(\d+):00:00'").replace_all(text, |caps: &regex::Captures| {
        let hours: u64 = caps[1].parse().unwrap_or(0);
        format!("'{hours} hour'")
    });
    regex!(r"'(\d+) (hour|minute|second|day|week|month|year)s'")
        .replace_all(&colon, "'$1 $2'")
        .into_owned()
}
