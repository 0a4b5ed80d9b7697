//! CHECK-expression normalization. The database stores check expressions
//! with extra parentheses, casts, and rewritten operators (`BETWEEN`
//! becomes two comparisons, `IN` becomes `= ANY (...)`); this pass folds
//! all of those back to one canonical form.

use lazy_regex::{regex, Lazy};
use regex::Regex;

/// Casts the database is known to add around literals in stored
/// expressions. Casts outside this list (e.g. `::uuid`) are left alone.
static CAST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)::(
            numeric
            | text
            | bigint
            | integer
            | smallint
            | real
            | double\ precision
            | character\ varying
            | varchar
            | character
            | char
            | timestamp\ with\ time\ zone
            | timestamp\ without\ time\ zone
            | timestamp
            | time\ with\ time\ zone
            | time\ without\ time\ zone
            | interval
            | boolean
            | jsonb
            | json
        )",
    )
    .unwrap()
});

/// Removes every cast in the recognized list from `text`. Shared by the
/// default, view-body, and index-column normalizers.
pub fn strip_known_casts(text: &str) -> String {
    CAST_RE.replace_all(text, "").into_owned()
}

/// Canonical form of a CHECK (or WHERE / WHEN) expression.
pub fn normalize_expression(raw: &str) -> String {
    let text = strip_check_prefix(raw.trim());
    let text = text.to_lowercase();
    let text = strip_outer_parens(&text);
    let text = expand_between(&text);
    let text = rewrite_any_array(&text);
    let text = CAST_RE.replace_all(&text, "").into_owned();
    let text = normalize_operators(&text);
    let text = strip_redundant_parens(&text);
    collapse_whitespace(&text)
}

/// Expression equality on normalized forms.
pub fn same_expression(a: &str, b: &str) -> bool {
    normalize_expression(a) == normalize_expression(b)
}

fn strip_check_prefix(text: &str) -> &str {
    let rest = text.trim_start();
    if rest.len() >= 5 && rest[..5].eq_ignore_ascii_case("check") {
        let tail = &rest[5..];
        if tail.is_empty() || tail.starts_with(['(', ' ', '\t', '\n']) {
            return tail.trim_start();
        }
    }
    rest
}

/// Whether `text` has balanced parentheses that never close below depth
/// zero, ignoring anything inside single-quoted strings.
fn balanced(text: &str) -> bool {
    let mut depth = 0i32;
    let mut in_string = false;
    for ch in text.chars() {
        match ch {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0 && !in_string
}

/// Removes matched outermost parentheses, repeatedly.
pub fn strip_outer_parens(text: &str) -> String {
    let mut current = text.trim();
    loop {
        match current
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
        {
            Some(inner) if balanced(inner) => current = inner.trim(),
            _ => return current.to_owned(),
        }
    }
}

const ATOM: &str = r"[a-z_][a-z0-9_.]*|'[^']*'|\d+(?:\.\d+)?";

/// `x BETWEEN a AND b` becomes `(x >= a) and (x <= b)`.
fn expand_between(text: &str) -> String {
    static BETWEEN_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(&format!(
            r"(?P<x>{ATOM})\s+between\s+(?P<a>{ATOM})\s+and\s+(?P<b>{ATOM})"
        ))
        .unwrap()
    });
    BETWEEN_RE
        .replace_all(text, "($x >= $a) and ($x <= $b)")
        .into_owned()
}

/// `x = ANY (ARRAY[...])` and `x = ANY ('{...}'::T[])` become `x in (...)`,
/// stripping recognized casts from the elements.
fn rewrite_any_array(text: &str) -> String {
    static ANY_ARRAY_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?P<x>[a-z_][a-z0-9_.]*)\s*=\s*any\s*\(\s*array\[(?P<items>[^\]]*)\]\s*(?:::[a-z_][a-z0-9_ ]*\[\])?\s*\)",
        )
        .unwrap()
    });
    static ANY_LITERAL_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?P<x>[a-z_][a-z0-9_.]*)\s*=\s*any\s*\(\s*'\{(?P<items>[^}]*)\}'\s*(?:::[a-z_][a-z0-9_ ]*\[\])?\s*\)",
        )
        .unwrap()
    });

    let rewritten = ANY_ARRAY_RE.replace_all(text, |caps: &regex::Captures| {
        let items = caps["items"]
            .split(',')
            .map(|item| CAST_RE.replace_all(item.trim(), "").into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} in ({})", &caps["x"], items)
    });
    ANY_LITERAL_RE
        .replace_all(&rewritten, |caps: &regex::Captures| {
            let items = caps["items"]
                .split(',')
                .map(|item| {
                    let item = item.trim();
                    if item.parse::<f64>().is_ok() || item.starts_with('\'') {
                        item.to_owned()
                    } else {
                        format!("'{item}'")
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} in ({})", &caps["x"], items)
        })
        .into_owned()
}

/// `<>` becomes `!=`; every comparison operator gets single spaces.
fn normalize_operators(text: &str) -> String {
    let unified = text.replace("<>", "!=");
    regex!(r"\s*(>=|<=|!=|=|<|>)\s*")
        .replace_all(&unified, " $1 ")
        .into_owned()
}

// Operator precedence classes used by the redundant-paren pass. Larger
// binds tighter; atoms get the top class.
const PREC_OR: u8 = 1;
const PREC_AND: u8 = 2;
const PREC_CMP: u8 = 3;
const PREC_ADD: u8 = 4;
const PREC_MUL: u8 = 5;
const PREC_ATOM: u8 = 6;

/// Loosest-binding operator at the top level of `content`.
fn inner_precedence(content: &str) -> u8 {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut word = String::new();
    let mut loosest = PREC_ATOM;
    let mut shrink = |prec: u8, loosest: &mut u8| {
        if prec < *loosest {
            *loosest = prec;
        }
    };
    for ch in content.chars() {
        if in_string {
            if ch == '\'' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '\'' => in_string = true,
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            _ if depth > 0 => {}
            'a'..='z' | '0'..='9' | '_' => {
                word.push(ch);
                continue;
            }
            '=' | '<' | '>' | '!' => shrink(PREC_CMP, &mut loosest),
            '+' | '-' => shrink(PREC_ADD, &mut loosest),
            '*' | '/' | '%' => shrink(PREC_MUL, &mut loosest),
            _ => {}
        }
        if depth == 0 {
            match word.as_str() {
                "and" => shrink(PREC_AND, &mut loosest),
                "or" => shrink(PREC_OR, &mut loosest),
                _ => {}
            }
        }
        word.clear();
    }
    match word.as_str() {
        "and" => shrink(PREC_AND, &mut loosest),
        "or" => shrink(PREC_OR, &mut loosest),
        _ => {}
    }
    loosest
}

/// Precedence of the operator context adjacent to a paren group, or `None`
/// when the group must be kept (function call, IN list, NOT, subquery).
fn outer_precedence(before: &str, after: &str) -> Option<u8> {
    let prev_word = before
        .trim_end()
        .chars()
        .rev()
        .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .collect::<String>()
        .chars()
        .rev()
        .collect::<String>();
    let prev = before.trim_end();

    let before_prec = if prev.is_empty() {
        0
    } else if prev.ends_with(['=', '<', '>', '!']) {
        PREC_CMP
    } else if prev.ends_with(['+', '-']) {
        PREC_ADD
    } else if prev.ends_with(['*', '/', '%']) {
        PREC_MUL
    } else if prev.ends_with(['(', ',']) {
        0
    } else {
        match prev_word.as_str() {
            "and" => PREC_AND,
            "or" => PREC_OR,
            // Any other word directly before `(` is a function name or a
            // keyword whose parentheses are syntactic.
            _ => return None,
        }
    };

    let next = after.trim_start();
    let next_word = next
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .collect::<String>();
    let after_prec = if next.is_empty() {
        0
    } else if next.starts_with(['=', '<', '>', '!']) {
        PREC_CMP
    } else if next.starts_with(['+', '-']) {
        PREC_ADD
    } else if next.starts_with(['*', '/', '%']) {
        PREC_MUL
    } else {
        match next_word.as_str() {
            "and" => PREC_AND,
            "or" => PREC_OR,
            _ => 0,
        }
    };

    Some(before_prec.max(after_prec))
}

fn has_top_level_comma(content: &str) -> bool {
    let mut depth = 0i32;
    let mut in_string = false;
    for ch in content.chars() {
        match ch {
            '\'' => in_string = !in_string,
            '(' | '[' if !in_string => depth += 1,
            ')' | ']' if !in_string => depth -= 1,
            ',' if !in_string && depth == 0 => return true,
            _ => {}
        }
    }
    false
}

/// Removes one redundant paren pair, or returns the input unchanged.
fn remove_one_paren_pair(text: &str) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut in_string = false;
    for (open, &ch) in chars.iter().enumerate() {
        if ch == '\'' {
            in_string = !in_string;
            continue;
        }
        if in_string || ch != '(' {
            continue;
        }
        let Some(close) = matching_paren(&chars, open) else {
            continue;
        };
        let content: String = chars[open + 1..close].iter().collect();
        let before: String = chars[..open].iter().collect();
        let after: String = chars[close + 1..].iter().collect();

        if has_top_level_comma(&content) || content.trim_start().starts_with("select") {
            continue;
        }
        let Some(outer) = outer_precedence(&before, &after) else {
            continue;
        };
        if inner_precedence(&content) >= outer.max(1) {
            return Some(format!("{before}{}{after}", content.trim()));
        }
    }
    None
}

fn matching_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    for (idx, &ch) in chars.iter().enumerate().skip(open) {
        match ch {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Recursively removes parentheses that do not change how the expression
/// groups: around atoms, around comparisons joined by AND/OR, and around
/// arithmetic whose loosest operator binds at least as tightly as the
/// surrounding one.
pub fn strip_redundant_parens(text: &str) -> String {
    let mut current = text.to_owned();
    while let Some(next) = remove_one_paren_pair(&current) {
        current = next;
    }
    current
}

fn collapse_whitespace(text: &str) -> String {
    let joined = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let commas = regex!(r"\s*,\s*").replace_all(&joined, ", ");
    let open = regex!(r"\(\s+").replace_all(&commas, "(");
    regex!(r"\s+\)").replace_all(&open, ")").into_owned()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn check_prefix_and_outer_parens_are_stripped() {
        assert_eq!(normalize_expression("CHECK (price > 0)"), "price > 0");
        assert_eq!(normalize_expression("CHECK(price > 0)"), "price > 0");
        assert_eq!(normalize_expression("((price > 0))"), "price > 0");
    }

    #[test]
    fn between_matches_its_expanded_form() {
        assert!(same_expression(
            "CHECK (rating BETWEEN 0 AND 1)",
            "CHECK ((rating >= 0) AND (rating <= 1))"
        ));
    }

    #[test]
    fn stored_form_with_casts_matches_between() {
        // Exactly what the database hands back for `rating BETWEEN 0 AND 1`
        // on a double precision column.
        assert!(same_expression(
            "CHECK (((rating >= (0)::double precision) AND (rating <= (1)::double precision)))",
            "CHECK (rating BETWEEN 0 AND 1)"
        ));
    }

    #[test]
    fn any_array_matches_in_list() {
        assert!(same_expression(
            "status = ANY (ARRAY['active'::text, 'inactive'::text])",
            "status IN ('active', 'inactive')"
        ));
        assert!(same_expression(
            "status = ANY ('{active,inactive}'::text[])",
            "status IN ('active', 'inactive')"
        ));
        assert!(same_expression(
            "code = ANY (ARRAY[1, 2, 3])",
            "code IN (1, 2, 3)"
        ));
    }

    #[test]
    fn operator_spelling_and_spacing_are_uniform() {
        assert!(same_expression("a <> b", "a != b"));
        assert!(same_expression("a>=b", "a >= b"));
        assert!(same_expression("a  =  b", "a = b"));
    }

    #[test]
    fn redundant_parens_fall_away_but_grouping_parens_stay() {
        assert_eq!(normalize_expression("(x) > (1)"), "x > 1");
        assert_eq!(normalize_expression("a + (b * c)"), "a + b * c");
        assert_eq!(normalize_expression("(a + b) * c"), "(a + b) * c");
        assert_eq!(
            normalize_expression("(a > 0) and (b > 0)"),
            "a > 0 and b > 0"
        );
        assert_eq!(normalize_expression("(a or b) and c"), "(a or b) and c");
        assert_eq!(normalize_expression("length(name) > 0"), "length(name) > 0");
        assert_eq!(normalize_expression("x in (1, 2)"), "x in (1, 2)");
    }

    #[test]
    fn unrecognized_casts_are_preserved() {
        assert!(!same_expression(
            "id = ANY (ARRAY['a'::uuid])",
            "id IN ('a')"
        ));
    }

    #[test]
    fn malformed_input_falls_back_without_panicking() {
        assert_eq!(normalize_expression("((broken"), "((broken");
        assert_eq!(normalize_expression(""), "");
    }
}
