//! View-body normalization. Two stages: a textual pass (whitespace, case,
//! casts, intervals, booleans) and a structural pass that parses the
//! SELECT into clause lists, resolves select-list aliases in GROUP BY and
//! ORDER BY, and strips table qualifiers belonging to the primary FROM
//! table. When the structural parse fails the textual form stands.

use itertools::Itertools;
use lazy_regex::regex;
use regex::Regex;

use super::{expr, interval};

/// Canonical form of a view, materialized-view, or continuous-aggregate
/// definition.
pub fn normalize_view_body(raw: &str) -> String {
    let textual = textual_pass(raw);
    structural_pass(&textual).unwrap_or(textual)
}

/// View-body equality on normalized forms.
pub fn same_view_body(a: &str, b: &str) -> bool {
    normalize_view_body(a) == normalize_view_body(b)
}

/// Stage one: purely textual cleanup.
fn textual_pass(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches(';').trim();
    let lowered = trimmed.to_lowercase();
    let uncast = expr::strip_known_casts(&lowered);
    let intervals = interval::canonicalize_interval_literals(&uncast);
    let booleans =
        regex!(r"\b(true|false)\b").replace_all(&intervals, |caps: &regex::Captures| {
            if &caps[1] == "true" { "'t'" } else { "'f'" }
        });
    let joined = booleans.split_whitespace().join(" ");
    let commas = regex!(r"\s*,\s*").replace_all(&joined, ", ");
    let open = regex!(r"\(\s+").replace_all(&commas, "(");
    regex!(r"\s+\)").replace_all(&open, ")").into_owned()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Number(String),
    Str(String),
    Punct(char),
    Op(String),
}

fn tokenize(text: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0;
    while pos < chars.len() {
        let ch = chars[pos];
        match ch {
            _ if ch.is_whitespace() => pos += 1,
            '\'' => {
                let mut literal = String::from('\'');
                pos += 1;
                loop {
                    let ch = *chars.get(pos)?;
                    literal.push(ch);
                    pos += 1;
                    if ch == '\'' {
                        // doubled quote = escaped quote
                        if chars.get(pos) == Some(&'\'') {
                            literal.push('\'');
                            pos += 1;
                        } else {
                            break;
                        }
                    }
                }
                tokens.push(Token::Str(literal));
            }
            '"' => {
                let mut word = String::new();
                pos += 1;
                loop {
                    let ch = *chars.get(pos)?;
                    pos += 1;
                    if ch == '"' {
                        break;
                    }
                    word.push(ch);
                }
                tokens.push(Token::Word(word));
            }
            'a'..='z' | '_' => {
                let mut word = String::new();
                while pos < chars.len()
                    && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_' || chars[pos] == '$')
                {
                    word.push(chars[pos]);
                    pos += 1;
                }
                tokens.push(Token::Word(word));
            }
            '0'..='9' => {
                let mut number = String::new();
                while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                    number.push(chars[pos]);
                    pos += 1;
                }
                tokens.push(Token::Number(number));
            }
            '(' | ')' | ',' | '.' | '[' | ']' => {
                tokens.push(Token::Punct(ch));
                pos += 1;
            }
            '=' | '<' | '>' | '!' | '+' | '-' | '*' | '/' | '%' | ':' | '|' | '~' | '@' | '^'
            | '#' | '&' | '?' => {
                let mut op = String::new();
                while pos < chars.len()
                    && matches!(
                        chars[pos],
                        '=' | '<' | '>' | '!' | '+' | '-' | '*' | '/' | '%' | ':' | '|' | '~'
                            | '@' | '^' | '#' | '&' | '?'
                    )
                {
                    op.push(chars[pos]);
                    pos += 1;
                }
                tokens.push(Token::Op(op));
            }
            _ => return None,
        }
    }
    Some(tokens)
}

/// Words that terminate the clause currently being read.
fn is_clause_boundary(word: &str) -> bool {
    matches!(
        word,
        "from" | "where" | "group" | "having" | "order" | "limit" | "offset" | "union"
            | "except" | "intersect" | "window" | "fetch" | "for"
    )
}

fn is_join_word(word: &str) -> bool {
    matches!(
        word,
        "join" | "inner" | "left" | "right" | "full" | "cross" | "natural"
    )
}

#[derive(Debug, Default)]
struct SelectQuery {
    ctes: Vec<(String, String)>,
    distinct: bool,
    select: Vec<(String, Option<String>)>,
    from: Option<FromClause>,
    where_clause: Option<String>,
    group_by: Vec<String>,
    having: Option<String>,
    order_by: Vec<String>,
    limit: Option<String>,
    offset: Option<String>,
}

#[derive(Debug, Default)]
struct FromClause {
    table: String,
    alias: Option<String>,
    joins: Vec<String>,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_word(&self) -> Option<&str> {
        match self.peek() {
            Some(Token::Word(word)) => Some(word),
            _ => None,
        }
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_word(&mut self, expected: &str) -> bool {
        if self.peek_word() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Collects tokens until a top-level comma or clause boundary.
    fn expression_tokens(&mut self) -> Vec<Token> {
        let mut depth = 0i32;
        let mut out = Vec::new();
        while let Some(token) = self.peek() {
            match token {
                Token::Punct('(') | Token::Punct('[') => depth += 1,
                Token::Punct(')') | Token::Punct(']') => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                Token::Punct(',') if depth == 0 => break,
                Token::Word(word) if depth == 0 && is_clause_boundary(word) => break,
                _ => {}
            }
            out.push(self.bump().unwrap_or(Token::Punct(' ')));
        }
        out
    }

    fn parse_query(&mut self) -> Option<SelectQuery> {
        let mut ctes = Vec::new();
        if self.eat_word("with") {
            loop {
                let Some(Token::Word(name)) = self.bump() else {
                    return None;
                };
                if !self.eat_word("as") {
                    return None;
                }
                if self.bump() != Some(Token::Punct('(')) {
                    return None;
                }
                let body = self.balanced_tokens()?;
                let mut inner = Parser {
                    tokens: body,
                    pos: 0,
                };
                let inner_query = inner.parse_query()?;
                if inner.pos != inner.tokens.len() {
                    return None;
                }
                ctes.push((name, inner_query.serialize()));
                if !self.eat_word_punct(',') {
                    break;
                }
            }
        }
        let mut query = self.parse_select()?;
        query.ctes = ctes;
        Some(query)
    }

    fn eat_word_punct(&mut self, punct: char) -> bool {
        if self.peek() == Some(&Token::Punct(punct)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consumes tokens up to (and including) the `)` matching an already
    /// consumed `(`, returning the inner tokens.
    fn balanced_tokens(&mut self) -> Option<Vec<Token>> {
        let mut depth = 1i32;
        let mut out = Vec::new();
        loop {
            let token = self.bump()?;
            match token {
                Token::Punct('(') => depth += 1,
                Token::Punct(')') => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(out);
                    }
                }
                _ => {}
            }
            out.push(token);
        }
    }

    fn parse_select(&mut self) -> Option<SelectQuery> {
        if !self.eat_word("select") {
            return None;
        }
        let mut query = SelectQuery::default();
        if self.eat_word("distinct") {
            // DISTINCT ON is beyond the structural pass.
            if self.peek_word() == Some("on") {
                return None;
            }
            query.distinct = true;
        } else {
            self.eat_word("all");
        }

        loop {
            let tokens = self.expression_tokens();
            if tokens.is_empty() {
                return None;
            }
            query.select.push(split_alias(&tokens));
            if !self.eat_word_punct(',') {
                break;
            }
        }

        if self.eat_word("from") {
            query.from = Some(self.parse_from()?);
        }
        if self.eat_word("where") {
            query.where_clause = Some(render(&self.expression_tokens()));
        }
        if self.eat_word("group") {
            if !self.eat_word("by") {
                return None;
            }
            loop {
                query.group_by.push(render(&self.expression_tokens()));
                if !self.eat_word_punct(',') {
                    break;
                }
            }
        }
        if self.eat_word("having") {
            query.having = Some(render(&self.expression_tokens()));
        }
        if self.eat_word("order") {
            if !self.eat_word("by") {
                return None;
            }
            loop {
                query.order_by.push(render(&self.expression_tokens()));
                if !self.eat_word_punct(',') {
                    break;
                }
            }
        }
        if self.eat_word("limit") {
            query.limit = Some(render(&self.expression_tokens()));
        }
        if self.eat_word("offset") {
            query.offset = Some(render(&self.expression_tokens()));
        }
        if self.pos != self.tokens.len() {
            return None;
        }
        Some(query)
    }

    fn parse_from(&mut self) -> Option<FromClause> {
        let mut from = FromClause {
            table: self.parse_table_name()?,
            ..FromClause::default()
        };
        from.alias = self.parse_alias();

        let mut joins = Vec::new();
        loop {
            match self.peek_word() {
                Some(word) if is_join_word(word) => {
                    let mut parts = Vec::new();
                    while let Some(word) = self.peek_word() {
                        if is_join_word(word) || word == "outer" {
                            parts.push(word.to_owned());
                            self.pos += 1;
                        } else {
                            break;
                        }
                    }
                    if parts.last().map(String::as_str) != Some("join") {
                        return None;
                    }
                    self.eat_word("lateral");
                    self.eat_word("only");
                    let mut rendered = parts.join(" ");
                    rendered.push(' ');
                    rendered.push_str(&self.parse_table_name()?);
                    if let Some(alias) = self.parse_alias() {
                        rendered.push(' ');
                        rendered.push_str(&alias);
                    }
                    if self.eat_word("on") {
                        rendered.push_str(" on ");
                        rendered.push_str(&render(&self.expression_tokens()));
                    } else if self.eat_word("using") {
                        if self.bump() != Some(Token::Punct('(')) {
                            return None;
                        }
                        let cols = self.balanced_tokens()?;
                        rendered.push_str(" using (");
                        rendered.push_str(&render(&cols));
                        rendered.push(')');
                    }
                    joins.push(rendered);
                }
                // Comma-separated FROM items read as cross joins.
                _ if self.peek() == Some(&Token::Punct(',')) => {
                    self.pos += 1;
                    let mut rendered = String::from("cross join ");
                    rendered.push_str(&self.parse_table_name()?);
                    if let Some(alias) = self.parse_alias() {
                        rendered.push(' ');
                        rendered.push_str(&alias);
                    }
                    joins.push(rendered);
                }
                _ => break,
            }
        }
        from.joins = joins;
        Some(from)
    }

    fn parse_table_name(&mut self) -> Option<String> {
        self.eat_word("only");
        let Some(Token::Word(first)) = self.bump() else {
            return None;
        };
        if self.peek() == Some(&Token::Punct('.')) {
            self.pos += 1;
            let Some(Token::Word(second)) = self.bump() else {
                return None;
            };
            Some(format!("{first}.{second}"))
        } else {
            Some(first)
        }
    }

    fn parse_alias(&mut self) -> Option<String> {
        if self.eat_word("as") {
            match self.bump() {
                Some(Token::Word(alias)) => return Some(alias),
                _ => return None,
            }
        }
        match self.peek_word() {
            Some(word)
                if !is_clause_boundary(word)
                    && !is_join_word(word)
                    && word != "on"
                    && word != "using" =>
            {
                let alias = word.to_owned();
                self.pos += 1;
                Some(alias)
            }
            _ => None,
        }
    }
}

fn split_alias(tokens: &[Token]) -> (String, Option<String>) {
    if tokens.len() >= 3 {
        if let (Token::Word(kw), Token::Word(alias)) =
            (&tokens[tokens.len() - 2], &tokens[tokens.len() - 1])
        {
            if kw == "as" {
                return (render(&tokens[..tokens.len() - 2]), Some(alias.clone()));
            }
        }
    }
    (render(tokens), None)
}

/// Renders a token run back to one canonical string.
fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut prev: Option<&Token> = None;
    for token in tokens {
        let text = match token {
            Token::Word(word) => word.clone(),
            Token::Number(number) => number.clone(),
            Token::Str(literal) => literal.clone(),
            Token::Punct(punct) => punct.to_string(),
            Token::Op(op) => op.clone(),
        };
        let space = match (prev, token) {
            (None, _) => false,
            (Some(Token::Punct('(')), _) | (Some(Token::Punct('.')), _) => false,
            (_, Token::Punct(')' | ',' | '.')) => false,
            (Some(Token::Word(_)), Token::Punct('(')) => false,
            (Some(Token::Op(op)), _) | (_, Token::Op(op)) if op == "::" => false,
            _ => true,
        };
        if space {
            out.push(' ');
        }
        out.push_str(&text);
        prev = Some(token);
    }
    out
}

/// Stage two: parse and re-serialize. `None` means "fall back to textual".
fn structural_pass(text: &str) -> Option<String> {
    let tokens = tokenize(text)?;
    let mut parser = Parser { tokens, pos: 0 };
    let query = parser.parse_query()?;
    Some(query.serialize())
}

impl SelectQuery {
    fn serialize(&self) -> String {
        let qualifiers = self.qualifiers();
        let strip = |text: &str| strip_qualifiers(text, &qualifiers);

        let select: Vec<(String, Option<String>)> = self
            .select
            .iter()
            .map(|(expr, alias)| (strip(expr), alias.clone()))
            .collect();

        // Aliases referenced in GROUP BY / ORDER BY resolve back to their
        // defining expressions.
        let resolve = |item: String| -> String {
            for (expr, alias) in &select {
                if alias.as_deref() == Some(item.as_str()) {
                    return expr.clone();
                }
            }
            item
        };

        let mut parts = Vec::new();
        if !self.ctes.is_empty() {
            let ctes = self
                .ctes
                .iter()
                .map(|(name, body)| format!("{name}=({body})"))
                .join(", ");
            parts.push(format!("with:[{ctes}]"));
        }
        let items = select
            .iter()
            .map(|(expr, alias)| match alias {
                Some(alias) => format!("{expr} as {alias}"),
                None => expr.clone(),
            })
            .join(", ");
        if self.distinct {
            parts.push(format!("select distinct:[{items}]"));
        } else {
            parts.push(format!("select:[{items}]"));
        }
        if let Some(from) = &self.from {
            parts.push(format!("from:{}", from.table));
            for join in &from.joins {
                parts.push(format!("join:{}", strip(join)));
            }
        }
        if let Some(where_clause) = &self.where_clause {
            parts.push(format!("where:{}", strip(where_clause)));
        }
        if !self.group_by.is_empty() {
            let group = self
                .group_by
                .iter()
                .map(|item| resolve(strip(item)))
                .join(", ");
            parts.push(format!("group:[{group}]"));
        }
        if let Some(having) = &self.having {
            parts.push(format!("having:{}", strip(having)));
        }
        if !self.order_by.is_empty() {
            let order = self
                .order_by
                .iter()
                .map(|item| resolve_order_item(strip(item), &resolve))
                .join(", ");
            parts.push(format!("order:[{order}]"));
        }
        if let Some(limit) = &self.limit {
            parts.push(format!("limit:{limit}"));
        }
        if let Some(offset) = &self.offset {
            parts.push(format!("offset:{offset}"));
        }
        parts.join("|")
    }

    /// The primary FROM table's name (both qualified and bare) and its
    /// declared alias.
    fn qualifiers(&self) -> Vec<String> {
        let mut qualifiers = Vec::new();
        if let Some(from) = &self.from {
            let bare = from
                .table
                .rsplit('.')
                .next()
                .unwrap_or(from.table.as_str())
                .to_owned();
            qualifiers.push(bare);
            if let Some(alias) = &from.alias {
                qualifiers.push(alias.clone());
            }
        }
        qualifiers
    }
}

/// Keeps a trailing `asc`/`desc`/`nulls first|last` while resolving the
/// expression part of an ORDER BY item.
fn resolve_order_item(item: String, resolve: &impl Fn(String) -> String) -> String {
    for suffix in [" desc", " asc"] {
        if let Some(stripped) = item.strip_suffix(suffix) {
            return format!("{}{suffix}", resolve(stripped.to_owned()));
        }
    }
    resolve(item)
}

fn strip_qualifiers(text: &str, qualifiers: &[String]) -> String {
    let mut out = text.to_owned();
    for qualifier in qualifiers {
        let pattern = Regex::new(&format!(r"\b{}\.", regex::escape(qualifier)));
        if let Ok(pattern) = pattern {
            out = pattern.replace_all(&out, "").into_owned();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn formatting_and_case_differences_compare_equal() {
        assert!(same_view_body(
            "SELECT id, name FROM users WHERE active = true",
            "select   id,\n       name\nfrom users\nwhere active = true;"
        ));
    }

    #[test]
    fn primary_table_qualifiers_are_stripped() {
        assert!(same_view_body(
            "SELECT u.id, u.name FROM users u",
            "SELECT id, name FROM users"
        ));
        assert!(same_view_body(
            "SELECT users.id FROM users",
            "SELECT id FROM users"
        ));
        // a join alias is not the primary table's qualifier
        assert!(!same_view_body(
            "SELECT o.id FROM users u JOIN orders o ON o.uid = u.id",
            "SELECT id FROM users u JOIN orders o ON o.uid = u.id"
        ));
    }

    #[test]
    fn group_by_aliases_resolve_to_their_expressions() {
        assert!(same_view_body(
            "SELECT date_trunc('day', ts) AS day, count(*) FROM events GROUP BY day",
            "SELECT date_trunc('day', ts) AS day, count(*) FROM events GROUP BY date_trunc('day', ts)"
        ));
    }

    #[test]
    fn order_by_aliases_resolve_and_keep_direction() {
        assert!(same_view_body(
            "SELECT sum(total) AS revenue FROM orders GROUP BY 1 ORDER BY revenue DESC",
            "SELECT sum(total) AS revenue FROM orders GROUP BY 1 ORDER BY sum(total) DESC"
        ));
    }

    #[test]
    fn recognized_casts_do_not_matter() {
        assert!(same_view_body(
            "SELECT 'open'::text AS state FROM tickets",
            "SELECT 'open' AS state FROM tickets"
        ));
    }

    #[test]
    fn interval_literal_forms_meet_in_the_middle() {
        assert!(same_view_body(
            "SELECT time_bucket('01:00:00', ts) FROM metrics",
            "SELECT time_bucket('1 hour', ts) FROM metrics"
        ));
    }

    #[test]
    fn ctes_participate_in_the_structural_pass() {
        assert!(same_view_body(
            "WITH recent AS (SELECT id FROM events WHERE ts > now()) SELECT id FROM recent",
            "with recent as ( select id from events where ts > now() )\nselect id from recent"
        ));
    }

    #[test]
    fn where_clause_differences_are_real_differences() {
        assert!(!same_view_body(
            "SELECT id FROM users WHERE active = true",
            "SELECT id FROM users WHERE active = false"
        ));
    }

    #[test]
    fn unparsable_bodies_fall_back_to_the_textual_form() {
        // set operations are outside the structural pass; textual equality
        // still applies
        assert!(same_view_body(
            "SELECT a FROM x UNION SELECT b FROM y",
            "select  a  from x union select b from y;"
        ));
        assert!(!same_view_body(
            "SELECT a FROM x UNION SELECT b FROM y",
            "SELECT a FROM x UNION SELECT c FROM y"
        ));
    }

    #[test]
    fn textual_pass_shape() {
        assert_eq!(
            textual_pass("SELECT  id ,name FROM users ;"),
            "select id, name from users"
        );
    }
}
