//! Data-type name normalization and the safe-widening predicate.

/// Maps a bare (parameter-free) type name to its canonical spelling.
fn alias(head: &str) -> &str {
    match head {
        "int" | "int4" | "serial" => "integer",
        "int2" => "smallint",
        "int8" | "bigserial" => "bigint",
        "float4" => "real",
        "float" | "float8" => "double precision",
        "bool" => "boolean",
        "character varying" => "varchar",
        "character" => "char",
        "decimal" => "numeric",
        "timestamp" => "timestamp without time zone",
        "timestamptz" => "timestamp with time zone",
        "time" => "time without time zone",
        "timetz" => "time with time zone",
        other => other,
    }
}

/// Lower-cases a data-type name and folds known aliases. Parameterized
/// forms substitute only the head: `VarChar(10)` becomes `varchar(10)`,
/// `character varying(10)` likewise.
pub fn normalize_type(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    match lowered.split_once('(') {
        Some((head, params)) => format!("{}({}", alias(head.trim_end()), params),
        None => alias(&lowered).to_owned(),
    }
}

/// The normalized type name with any `(...)` parameter list removed.
pub fn base_type(raw: &str) -> String {
    let normalized = normalize_type(raw);
    match normalized.split_once('(') {
        Some((head, _)) => head.trim_end().to_owned(),
        None => normalized,
    }
}

fn length_widens(old: Option<u32>, new: Option<u32>) -> bool {
    match (old, new) {
        // A target without a declared length is unbounded.
        (_, None) => true,
        (None, Some(_)) => false,
        (Some(old), Some(new)) => new >= old,
    }
}

/// Whether changing a column from `old` to `new` loses no data: integer
/// promotions, varchar/char length growth, and numeric precision/scale
/// growth. Everything else requires a data migration.
pub fn is_safe_widening(
    old_type: &str,
    new_type: &str,
    old_max_length: Option<u32>,
    new_max_length: Option<u32>,
    old_precision: Option<u32>,
    new_precision: Option<u32>,
    old_scale: Option<u32>,
    new_scale: Option<u32>,
) -> bool {
    let from = base_type(old_type);
    let to = base_type(new_type);
    match (from.as_str(), to.as_str()) {
        ("smallint", "integer") | ("smallint", "bigint") | ("integer", "bigint") => true,
        ("varchar", "varchar") | ("char", "char") | ("char", "varchar") => {
            length_widens(old_max_length, new_max_length)
        }
        ("numeric", "numeric") => {
            let precision_ok = length_widens(old_precision, new_precision);
            let scale_ok = match (old_scale, new_scale) {
                (Some(old), Some(new)) => new >= old,
                _ => true,
            };
            precision_ok && scale_ok
        }
        _ => false,
    }
}
