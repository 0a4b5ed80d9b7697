use thiserror::Error;

/// Failures that abort a whole comparison run.
///
/// Malformed SQL inside view bodies, expressions, or identifiers is never an
/// error: the normalizers recover locally by falling back to their textual
/// forms. The only way a run fails is an unresolvable ordering.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComparisonError {
    /// The dependency graph over the plan contains a cycle. The path is the
    /// formatted cycle, e.g. `add view a (public.a) -> add view b (public.b)`.
    #[error("circular dependency detected: {path}")]
    CircularDependency { path: String },
}
