//! Canonical forms for the pieces of a schema that the database itself
//! rewrites: identifiers, data types, default expressions, CHECK
//! expressions, intervals, view bodies, and comments.
//!
//! Every pass is a pure function from string to string. Equality of
//! normalized strings implies "no change"; any parse failure falls back to
//! the textual form instead of surfacing an error.

pub mod comment;
pub mod default;
pub mod expr;
pub mod ident;
pub mod interval;
pub mod types;
pub mod view_body;
