/// Flags controlling which differences the comparators look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompareOptions {
    /// Skip all comment-only additions and modifications.
    pub ignore_comments: bool,
    /// Do not emit ownership changes. Owners are not part of the snapshot
    /// model; the flag is carried for interface compatibility.
    pub ignore_owners: bool,
    /// Ignore tablespace differences. Tablespaces are not part of the
    /// snapshot model; the flag is carried for interface compatibility.
    pub ignore_tablespaces: bool,
    /// Reserved. While rename detection is off a rename is a drop plus an
    /// add.
    pub detect_renames: bool,
    /// Match indexes by structure instead of by name.
    pub ignore_index_names: bool,
    /// Match constraints by structure instead of by name.
    pub ignore_constraint_names: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        CompareOptions {
            ignore_comments: false,
            ignore_owners: true,
            ignore_tablespaces: true,
            detect_renames: true,
            ignore_index_names: false,
            ignore_constraint_names: false,
        }
    }
}
