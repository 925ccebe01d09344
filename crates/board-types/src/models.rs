use serde::{Deserialize, Serialize};

/// The fixed set of reaction kinds a viewer can attach to a row.
/// Each kind maps to one reserved column in the published sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReactionKind {
    Understand,
    Like,
    Curious,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 3] = [
        ReactionKind::Understand,
        ReactionKind::Like,
        ReactionKind::Curious,
    ];

    /// Default column header label for this kind.
    pub fn label(&self) -> &'static str {
        match self {
            ReactionKind::Understand => "UNDERSTAND",
            ReactionKind::Like => "LIKE",
            ReactionKind::Curious => "CURIOUS",
        }
    }
}

/// Whether a toggle added or removed the caller's reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionAction {
    Added,
    Removed,
}

/// Display order for board entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    Score,
    Newest,
    Oldest,
    Likes,
    Random,
}

/// A tenant's published sheet reference, stored as JSON in the user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    #[serde(default)]
    pub default_sort: SortMode,
}
