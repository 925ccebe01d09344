use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{BoardConfig, ReactionAction, ReactionKind, SortMode};

// -- JWT Claims --

/// JWT claims shared between board-api (REST middleware) and the server
/// binary. Canonical definition lives here in board-types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub email: String,
    pub token: String,
}

// -- Tenants --

/// Snapshot of a tenant record. Also the payload cached under versioned
/// `users_v<n>_*` keys, so it derives Deserialize as well.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub email: String,
    pub is_active: bool,
    pub board: Option<BoardConfig>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSheetRequest {
    pub sheet_name: String,
    pub answer_headers: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateSheetResponse {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub headers: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishBoardRequest {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    #[serde(default)]
    pub default_sort: SortMode,
}

// -- Board --

#[derive(Debug, Serialize)]
pub struct BoardResponse {
    pub owner_id: Uuid,
    pub sheet_name: String,
    pub sort: SortMode,
    pub entries: Vec<BoardEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardEntry {
    /// 1-based data row index, header excluded.
    pub row: u32,
    pub answers: HashMap<String, String>,
    pub reactions: ReactionCounts,
    pub highlighted: bool,
    pub viewer_reaction: Option<ReactionKind>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ReactionCounts {
    pub understand: usize,
    pub like: usize,
    pub curious: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitAnswerRequest {
    pub answers: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitAnswerResponse {
    pub row: u32,
}

// -- Reactions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleReactionRequest {
    pub kind: ReactionKind,
}

#[derive(Debug, Serialize)]
pub struct ReactionResponse {
    pub action: ReactionAction,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct HighlightResponse {
    pub highlighted: bool,
}

// -- Errors --

/// Uniform error body: every handler failure renders as
/// `{"status":"error","message":...}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: String,
    pub message: String,
}
