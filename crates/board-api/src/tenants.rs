use std::time::Duration;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::warn;
use uuid::Uuid;

use board_core::BoardError;
use board_core::cache::versioned_key;
use board_core::store::VersionStore;
use board_store::models::UserRow;
use board_types::api::{Claims, CreateSheetRequest, CreateSheetResponse, PublishBoardRequest, UserResponse};
use board_types::models::BoardConfig;

use crate::auth::{AppState, AppStateInner};
use crate::error::ApiError;

pub const USER_CACHE_TTL: Duration = Duration::from_secs(300);

/// Cache kind for tenant snapshots; bumped on every tenant mutation.
const USERS_KIND: &str = "users";

/// Read-through tenant lookup through the versioned user cache: the key
/// carries the current `users` version, so a bump makes stale snapshots
/// unreachable without deleting them.
pub(crate) fn load_user(state: &AppStateInner, user_id: Uuid) -> Result<UserResponse, ApiError> {
    let version = state
        .db
        .cache_version(USERS_KIND)
        .map_err(ApiError::internal)?;
    let key = versioned_key(USERS_KIND, version, &format!("id_{user_id}"));

    if let Some(hit) = state.users_cache.get(&key) {
        if let Ok(user) = serde_json::from_str(&hit) {
            return Ok(user);
        }
    }

    let row = state
        .db
        .get_user_by_id(&user_id.to_string())
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::from(BoardError::UserNotFound(user_id.to_string())))?;
    let user = to_response(row)?;

    if let Ok(json) = serde_json::to_string(&user) {
        state.users_cache.put(&key, json, USER_CACHE_TTL);
    }
    Ok(user)
}

fn to_response(row: UserRow) -> Result<UserResponse, ApiError> {
    let user_id: Uuid = row
        .id
        .parse()
        .map_err(|e| ApiError::internal(anyhow::anyhow!("corrupt user id '{}': {e}", row.id)))?;

    let board: Option<BoardConfig> = match row.config.as_deref() {
        Some(raw) => match serde_json::from_str(raw) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("corrupt board config for user '{}': {}", row.id, e);
                None
            }
        },
        None => None,
    };

    Ok(UserResponse {
        user_id,
        email: row.email,
        is_active: row.is_active,
        board,
        created_at: parse_timestamp(&row.created_at, &row.id),
    })
}

fn parse_timestamp(raw: &str, user_id: &str) -> chrono::DateTime<chrono::Utc> {
    raw.parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without
            // timezone. Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("corrupt created_at '{}' on user '{}': {}", raw, user_id, e);
            chrono::DateTime::default()
        })
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(load_user(&state, claims.sub)?))
}

/// Soft-deactivate the caller's account. The record stays; boards and
/// lookups treat it as gone.
pub async fn deactivate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let changed = state
        .db
        .set_user_active(&claims.sub.to_string(), false)
        .map_err(ApiError::internal)?;
    if !changed {
        return Err(ApiError::from(BoardError::UserNotFound(claims.sub.to_string())));
    }

    state
        .db
        .bump_cache_version(USERS_KIND)
        .map_err(ApiError::internal)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Create a sheet owned by the caller. The reserved reaction and highlight
/// columns are appended to the header here, once, at creation time.
pub async fn create_sheet(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateSheetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.sheet_name.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "sheet name is empty"));
    }
    if req.answer_headers.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "at least one answer column is required",
        ));
    }

    let reserved = state.engine.columns().reserved_labels();
    for header in &req.answer_headers {
        if header.trim().is_empty() {
            return Err(ApiError::new(StatusCode::BAD_REQUEST, "answer column label is empty"));
        }
        if reserved.contains(&header.as_str()) {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                format!("'{header}' is a reserved column label"),
            ));
        }
    }

    let spreadsheet_id = Uuid::new_v4().to_string();
    let mut headers = req.answer_headers.clone();
    headers.extend(reserved.iter().map(|label| label.to_string()));

    state
        .db
        .create_sheet(&spreadsheet_id, &req.sheet_name, &claims.sub.to_string(), &headers)
        .map_err(ApiError::internal)?;

    state.engine.headers().invalidate(&spreadsheet_id, &req.sheet_name);

    Ok((
        StatusCode::CREATED,
        Json(CreateSheetResponse {
            spreadsheet_id,
            sheet_name: req.sheet_name,
            headers,
        }),
    ))
}

/// Publish one of the caller's sheets as their board. A tenant holds at
/// most one published sheet reference at a time; this replaces it.
pub async fn publish_board(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PublishBoardRequest>,
) -> Result<Json<BoardConfig>, ApiError> {
    let owner = state
        .db
        .sheet_owner(&req.spreadsheet_id, &req.sheet_name)
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "sheet not found"))?;
    if owner != claims.sub.to_string() {
        return Err(ApiError::new(
            StatusCode::FORBIDDEN,
            "only the sheet owner can publish it",
        ));
    }

    let config = BoardConfig {
        spreadsheet_id: req.spreadsheet_id,
        sheet_name: req.sheet_name,
        default_sort: req.default_sort,
    };
    let config_json = serde_json::to_string(&config)
        .map_err(|e| ApiError::internal(anyhow::anyhow!("config serialization failed: {e}")))?;

    let changed = state
        .db
        .update_user_config(&claims.sub.to_string(), &config_json)
        .map_err(ApiError::internal)?;
    if !changed {
        return Err(ApiError::from(BoardError::UserNotFound(claims.sub.to_string())));
    }

    state
        .db
        .bump_cache_version(USERS_KIND)
        .map_err(ApiError::internal)?;
    state
        .engine
        .headers()
        .invalidate(&config.spreadsheet_id, &config.sheet_name);

    Ok(Json(config))
}
