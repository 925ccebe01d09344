use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use board_types::api::{Claims, HighlightResponse, ReactionResponse, ToggleReactionRequest};

use crate::auth::AppState;
use crate::boards::published_board;
use crate::error::ApiError;

/// Toggle the caller's reaction on one board row. The engine enforces the
/// one-active-kind-per-user-per-row invariant under its operation lock.
pub async fn toggle_reaction(
    State(state): State<AppState>,
    Path((owner_id, row)): Path<(Uuid, u32)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ToggleReactionRequest>,
) -> Result<Json<ReactionResponse>, ApiError> {
    let config = published_board(&state, owner_id)?;

    let outcome = state
        .engine
        .apply_reaction(
            &config.spreadsheet_id,
            &config.sheet_name,
            row,
            req.kind,
            &claims.email,
        )
        .await?;

    Ok(Json(ReactionResponse {
        action: outcome.action,
        count: outcome.count,
    }))
}

/// Toggle the highlight flag on one row. Owner only; the engine itself does
/// not authorize.
pub async fn toggle_highlight(
    State(state): State<AppState>,
    Path((owner_id, row)): Path<(Uuid, u32)>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<HighlightResponse>, ApiError> {
    if claims.sub != owner_id {
        return Err(ApiError::new(
            StatusCode::FORBIDDEN,
            "only the board owner can toggle highlights",
        ));
    }

    let config = published_board(&state, owner_id)?;

    let highlighted = state
        .engine
        .toggle_highlight(&config.spreadsheet_id, &config.sheet_name, row)
        .await?;

    Ok(Json(HighlightResponse { highlighted }))
}
