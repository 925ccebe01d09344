use std::collections::{HashMap, HashSet};

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use board_core::store::RowStore;
use board_core::{codec, scoring};
use board_types::api::{
    BoardEntry, BoardResponse, Claims, ReactionCounts, SubmitAnswerRequest, SubmitAnswerResponse,
};
use board_types::models::{BoardConfig, ReactionKind, SortMode};

use crate::auth::{AppState, AppStateInner};
use crate::error::ApiError;
use crate::tenants::load_user;

#[derive(Debug, Deserialize)]
pub struct BoardQuery {
    pub sort: Option<SortMode>,
}

/// Resolve a tenant's published board config; 404 for inactive tenants and
/// unpublished boards alike.
pub(crate) fn published_board(
    state: &AppStateInner,
    owner_id: Uuid,
) -> Result<BoardConfig, ApiError> {
    let owner = load_user(state, owner_id)?;
    if !owner.is_active {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "user not found"));
    }
    owner
        .board
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "no published board for this user"))
}

/// Render a tenant's board: all rows of the published sheet with reaction
/// counts, highlight flag, the viewer's own active reaction, in the
/// requested display order.
pub async fn get_board(
    State(state): State<AppState>,
    Path(owner_id): Path<Uuid>,
    Query(query): Query<BoardQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<BoardResponse>, ApiError> {
    let config = published_board(&state, owner_id)?;
    let sort = query.sort.unwrap_or(config.default_sort);

    // Run blocking sheet reads off the async runtime
    let db = state.db.clone();
    let spreadsheet_id = config.spreadsheet_id.clone();
    let sheet_name = config.sheet_name.clone();
    let (headers, rows) = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let headers = db.header_row(&spreadsheet_id, &sheet_name)?;
        let rows = db.data_rows(&spreadsheet_id, &sheet_name)?;
        Ok((headers, rows))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    })?
    .map_err(ApiError::internal)?;

    let columns = state.engine.columns();
    let reaction_cols: Vec<(ReactionKind, Option<usize>)> = columns
        .reactions
        .iter()
        .map(|(kind, label)| (*kind, headers.iter().position(|h| h == label)))
        .collect();
    let highlight_col = headers.iter().position(|h| *h == columns.highlight);
    let reserved: HashSet<&str> = columns.reserved_labels().into_iter().collect();

    let mut entries = Vec::with_capacity(rows.len());
    let mut stats = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let mut answers = HashMap::new();
        for (idx, label) in headers.iter().enumerate() {
            if label.trim().is_empty() || reserved.contains(label.as_str()) {
                continue;
            }
            answers.insert(label.clone(), row.get(idx).cloned().unwrap_or_default());
        }

        let mut counts = ReactionCounts::default();
        let mut viewer_reaction = None;
        for (kind, col) in &reaction_cols {
            let Some(col) = col else { continue };
            let users = codec::decode(row.get(*col).map(String::as_str).unwrap_or(""));
            if users.iter().any(|u| u == &claims.email) {
                viewer_reaction = Some(*kind);
            }
            match kind {
                ReactionKind::Understand => counts.understand = users.len(),
                ReactionKind::Like => counts.like = users.len(),
                ReactionKind::Curious => counts.curious = users.len(),
            }
        }

        let highlighted = highlight_col
            .and_then(|col| row.get(col))
            .is_some_and(|v| v == "true");

        stats.push(scoring::RowStats {
            likes: counts.like,
            understands: counts.understand,
            curious: counts.curious,
            highlighted,
        });
        entries.push(BoardEntry {
            row: (i + 1) as u32,
            answers,
            reactions: counts,
            highlighted,
            viewer_reaction,
        });
    }

    let order = scoring::display_order(&stats, sort, &mut rand::rng());
    let entries: Vec<BoardEntry> = order.into_iter().map(|i| entries[i].clone()).collect();

    Ok(Json(BoardResponse {
        owner_id,
        sheet_name: config.sheet_name,
        sort,
        entries,
    }))
}

/// Append one answer row to a tenant's published sheet. Submitted values are
/// aligned to the live header row; reserved cells stay empty.
pub async fn submit_answer(
    State(state): State<AppState>,
    Path(owner_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let config = published_board(&state, owner_id)?;
    if req.answers.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "no answers submitted"));
    }

    let header = state
        .engine
        .headers()
        .resolve(state.db.as_ref(), &config.spreadsheet_id, &config.sheet_name)?;
    let reserved: HashSet<&str> = state
        .engine
        .columns()
        .reserved_labels()
        .into_iter()
        .collect();

    let width = header.values().max().map(|m| m + 1).unwrap_or(0);
    let mut values = vec![String::new(); width];
    for (key, value) in &req.answers {
        if reserved.contains(key.as_str()) {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                format!("'{key}' is a reserved column"),
            ));
        }
        let idx = *header.get(key.as_str()).ok_or_else(|| {
            ApiError::new(StatusCode::BAD_REQUEST, format!("unknown answer column '{key}'"))
        })?;
        values[idx] = value.clone();
    }

    let db = state.db.clone();
    let row = tokio::task::spawn_blocking(move || {
        db.append_row(&config.spreadsheet_id, &config.sheet_name, &values)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    })?
    .map_err(ApiError::internal)?;

    Ok((StatusCode::CREATED, Json(SubmitAnswerResponse { row })))
}
