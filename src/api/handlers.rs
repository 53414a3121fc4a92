use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{
        AddOutcome, AuthState, MergeReport, NewWishlistItem, RemoveOutcome, WishlistId,
        WishlistItem, WishlistSnapshot,
    },
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub state: AuthState,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Last committed wishlist snapshot
pub async fn get_wishlist(State(state): State<AppState>) -> Json<WishlistSnapshot> {
    Json(state.engine.snapshot())
}

/// Add a program to the wishlist
pub async fn add_to_wishlist(
    State(state): State<AppState>,
    Json(request): Json<NewWishlistItem>,
) -> AppResult<(StatusCode, Json<AddOutcome>)> {
    if request.title.trim().is_empty() {
        return Err(AppError::InvalidInput("title must not be empty".to_string()));
    }

    let outcome = state.engine.add(request).await?;
    let status = match outcome {
        AddOutcome::Added { .. } => StatusCode::CREATED,
        AddOutcome::AlreadyPresent { .. } => StatusCode::OK,
        AddOutcome::SavedLocallyOnly { .. } | AddOutcome::Accepted { .. } => StatusCode::ACCEPTED,
    };

    Ok((status, Json(outcome)))
}

/// Remove an entry by id (`123` for server ids, `local:123` for local ones)
pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<RemoveOutcome>> {
    let id: WishlistId = id.parse()?;
    let outcome = state.engine.remove(id).await?;
    Ok(Json(outcome))
}

pub async fn refresh_wishlist(State(state): State<AppState>) -> AppResult<Json<Vec<WishlistItem>>> {
    let items = state.engine.refresh().await?;
    Ok(Json(items))
}

/// Push items left in the local cache by an earlier partial merge
pub async fn retry_merge(State(state): State<AppState>) -> AppResult<Json<MergeReport>> {
    let report = state.engine.retry_merge().await?;
    Ok(Json(report))
}

pub async fn begin_login(State(state): State<AppState>) -> Json<SessionResponse> {
    state.auth.begin_login();
    Json(SessionResponse {
        state: state.auth.state(),
    })
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<SessionResponse>> {
    if request.token.trim().is_empty() {
        return Err(AppError::InvalidInput("token must not be empty".to_string()));
    }

    state.auth.login(request.token);
    Ok(Json(SessionResponse {
        state: state.auth.state(),
    }))
}

pub async fn logout(State(state): State<AppState>) -> Json<SessionResponse> {
    state.auth.logout();
    Json(SessionResponse {
        state: state.auth.state(),
    })
}
