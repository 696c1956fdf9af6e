use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::AppState;
use crate::engine::SquadView;
use crate::error::ApiError;

use super::client_ip;

pub async fn get_squad(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(share_code): Path<String>,
) -> Result<Json<SquadView>, ApiError> {
    let ip = client_ip(&headers);
    let view = state.engine.get_squad(&share_code, &ip).await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
pub struct LeaveBody {
    room_share_code: Option<String>,
    member_id: Option<String>,
}

pub async fn leave(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<LeaveBody>,
) -> Result<Json<Value>, ApiError> {
    let ip = client_ip(&headers);
    let room_share_code = body
        .room_share_code
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .ok_or(ApiError::InvalidInput("Invalid request."))?;
    let member_id = body
        .member_id
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .ok_or(ApiError::InvalidInput("Invalid request."))?;

    state
        .engine
        .leave(room_share_code.trim(), member_id.trim(), &ip)
        .await?;

    Ok(Json(json!({ "ok": true })))
}
