use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
    response::Redirect,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;

use crate::AppState;
use crate::engine::{ChangeEmailTarget, ConfirmOutcome};
use crate::error::ApiError;

use super::{client_ip, user_agent};

#[derive(Debug, Deserialize)]
pub struct JoinBody {
    email: Option<String>,
    share_code: Option<String>,
}

pub async fn join(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<JoinBody>,
) -> Result<Json<Value>, ApiError> {
    let ip = client_ip(&headers);
    let email = body
        .email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .ok_or(ApiError::InvalidInput("Email is required."))?;

    let outcome = state
        .engine
        .join(
            email,
            body.share_code.as_deref(),
            &ip,
            user_agent(&headers).as_deref(),
        )
        .await?;

    let body = if outcome.already_verified {
        json!({ "already_verified": true, "share_code": outcome.share_code })
    } else {
        json!({ "share_code": outcome.share_code })
    };
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    token: Option<String>,
}

/// Reached by clicking an email link, so outcomes are communicated through
/// redirect query parameters instead of a JSON body.
pub async fn confirm(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConfirmQuery>,
) -> Redirect {
    let Some(token) = query.token.filter(|t| !t.trim().is_empty()) else {
        return Redirect::to("/?verify=invalid");
    };

    match state.engine.confirm(token.trim()).await {
        Ok(ConfirmOutcome::Verified {
            share_code: Some(code),
        })
        | Ok(ConfirmOutcome::AlreadyUsed {
            share_code: Some(code),
        }) => Redirect::to(&format!("/squad/{code}?verified=1")),
        Ok(ConfirmOutcome::Verified { share_code: None }) => Redirect::to("/?verify=ok"),
        Ok(ConfirmOutcome::AlreadyUsed { share_code: None }) => {
            Redirect::to("/?verify=already_used")
        }
        Ok(ConfirmOutcome::Invalid) => Redirect::to("/?verify=invalid"),
        Ok(ConfirmOutcome::Expired) => Redirect::to("/?verify=expired"),
        Err(e) => {
            error!("Confirm failed: {e}");
            Redirect::to("/?verify=error")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResendBody {
    email: Option<String>,
}

pub async fn resend(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ResendBody>,
) -> Result<Json<Value>, ApiError> {
    let ip = client_ip(&headers);
    let email = body
        .email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .ok_or(ApiError::InvalidInput("Email is required."))?;

    state.engine.resend(email, &ip).await?;
    Ok(Json(json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
pub struct ChangeEmailBody {
    share_code: Option<String>,
    new_email: Option<String>,
    member_id: Option<String>,
}

pub async fn change_email(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ChangeEmailBody>,
) -> Result<Json<Value>, ApiError> {
    let ip = client_ip(&headers);
    let share_code = body
        .share_code
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .ok_or(ApiError::InvalidInput("Invalid request."))?;
    let new_email = body
        .new_email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .ok_or(ApiError::InvalidInput("New email is required."))?;

    // Resolve the target variant once up front instead of re-branching on
    // member_id presence later.
    let target = match body.member_id.filter(|m| !m.trim().is_empty()) {
        Some(member_id) => ChangeEmailTarget::Member(member_id),
        None => ChangeEmailTarget::Owner,
    };

    let new_share_code = state
        .engine
        .change_email(share_code.trim(), new_email, target, &ip)
        .await?;

    Ok(Json(json!({ "ok": true, "new_share_code": new_share_code })))
}
