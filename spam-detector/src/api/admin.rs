//! Admin API handlers
//!
//! User management, classification history and model retraining. Every
//! route sits behind the auth and admin middlewares.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::handlers::{error_response, failure, required, ApiFailure, AppState};
use super::server::CurrentUser;
use crate::error::SpamError;
use crate::spam::ModelSummary;
use crate::storage::{MessageFilter, MessageType, MessagesByType, Role, StoredMessage, User};

/// Plain `{message}` acknowledgement
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(msg: &str) -> Json<Self> {
        Json(Self {
            message: msg.to_string(),
        })
    }
}

/// Dashboard statistics
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatsResponse {
    pub total_users: i64,
    pub total_messages: i64,
    pub spam_count: i64,
    pub ham_count: i64,
    pub messages_by_type: MessagesByType,
    pub recent_activity: Vec<StoredMessage>,
}

/// GET /api/admin/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AdminStatsResponse>, ApiFailure> {
    let total_users = state.users.count_users().await.map_err(error_response)?;
    let stats = state.messages.stats().await.map_err(error_response)?;

    Ok(Json(AdminStatsResponse {
        total_users,
        total_messages: stats.total,
        spam_count: stats.spam,
        ham_count: stats.ham,
        messages_by_type: stats.by_type,
        recent_activity: stats.recent,
    }))
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<User>>, ApiFailure> {
    let users = state.users.list_users().await.map_err(error_response)?;
    Ok(Json(users))
}

/// User creation request
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// POST /api/admin/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiFailure> {
    let (Some(name), Some(email), Some(password)) =
        (required(req.name), required(req.email), required(req.password))
    else {
        return Err(failure(StatusCode::BAD_REQUEST, "Missing required fields"));
    };
    let role = match req.role.as_deref() {
        None => Role::User,
        Some(r) => Role::parse(r).map_err(error_response)?,
    };

    info!("Admin: creating user {}", email);
    let user = state
        .users
        .create_user(&name, &email, &password, role)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// DELETE /api/admin/users/:id
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(admin): CurrentUser,
    Path(user_id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiFailure> {
    if admin.id == user_id {
        return Err(failure(StatusCode::BAD_REQUEST, "Cannot delete your own account"));
    }

    state.users.delete_user(user_id).await.map_err(|e| match e {
        SpamError::NotFound(_) => failure(StatusCode::NOT_FOUND, "User not found"),
        SpamError::Forbidden(_) => {
            failure(StatusCode::FORBIDDEN, "Cannot delete admin users")
        }
        other => error_response(other),
    })?;

    info!("Admin {}: deleted user {}", admin.email, user_id);
    Ok(MessageResponse::new("User deleted successfully"))
}

/// Status update request
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

/// PATCH /api/admin/users/:id/status
pub async fn update_user_status(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<MessageResponse>, ApiFailure> {
    let Some(status) = req.status.filter(|s| !s.is_empty()) else {
        return Err(failure(StatusCode::BAD_REQUEST, "Missing status"));
    };

    state
        .users
        .update_status(user_id, &status)
        .await
        .map_err(error_response)?;

    Ok(MessageResponse::new("User status updated successfully"))
}

/// Message listing query
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesQuery {
    pub is_spam: Option<String>,
    #[serde(rename = "type")]
    pub message_type: Option<String>,
}

/// GET /api/admin/messages?isSpam=true&type=sms
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<StoredMessage>>, ApiFailure> {
    let filter = MessageFilter {
        is_spam: query.is_spam.map(|s| s.eq_ignore_ascii_case("true")),
        message_type: match query.message_type.as_deref() {
            None | Some("") => None,
            Some(t) => Some(MessageType::parse(t).map_err(error_response)?),
        },
    };

    let messages = state.messages.list(filter).await.map_err(error_response)?;
    Ok(Json(messages))
}

/// POST /api/admin/model/retrain
pub async fn retrain_model(
    State(state): State<Arc<AppState>>,
    CurrentUser(admin): CurrentUser,
) -> Result<Json<ModelSummary>, ApiFailure> {
    info!("Admin {}: retraining model", admin.email);
    let summary = state
        .model
        .retrain(&state.model_config, state.corpus.clone())
        .await
        .map_err(error_response)?;

    Ok(Json(summary))
}
