//! API request handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api::auth::JwtConfig;
use crate::api::server::CurrentUser;
use crate::config::ModelConfig;
use crate::error::SpamError;
use crate::spam::{CorpusProvider, ModelHandle};
use crate::storage::{MessageStore, MessageType, Role, UserStore};

/// Shared application state
pub struct AppState {
    pub users: UserStore,
    pub messages: MessageStore,
    pub jwt_config: JwtConfig,
    pub model: Arc<ModelHandle>,
    pub corpus: Arc<dyn CorpusProvider>,
    pub model_config: ModelConfig,
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: String,
}

impl ApiError {
    pub fn new(msg: &str) -> Self {
        Self {
            message: msg.to_string(),
        }
    }
}

/// Handler error: status plus JSON body
pub type ApiFailure = (StatusCode, Json<ApiError>);

pub(crate) fn failure(status: StatusCode, msg: &str) -> ApiFailure {
    (status, Json(ApiError::new(msg)))
}

/// Map a library error onto its HTTP response
pub(crate) fn error_response(err: SpamError) -> ApiFailure {
    let status = err.status_code();
    if status.is_server_error() {
        error!("Request failed: {}", err);
    }
    (status, Json(ApiError::new(&err.to_string())))
}

/// Health response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub vocabulary_size: usize,
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let model = state.model.current().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        model_loaded: model.is_trained(),
        vocabulary_size: model.vectorizer().vocabulary_size(),
    })
}

/// Registration request body
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Registration response
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: i64,
}

pub(crate) fn required(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.trim().is_empty())
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiFailure> {
    let (Some(name), Some(email), Some(password)) =
        (required(req.name), required(req.email), required(req.password))
    else {
        return Err(failure(StatusCode::BAD_REQUEST, "Missing required fields"));
    };

    let user = state
        .users
        .create_user(&name, &email, &password, Role::User)
        .await
        .map_err(|e| match e {
            SpamError::Conflict(_) => failure(StatusCode::CONFLICT, "Email already registered"),
            other => error_response(other),
        })?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user_id: user.id,
        }),
    ))
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Public view of the logged-in user
#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

/// POST /api/auth/login - Authenticate and get JWT token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiFailure> {
    let (Some(email), Some(password)) = (required(req.email), required(req.password)) else {
        warn!("Login attempt without email or password");
        return Err(failure(StatusCode::BAD_REQUEST, "Missing email or password"));
    };

    let user = state
        .users
        .verify_credentials(&email, &password)
        .await
        .map_err(error_response)?
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "Invalid credentials"))?;

    let token = state.jwt_config.create_token(&user).map_err(|e| {
        error!("Failed to create token: {}", e);
        failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create token")
    })?;

    info!("Successful login for {} with role {}", user.email, user.role.as_str());
    Ok(Json(LoginResponse {
        token,
        user: LoginUser {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        },
    }))
}

/// Prediction request body
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub message_type: Option<String>,
}

/// Prediction response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictResponse {
    pub is_spam: bool,
    pub confidence: f64,
    pub message: String,
}

/// POST /api/predict - Classify a message and record it
pub async fn predict(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ApiFailure> {
    let Some(message) = required(req.message) else {
        return Err(failure(StatusCode::BAD_REQUEST, "No message provided"));
    };
    let message_type = match req.message_type.as_deref() {
        None => MessageType::default(),
        Some(t) => MessageType::parse(t).map_err(error_response)?,
    };

    let prediction = state.model.predict(&message).await.map_err(error_response)?;

    // history is best effort
    if let Err(e) = state
        .messages
        .record(user.id, &message, message_type, &prediction)
        .await
    {
        error!("Error saving message: {}", e);
    }

    Ok(Json(PredictResponse {
        is_spam: prediction.is_spam,
        confidence: prediction.confidence,
        message: if prediction.is_spam { "Spam detected" } else { "Not spam" }.to_string(),
    }))
}
