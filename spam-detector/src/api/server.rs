//! API Server - HTTP server for REST API

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        request::Parts,
        HeaderValue, Method, StatusCode,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::admin;
use crate::api::handlers::{self, ApiError, ApiFailure, AppState};
use crate::config::ServerConfig;
use crate::storage::User;

/// Authenticated user, resolved by the auth middleware
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// API Server configuration
pub struct ApiServer {
    state: Arc<AppState>,
    addr: String,
    cors_origins: Vec<String>,
}

impl ApiServer {
    pub fn new(state: Arc<AppState>, config: &ServerConfig) -> Self {
        Self {
            state,
            addr: format!("{}:{}", config.host, config.port),
            cors_origins: config.cors_origins.clone(),
        }
    }

    fn cors(&self) -> CorsLayer {
        let origins: Vec<HeaderValue> = self
            .cors_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin {}", o);
                    None
                }
            })
            .collect();

        let allow_origin = if origins.is_empty() {
            AllowOrigin::from(Any)
        } else {
            AllowOrigin::list(origins)
        };

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([CONTENT_TYPE, AUTHORIZATION])
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        // Public routes (no auth required)
        let public_routes = Router::new()
            .route("/health", get(handlers::health))
            .route("/auth/register", post(handlers::register))
            .route("/auth/login", post(handlers::login));

        // Protected routes (auth required)
        let protected_routes = Router::new()
            .route("/predict", post(handlers::predict))
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth_middleware,
            ));

        // Admin routes (auth required + admin role check)
        let admin_routes = Router::new()
            .route("/stats", get(admin::get_stats))
            .route("/users", get(admin::list_users).post(admin::create_user))
            .route("/users/:id", delete(admin::delete_user))
            .route("/users/:id/status", patch(admin::update_user_status))
            .route("/messages", get(admin::list_messages))
            .route("/model/retrain", post(admin::retrain_model))
            .route_layer(middleware::from_fn(admin_middleware))
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth_middleware,
            ));

        Router::new()
            .nest("/api", public_routes.merge(protected_routes))
            .nest("/api/admin", admin_routes)
            .layer(self.cors())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Start the API server
    pub async fn run(&self) -> std::io::Result<()> {
        let router = self.router();

        info!("Starting API server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}

fn unauthorized(msg: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(ApiError::new(msg))).into_response()
}

/// Authentication middleware - validates the JWT and loads its user
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        warn!("Missing bearer token");
        return unauthorized("Token is missing!");
    };

    let claims = match state.jwt_config.validate_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            warn!("Invalid JWT token: {}", e);
            return unauthorized("Token is invalid!");
        }
    };

    match state.users.find_by_id(claims.sub).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(CurrentUser(user));
            next.run(req).await
        }
        Ok(None) => unauthorized("User no longer exists!"),
        Err(e) => handlers::error_response(e).into_response(),
    }
}

/// Admin middleware - runs after [`auth_middleware`]
async fn admin_middleware(req: Request, next: Next) -> Response {
    let is_admin = req
        .extensions()
        .get::<CurrentUser>()
        .is_some_and(|CurrentUser(user)| user.is_admin());

    if !is_admin {
        return (
            StatusCode::FORBIDDEN,
            Json(ApiError::new("Admin privileges required!")),
        )
            .into_response();
    }
    next.run(req).await
}

/// Extract the current user from request (for handlers)
#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiFailure;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or((
                StatusCode::UNAUTHORIZED,
                Json(ApiError::new("Not authenticated")),
            ))
    }
}
