use crate::{
    app::AppState,
    db::StoreError,
    models::{ErrorResponse, LoginRequest, LoginResponse, RegisterRequest, UserResponse},
    services::auth_service::{hash_password, issue_token, validate_jwt, verify_password},
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;
use tracing::{error, info, warn};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn jwt_secret(state: &AppState) -> Result<&str, ApiError> {
    match &state.config.auth_jwt_secret {
        Some(secret) => Ok(secret),
        None => {
            error!("Auth JWT secret not configured");
            Err(ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, "Authentication is not configured"))
        }
    }
}

/// Create an account
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    if req.username.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ErrorResponse::reply(StatusCode::BAD_REQUEST, "Username, email and password are required"));
    }

    let hash = hash_password(req.password, state.config.bcrypt_cost).await.map_err(|e| {
        error!("Failed to hash password: {}", e);
        ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to register user")
    })?;

    match state.users.create_user(req.username.trim(), req.email.trim(), &hash).await {
        Ok(user) => {
            info!("Registered user {}", user.username);
            Ok((StatusCode::OK, Json(UserResponse {
                id: user.id,
                username: user.username,
                email: user.email,
                created_at: user.created_at,
            })))
        }
        Err(StoreError::Conflict(msg)) => {
            warn!("Registration rejected: {}", msg);
            Err(ErrorResponse::reply(StatusCode::CONFLICT, "Username already taken"))
        }
        Err(e) => {
            error!("Failed to register user: {}", e);
            Err(ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to register user"))
        }
    }
}

/// Exchange credentials for a signed token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), ApiError> {
    let secret = jwt_secret(&state)?;

    let user = match state.users.find_user_by_username(&req.username).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(ErrorResponse::reply(StatusCode::NOT_FOUND, "User not found!")),
        Err(e) => {
            error!("Failed to look up user {}: {}", req.username, e);
            return Err(ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to log in"));
        }
    };

    let valid = verify_password(req.password, user.password_hash.clone()).await.map_err(|e| {
        error!("Failed to verify password for {}: {}", user.username, e);
        ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to log in")
    })?;
    if !valid {
        warn!("Wrong password for user {}", user.username);
        return Err(ErrorResponse::reply(StatusCode::BAD_REQUEST, "Wrong password!"));
    }

    let token = issue_token(&user, secret, state.config.auth_token_ttl_secs).map_err(|e| {
        error!("Failed to sign token: {}", e);
        ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to log in")
    })?;

    info!("User {} logged in", user.username);
    Ok((StatusCode::OK, Json(LoginResponse { token, username: user.username })))
}

/// The user a bearer token was issued to
pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let secret = jwt_secret(&state)?;

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| ErrorResponse::reply(StatusCode::UNAUTHORIZED, "Missing bearer token"))?;

    let claims = match validate_jwt(token, secret) {
        Ok(data) => data.claims,
        Err(e) => {
            warn!("JWT validation failed: {}", e);
            return Err(ErrorResponse::reply(StatusCode::UNAUTHORIZED, "Invalid token"));
        }
    };

    match state.users.find_user_by_username(&claims.username).await {
        Ok(Some(user)) if user.id.to_string() == claims.sub => Ok((StatusCode::OK, Json(UserResponse {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }))),
        Ok(_) => Err(ErrorResponse::reply(StatusCode::UNAUTHORIZED, "User no longer exists")),
        Err(e) => {
            error!("Failed to look up user {}: {}", claims.username, e);
            Err(ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load user"))
        }
    }
}
