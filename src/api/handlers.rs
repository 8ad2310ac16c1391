//! User CRUD Handlers
//! Mission: Wire authentication, authorization, merge, and storage together

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::AppState;
use crate::auth::{authorize, AuthError, AuthIdentity, Operation};
use crate::models::{User, UserPatch};
use crate::store::StoreError;
use crate::validation::{validate_patch, ValidationError};

/// Health probe - GET /ping
pub async fn ping() -> &'static str {
    "pong"
}

/// Basic-auth middleware for the /users subtree.
///
/// Decodes the credential envelope, authenticates it, and inserts the
/// resulting identity into the request extensions for the handlers. Any
/// malformed envelope reports the same way as bad credentials.
pub async fn basic_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let encoded = header_value
        .strip_prefix("Basic ")
        .ok_or(ApiError::Unauthorized)?;
    let decoded = BASE64
        .decode(encoded.trim())
        .map_err(|_| ApiError::Unauthorized)?;
    let decoded = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;
    let (username, secret) = decoded.split_once(':').ok_or(ApiError::Unauthorized)?;

    let identity = state.verifier.authenticate(username, secret)?;
    debug!("authenticated {}", identity.username);
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub offset: Option<usize>,
}

/// List users - GET /users (any authenticated user)
pub async fn list_users(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<User>>, ApiError> {
    authorize(state.store.as_ref(), &identity, Operation::ListUsers)?;

    let users = state.store.list()?;
    let users: Vec<User> = users
        .into_iter()
        .skip(params.offset.unwrap_or(0))
        .collect();

    Ok(Json(users))
}

/// Create user - POST /users (admin only)
pub async fn create_user(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Json(payload): Json<UserPatch>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    authorize(state.store.as_ref(), &identity, Operation::CreateUser)?;

    let (username, password, email) = required_fields(&payload)?;
    validate_patch(&payload, state.policy)?;

    let password_hash = hash_password(&password, state.bcrypt_cost)?;
    let mut user = User {
        id: Uuid::nil(),
        username,
        email,
        password_hash,
        admin: payload.admin,
    };

    user.id = state.store.create(user.clone())?;
    info!("✅ Created user: {}", user.username);

    Ok((StatusCode::CREATED, Json(user)))
}

/// Get user by id - GET /users/:user_id (any authenticated user)
pub async fn get_user(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    authorize(state.store.as_ref(), &identity, Operation::GetUser)?;

    let id = parse_user_id(&user_id)?;
    let user = state.store.get_by_id(id)?;

    Ok(Json(user))
}

/// Replace user - PUT /users/:user_id (admin only)
///
/// All required fields must be present and non-empty; the admin flag stays
/// tri-state (absent keeps the stored value).
pub async fn put_user(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Path(user_id): Path<String>,
    Json(mut payload): Json<UserPatch>,
) -> Result<StatusCode, ApiError> {
    authorize(state.store.as_ref(), &identity, Operation::PutUser)?;
    let id = parse_user_id(&user_id)?;

    let (_, password, _) = required_fields(&payload)?;
    validate_patch(&payload, state.policy)?;

    let mut user = state.store.get_by_id(id)?;
    payload.password = Some(hash_password(&password, state.bcrypt_cost)?);
    user.apply_patch(&payload);
    state.store.update(user)?;

    Ok(StatusCode::OK)
}

/// Partially update user - PATCH /users/:user_id (admin only)
pub async fn patch_user(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Path(user_id): Path<String>,
    Json(mut payload): Json<UserPatch>,
) -> Result<StatusCode, ApiError> {
    authorize(state.store.as_ref(), &identity, Operation::PatchUser)?;
    let id = parse_user_id(&user_id)?;

    if payload.is_empty() {
        return Err(StoreError::EmptyUpdate.into());
    }
    validate_patch(&payload, state.policy)?;

    let mut user = state.store.get_by_id(id)?;
    if let Some(password) = payload.password.take() {
        payload.password = Some(hash_password(&password, state.bcrypt_cost)?);
    }
    user.apply_patch(&payload);
    state.store.update(user)?;

    Ok(StatusCode::OK)
}

/// Delete user - DELETE /users/:user_id (admin only)
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    authorize(state.store.as_ref(), &identity, Operation::DeleteUser)?;

    let id = parse_user_id(&user_id)?;
    state.store.delete(id)?;
    info!("🗑️  Deleted user: {}", id);

    Ok(StatusCode::OK)
}

fn parse_user_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidUserId)
}

/// Fields every create/replace payload must carry, non-empty.
fn required_fields(payload: &UserPatch) -> Result<(String, String, String), ApiError> {
    let username = match payload.username.as_deref() {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => return Err(ApiError::Validation("empty username".to_string())),
    };
    let password = match payload.password.as_deref() {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => return Err(ApiError::Validation("empty password".to_string())),
    };
    let email = match payload.email.as_deref() {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => return Err(ApiError::Validation("empty email".to_string())),
    };
    Ok((username, password, email))
}

// Hashing happens here in the handler layer so the store's critical
// sections never carry bcrypt work.
fn hash_password(password: &str, cost: u32) -> Result<String, ApiError> {
    bcrypt::hash(password, cost).map_err(|e| {
        warn!("failed to hash password: {}", e);
        ApiError::Internal
    })
}

/// API errors mapped onto the HTTP status contract.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Forbidden,
    NotFound,
    UsernameExists,
    EmailExists,
    EmptyUpdate,
    InvalidUserId,
    Validation(String),
    Internal,
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ApiError::NotFound,
            StoreError::UsernameExists => ApiError::UsernameExists,
            StoreError::EmailExists => ApiError::EmailExists,
            StoreError::EmptyUpdate => ApiError::EmptyUpdate,
            StoreError::Storage(msg) => {
                warn!("storage failure: {}", msg);
                ApiError::Internal
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Unauthorized => ApiError::Unauthorized,
            AuthError::Forbidden => ApiError::Forbidden,
            AuthError::Internal => ApiError::Internal,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Validation(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "forbidden".to_string()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "user not found".to_string()),
            ApiError::UsernameExists => {
                (StatusCode::CONFLICT, "username already exists".to_string())
            }
            ApiError::EmailExists => (StatusCode::CONFLICT, "email already exists".to_string()),
            ApiError::EmptyUpdate => (StatusCode::BAD_REQUEST, "nothing to update".to_string()),
            ApiError::InvalidUserId => (StatusCode::BAD_REQUEST, "invalid user id".to_string()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ),
        };

        let mut response = (status, message).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"users\""),
            );
        }
        response
    }
}
