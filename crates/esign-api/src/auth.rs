use std::sync::Arc;

use anyhow::anyhow;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use esign_db::Database;
use esign_types::api::{
    Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, ResetPasswordRequest,
    ResetRequest, ResetRequestResponse,
};
use esign_types::models::{ResetState, Role, UserStatus};

use crate::error::{ApiError, run_blocking};
use crate::extract::ApiJson;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

impl AppStateInner {
    /// Run a database call on the blocking pool.
    pub async fn with_db<F, T>(self: &Arc<Self>, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(self);
        run_blocking(move || f(&state.db).map_err(ApiError::from)).await
    }
}

const MIN_PASSWORD_LEN: usize = 8;

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    let chars = username.chars().count();
    if !(3..=32).contains(&chars) {
        return Err(ApiError::bad_request("username must be 3-32 characters"));
    }
    check_password(&req.password)?;

    let password_hash = run_blocking(move || Ok(hash_password(&req.password)?)).await?;

    let user_id = Uuid::new_v4();
    let id = user_id.to_string();
    let name = username.clone();
    let created = state
        .with_db(move |db| db.create_user(&id, &name, &password_hash))
        .await?;
    if !created {
        return Err(ApiError::Conflict("username already exists".into()));
    }

    info!("Registered {} (awaiting approval)", username);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id,
            status: UserStatus::Pending,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.clone();
    let user = state
        .with_db(move |db| db.get_user_by_username(&username))
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    if user.status == UserStatus::Pending {
        return Err(ApiError::Forbidden(
            "account has not been approved by an administrator yet".into(),
        ));
    }

    let stored = user.password.clone();
    let ok = run_blocking(move || Ok(verify_password(&req.password, &stored)?)).await?;
    if !ok {
        return Err(ApiError::Unauthorized("wrong password".into()));
    }

    let user_id = user.id.parse::<Uuid>().map_err(|e| anyhow!("corrupt user id {}: {}", user.id, e))?;
    let token = create_token(&state.jwt_secret, user_id, &user.username, user.role)?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        role: user.role,
        token,
    }))
}

/// Ask for a password reset, or learn that an admin has already allowed one.
pub async fn request_reset(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let reset = state
        .with_db(move |db| {
            let Some(user) = db.get_user_by_username(&req.username)? else {
                return Ok(None);
            };
            if user.reset == ResetState::Granted {
                return Ok(Some(ResetState::Granted));
            }
            db.transition_reset(&user.id, ResetState::None, ResetState::Requested)?;
            info!("Password reset requested for {}", user.username);
            Ok(Some(ResetState::Requested))
        })
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    Ok(Json(ResetRequestResponse { reset }))
}

/// Set a new password once an admin has granted the reset.
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    check_password(&req.new_password)?;

    let username = req.username.clone();
    let user = state
        .with_db(move |db| db.get_user_by_username(&username))
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    if user.reset != ResetState::Granted {
        return Err(ApiError::Forbidden("password reset has not been granted".into()));
    }

    let password_hash = run_blocking(move || Ok(hash_password(&req.new_password)?)).await?;
    let id = user.id.clone();
    let done = state
        .with_db(move |db| db.complete_reset(&id, &password_hash))
        .await?;
    if !done {
        return Err(ApiError::Forbidden("password reset has not been granted".into()));
    }

    info!("Password reset completed for {}", user.username);
    Ok(StatusCode::NO_CONTENT)
}

/// Create the `ADMIN` account on first start.
pub fn bootstrap_admin(db: &Database, password: &str) -> anyhow::Result<()> {
    let password_hash = hash_password(password)?;
    if db.ensure_admin(&Uuid::new_v4().to_string(), &password_hash)? {
        info!("Created bootstrap admin account");
    }
    Ok(())
}

fn check_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Hash a password with Argon2id.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, stored_hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| anyhow!("corrupt password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn create_token(secret: &str, user_id: Uuid, username: &str, role: Role) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        role,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
