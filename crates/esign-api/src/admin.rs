use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use esign_db::models::UserRow;
use esign_types::api::{Claims, RecentActivity, StatsResponse, UserSummary};
use esign_types::models::{ResetState, Role, UserStatus};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::{ApiBytes, ApiPath};
use crate::profile::{image_response, validate_image};

/// Number of signing events shown on the admin dashboard.
const RECENT_ACTIVITY_LIMIT: u32 = 10;

pub async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let (total_documents, total_users, recent) = state
        .with_db(|db| {
            Ok((
                db.count_documents(None)?,
                db.count_users(Role::User)?,
                db.recent_activity(RECENT_ACTIVITY_LIMIT)?,
            ))
        })
        .await?;

    Ok(Json(StatsResponse {
        total_documents,
        total_users,
        recent: recent
            .into_iter()
            .map(|r| RecentActivity {
                signed_at: r.signed_at,
                username: r.username,
                doc_name: r.doc_name,
            })
            .collect(),
    }))
}

/// GET /admin/users: regular accounts, e.g. to pick a chat partner.
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = state.with_db(|db| db.list_users_by_role(Role::User)).await?;
    Ok(Json(summaries(rows)))
}

/// GET /admin/pending: registrations waiting for approval.
pub async fn pending_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = state
        .with_db(|db| db.list_users_by_status(UserStatus::Pending))
        .await?;
    Ok(Json(summaries(rows)))
}

pub async fn approve_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    let uid = user_id.to_string();
    let updated = state
        .with_db(move |db| db.set_status(&uid, UserStatus::Active))
        .await?;
    if !updated {
        return Err(ApiError::not_found("user not found"));
    }

    info!("User {} approved by {}", user_id, claims.username);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /admin/reset-requests: users waiting for a password reset.
pub async fn reset_requests(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = state.with_db(|db| db.list_reset_requests()).await?;
    Ok(Json(summaries(rows)))
}

/// Allow a user who asked for a reset to pick a new password.
pub async fn grant_reset(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    let uid = user_id.to_string();
    let (granted, exists) = state
        .with_db(move |db| {
            let granted = db.transition_reset(&uid, ResetState::Requested, ResetState::Granted)?;
            let exists = granted || db.get_user_by_id(&uid)?.is_some();
            Ok((granted, exists))
        })
        .await?;

    if !exists {
        return Err(ApiError::not_found("user not found"));
    }
    if !granted {
        return Err(ApiError::Conflict("user has not requested a password reset".into()));
    }

    info!("Password reset for {} granted by {}", user_id, claims.username);
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /admin/background: raw PNG or JPEG bytes.
pub async fn set_background(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiBytes(body): ApiBytes,
) -> Result<StatusCode, ApiError> {
    validate_image(&body)?;
    state.with_db(move |db| db.set_background(&body)).await?;

    info!("Background image replaced by {}", claims.username);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /background: public, shown behind the login page too.
pub async fn get_background(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let image = state
        .with_db(|db| db.get_background())
        .await?
        .ok_or_else(|| ApiError::not_found("no background configured"))?;

    Ok(image_response(image))
}

fn summaries(rows: Vec<UserRow>) -> Vec<UserSummary> {
    rows.into_iter()
        .map(|row| UserSummary {
            id: row.id.parse().unwrap_or_else(|e| {
                warn!("Corrupt user id '{}': {}", row.id, e);
                Uuid::default()
            }),
            username: row.username,
            status: row.status,
            reset: row.reset,
        })
        .collect()
}
