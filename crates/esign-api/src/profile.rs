use axum::{
    Extension, Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use tracing::info;

use esign_crypto::payload::{KEY_ID, KEY_POS, KEY_SIGNER, check_field};
use esign_crypto::qr::image_content_type;
use esign_types::api::{Claims, DashboardResponse, ProfileResponse, UpdateProfileRequest};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::{ApiBytes, ApiJson};

/// 5 MB upload limit for logos and backgrounds
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let user = state
        .with_db(move |db| db.get_user_by_id(&uid))
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    Ok(Json(ProfileResponse {
        user_id: claims.sub,
        username: user.username,
        role: user.role,
        full_name: user.full_name,
        emp_id: user.emp_id,
        position: user.position,
        has_logo: user.has_logo,
    }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<StatusCode, ApiError> {
    let full_name = req.full_name.trim().to_string();
    let emp_id = req.emp_id.trim().to_string();
    let position = req.position.trim().to_string();

    // These end up inside every QR payload the user signs
    for (field, value) in [(KEY_SIGNER, &full_name), (KEY_ID, &emp_id), (KEY_POS, &position)] {
        check_field(field, value).map_err(|e| ApiError::bad_request(e.to_string()))?;
    }

    let uid = claims.sub.to_string();
    let updated = state
        .with_db(move |db| db.update_profile(&uid, &full_name, &emp_id, &position))
        .await?;
    if !updated {
        return Err(ApiError::not_found("user not found"));
    }

    info!("Profile updated for {}", claims.username);
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /me/logo: raw PNG or JPEG bytes.
pub async fn upload_logo(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiBytes(body): ApiBytes,
) -> Result<StatusCode, ApiError> {
    validate_image(&body)?;

    let uid = claims.sub.to_string();
    let updated = state
        .with_db(move |db| db.set_logo(&uid, &body))
        .await?;
    if !updated {
        return Err(ApiError::not_found("user not found"));
    }

    info!("Logo updated for {}", claims.username);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_logo(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let logo = state
        .with_db(move |db| db.get_logo(&uid))
        .await?
        .ok_or_else(|| ApiError::not_found("no logo uploaded"))?;

    Ok(image_response(logo))
}

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let document_count = state
        .with_db(move |db| db.count_documents(Some(&uid)))
        .await?;

    Ok(Json(DashboardResponse {
        username: claims.username,
        document_count,
    }))
}

/// Accept only non-empty PNG/JPEG uploads within the size limit.
pub(crate) fn validate_image(bytes: &[u8]) -> Result<&'static str, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::bad_request("empty upload"));
    }
    if bytes.len() > MAX_IMAGE_SIZE {
        return Err(ApiError::PayloadTooLarge(MAX_IMAGE_SIZE));
    }
    image_content_type(bytes).ok_or(ApiError::UnsupportedImage)
}

pub(crate) fn image_response(bytes: Vec<u8>) -> impl IntoResponse {
    let content_type = image_content_type(&bytes).unwrap_or("application/octet-stream");
    ([(header::CONTENT_TYPE, content_type)], bytes)
}
