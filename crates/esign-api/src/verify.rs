use axum::{Json, response::IntoResponse};
use tracing::info;

use esign_crypto::Verification;
use esign_types::api::VerifyTextRequest;

use crate::error::{ApiError, run_blocking};
use crate::extract::{ApiBytes, ApiJson};
use crate::profile::MAX_IMAGE_SIZE;

/// POST /verify/image: raw bytes of a photo or screenshot of a QR code.
pub async fn verify_image(ApiBytes(body): ApiBytes) -> Result<Json<Verification>, ApiError> {
    if body.len() > MAX_IMAGE_SIZE {
        return Err(ApiError::PayloadTooLarge(MAX_IMAGE_SIZE));
    }

    let outcome = run_blocking(move || Ok(esign_crypto::verify_image(&body))).await?;
    info!("QR image verification: {}", outcome.label());
    Ok(Json(outcome))
}

/// POST /verify/text: payload already decoded by the client's scanner.
pub async fn verify_text(ApiJson(req): ApiJson<VerifyTextRequest>) -> impl IntoResponse {
    let outcome = esign_crypto::verify_text(&req.payload);
    info!("QR text verification: {}", outcome.label());
    Json(outcome)
}
