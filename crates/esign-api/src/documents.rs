use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use tracing::{info, warn};
use uuid::Uuid;

use esign_crypto::payload::{IssuedPayload, SignedFields};
use esign_crypto::qr::{self, QrError};
use esign_db::models::DocumentRow;
use esign_types::api::{Claims, DocumentResponse, SignRequest, SignResponse};

use crate::auth::{AppState, verify_password};
use crate::error::{ApiError, run_blocking};
use crate::extract::ApiJson;

/// Display format of the signing timestamp, e.g. `14:03:22 17/05/2024`.
const SIGNED_AT_FORMAT: &str = "%H:%M:%S %d/%m/%Y";

/// POST /documents: sign a document and return its QR code.
pub async fn sign_document(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<SignRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let doc_no = req.doc_no.trim().to_string();
    let doc_name = req.doc_name.trim().to_string();
    if doc_no.is_empty() || doc_name.is_empty() {
        return Err(ApiError::bad_request("document number and name are required"));
    }

    let uid = claims.sub.to_string();
    let (user, logo) = state
        .with_db(move |db| Ok((db.get_user_by_id(&uid)?, db.get_logo(&uid)?)))
        .await?;
    let user = user.ok_or_else(|| ApiError::not_found("user not found"))?;

    if !user.profile_complete() {
        return Err(ApiError::Conflict(
            "complete your profile before signing documents".into(),
        ));
    }

    let stored = user.password.clone();
    let password = req.password;
    let confirmed = run_blocking(move || Ok(verify_password(&password, &stored)?)).await?;
    if !confirmed {
        return Err(ApiError::Unauthorized("wrong password".into()));
    }

    let fields = SignedFields::new(
        user.full_name.unwrap_or_default(),
        user.emp_id.unwrap_or_default(),
        user.position.unwrap_or_default(),
        doc_no,
        doc_name,
    )
    .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let signed_at = chrono::Local::now().format(SIGNED_AT_FORMAT).to_string();
    let issued = IssuedPayload::issue(fields, signed_at);
    let payload = issued.to_text();

    let text = payload.clone();
    let png = run_blocking(move || render_with_logo(&text, logo.as_deref())).await?;

    let row = DocumentRow {
        id: Uuid::new_v4().to_string(),
        user_id: claims.sub.to_string(),
        doc_no: issued.fields.doc_no.clone(),
        doc_name: issued.fields.doc_name.clone(),
        remarks: req.remarks,
        signed_at: issued.time.clone(),
        hash: issued.hash.clone(),
    };
    let document = to_response(&row);
    state.with_db(move |db| db.insert_document(&row)).await?;

    info!(
        "{} signed document {} ({})",
        claims.username, document.doc_no, document.hash
    );

    Ok((
        StatusCode::CREATED,
        Json(SignResponse {
            file_name: qr_file_name(&document.doc_no),
            document,
            payload,
            qr_png: B64.encode(png),
        }),
    ))
}

/// GET /documents: the caller's signing history, newest first.
pub async fn list_documents(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let rows = state.with_db(move |db| db.list_documents(&uid)).await?;

    let documents: Vec<DocumentResponse> = rows.iter().map(to_response).collect();
    Ok(Json(documents))
}

fn render_with_logo(text: &str, logo: Option<&[u8]>) -> Result<Vec<u8>, ApiError> {
    match qr::render_png(text, logo) {
        Ok(png) => Ok(png),
        Err(QrError::Encode(e)) => Err(ApiError::BadRequest(format!(
            "document details are too long for a QR code: {e}"
        ))),
        // A stored logo that no longer decodes should not block signing
        Err(QrError::Image(e)) if logo.is_some() => {
            warn!("Logo could not be composited, rendering without it: {}", e);
            qr::render_png(text, None).map_err(|e| ApiError::Internal(e.into()))
        }
        Err(e) => Err(ApiError::Internal(e.into())),
    }
}

fn to_response(row: &DocumentRow) -> DocumentResponse {
    DocumentResponse {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt document id '{}': {}", row.id, e);
            Uuid::default()
        }),
        doc_no: row.doc_no.clone(),
        doc_name: row.doc_name.clone(),
        remarks: row.remarks,
        signed_at: row.signed_at.clone(),
        hash: row.hash.clone(),
    }
}

/// `QR_<doc_no>.png` with anything outside `[A-Za-z0-9_-]` replaced.
fn qr_file_name(doc_no: &str) -> String {
    let safe: String = doc_no
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("QR_{safe}.png")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_sanitised() {
        assert_eq!(qr_file_name("DOC/2024/07"), "QR_DOC_2024_07.png");
        assert_eq!(qr_file_name("A-1_b"), "QR_A-1_b.png");
    }

    #[test]
    fn broken_logo_falls_back_to_plain_code() {
        let png = render_with_logo("hello", Some(b"definitely not an image")).unwrap();
        assert_eq!(qr::decode(&png).unwrap(), "hello");
    }

    #[test]
    fn oversized_payload_is_a_user_error() {
        let text = "x".repeat(4000);
        assert!(matches!(render_with_logo(&text, None), Err(ApiError::BadRequest(_))));
    }
}
