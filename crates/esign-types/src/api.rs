use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Remarks, ResetState, Role, UserStatus};

// -- JWT Claims --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub status: UserStatus,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetRequest {
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetRequestResponse {
    pub reset: ResetState,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetPasswordRequest {
    pub username: String,
    pub new_password: String,
}

// -- Profile --

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    pub full_name: Option<String>,
    pub emp_id: Option<String>,
    pub position: Option<String>,
    pub has_logo: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub full_name: String,
    pub emp_id: String,
    pub position: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub username: String,
    pub document_count: u64,
}

// -- Documents --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignRequest {
    pub doc_no: String,
    pub doc_name: String,
    pub remarks: Remarks,
    /// Re-entered account password confirming the signing intent.
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub doc_no: String,
    pub doc_name: String,
    pub remarks: Remarks,
    pub signed_at: String,
    pub hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignResponse {
    pub document: DocumentResponse,
    pub payload: String,
    /// Base64 PNG of the rendered QR code.
    pub qr_png: String,
    pub file_name: String,
}

// -- Verification --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyTextRequest {
    pub payload: String,
}

// -- Chat --

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    pub with: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendChatRequest {
    pub text: String,
    #[serde(default)]
    pub to: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessageResponse {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub text: String,
    pub time: String,
    /// True when the caller sent this message.
    pub mine: bool,
}

// -- Admin --

#[derive(Debug, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub status: UserStatus,
    pub reset: ResetState,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecentActivity {
    pub signed_at: String,
    pub username: String,
    pub doc_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_documents: u64,
    pub total_users: u64,
    pub recent: Vec<RecentActivity>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
