use esign_types::models::{Remarks, ResetState, Role, UserStatus};

/// Database row types: these map directly to SQLite rows.
/// Distinct from esign-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub full_name: Option<String>,
    pub emp_id: Option<String>,
    pub position: Option<String>,
    pub has_logo: bool,
    pub status: UserStatus,
    pub reset: ResetState,
    pub role: Role,
    pub created_at: String,
}

impl UserRow {
    /// A profile is complete once the signer name is filled in.
    pub fn profile_complete(&self) -> bool {
        self.full_name.as_deref().is_some_and(|n| !n.trim().is_empty())
    }
}

pub struct DocumentRow {
    pub id: String,
    pub user_id: String,
    pub doc_no: String,
    pub doc_name: String,
    pub remarks: Remarks,
    pub signed_at: String,
    pub hash: String,
}

pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub body: String,
    pub time: String,
}

pub struct ActivityRow {
    pub signed_at: String,
    pub username: String,
    pub doc_name: String,
}
