use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::warn;
use uuid::Uuid;

use esign_db::models::MessageRow;
use esign_types::api::{ChatMessageResponse, ChatQuery, Claims, SendChatRequest};
use esign_types::models::Role;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};

/// Display format of the message time, e.g. `09:41`.
const MESSAGE_TIME_FORMAT: &str = "%H:%M";

/// Chat is always between one regular user and the administrator.
/// Users talk to the admin; the admin picks which user to talk to.
async fn resolve_peer(
    state: &AppState,
    claims: &Claims,
    requested: Option<Uuid>,
) -> Result<String, ApiError> {
    if claims.role == Role::Admin {
        let peer = requested.ok_or_else(|| ApiError::bad_request("choose a user to chat with"))?;
        let pid = peer.to_string();
        let user = state.with_db(move |db| db.get_user_by_id(&pid)).await?;
        match user {
            Some(u) if u.role == Role::User => Ok(u.id),
            Some(_) => Err(ApiError::bad_request("chat partner must be a regular user")),
            None => Err(ApiError::not_found("user not found")),
        }
    } else {
        state
            .with_db(|db| db.admin_id())
            .await?
            .ok_or_else(|| ApiError::not_found("no administrator account"))
    }
}

pub async fn get_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<ChatQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let peer = resolve_peer(&state, &claims, query.with).await?;

    let me = claims.sub.to_string();
    let rows = state
        .with_db(move |db| db.get_conversation(&me, &peer))
        .await?;

    let messages: Vec<ChatMessageResponse> = rows.iter().map(|row| to_response(row, claims.sub)).collect();
    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<SendChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = req.text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::bad_request("message must not be empty"));
    }

    let peer = resolve_peer(&state, &claims, req.to).await?;

    let row = MessageRow {
        id: Uuid::new_v4().to_string(),
        sender_id: claims.sub.to_string(),
        receiver_id: peer,
        body: text,
        time: chrono::Local::now().format(MESSAGE_TIME_FORMAT).to_string(),
    };
    let response = to_response(&row, claims.sub);
    state.with_db(move |db| db.insert_message(&row)).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

fn to_response(row: &MessageRow, me: Uuid) -> ChatMessageResponse {
    let sender_id = row.sender_id.parse::<Uuid>().unwrap_or_else(|e| {
        warn!("Corrupt sender_id '{}' on message '{}': {}", row.sender_id, row.id, e);
        Uuid::default()
    });

    ChatMessageResponse {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt message id '{}': {}", row.id, e);
            Uuid::default()
        }),
        sender_id,
        receiver_id: row.receiver_id.parse().unwrap_or_else(|e| {
            warn!("Corrupt receiver_id '{}' on message '{}': {}", row.receiver_id, row.id, e);
            Uuid::default()
        }),
        text: row.body.clone(),
        time: row.time.clone(),
        mine: sender_id == me,
    }
}
