pub mod admin;
pub mod auth;
pub mod chat;
pub mod documents;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod profile;
pub mod verify;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
};

use crate::auth::AppState;
use crate::middleware::{require_admin, require_auth};

/// 8 MB cap on any request body
const MAX_BODY_SIZE: usize = 8 * 1024 * 1024;

/// Every route of the service. Tracing and CORS layers are added by the
/// binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/reset-request", post(auth::request_reset))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/verify/image", post(verify::verify_image))
        .route("/verify/text", post(verify::verify_text))
        .route("/background", get(admin::get_background));

    let protected_routes = Router::new()
        .route("/me", get(profile::get_profile).put(profile::update_profile))
        .route("/me/logo", get(profile::get_logo).put(profile::upload_logo))
        .route("/dashboard", get(profile::dashboard))
        .route("/documents", get(documents::list_documents).post(documents::sign_document))
        .route("/chat/messages", get(chat::get_messages).post(chat::send_message))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let admin_routes = Router::new()
        .route("/admin/stats", get(admin::stats))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/pending", get(admin::pending_users))
        .route("/admin/users/{user_id}/approve", post(admin::approve_user))
        .route("/admin/reset-requests", get(admin::reset_requests))
        .route("/admin/users/{user_id}/grant-reset", post(admin::grant_reset))
        .route("/admin/background", put(admin::set_background))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// GET /health: liveness check (no auth).
async fn health() -> &'static str {
    "ok"
}
