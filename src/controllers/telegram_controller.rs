use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::{error, warn};

use crate::{
    auth::unauthorized,
    error::{NotifyError, SettingsError},
    models::CurrentUser,
    services::{notification_service, settings_service::{self, SettingsInput}},
    AppState,
};

fn message(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(json!({ "message": msg.into() }))).into_response()
}

fn server_error() -> Response {
    message(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
}

fn settings_error(e: SettingsError) -> Response {
    match e {
        SettingsError::Repo(e) => {
            error!(error = %e, "telegram settings storage error");
            server_error()
        }
        other => message(StatusCode::BAD_REQUEST, other.to_string()),
    }
}

// GET /api/telegram
pub async fn get_settings(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let public_token = state.settings.telegram_public_token.clone();

    match settings_service::get_settings(&state, u.id).await {
        Ok(Some(s)) => {
            let mut payload = serde_json::to_value(&s).unwrap_or_else(|_| json!({}));
            if let Some(obj) = payload.as_object_mut() {
                obj.insert("_id".to_string(), json!(s.id.to_hex()));
                obj.insert("user_id".to_string(), json!(s.user_id.to_hex()));
                obj.insert("publicToken".to_string(), json!(public_token));
            }
            (StatusCode::OK, Json(payload)).into_response()
        }
        Ok(None) => (StatusCode::OK, Json(json!({ "publicToken": public_token }))).into_response(),
        Err(e) => settings_error(e),
    }
}

// POST /api/telegram
pub async fn post_settings(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Json(input): Json<SettingsInput>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    match settings_service::save_settings(&state, u.id, &input).await {
        Ok(s) => {
            let mut payload = serde_json::to_value(&s).unwrap_or_else(|_| json!({}));
            if let Some(obj) = payload.as_object_mut() {
                obj.insert("_id".to_string(), json!(s.id.to_hex()));
                obj.insert("user_id".to_string(), json!(s.user_id.to_hex()));
            }
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(e) => settings_error(e),
    }
}

// POST /api/telegram/test
pub async fn post_test(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    match notification_service::send_test_message(&state, u.id).await {
        Ok(()) => message(StatusCode::OK, "Test message sent!"),
        Err(NotifyError::NotConfigured(why)) => message(StatusCode::BAD_REQUEST, why),
        Err(e) => {
            warn!(user_id = %u.id, error = %e, "test notification failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "message": "Failed to send the message",
                    "details": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

// DELETE /api/telegram
pub async fn delete_settings(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    match settings_service::delete_settings(&state, u.id).await {
        Ok(_) => message(StatusCode::OK, "Settings deleted"),
        Err(e) => settings_error(e),
    }
}
