use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::{db::is_unique_violation, responses::JsonResponse, state::AppState, utils::password::hash_password};

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Deserialize, Serialize)]
pub struct RegisterPayload {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
}

pub async fn handle_register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Response {
    let name = payload.name.trim();
    if name.is_empty() {
        return JsonResponse::bad_request("Name is required").into_response();
    }

    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return JsonResponse::bad_request("A valid email is required").into_response();
    }

    if payload.password.len() < MIN_PASSWORD_LENGTH {
        return JsonResponse::bad_request("Password must be at least 8 characters").into_response();
    }

    let password_hash = match hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!(?err, "failed to hash password during registration");
            return JsonResponse::server_error("Registration failed").into_response();
        }
    };

    match state
        .accounts
        .create_user(name, &email, payload.phone.as_deref(), &password_hash)
        .await
    {
        Ok(user) => (
            StatusCode::CREATED,
            Json(json!({
                "id": user.id,
                "name": user.name,
                "email": user.email,
            })),
        )
            .into_response(),
        Err(err) if is_unique_violation(&err) => {
            JsonResponse::bad_request("An account with this email already exists").into_response()
        }
        Err(err) => {
            error!(?err, "failed to create user");
            JsonResponse::server_error("Registration failed").into_response()
        }
    }
}
