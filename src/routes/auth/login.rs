use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::{
    db::account_repository::AccountKind,
    responses::JsonResponse,
    routes::auth::claims::{Claims, Role},
    state::AppState,
    utils::password::verify_password,
};

#[derive(Deserialize, Serialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

pub async fn handle_login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Response {
    let email = payload.email.trim().to_lowercase();

    let user = match state.accounts.find_user_by_email(&email).await {
        Ok(Some(record)) => record,
        Ok(None) => return JsonResponse::unauthorized("Invalid credentials").into_response(),
        Err(err) => {
            error!(?err, "database error during login");
            return JsonResponse::server_error("Login failed").into_response();
        }
    };

    match verify_password(&payload.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => return JsonResponse::unauthorized("Invalid credentials").into_response(),
        Err(err) => {
            error!(?err, "password verification error");
            return JsonResponse::server_error("Login failed").into_response();
        }
    }

    let access_claims = Claims::access(user.id, &user.email, Role::Citizen, None);
    let refresh_claims = Claims::refresh(user.id, &user.email, Role::Citizen, None);

    let (access_token, refresh_token) =
        match (state.jwt.sign(&access_claims), state.jwt.sign(&refresh_claims)) {
            (Ok(access), Ok(refresh)) => (access, refresh),
            (Err(err), _) | (_, Err(err)) => {
                error!(?err, "failed to sign login tokens");
                return JsonResponse::server_error("Login failed").into_response();
            }
        };

    if let Err(err) = state
        .accounts
        .record_refresh_token(AccountKind::User, user.id, &refresh_token)
        .await
    {
        error!(?err, user_id = %user.id, "failed to record refresh token");
        return JsonResponse::server_error("Login failed").into_response();
    }

    Json(json!({
        "accessToken": access_token,
        "refreshToken": refresh_token,
    }))
    .into_response()
}
