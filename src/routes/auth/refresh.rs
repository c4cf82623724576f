use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::{
    responses::JsonResponse,
    routes::auth::claims::{Claims, TokenUse},
    state::AppState,
};

#[derive(Deserialize, Serialize)]
pub struct RefreshPayload {
    pub token: String,
}

/// Exchanges a live refresh token for a fresh access token. Validity is
/// signature + expiry; the persisted ledger is audit-only.
pub async fn handle_refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshPayload>,
) -> Response {
    let data = match state.jwt.verify(&payload.token, TokenUse::Refresh) {
        Ok(data) => data,
        Err(_) => return JsonResponse::forbidden("Invalid refresh token").into_response(),
    };

    let claims = data.claims;
    let Ok(account_id) = Uuid::parse_str(&claims.id) else {
        return JsonResponse::forbidden("Invalid refresh token").into_response();
    };

    let access_claims = Claims::access(account_id, &claims.email, claims.role, claims.department);

    match state.jwt.sign(&access_claims) {
        Ok(access_token) => Json(json!({ "accessToken": access_token })).into_response(),
        Err(err) => {
            error!(?err, %account_id, "failed to sign access token during refresh");
            JsonResponse::server_error("Failed to refresh session").into_response()
        }
    }
}
