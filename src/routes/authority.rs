use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::{
    db::account_repository::{AccountKind, AuthorityProfileUpdate},
    db::is_unique_violation,
    responses::JsonResponse,
    routes::auth::claims::{Claims, Role},
    routes::auth::login::LoginPayload,
    routes::auth::principal::{AuthorityAuth, HigherAuth},
    state::AppState,
    utils::geo::{validate_latitude, validate_longitude},
    utils::password::{generate_temp_password, hash_password, verify_password},
};

#[derive(Deserialize, Serialize)]
pub struct RegisterLowerPayload {
    pub email: String,
}

/// A department head provisions a field authority for their own department.
/// The temporary credential is generated server-side and returned once so
/// the head can hand it over out of band.
pub async fn handle_register_lower(
    State(state): State<AppState>,
    HigherAuth(higher): HigherAuth,
    Json(payload): Json<RegisterLowerPayload>,
) -> Response {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return JsonResponse::bad_request("A valid email is required").into_response();
    }

    let temp_password = generate_temp_password();
    let password_hash = match hash_password(&temp_password) {
        Ok(hash) => hash,
        Err(err) => {
            error!(?err, "failed to hash temporary password");
            return JsonResponse::server_error("Failed to register authority").into_response();
        }
    };

    match state
        .accounts
        .create_authority(&email, &password_hash, &higher.department)
        .await
    {
        Ok(authority) => (
            StatusCode::CREATED,
            Json(json!({
                "authority": authority,
                "tempPassword": temp_password,
            })),
        )
            .into_response(),
        Err(err) if is_unique_violation(&err) => {
            JsonResponse::bad_request("An authority with this email already exists").into_response()
        }
        Err(err) => {
            error!(?err, "failed to create authority");
            JsonResponse::server_error("Failed to register authority").into_response()
        }
    }
}

/// Shared login for both authority tiers. The higher-authority table is
/// consulted first; an email present in both resolves as a department head.
pub async fn handle_authority_login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Response {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return JsonResponse::bad_request("Email and password are required").into_response();
    }

    let (id, account_email, password_hash, role, department) =
        match state.accounts.find_higher_by_email(&email).await {
            Ok(Some(higher)) => (
                higher.id,
                higher.email,
                higher.password_hash,
                Role::Higher,
                higher.department,
            ),
            Ok(None) => match state.accounts.find_authority_by_email(&email).await {
                Ok(Some(authority)) => (
                    authority.id,
                    authority.email,
                    authority.password_hash,
                    Role::Authority,
                    authority.department,
                ),
                Ok(None) => {
                    return JsonResponse::unauthorized("Invalid email or password").into_response()
                }
                Err(err) => {
                    error!(?err, "database error during authority login");
                    return JsonResponse::server_error("Login failed").into_response();
                }
            },
            Err(err) => {
                error!(?err, "database error during authority login");
                return JsonResponse::server_error("Login failed").into_response();
            }
        };

    match verify_password(&payload.password, &password_hash) {
        Ok(true) => {}
        Ok(false) => return JsonResponse::unauthorized("Invalid email or password").into_response(),
        Err(err) => {
            error!(?err, "password verification error during authority login");
            return JsonResponse::server_error("Login failed").into_response();
        }
    }

    let access_claims = Claims::access(id, &account_email, role, Some(department.clone()));
    let refresh_claims = Claims::refresh(id, &account_email, role, Some(department.clone()));

    let (access_token, refresh_token) =
        match (state.jwt.sign(&access_claims), state.jwt.sign(&refresh_claims)) {
            (Ok(access), Ok(refresh)) => (access, refresh),
            (Err(err), _) | (_, Err(err)) => {
                error!(?err, "failed to sign authority login tokens");
                return JsonResponse::server_error("Login failed").into_response();
            }
        };

    let kind = match role {
        Role::Higher => AccountKind::Higher,
        _ => AccountKind::Authority,
    };
    if let Err(err) = state
        .accounts
        .record_refresh_token(kind, id, &refresh_token)
        .await
    {
        error!(?err, account_id = %id, "failed to record refresh token");
        return JsonResponse::server_error("Login failed").into_response();
    }

    Json(json!({
        "accessToken": access_token,
        "refreshToken": refresh_token,
        "user": {
            "id": id,
            "email": account_email,
            "role": role.as_str(),
            "department": department,
        },
    }))
    .into_response()
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfilePayload {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub new_password: Option<String>,
}

/// First completion of this flips `is_initialized`; the home geometry is
/// re-derived from whatever coordinate pair is in effect afterwards.
pub async fn handle_update_profile(
    State(state): State<AppState>,
    AuthorityAuth(authority): AuthorityAuth,
    Json(payload): Json<UpdateProfilePayload>,
) -> Response {
    if let Some(latitude) = payload.latitude {
        if let Err(err) = validate_latitude(latitude) {
            return JsonResponse::bad_request(&err.to_string()).into_response();
        }
    }
    if let Some(longitude) = payload.longitude {
        if let Err(err) = validate_longitude(longitude) {
            return JsonResponse::bad_request(&err.to_string()).into_response();
        }
    }

    let password_hash = match &payload.new_password {
        Some(new_password) => match hash_password(new_password) {
            Ok(hash) => Some(hash),
            Err(err) => {
                error!(?err, "failed to hash new authority password");
                return JsonResponse::server_error("Failed to update profile").into_response();
            }
        },
        None => None,
    };

    let update = AuthorityProfileUpdate {
        name: payload.name,
        phone: payload.phone,
        department: payload.department,
        latitude: payload.latitude,
        longitude: payload.longitude,
        password_hash,
    };

    match state
        .accounts
        .update_authority_profile(authority.id, &update)
        .await
    {
        Ok(Some(profile)) => Json(json!({ "authority": profile })).into_response(),
        Ok(None) => JsonResponse::not_found("Authority not found").into_response(),
        Err(err) => {
            error!(?err, authority_id = %authority.id, "failed to update authority profile");
            JsonResponse::server_error("Failed to update profile").into_response()
        }
    }
}
