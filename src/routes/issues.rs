use axum::{
    extract::{Json, Query, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::{
    models::issue::IssueStatus,
    responses::JsonResponse,
    routes::auth::principal::{Auth, AuthorityAuth, HigherAuth, Principal},
    state::AppState,
    utils::geo::GeoPoint,
};

pub const DEFAULT_RADIUS_KM: f64 = 10.0;
pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Default, Deserialize)]
pub struct NearbyQuery {
    /// Radius in kilometers.
    pub radius: Option<f64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Field-authority view: issues of the caller's department within a radius of
/// their home point, nearest first.
pub async fn handle_nearby_issues(
    State(state): State<AppState>,
    AuthorityAuth(authority): AuthorityAuth,
    Query(query): Query<NearbyQuery>,
) -> Response {
    let radius_km = query.radius.unwrap_or(DEFAULT_RADIUS_KM);
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return JsonResponse::bad_request("radius must be a positive number of kilometers")
            .into_response();
    }
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);

    let home = match state.accounts.find_authority_home(authority.id).await {
        Ok(Some(home)) => home,
        Ok(None) => return JsonResponse::not_found("Authority not found").into_response(),
        Err(err) => {
            error!(?err, authority_id = %authority.id, "failed to resolve authority home");
            return JsonResponse::server_error("Failed to fetch issues").into_response();
        }
    };

    if !home.is_initialized {
        return JsonResponse::bad_request(
            "Complete your profile before querying nearby issues",
        )
        .into_response();
    }

    let origin = match GeoPoint::new(home.latitude, home.longitude) {
        Ok(point) => point,
        Err(err) => {
            error!(%err, authority_id = %authority.id, "stored home location is invalid");
            return JsonResponse::server_error("Failed to fetch issues").into_response();
        }
    };

    let page = match state
        .issues
        .nearby_for_authority(&home.department, origin, radius_km * 1000.0, limit, offset)
        .await
    {
        Ok(page) => page,
        Err(err) => {
            error!(?err, authority_id = %authority.id, "nearby issue query failed");
            return JsonResponse::server_error("Failed to fetch issues").into_response();
        }
    };

    let has_more = offset + (page.issues.len() as i64) < page.total;
    Json(json!({
        "issues": page.issues,
        "total": page.total,
        "limit": limit,
        "offset": offset,
        "hasMore": has_more,
    }))
    .into_response()
}

/// Department-head view: the whole department, nested reports included.
pub async fn handle_department_issues(
    State(state): State<AppState>,
    HigherAuth(higher): HigherAuth,
) -> Response {
    let department = match state.accounts.find_higher_department(higher.id).await {
        Ok(Some(department)) => department,
        Ok(None) => return JsonResponse::not_found("Higher authority not found").into_response(),
        Err(err) => {
            error!(?err, higher_id = %higher.id, "failed to resolve higher authority");
            return JsonResponse::server_error("Failed to fetch issues").into_response();
        }
    };

    match state.issues.department_rollup(&department).await {
        Ok(issues) => Json(json!({ "issues": issues })).into_response(),
        Err(err) => {
            error!(?err, %department, "department rollup query failed");
            JsonResponse::server_error("Failed to fetch issues").into_response()
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    pub issue_id: Uuid,
    pub status: String,
}

/// Both authority tiers may triage. Any of the four statuses may replace any
/// other; only enum membership is checked.
pub async fn handle_update_status(
    State(state): State<AppState>,
    Auth(principal): Auth,
    Json(payload): Json<StatusPayload>,
) -> Response {
    if matches!(principal, Principal::Citizen(_)) {
        return JsonResponse::forbidden("Authority role required").into_response();
    }

    let status: IssueStatus = match payload.status.parse() {
        Ok(status) => status,
        Err(_) => {
            return JsonResponse::bad_request(
                "Status must be one of: submitted, ongoing, resolved, rejected",
            )
            .into_response()
        }
    };

    match state.issues.set_status(payload.issue_id, status).await {
        Ok(Some(issue)) => Json(json!({ "issue": issue })).into_response(),
        Ok(None) => JsonResponse::not_found("Issue not found").into_response(),
        Err(err) => {
            error!(?err, issue_id = %payload.issue_id, "failed to update issue status");
            JsonResponse::server_error("Failed to update issue status").into_response()
        }
    }
}
