use axum::{
    extract::{Json, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use time::OffsetDateTime;
use tracing::error;
use uuid::Uuid;

use crate::{
    responses::JsonResponse,
    routes::auth::principal::Auth,
    services::storage::object_key,
    state::AppState,
    utils::geo::GeoPoint,
};

pub const MAX_REPORT_FILES: usize = 5;
pub const MAX_DESCRIPTION_CHARS: usize = 4000;

struct EvidenceFile {
    name: String,
    content_type: String,
    bytes: Vec<u8>,
}

struct SubmitForm {
    latitude: Option<String>,
    longitude: Option<String>,
    description: Option<String>,
    files: Vec<EvidenceFile>,
}

async fn read_form(multipart: &mut Multipart) -> Result<SubmitForm, Response> {
    let mut form = SubmitForm {
        latitude: None,
        longitude: None,
        description: None,
        files: Vec::new(),
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(_) => {
                return Err(JsonResponse::bad_request("Malformed multipart body").into_response())
            }
        };

        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "latitude" => {
                form.latitude = Some(field.text().await.map_err(|_| {
                    JsonResponse::bad_request("Malformed multipart body").into_response()
                })?)
            }
            "longitude" => {
                form.longitude = Some(field.text().await.map_err(|_| {
                    JsonResponse::bad_request("Malformed multipart body").into_response()
                })?)
            }
            "description" => {
                form.description = Some(field.text().await.map_err(|_| {
                    JsonResponse::bad_request("Malformed multipart body").into_response()
                })?)
            }
            "files" => {
                if form.files.len() == MAX_REPORT_FILES {
                    return Err(JsonResponse::bad_request(
                        "A report can attach at most 5 files",
                    )
                    .into_response());
                }
                let name = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "upload.bin".to_string());
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let bytes = field.bytes().await.map_err(|_| {
                    JsonResponse::bad_request("Malformed multipart body").into_response()
                })?;
                form.files.push(EvidenceFile {
                    name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {} // unknown fields are ignored
        }
    }

    Ok(form)
}

fn parse_coordinate(value: Option<String>, field: &str) -> Result<f64, Response> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            JsonResponse::bad_request(&format!("{field} is required")).into_response()
        })?
        .parse::<f64>()
        .map_err(|_| JsonResponse::bad_request(&format!("{field} must be a number")).into_response())
}

/// One atomic submission: blobs are pushed first under the pre-minted report
/// id, then the report row and its upload rows commit together. A failed
/// blob push aborts before anything relational happens; a failed commit
/// leaves only orphaned blobs, never a report without its evidence rows.
pub async fn handle_submit_report(
    State(state): State<AppState>,
    Auth(principal): Auth,
    mut multipart: Multipart,
) -> Response {
    let form = match read_form(&mut multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let latitude = match parse_coordinate(form.latitude, "latitude") {
        Ok(v) => v,
        Err(response) => return response,
    };
    let longitude = match parse_coordinate(form.longitude, "longitude") {
        Ok(v) => v,
        Err(response) => return response,
    };
    let location = match GeoPoint::new(latitude, longitude) {
        Ok(point) => point,
        Err(err) => return JsonResponse::bad_request(&err.to_string()).into_response(),
    };

    let description = form.description.as_deref().map(str::trim).unwrap_or_default();
    if description.is_empty() {
        return JsonResponse::bad_request("Description is required").into_response();
    }
    if description.len() > MAX_DESCRIPTION_CHARS {
        return JsonResponse::bad_request("Description is too long").into_response();
    }

    let report_id = Uuid::new_v4();
    let mut upload_urls = Vec::with_capacity(form.files.len());
    for file in form.files {
        let key = object_key(report_id, OffsetDateTime::now_utc(), &file.name);
        match state
            .storage
            .store(&key, file.bytes, &file.content_type)
            .await
        {
            Ok(url) => upload_urls.push(url),
            Err(err) => {
                error!(?err, %report_id, "failed to store report evidence");
                return JsonResponse::server_error("Failed to store report evidence")
                    .into_response();
            }
        }
    }

    match state
        .reports
        .create_report_with_uploads(
            report_id,
            principal.account_id(),
            location,
            description,
            &upload_urls,
        )
        .await
    {
        Ok((report, uploads)) => (
            StatusCode::CREATED,
            Json(json!({ "report": report, "uploads": uploads })),
        )
            .into_response(),
        Err(err) => {
            error!(?err, %report_id, "failed to persist report");
            JsonResponse::server_error("Failed to create report").into_response()
        }
    }
}

pub async fn handle_my_reports(State(state): State<AppState>, Auth(principal): Auth) -> Response {
    match state
        .reports
        .list_reports_for_user(principal.account_id())
        .await
    {
        Ok(reports) => Json(json!({ "reports": reports })).into_response(),
        Err(err) => {
            error!(?err, "failed to list reports");
            JsonResponse::server_error("Failed to fetch reports").into_response()
        }
    }
}

pub async fn handle_get_report(
    State(state): State<AppState>,
    Auth(principal): Auth,
    Path(report_id): Path<Uuid>,
) -> Response {
    match state
        .reports
        .find_report_for_user(report_id, principal.account_id())
        .await
    {
        Ok(Some(report)) => Json(json!({ "report": report })).into_response(),
        // A foreign report is indistinguishable from a missing one.
        Ok(None) => JsonResponse::not_found("Report not found").into_response(),
        Err(err) => {
            error!(?err, %report_id, "failed to fetch report");
            JsonResponse::server_error("Failed to fetch report").into_response()
        }
    }
}
