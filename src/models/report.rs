use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Raw citizen submission. Immutable once created except for the
/// classification linkage (`issue_id`, `is_classified`, `updated_at`).
#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct Report {
    pub id: Uuid,
    pub user_id: Uuid,
    pub issue_id: Option<Uuid>,
    pub latitude: f64,
    pub longitude: f64,
    pub description: String,
    pub is_classified: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// One piece of evidence. `filename` holds the public object-store URL. The
/// trust flags are written by the external classification model; the
/// embedding column exists for that model and is never read here.
#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct ReportUpload {
    pub id: Uuid,
    pub report_id: Uuid,
    pub filename: String,
    pub is_fake: bool,
    pub is_spam: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}

/// Evidence entry as nested inside citizen- and authority-facing views.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UploadView {
    pub id: Uuid,
    pub url: String,
    pub is_fake: bool,
    pub is_spam: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}

/// Summary of the canonical issue a classified report was merged into.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IssueSummary {
    pub id: Uuid,
    pub department: String,
    pub category: Option<String>,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A report as surfaced to its owner: visible uploads nested, issue summary
/// present once classified.
#[derive(Debug, FromRow, Serialize, Clone)]
pub struct ReportWithEvidence {
    pub id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub description: String,
    pub is_classified: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub issue: Option<Json<IssueSummary>>,
    pub uploads: Json<Vec<UploadView>>,
}
