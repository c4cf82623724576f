use async_trait::async_trait;
use uuid::Uuid;

use crate::models::report::{Report, ReportUpload, ReportWithEvidence};
use crate::utils::geo::GeoPoint;

#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Inserts the report row and all of its upload rows in one transaction.
    /// The caller has already pushed the blobs to object storage under
    /// `report_id`; a failure here rolls everything back so no committed row
    /// ever references evidence that was not fully recorded.
    async fn create_report_with_uploads(
        &self,
        report_id: Uuid,
        user_id: Uuid,
        location: GeoPoint,
        description: &str,
        upload_urls: &[String],
    ) -> Result<(Report, Vec<ReportUpload>), sqlx::Error>;

    /// All reports owned by the user, newest first, hidden uploads excluded.
    async fn list_reports_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ReportWithEvidence>, sqlx::Error>;

    /// Ownership is part of the lookup key; a report owned by someone else
    /// behaves exactly like a missing one.
    async fn find_report_for_user(
        &self,
        report_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ReportWithEvidence>, sqlx::Error>;

    /// Oldest-first batch feed for the classification engine.
    async fn list_unclassified(&self, limit: i64) -> Result<Vec<Report>, sqlx::Error>;

    async fn uploads_for_report(
        &self,
        report_id: Uuid,
    ) -> Result<Vec<ReportUpload>, sqlx::Error>;
}
