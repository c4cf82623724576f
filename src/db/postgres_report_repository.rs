use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::report_repository::ReportRepository;
use crate::models::report::{Report, ReportUpload, ReportWithEvidence};
use crate::utils::geo::GeoPoint;

const REPORT_COLUMNS: &str =
    "id, user_id, issue_id, latitude, longitude, description, is_classified, created_at, updated_at";

const UPLOAD_COLUMNS: &str = "id, report_id, filename, is_fake, is_spam, uploaded_at";

pub struct PostgresReportRepository {
    pub pool: PgPool,
}

#[async_trait]
impl ReportRepository for PostgresReportRepository {
    async fn create_report_with_uploads(
        &self,
        report_id: Uuid,
        user_id: Uuid,
        location: GeoPoint,
        description: &str,
        upload_urls: &[String],
    ) -> Result<(Report, Vec<ReportUpload>), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let report: Report = sqlx::query_as(&format!(
            r#"
            INSERT INTO reports (id, user_id, latitude, longitude, location, description)
            VALUES ($1, $2, $3, $4, ST_SetSRID(ST_MakePoint($4, $3), 4326), $5)
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(report_id)
        .bind(user_id)
        .bind(location.latitude())
        .bind(location.longitude())
        .bind(description)
        .fetch_one(&mut *tx)
        .await?;

        let mut uploads = Vec::with_capacity(upload_urls.len());
        for url in upload_urls {
            let upload: ReportUpload = sqlx::query_as(&format!(
                r#"
                INSERT INTO report_uploads (report_id, filename)
                VALUES ($1, $2)
                RETURNING {UPLOAD_COLUMNS}
                "#
            ))
            .bind(report.id)
            .bind(url)
            .fetch_one(&mut *tx)
            .await?;
            uploads.push(upload);
        }

        tx.commit().await?;
        Ok((report, uploads))
    }

    async fn list_reports_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ReportWithEvidence>, sqlx::Error> {
        sqlx::query_as::<_, ReportWithEvidence>(&format!(
            "{EVIDENCE_QUERY} WHERE r.user_id = $1 GROUP BY r.id, i.id ORDER BY r.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_report_for_user(
        &self,
        report_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ReportWithEvidence>, sqlx::Error> {
        sqlx::query_as::<_, ReportWithEvidence>(&format!(
            "{EVIDENCE_QUERY} WHERE r.id = $1 AND r.user_id = $2 GROUP BY r.id, i.id"
        ))
        .bind(report_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_unclassified(&self, limit: i64) -> Result<Vec<Report>, sqlx::Error> {
        sqlx::query_as::<_, Report>(&format!(
            r#"
            SELECT {REPORT_COLUMNS}
            FROM reports
            WHERE is_classified = false
            ORDER BY created_at ASC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn uploads_for_report(
        &self,
        report_id: Uuid,
    ) -> Result<Vec<ReportUpload>, sqlx::Error> {
        sqlx::query_as::<_, ReportUpload>(&format!(
            r#"
            SELECT {UPLOAD_COLUMNS}
            FROM report_uploads
            WHERE report_id = $1
            ORDER BY uploaded_at ASC
            "#
        ))
        .bind(report_id)
        .fetch_all(&self.pool)
        .await
    }
}

/// Shared SELECT for the owner-facing evidence views: hidden uploads are
/// filtered in the join, the issue summary appears only once classified.
const EVIDENCE_QUERY: &str = r#"
    SELECT r.id,
           r.latitude,
           r.longitude,
           r.description,
           r.is_classified,
           r.created_at,
           CASE WHEN r.is_classified AND i.id IS NOT NULL THEN
               json_build_object(
                   'id', i.id,
                   'department', i.department,
                   'category', i.category,
                   'status', i.status,
                   'created_at', i.created_at,
                   'updated_at', i.updated_at
               )
           END AS issue,
           COALESCE(
               json_agg(
                   json_build_object(
                       'id', ru.id,
                       'url', ru.filename,
                       'is_fake', ru.is_fake,
                       'is_spam', ru.is_spam,
                       'uploaded_at', ru.uploaded_at
                   )
                   ORDER BY ru.uploaded_at
               ) FILTER (WHERE ru.id IS NOT NULL), '[]'
           ) AS uploads
    FROM reports r
    LEFT JOIN report_uploads ru
           ON ru.report_id = r.id AND ru.is_fake = false AND ru.is_spam = false
    LEFT JOIN issues i ON r.issue_id = i.id
"#;
