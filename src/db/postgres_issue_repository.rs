use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::issue_repository::{ClassifyOutcome, IssueRepository, NearbyPage};
use crate::models::issue::{DepartmentIssue, Issue, IssueStatus, NearbyIssue};
use crate::utils::geo::GeoPoint;

const ISSUE_COLUMNS: &str =
    "id, latitude, longitude, category, department, status, created_at, updated_at";

pub struct PostgresIssueRepository {
    pub pool: PgPool,
}

#[async_trait]
impl IssueRepository for PostgresIssueRepository {
    async fn nearby_for_authority(
        &self,
        department: &str,
        origin: GeoPoint,
        radius_meters: f64,
        limit: i64,
        offset: i64,
    ) -> Result<NearbyPage, sqlx::Error> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM issues
            WHERE department = $1
              AND ST_DWithin(
                    location::geography,
                    ST_SetSRID(ST_MakePoint($2, $3), 4326)::geography,
                    $4)
            "#,
        )
        .bind(department)
        .bind(origin.longitude())
        .bind(origin.latitude())
        .bind(radius_meters)
        .fetch_one(&self.pool)
        .await?;

        let issues = sqlx::query_as::<_, NearbyIssue>(&format!(
            r#"
            SELECT {ISSUE_COLUMNS},
                   ST_Distance(
                       location::geography,
                       ST_SetSRID(ST_MakePoint($2, $3), 4326)::geography
                   ) AS distance_meters,
                   ROUND((ST_Distance(
                       location::geography,
                       ST_SetSRID(ST_MakePoint($2, $3), 4326)::geography
                   ) / 1000.0)::numeric, 2)::double precision AS distance_km
            FROM issues
            WHERE department = $1
              AND ST_DWithin(
                    location::geography,
                    ST_SetSRID(ST_MakePoint($2, $3), 4326)::geography,
                    $4)
            ORDER BY distance_meters ASC, created_at DESC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(department)
        .bind(origin.longitude())
        .bind(origin.latitude())
        .bind(radius_meters)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(NearbyPage { issues, total })
    }

    async fn department_rollup(
        &self,
        department: &str,
    ) -> Result<Vec<DepartmentIssue>, sqlx::Error> {
        sqlx::query_as::<_, DepartmentIssue>(
            r#"
            SELECT i.id,
                   i.latitude,
                   i.longitude,
                   i.category,
                   i.department,
                   i.status,
                   i.created_at,
                   i.updated_at,
                   COALESCE(
                       json_agg(
                           json_build_object(
                               'id', r.id,
                               'description', r.description,
                               'uploads', (
                                   SELECT COALESCE(
                                       json_agg(
                                           json_build_object(
                                               'id', ru.id,
                                               'url', ru.filename,
                                               'is_fake', ru.is_fake,
                                               'is_spam', ru.is_spam,
                                               'uploaded_at', ru.uploaded_at
                                           )
                                           ORDER BY ru.uploaded_at
                                       ), '[]'::json
                                   )
                                   FROM report_uploads ru
                                   WHERE ru.report_id = r.id
                                     AND ru.is_fake = false
                                     AND ru.is_spam = false
                               )
                           )
                           ORDER BY r.created_at DESC
                       ) FILTER (WHERE r.id IS NOT NULL), '[]'
                   ) AS reports
            FROM issues i
            LEFT JOIN reports r ON r.issue_id = i.id AND r.is_classified = true
            WHERE i.department = $1
            GROUP BY i.id
            ORDER BY i.created_at DESC
            "#,
        )
        .bind(department)
        .fetch_all(&self.pool)
        .await
    }

    async fn set_status(
        &self,
        issue_id: Uuid,
        status: IssueStatus,
    ) -> Result<Option<Issue>, sqlx::Error> {
        sqlx::query_as::<_, Issue>(&format!(
            r#"
            UPDATE issues
            SET status = $1, updated_at = now()
            WHERE id = $2
            RETURNING {ISSUE_COLUMNS}
            "#
        ))
        .bind(status.as_str())
        .bind(issue_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn classify_report(
        &self,
        report_id: Uuid,
        location: GeoPoint,
        category: &str,
        department: &str,
        merge_radius_meters: f64,
    ) -> Result<ClassifyOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // Serialize merge decisions per (department, category, cell). Locks
        // are transaction-scoped and taken in sorted order.
        for cell in location.merge_cells() {
            sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
                .bind(format!("{department}:{category}:{cell}"))
                .execute(&mut *tx)
                .await?;
        }

        let existing: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM issues
            WHERE department = $1
              AND category = $2
              AND ST_DWithin(
                    location::geography,
                    ST_SetSRID(ST_MakePoint($3, $4), 4326)::geography,
                    $5)
            ORDER BY ST_Distance(
                location::geography,
                ST_SetSRID(ST_MakePoint($3, $4), 4326)::geography
            ) ASC
            LIMIT 1
            "#,
        )
        .bind(department)
        .bind(category)
        .bind(location.longitude())
        .bind(location.latitude())
        .bind(merge_radius_meters)
        .fetch_optional(&mut *tx)
        .await?;

        let (issue_id, created) = match existing {
            Some(id) => (id, false),
            None => {
                let id: Uuid = sqlx::query_scalar(
                    r#"
                    INSERT INTO issues (latitude, longitude, location, category, department)
                    VALUES ($1, $2, ST_SetSRID(ST_MakePoint($2, $1), 4326), $3, $4)
                    RETURNING id
                    "#,
                )
                .bind(location.latitude())
                .bind(location.longitude())
                .bind(category)
                .bind(department)
                .fetch_one(&mut *tx)
                .await?;
                (id, true)
            }
        };

        let updated = sqlx::query(
            r#"
            UPDATE reports
            SET issue_id = $1, is_classified = true, updated_at = now()
            WHERE id = $2 AND is_classified = false
            "#,
        )
        .bind(issue_id)
        .bind(report_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Concurrent run won; discard any issue minted above.
            tx.rollback().await?;
            return Ok(ClassifyOutcome::AlreadyClassified);
        }

        tx.commit().await?;

        Ok(if created {
            ClassifyOutcome::Created { issue_id }
        } else {
            ClassifyOutcome::Linked { issue_id }
        })
    }
}
