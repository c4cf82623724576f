use async_trait::async_trait;
use uuid::Uuid;

use crate::models::issue::{DepartmentIssue, Issue, IssueStatus, NearbyIssue};
use crate::utils::geo::GeoPoint;

/// One page of the radius view plus the unpaged match count.
#[derive(Debug)]
pub struct NearbyPage {
    pub issues: Vec<NearbyIssue>,
    pub total: i64,
}

/// What the merge engine decided for one report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifyOutcome {
    /// Linked to an existing issue within the merge radius.
    Linked { issue_id: Uuid },
    /// No candidate found; a new issue was minted and linked.
    Created { issue_id: Uuid },
    /// Another run classified this report first; nothing was written.
    AlreadyClassified,
}

#[async_trait]
pub trait IssueRepository: Send + Sync {
    /// Department-scoped radius query, nearest first, distances computed on
    /// the geography (ellipsoidal) projection.
    async fn nearby_for_authority(
        &self,
        department: &str,
        origin: GeoPoint,
        radius_meters: f64,
        limit: i64,
        offset: i64,
    ) -> Result<NearbyPage, sqlx::Error>;

    /// Every issue in the department with its classified reports and visible
    /// evidence, newest issue first, read as one snapshot.
    async fn department_rollup(
        &self,
        department: &str,
    ) -> Result<Vec<DepartmentIssue>, sqlx::Error>;

    async fn set_status(
        &self,
        issue_id: Uuid,
        status: IssueStatus,
    ) -> Result<Option<Issue>, sqlx::Error>;

    /// Atomically links a report to the nearest same-department,
    /// same-category issue within `merge_radius_meters`, minting the issue
    /// when none exists. Merge decisions for the same spatial bucket are
    /// serialized, and a report that was classified concurrently is left
    /// untouched.
    async fn classify_report(
        &self,
        report_id: Uuid,
        location: GeoPoint,
        category: &str,
        department: &str,
        merge_radius_meters: f64,
    ) -> Result<ClassifyOutcome, sqlx::Error>;
}
