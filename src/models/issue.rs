use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::report::UploadView;

/// The lifecycle of a canonical issue. Any status may be overwritten with any
/// other; only membership in this set is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    Submitted,
    Ongoing,
    Resolved,
    Rejected,
}

impl IssueStatus {
    pub const ALL: [IssueStatus; 4] = [
        IssueStatus::Submitted,
        IssueStatus::Ongoing,
        IssueStatus::Resolved,
        IssueStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Submitted => "submitted",
            IssueStatus::Ongoing => "ongoing",
            IssueStatus::Resolved => "resolved",
            IssueStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct InvalidStatus(pub String);

impl FromStr for IssueStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IssueStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| InvalidStatus(s.to_string()))
    }
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct Issue {
    pub id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub category: Option<String>,
    pub department: String,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Row of the field-authority radius view, annotated with the distance from
/// the caller's home point.
#[derive(Debug, FromRow, Serialize, Clone)]
pub struct NearbyIssue {
    pub id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub category: Option<String>,
    pub department: String,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub distance_meters: f64,
    pub distance_km: f64,
}

/// Row of the department-head rollup: one issue with its classified reports
/// and their visible evidence, aggregated in a single query snapshot.
#[derive(Debug, FromRow, Serialize, Clone)]
pub struct DepartmentIssue {
    pub id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub category: Option<String>,
    pub department: String,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub reports: Json<Vec<ReportRollup>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReportRollup {
    pub id: Uuid,
    pub description: String,
    pub uploads: Vec<UploadView>,
}
