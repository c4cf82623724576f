use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::issue_repository::{ClassifyOutcome, IssueRepository};
use crate::db::report_repository::ReportRepository;
use crate::models::report::{Report, ReportUpload};
use crate::utils::geo::GeoPoint;

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("database error during classification: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result of deciding what a report is about. The department is inferred from
/// the category; issues are minted and matched per (department, category).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: String,
    pub department: String,
}

/// Boundary to the external model that labels reports. Implementations see
/// the report plus its evidence (trust flags, and embeddings where the
/// backing model consumes them) and either produce a label or abstain.
pub trait ReportClassifier: Send + Sync {
    fn classify(&self, report: &Report, uploads: &[ReportUpload]) -> Option<Classification>;
}

/// Deterministic fallback classifier: first keyword hit in the description
/// wins. Good enough to exercise the merge pipeline end to end; the real
/// model plugs in through the same trait.
#[derive(Default)]
pub struct KeywordClassifier;

const KEYWORD_TABLE: &[(&[&str], &str, &str)] = &[
    (&["pothole", "road", "asphalt"], "pothole", "roads"),
    (&["garbage", "trash", "waste"], "garbage", "sanitation"),
    (&["sewage", "drain"], "sewage", "sanitation"),
    (&["streetlight", "street light", "lamp post"], "streetlight", "electricity"),
    (&["water leak", "pipeline", "water supply"], "water-leak", "water"),
];

impl ReportClassifier for KeywordClassifier {
    fn classify(&self, report: &Report, _uploads: &[ReportUpload]) -> Option<Classification> {
        let description = report.description.to_lowercase();
        KEYWORD_TABLE
            .iter()
            .find(|(keywords, _, _)| keywords.iter().any(|k| description.contains(k)))
            .map(|(_, category, department)| Classification {
                category: (*category).to_string(),
                department: (*department).to_string(),
            })
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub examined: usize,
    pub linked: usize,
    pub created: usize,
    pub skipped: usize,
}

/// Batch merge engine: drains unclassified reports oldest-first, skips fully
/// flagged ones, and asks the issue store to link-or-mint per report. The
/// only component that creates issues.
pub struct ClassificationEngine {
    reports: Arc<dyn ReportRepository>,
    issues: Arc<dyn IssueRepository>,
    classifier: Arc<dyn ReportClassifier>,
    merge_radius_meters: f64,
    batch_size: i64,
}

impl ClassificationEngine {
    pub fn new(
        reports: Arc<dyn ReportRepository>,
        issues: Arc<dyn IssueRepository>,
        classifier: Arc<dyn ReportClassifier>,
        merge_radius_meters: f64,
        batch_size: i64,
    ) -> Self {
        Self {
            reports,
            issues,
            classifier,
            merge_radius_meters,
            batch_size,
        }
    }

    pub async fn run_batch(&self) -> Result<BatchSummary, ClassificationError> {
        let batch = self.reports.list_unclassified(self.batch_size).await?;
        let mut summary = BatchSummary {
            examined: batch.len(),
            ..Default::default()
        };

        for report in &batch {
            let uploads = self.reports.uploads_for_report(report.id).await?;

            if !uploads.is_empty() && uploads.iter().all(|u| u.is_fake || u.is_spam) {
                debug!(report_id = %report.id, "all evidence flagged, leaving unclassified");
                summary.skipped += 1;
                continue;
            }

            let Some(classification) = self.classifier.classify(report, &uploads) else {
                debug!(report_id = %report.id, "classifier abstained");
                summary.skipped += 1;
                continue;
            };

            let location = match GeoPoint::new(report.latitude, report.longitude) {
                Ok(point) => point,
                Err(err) => {
                    warn!(report_id = %report.id, %err, "stored report location is invalid");
                    summary.skipped += 1;
                    continue;
                }
            };

            let outcome = self
                .issues
                .classify_report(
                    report.id,
                    location,
                    &classification.category,
                    &classification.department,
                    self.merge_radius_meters,
                )
                .await?;

            match outcome {
                ClassifyOutcome::Linked { issue_id } => {
                    debug!(report_id = %report.id, %issue_id, "merged into existing issue");
                    summary.linked += 1;
                }
                ClassifyOutcome::Created { issue_id } => {
                    debug!(report_id = %report.id, %issue_id, "minted new issue");
                    summary.created += 1;
                }
                ClassifyOutcome::AlreadyClassified => {
                    summary.skipped += 1;
                }
            }
        }

        info!(
            examined = summary.examined,
            linked = summary.linked,
            created = summary.created,
            skipped = summary.skipped,
            "classification batch finished"
        );
        Ok(summary)
    }
}
