use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::{ClassificationSettings, Config, StorageSettings};
use crate::db::account_repository::{
    AccountKind, AccountRepository, AuthorityHome, AuthorityProfileUpdate, RegisteredAuthority,
};
use crate::db::issue_repository::{ClassifyOutcome, IssueRepository, NearbyPage};
use crate::db::report_repository::ReportRepository;
use crate::models::{
    authority::{Authority, AuthorityProfile, HigherAuthority},
    issue::{DepartmentIssue, Issue, IssueStatus, NearbyIssue, ReportRollup},
    report::{IssueSummary, Report, ReportUpload, ReportWithEvidence, UploadView},
    user::{PublicUser, User},
};
use crate::services::storage::ObjectStorage;
use crate::state::AppState;
use crate::utils::geo::GeoPoint;
use crate::utils::jwt::JwtKeys;

#[derive(Debug)]
struct MockUniqueViolation;

impl fmt::Display for MockUniqueViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("duplicate key value violates unique constraint")
    }
}

impl std::error::Error for MockUniqueViolation {}

impl sqlx::error::DatabaseError for MockUniqueViolation {
    fn message(&self) -> &str {
        "duplicate key value violates unique constraint"
    }

    fn kind(&self) -> sqlx::error::ErrorKind {
        sqlx::error::ErrorKind::UniqueViolation
    }

    fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self
    }
}

pub fn unique_violation() -> sqlx::Error {
    sqlx::Error::Database(Box::new(MockUniqueViolation))
}

fn db_failure() -> sqlx::Error {
    sqlx::Error::Protocol("Mock DB failure".into())
}

/// In-memory stand-in for every repository trait, backed by plain vectors so
/// tests can seed and inspect rows directly.
#[derive(Default)]
pub struct MockDb {
    pub users: Mutex<Vec<User>>,
    pub authorities: Mutex<Vec<Authority>>,
    pub highers: Mutex<Vec<HigherAuthority>>,
    pub issues: Mutex<Vec<Issue>>,
    pub reports: Mutex<Vec<Report>>,
    pub uploads: Mutex<Vec<ReportUpload>>,
    pub refresh_tokens: Mutex<Vec<(AccountKind, Uuid, String)>>,
    pub should_fail: bool,
}

impl MockDb {
    pub fn seed_user(&self, name: &str, email: &str, password_hash: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            password_hash: password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }

    pub fn seed_authority(&self, email: &str, password_hash: &str, department: &str) -> Authority {
        let authority = Authority {
            id: Uuid::new_v4(),
            name: None,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            phone: None,
            latitude: 0.0,
            longitude: 0.0,
            department: department.to_string(),
            is_initialized: false,
            created_at: OffsetDateTime::now_utc(),
        };
        self.authorities.lock().unwrap().push(authority.clone());
        authority
    }

    pub fn seed_higher(&self, email: &str, password_hash: &str, department: &str) -> HigherAuthority {
        let higher = HigherAuthority {
            id: Uuid::new_v4(),
            name: "Head".to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            department: department.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.highers.lock().unwrap().push(higher.clone());
        higher
    }

    pub fn seed_issue(
        &self,
        latitude: f64,
        longitude: f64,
        category: &str,
        department: &str,
    ) -> Issue {
        let now = OffsetDateTime::now_utc();
        let issue = Issue {
            id: Uuid::new_v4(),
            latitude,
            longitude,
            category: Some(category.to_string()),
            department: department.to_string(),
            status: IssueStatus::Submitted.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        self.issues.lock().unwrap().push(issue.clone());
        issue
    }

    pub fn seed_report(
        &self,
        user_id: Uuid,
        latitude: f64,
        longitude: f64,
        description: &str,
    ) -> Report {
        let now = OffsetDateTime::now_utc();
        let report = Report {
            id: Uuid::new_v4(),
            user_id,
            issue_id: None,
            latitude,
            longitude,
            description: description.to_string(),
            is_classified: false,
            created_at: now,
            updated_at: now,
        };
        self.reports.lock().unwrap().push(report.clone());
        report
    }

    pub fn seed_upload(&self, report_id: Uuid, url: &str, is_fake: bool, is_spam: bool) -> ReportUpload {
        let upload = ReportUpload {
            id: Uuid::new_v4(),
            report_id,
            filename: url.to_string(),
            is_fake,
            is_spam,
            uploaded_at: OffsetDateTime::now_utc(),
        };
        self.uploads.lock().unwrap().push(upload.clone());
        upload
    }

    fn visible_uploads(&self, report_id: Uuid) -> Vec<UploadView> {
        let mut views: Vec<UploadView> = self
            .uploads
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.report_id == report_id && !u.is_fake && !u.is_spam)
            .map(upload_view)
            .collect();
        views.sort_by_key(|v| v.uploaded_at);
        views
    }

    fn evidence_for(&self, report: &Report) -> ReportWithEvidence {
        let issue = report
            .issue_id
            .filter(|_| report.is_classified)
            .and_then(|issue_id| {
                self.issues
                    .lock()
                    .unwrap()
                    .iter()
                    .find(|i| i.id == issue_id)
                    .map(issue_summary)
            })
            .map(Json);

        ReportWithEvidence {
            id: report.id,
            latitude: report.latitude,
            longitude: report.longitude,
            description: report.description.clone(),
            is_classified: report.is_classified,
            created_at: report.created_at,
            issue,
            uploads: Json(self.visible_uploads(report.id)),
        }
    }
}

fn upload_view(upload: &ReportUpload) -> UploadView {
    UploadView {
        id: upload.id,
        url: upload.filename.clone(),
        is_fake: upload.is_fake,
        is_spam: upload.is_spam,
        uploaded_at: upload.uploaded_at,
    }
}

fn issue_summary(issue: &Issue) -> IssueSummary {
    IssueSummary {
        id: issue.id,
        department: issue.department.clone(),
        category: issue.category.clone(),
        status: issue.status.clone(),
        created_at: issue.created_at,
        updated_at: issue.updated_at,
    }
}

#[async_trait]
impl AccountRepository for MockDb {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
        password_hash: &str,
    ) -> Result<PublicUser, sqlx::Error> {
        if self.should_fail {
            return Err(db_failure());
        }
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == email) {
            return Err(unique_violation());
        }
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.map(str::to_string),
            password_hash: password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(PublicUser {
            id: user.id,
            name: user.name,
            email: user.email,
        })
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        if self.should_fail {
            return Err(db_failure());
        }
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_higher_by_email(
        &self,
        email: &str,
    ) -> Result<Option<HigherAuthority>, sqlx::Error> {
        if self.should_fail {
            return Err(db_failure());
        }
        Ok(self
            .highers
            .lock()
            .unwrap()
            .iter()
            .find(|h| h.email == email)
            .cloned())
    }

    async fn find_authority_by_email(&self, email: &str) -> Result<Option<Authority>, sqlx::Error> {
        if self.should_fail {
            return Err(db_failure());
        }
        Ok(self
            .authorities
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn create_authority(
        &self,
        email: &str,
        password_hash: &str,
        department: &str,
    ) -> Result<RegisteredAuthority, sqlx::Error> {
        if self.should_fail {
            return Err(db_failure());
        }
        let mut authorities = self.authorities.lock().unwrap();
        if authorities.iter().any(|a| a.email == email) {
            return Err(unique_violation());
        }
        let authority = Authority {
            id: Uuid::new_v4(),
            name: None,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            phone: None,
            latitude: 0.0,
            longitude: 0.0,
            department: department.to_string(),
            is_initialized: false,
            created_at: OffsetDateTime::now_utc(),
        };
        authorities.push(authority.clone());
        Ok(RegisteredAuthority {
            id: authority.id,
            email: authority.email,
            department: authority.department,
        })
    }

    async fn update_authority_profile(
        &self,
        authority_id: Uuid,
        update: &AuthorityProfileUpdate,
    ) -> Result<Option<AuthorityProfile>, sqlx::Error> {
        if self.should_fail {
            return Err(db_failure());
        }
        let mut authorities = self.authorities.lock().unwrap();
        let Some(authority) = authorities.iter_mut().find(|a| a.id == authority_id) else {
            return Ok(None);
        };

        if let Some(name) = &update.name {
            authority.name = Some(name.clone());
        }
        if let Some(phone) = &update.phone {
            authority.phone = Some(phone.clone());
        }
        if let Some(department) = &update.department {
            authority.department = department.clone();
        }
        if let Some(latitude) = update.latitude {
            authority.latitude = latitude;
        }
        if let Some(longitude) = update.longitude {
            authority.longitude = longitude;
        }
        if let Some(password_hash) = &update.password_hash {
            authority.password_hash = password_hash.clone();
        }
        authority.is_initialized = true;

        Ok(Some(AuthorityProfile {
            id: authority.id,
            name: authority.name.clone(),
            email: authority.email.clone(),
            department: authority.department.clone(),
            latitude: authority.latitude,
            longitude: authority.longitude,
            is_initialized: authority.is_initialized,
        }))
    }

    async fn find_authority_home(
        &self,
        authority_id: Uuid,
    ) -> Result<Option<AuthorityHome>, sqlx::Error> {
        if self.should_fail {
            return Err(db_failure());
        }
        Ok(self
            .authorities
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == authority_id)
            .map(|a| AuthorityHome {
                department: a.department.clone(),
                latitude: a.latitude,
                longitude: a.longitude,
                is_initialized: a.is_initialized,
            }))
    }

    async fn find_higher_department(
        &self,
        higher_id: Uuid,
    ) -> Result<Option<String>, sqlx::Error> {
        if self.should_fail {
            return Err(db_failure());
        }
        Ok(self
            .highers
            .lock()
            .unwrap()
            .iter()
            .find(|h| h.id == higher_id)
            .map(|h| h.department.clone()))
    }

    async fn record_refresh_token(
        &self,
        kind: AccountKind,
        account_id: Uuid,
        token: &str,
    ) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(db_failure());
        }
        self.refresh_tokens
            .lock()
            .unwrap()
            .push((kind, account_id, token.to_string()));
        Ok(())
    }
}

#[async_trait]
impl ReportRepository for MockDb {
    async fn create_report_with_uploads(
        &self,
        report_id: Uuid,
        user_id: Uuid,
        location: GeoPoint,
        description: &str,
        upload_urls: &[String],
    ) -> Result<(Report, Vec<ReportUpload>), sqlx::Error> {
        if self.should_fail {
            return Err(db_failure());
        }
        let now = OffsetDateTime::now_utc();
        let report = Report {
            id: report_id,
            user_id,
            issue_id: None,
            latitude: location.latitude(),
            longitude: location.longitude(),
            description: description.to_string(),
            is_classified: false,
            created_at: now,
            updated_at: now,
        };
        self.reports.lock().unwrap().push(report.clone());

        let mut uploads = Vec::with_capacity(upload_urls.len());
        for url in upload_urls {
            uploads.push(self.seed_upload(report_id, url, false, false));
        }
        Ok((report, uploads))
    }

    async fn list_reports_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ReportWithEvidence>, sqlx::Error> {
        if self.should_fail {
            return Err(db_failure());
        }
        let mut reports: Vec<Report> = self
            .reports
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports.iter().map(|r| self.evidence_for(r)).collect())
    }

    async fn find_report_for_user(
        &self,
        report_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ReportWithEvidence>, sqlx::Error> {
        if self.should_fail {
            return Err(db_failure());
        }
        let report = self
            .reports
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == report_id && r.user_id == user_id)
            .cloned();
        Ok(report.map(|r| self.evidence_for(&r)))
    }

    async fn list_unclassified(&self, limit: i64) -> Result<Vec<Report>, sqlx::Error> {
        if self.should_fail {
            return Err(db_failure());
        }
        let mut reports: Vec<Report> = self
            .reports
            .lock()
            .unwrap()
            .iter()
            .filter(|r| !r.is_classified)
            .cloned()
            .collect();
        reports.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        reports.truncate(limit.max(0) as usize);
        Ok(reports)
    }

    async fn uploads_for_report(
        &self,
        report_id: Uuid,
    ) -> Result<Vec<ReportUpload>, sqlx::Error> {
        if self.should_fail {
            return Err(db_failure());
        }
        let mut uploads: Vec<ReportUpload> = self
            .uploads
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.report_id == report_id)
            .cloned()
            .collect();
        uploads.sort_by_key(|u| u.uploaded_at);
        Ok(uploads)
    }
}

#[async_trait]
impl IssueRepository for MockDb {
    async fn nearby_for_authority(
        &self,
        department: &str,
        origin: GeoPoint,
        radius_meters: f64,
        limit: i64,
        offset: i64,
    ) -> Result<NearbyPage, sqlx::Error> {
        if self.should_fail {
            return Err(db_failure());
        }
        let mut matches: Vec<NearbyIssue> = self
            .issues
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.department == department)
            .filter_map(|i| {
                let point = GeoPoint::new(i.latitude, i.longitude).ok()?;
                let distance = origin.distance_meters(&point);
                (distance <= radius_meters).then(|| NearbyIssue {
                    id: i.id,
                    latitude: i.latitude,
                    longitude: i.longitude,
                    category: i.category.clone(),
                    department: i.department.clone(),
                    status: i.status.clone(),
                    created_at: i.created_at,
                    updated_at: i.updated_at,
                    distance_meters: distance,
                    distance_km: (distance / 10.0).round() / 100.0,
                })
            })
            .collect();
        matches.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));

        let total = matches.len() as i64;
        let issues = matches
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok(NearbyPage { issues, total })
    }

    async fn department_rollup(
        &self,
        department: &str,
    ) -> Result<Vec<DepartmentIssue>, sqlx::Error> {
        if self.should_fail {
            return Err(db_failure());
        }
        let mut issues: Vec<Issue> = self
            .issues
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.department == department)
            .cloned()
            .collect();
        issues.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(issues
            .into_iter()
            .map(|issue| {
                let mut linked: Vec<Report> = self
                    .reports
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|r| r.issue_id == Some(issue.id) && r.is_classified)
                    .cloned()
                    .collect();
                linked.sort_by(|a, b| b.created_at.cmp(&a.created_at));

                let rollups = linked
                    .into_iter()
                    .map(|r| ReportRollup {
                        id: r.id,
                        description: r.description,
                        uploads: self.visible_uploads(r.id),
                    })
                    .collect();

                DepartmentIssue {
                    id: issue.id,
                    latitude: issue.latitude,
                    longitude: issue.longitude,
                    category: issue.category,
                    department: issue.department,
                    status: issue.status,
                    created_at: issue.created_at,
                    updated_at: issue.updated_at,
                    reports: Json(rollups),
                }
            })
            .collect())
    }

    async fn set_status(
        &self,
        issue_id: Uuid,
        status: IssueStatus,
    ) -> Result<Option<Issue>, sqlx::Error> {
        if self.should_fail {
            return Err(db_failure());
        }
        let mut issues = self.issues.lock().unwrap();
        let Some(issue) = issues.iter_mut().find(|i| i.id == issue_id) else {
            return Ok(None);
        };
        issue.status = status.as_str().to_string();
        issue.updated_at = OffsetDateTime::now_utc();
        Ok(Some(issue.clone()))
    }

    async fn classify_report(
        &self,
        report_id: Uuid,
        location: GeoPoint,
        category: &str,
        department: &str,
        merge_radius_meters: f64,
    ) -> Result<ClassifyOutcome, sqlx::Error> {
        if self.should_fail {
            return Err(db_failure());
        }

        {
            let reports = self.reports.lock().unwrap();
            match reports.iter().find(|r| r.id == report_id) {
                Some(report) if report.is_classified => {
                    return Ok(ClassifyOutcome::AlreadyClassified)
                }
                Some(_) => {}
                None => return Err(sqlx::Error::RowNotFound),
            }
        }

        let nearest = {
            let issues = self.issues.lock().unwrap();
            issues
                .iter()
                .filter(|i| i.department == department && i.category.as_deref() == Some(category))
                .filter_map(|i| {
                    let point = GeoPoint::new(i.latitude, i.longitude).ok()?;
                    let distance = location.distance_meters(&point);
                    (distance <= merge_radius_meters).then_some((i.id, distance))
                })
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(id, _)| id)
        };

        let (issue_id, created) = match nearest {
            Some(id) => (id, false),
            None => {
                let now = OffsetDateTime::now_utc();
                let issue = Issue {
                    id: Uuid::new_v4(),
                    latitude: location.latitude(),
                    longitude: location.longitude(),
                    category: Some(category.to_string()),
                    department: department.to_string(),
                    status: IssueStatus::Submitted.as_str().to_string(),
                    created_at: now,
                    updated_at: now,
                };
                let id = issue.id;
                self.issues.lock().unwrap().push(issue);
                (id, true)
            }
        };

        {
            let mut reports = self.reports.lock().unwrap();
            let report = reports
                .iter_mut()
                .find(|r| r.id == report_id)
                .expect("checked above");
            report.issue_id = Some(issue_id);
            report.is_classified = true;
            report.updated_at = OffsetDateTime::now_utc();
        }

        Ok(if created {
            ClassifyOutcome::Created { issue_id }
        } else {
            ClassifyOutcome::Linked { issue_id }
        })
    }
}

pub fn test_config() -> Arc<Config> {
    Arc::new(Config {
        database_url: String::new(),
        max_db_connections: 1,
        frontend_origin: "http://localhost".into(),
        listen_port: 0,
        max_upload_bytes: 1024 * 1024,
        storage: StorageSettings {
            base_url: "http://storage.local".into(),
            api_key: "stub".into(),
            bucket: "evidence".into(),
        },
        classification: ClassificationSettings {
            merge_radius_meters: 150.0,
            batch_size: 200,
        },
    })
}

pub fn test_jwt_keys() -> Arc<JwtKeys> {
    Arc::new(
        JwtKeys::from_secrets(
            "0123456789abcdef0123456789abcdef",
            "fedcba9876543210fedcba9876543210",
        )
        .expect("test JWT secrets should be valid"),
    )
}

pub fn test_state(db: Arc<MockDb>, storage: Arc<dyn ObjectStorage>) -> AppState {
    AppState {
        accounts: db.clone() as Arc<dyn AccountRepository>,
        reports: db.clone() as Arc<dyn ReportRepository>,
        issues: db as Arc<dyn IssueRepository>,
        storage,
        jwt: test_jwt_keys(),
        config: test_config(),
    }
}
