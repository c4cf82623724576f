use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::Config;
use crate::db::{
    account_repository::AccountRepository, issue_repository::IssueRepository,
    report_repository::ReportRepository,
};
use crate::services::storage::ObjectStorage;
use crate::utils::jwt::JwtKeys;

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<dyn AccountRepository>,
    pub reports: Arc<dyn ReportRepository>,
    pub issues: Arc<dyn IssueRepository>,
    pub storage: Arc<dyn ObjectStorage>,
    pub jwt: Arc<JwtKeys>,
    pub config: Arc<Config>,
}

impl FromRef<AppState> for Arc<JwtKeys> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}
