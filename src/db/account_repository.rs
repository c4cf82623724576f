use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    authority::{Authority, AuthorityProfile, HigherAuthority},
    user::{PublicUser, User},
};

/// Which identity table a refresh-token ledger row points at. Persisted as
/// text so the weak cross-table reference stays unambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    User,
    Authority,
    Higher,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::User => "user",
            AccountKind::Authority => "authority",
            AccountKind::Higher => "higher",
        }
    }
}

/// Subset returned from registering a lower authority.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct RegisteredAuthority {
    pub id: Uuid,
    pub email: String,
    pub department: String,
}

/// What the nearby-issues query needs to know about the caller.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthorityHome {
    pub department: String,
    pub latitude: f64,
    pub longitude: f64,
    pub is_initialized: bool,
}

/// Partial profile update; absent fields keep their stored values.
#[derive(Debug, Default, Clone)]
pub struct AuthorityProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub password_hash: Option<String>,
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
        password_hash: &str,
    ) -> Result<PublicUser, sqlx::Error>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;

    async fn find_higher_by_email(
        &self,
        email: &str,
    ) -> Result<Option<HigherAuthority>, sqlx::Error>;

    async fn find_authority_by_email(&self, email: &str) -> Result<Option<Authority>, sqlx::Error>;

    async fn create_authority(
        &self,
        email: &str,
        password_hash: &str,
        department: &str,
    ) -> Result<RegisteredAuthority, sqlx::Error>;

    async fn update_authority_profile(
        &self,
        authority_id: Uuid,
        update: &AuthorityProfileUpdate,
    ) -> Result<Option<AuthorityProfile>, sqlx::Error>;

    async fn find_authority_home(
        &self,
        authority_id: Uuid,
    ) -> Result<Option<AuthorityHome>, sqlx::Error>;

    async fn find_higher_department(
        &self,
        higher_id: Uuid,
    ) -> Result<Option<String>, sqlx::Error>;

    /// Audit ledger only; token validity is decided by signature + expiry.
    async fn record_refresh_token(
        &self,
        kind: AccountKind,
        account_id: Uuid,
        token: &str,
    ) -> Result<(), sqlx::Error>;
}
