use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Field-level department staff. `name`/`phone` stay empty and
/// `is_initialized` stays false until the authority completes their first
/// profile update; the home point defaults to (0, 0) until then.
#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct Authority {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub department: String,
    pub is_initialized: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Department head. Scoped to a whole department, no home point.
#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct HigherAuthority {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub department: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct AuthorityProfile {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub department: String,
    pub latitude: f64,
    pub longitude: f64,
    pub is_initialized: bool,
}
