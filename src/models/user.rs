use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Shape returned to clients; never carries the credential hash.
#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}
