use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::utils::jwt::{ACCESS_TOKEN_TTL_SECS, REFRESH_TOKEN_TTL_SECS};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Citizen,
    Authority,
    Higher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Citizen => "citizen",
            Role::Authority => "authority",
            Role::Higher => "higher",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Claims {
    pub id: String, // account UUID
    pub email: String,
    pub role: Role,
    /// Present for authority and higher tokens, absent for citizens.
    pub department: Option<String>,
    pub exp: usize, // expiration (as UNIX timestamp)
    pub token_use: TokenUse,
}

impl Claims {
    pub fn access(id: Uuid, email: &str, role: Role, department: Option<String>) -> Self {
        Self::with_ttl(id, email, role, department, TokenUse::Access, ACCESS_TOKEN_TTL_SECS)
    }

    pub fn refresh(id: Uuid, email: &str, role: Role, department: Option<String>) -> Self {
        Self::with_ttl(id, email, role, department, TokenUse::Refresh, REFRESH_TOKEN_TTL_SECS)
    }

    fn with_ttl(
        id: Uuid,
        email: &str,
        role: Role,
        department: Option<String>,
        token_use: TokenUse,
        ttl_secs: i64,
    ) -> Self {
        Self {
            id: id.to_string(),
            email: email.to_string(),
            role,
            department,
            exp: (OffsetDateTime::now_utc().unix_timestamp() + ttl_secs) as usize,
            token_use,
        }
    }
}
