use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    typed_header::TypedHeader,
};
use uuid::Uuid;

use crate::responses::JsonResponse;
use crate::routes::auth::claims::{Claims, Role, TokenUse};
use crate::utils::jwt::JwtKeys;

#[derive(Debug, Clone, PartialEq)]
pub struct CitizenPrincipal {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthorityPrincipal {
    pub id: Uuid,
    pub email: String,
    pub department: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HigherPrincipal {
    pub id: Uuid,
    pub email: String,
    pub department: String,
}

/// The authenticated caller, decoded once from the bearer token. Handlers
/// receive this instead of a loose claim bag; each variant carries exactly
/// the fields its role guarantees.
#[derive(Debug, Clone, PartialEq)]
pub enum Principal {
    Citizen(CitizenPrincipal),
    Authority(AuthorityPrincipal),
    Higher(HigherPrincipal),
}

impl Principal {
    pub fn account_id(&self) -> Uuid {
        match self {
            Principal::Citizen(p) => p.id,
            Principal::Authority(p) => p.id,
            Principal::Higher(p) => p.id,
        }
    }

    fn from_claims(claims: Claims) -> Option<Self> {
        let id = Uuid::parse_str(&claims.id).ok()?;
        match claims.role {
            Role::Citizen => Some(Principal::Citizen(CitizenPrincipal {
                id,
                email: claims.email,
            })),
            Role::Authority => Some(Principal::Authority(AuthorityPrincipal {
                id,
                email: claims.email,
                department: claims.department?,
            })),
            Role::Higher => Some(Principal::Higher(HigherPrincipal {
                id,
                email: claims.email,
                department: claims.department?,
            })),
        }
    }
}

/// Any authenticated caller.
#[derive(Debug, PartialEq)]
pub struct Auth(pub Principal);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
    Arc<JwtKeys>: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = Arc::<JwtKeys>::from_ref(state);

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| JsonResponse::unauthorized("Missing bearer token").into_response())?;

        let data = keys
            .verify(bearer.token(), TokenUse::Access)
            .map_err(|_| JsonResponse::unauthorized("Invalid or expired token").into_response())?;

        let principal = Principal::from_claims(data.claims)
            .ok_or_else(|| JsonResponse::unauthorized("Invalid token claims").into_response())?;

        Ok(Auth(principal))
    }
}

/// A field authority; any other role is rejected with 403.
#[derive(Debug, PartialEq)]
pub struct AuthorityAuth(pub AuthorityPrincipal);

impl<S> FromRequestParts<S> for AuthorityAuth
where
    S: Send + Sync,
    Arc<JwtKeys>: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(principal) = Auth::from_request_parts(parts, state).await?;
        match principal {
            Principal::Authority(authority) => Ok(AuthorityAuth(authority)),
            _ => Err(JsonResponse::forbidden("Authority role required").into_response()),
        }
    }
}

/// A department head; any other role is rejected with 403.
#[derive(Debug, PartialEq)]
pub struct HigherAuth(pub HigherPrincipal);

impl<S> FromRequestParts<S> for HigherAuth
where
    S: Send + Sync,
    Arc<JwtKeys>: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(principal) = Auth::from_request_parts(parts, state).await?;
        match principal {
            Principal::Higher(higher) => Ok(HigherAuth(higher)),
            _ => Err(JsonResponse::forbidden("Higher authority role required").into_response()),
        }
    }
}
