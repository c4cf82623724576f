use std::{collections::HashSet, env};

use crate::routes::auth::claims::{Claims, TokenUse};
use jsonwebtoken::{
    decode, encode, errors::Error, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    TokenData, Validation,
};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Minimum acceptable size for a token secret in bytes.
pub const MIN_TOKEN_SECRET_LENGTH: usize = 32;
/// Minimum number of unique bytes expected to avoid trivially guessable secrets.
const MIN_UNIQUE_SECRET_BYTES: usize = 8;

pub const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum TokenSecretError {
    #[error("{name} must be set")]
    Missing { name: &'static str },
    #[error("{name} must be at least {required} bytes, but {actual} bytes were provided")]
    TooShort {
        name: &'static str,
        actual: usize,
        required: usize,
    },
    #[error(
        "{name} must contain sufficient entropy (at least {required} unique bytes); only {actual} unique bytes found"
    )]
    LowEntropy {
        name: &'static str,
        actual: usize,
        required: usize,
    },
}

#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(name: &'static str, secret: &[u8]) -> Result<Self, TokenSecretError> {
        validate_secret(name, secret)?;
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        })
    }
}

/// Access and refresh tokens are signed with distinct secrets so a leaked
/// short-lived key cannot mint long-lived credentials.
#[derive(Clone)]
pub struct JwtKeys {
    access: KeyPair,
    refresh: KeyPair,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys").finish_non_exhaustive()
    }
}

impl JwtKeys {
    pub fn from_env() -> Result<Self, TokenSecretError> {
        let access = env::var("ACCESS_TOKEN_SECRET").map_err(|_| TokenSecretError::Missing {
            name: "ACCESS_TOKEN_SECRET",
        })?;
        let refresh = env::var("REFRESH_TOKEN_SECRET").map_err(|_| TokenSecretError::Missing {
            name: "REFRESH_TOKEN_SECRET",
        })?;
        Self::from_secrets(access, refresh)
    }

    pub fn from_secrets(
        access: impl AsRef<[u8]>,
        refresh: impl AsRef<[u8]>,
    ) -> Result<Self, TokenSecretError> {
        Ok(Self {
            access: KeyPair::from_secret("ACCESS_TOKEN_SECRET", access.as_ref())?,
            refresh: KeyPair::from_secret("REFRESH_TOKEN_SECRET", refresh.as_ref())?,
        })
    }

    fn pair_for(&self, token_use: TokenUse) -> &KeyPair {
        match token_use {
            TokenUse::Access => &self.access,
            TokenUse::Refresh => &self.refresh,
        }
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, Error> {
        let pair = self.pair_for(claims.token_use);
        encode(&Header::default(), claims, &pair.encoding)
    }

    /// Decodes and validates a token, rejecting tokens whose `token_use` does
    /// not match the secret they were checked against.
    pub fn verify(&self, token: &str, expected: TokenUse) -> Result<TokenData<Claims>, Error> {
        let pair = self.pair_for(expected);

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.required_spec_claims.insert("exp".to_string());
        let data = decode::<Claims>(token, &pair.decoding, &validation)?;

        if data.claims.token_use != expected {
            return Err(Error::from(ErrorKind::InvalidToken));
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| Error::from(ErrorKind::InvalidToken))?
            .as_secs();

        if (data.claims.exp as u64) <= now {
            return Err(Error::from(ErrorKind::ExpiredSignature));
        }

        Ok(data)
    }
}

fn validate_secret(name: &'static str, secret: &[u8]) -> Result<(), TokenSecretError> {
    if secret.len() < MIN_TOKEN_SECRET_LENGTH {
        return Err(TokenSecretError::TooShort {
            name,
            actual: secret.len(),
            required: MIN_TOKEN_SECRET_LENGTH,
        });
    }

    let unique = secret.iter().copied().collect::<HashSet<_>>().len();
    if unique < MIN_UNIQUE_SECRET_BYTES {
        return Err(TokenSecretError::LowEntropy {
            name,
            actual: unique,
            required: MIN_UNIQUE_SECRET_BYTES,
        });
    }

    Ok(())
}
