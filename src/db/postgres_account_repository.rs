use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::account_repository::{
    AccountKind, AccountRepository, AuthorityHome, AuthorityProfileUpdate, RegisteredAuthority,
};
use crate::models::{
    authority::{Authority, AuthorityProfile, HigherAuthority},
    user::{PublicUser, User},
};

pub struct PostgresAccountRepository {
    pub pool: PgPool,
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
        password_hash: &str,
    ) -> Result<PublicUser, sqlx::Error> {
        sqlx::query_as::<_, PublicUser>(
            r#"
            INSERT INTO users (name, email, phone, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, phone, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_higher_by_email(
        &self,
        email: &str,
    ) -> Result<Option<HigherAuthority>, sqlx::Error> {
        sqlx::query_as::<_, HigherAuthority>(
            r#"
            SELECT id, name, email, password_hash, department, created_at
            FROM higherauthorities
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_authority_by_email(&self, email: &str) -> Result<Option<Authority>, sqlx::Error> {
        sqlx::query_as::<_, Authority>(
            r#"
            SELECT id, name, email, password_hash, phone, latitude, longitude,
                   department, is_initialized, created_at
            FROM authorities
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_authority(
        &self,
        email: &str,
        password_hash: &str,
        department: &str,
    ) -> Result<RegisteredAuthority, sqlx::Error> {
        sqlx::query_as::<_, RegisteredAuthority>(
            r#"
            INSERT INTO authorities (email, password_hash, department)
            VALUES ($1, $2, $3)
            RETURNING id, email, department
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(department)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_authority_profile(
        &self,
        authority_id: Uuid,
        update: &AuthorityProfileUpdate,
    ) -> Result<Option<AuthorityProfile>, sqlx::Error> {
        // The home point is re-derived from the coalesced coordinate pair so
        // geometry and the plain columns can never drift apart.
        sqlx::query_as::<_, AuthorityProfile>(
            r#"
            UPDATE authorities
            SET name = COALESCE($1, name),
                phone = COALESCE($2, phone),
                department = COALESCE($3, department),
                latitude = COALESCE($4, latitude),
                longitude = COALESCE($5, longitude),
                location = ST_SetSRID(
                    ST_MakePoint(COALESCE($5, longitude), COALESCE($4, latitude)), 4326),
                password_hash = COALESCE($6, password_hash),
                is_initialized = true
            WHERE id = $7
            RETURNING id, name, email, department, latitude, longitude, is_initialized
            "#,
        )
        .bind(update.name.as_deref())
        .bind(update.phone.as_deref())
        .bind(update.department.as_deref())
        .bind(update.latitude)
        .bind(update.longitude)
        .bind(update.password_hash.as_deref())
        .bind(authority_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_authority_home(
        &self,
        authority_id: Uuid,
    ) -> Result<Option<AuthorityHome>, sqlx::Error> {
        sqlx::query_as::<_, AuthorityHome>(
            r#"
            SELECT department, latitude, longitude, is_initialized
            FROM authorities
            WHERE id = $1
            "#,
        )
        .bind(authority_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_higher_department(
        &self,
        higher_id: Uuid,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT department FROM higherauthorities WHERE id = $1")
            .bind(higher_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn record_refresh_token(
        &self,
        kind: AccountKind,
        account_id: Uuid,
        token: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO refresh_tokens (account_kind, account_id, token) VALUES ($1, $2, $3)",
        )
        .bind(kind.as_str())
        .bind(account_id)
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
