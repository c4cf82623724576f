use sqlx::PgPool;
use tracing::info;

/// Idempotent schema bootstrap, run once at startup. Statements execute in
/// order; extensions first, then tables, then indexes.
pub async fn init_db(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA_STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("database schema ready");
    Ok(())
}

const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE EXTENSION IF NOT EXISTS postgis",
    "CREATE EXTENSION IF NOT EXISTS vector",
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        email TEXT UNIQUE NOT NULL,
        phone TEXT,
        password_hash TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS authorities (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT,
        email TEXT UNIQUE NOT NULL,
        password_hash TEXT NOT NULL,
        phone TEXT,
        latitude DOUBLE PRECISION NOT NULL DEFAULT 0,
        longitude DOUBLE PRECISION NOT NULL DEFAULT 0,
        location geometry(Point, 4326) NOT NULL
            DEFAULT ST_SetSRID(ST_MakePoint(0, 0), 4326),
        department TEXT NOT NULL,
        is_initialized BOOLEAN NOT NULL DEFAULT false,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS higherauthorities (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        email TEXT UNIQUE NOT NULL,
        password_hash TEXT NOT NULL,
        department TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS issues (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        latitude DOUBLE PRECISION NOT NULL,
        longitude DOUBLE PRECISION NOT NULL,
        location geometry(Point, 4326) NOT NULL,
        category TEXT,
        department TEXT NOT NULL,
        status TEXT NOT NULL
            CHECK (status IN ('submitted', 'ongoing', 'resolved', 'rejected'))
            DEFAULT 'submitted',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS issues_location_gix ON issues USING GIST (location)",
    r#"
    CREATE TABLE IF NOT EXISTS reports (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        issue_id UUID REFERENCES issues(id) ON DELETE CASCADE,
        latitude DOUBLE PRECISION NOT NULL,
        longitude DOUBLE PRECISION NOT NULL,
        location geometry(Point, 4326) NOT NULL,
        description TEXT NOT NULL,
        is_classified BOOLEAN NOT NULL DEFAULT false,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS reports_location_gix ON reports USING GIST (location)",
    "CREATE INDEX IF NOT EXISTS reports_is_classified_idx ON reports(is_classified)",
    r#"
    CREATE TABLE IF NOT EXISTS report_uploads (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        report_id UUID NOT NULL REFERENCES reports(id) ON DELETE CASCADE,
        filename TEXT NOT NULL,
        embedding vector(512),
        is_fake BOOLEAN NOT NULL DEFAULT false,
        is_spam BOOLEAN NOT NULL DEFAULT false,
        uploaded_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS report_uploads_report_id_idx ON report_uploads(report_id)",
    r#"
    CREATE TABLE IF NOT EXISTS refresh_tokens (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        account_kind TEXT NOT NULL CHECK (account_kind IN ('user', 'authority', 'higher')),
        account_id UUID NOT NULL,
        token TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS refresh_tokens_account_idx ON refresh_tokens(account_kind, account_id)",
    "CREATE INDEX IF NOT EXISTS refresh_tokens_token_idx ON refresh_tokens(token)",
];
