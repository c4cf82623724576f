pub mod account_repository;
pub mod issue_repository;
#[cfg(test)]
pub mod mock_db;
pub mod postgres_account_repository;
pub mod postgres_issue_repository;
pub mod postgres_report_repository;
pub mod report_repository;
pub mod schema;

/// Duplicate-key detection for the unique-email constraints; anything else
/// surfaces as a dependency failure.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
    )
}
