pub mod auth;
pub mod authority;
pub mod issues;
pub mod reports;
