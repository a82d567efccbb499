//! Staff account commands.
//!
//! There is no self-registration in the back-office: an operator creates
//! each account here and hands the password over out of band.

use atelier_admin::db::AdminUserRepository;
use atelier_admin::services::{AdminAuthError, AdminAuthService};
use atelier_core::{AdminRole, AdminUserId};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// No password on the command line or in `ATELIER_ADMIN_PASSWORD`.
    #[error("A password is required: pass --password or set ATELIER_ADMIN_PASSWORD")]
    MissingPassword,

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Auth(#[from] AdminAuthError),

    #[error("{0}")]
    Repository(#[from] atelier_admin::db::RepositoryError),
}

/// Create a staff account.
///
/// # Errors
///
/// Returns `AdminError::Auth` for invalid input or a taken email.
pub async fn create_user(
    database_url: &SecretString,
    email: &str,
    name: &str,
    role: AdminRole,
    password: &SecretString,
) -> Result<AdminUserId, AdminError> {
    let pool = atelier_admin::db::create_pool(database_url).await?;

    tracing::info!("Creating admin user: {} ({})", email, role);
    let admin = AdminAuthService::new(&pool)
        .create_admin(email, name, role, password.expose_secret())
        .await?;

    tracing::info!(
        "Admin user created. ID: {}, Email: {}, Role: {}",
        admin.id,
        admin.email,
        admin.role
    );
    Ok(admin.id)
}

/// Log every staff account.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn list_users(database_url: &SecretString) -> Result<(), AdminError> {
    let pool = atelier_admin::db::create_pool(database_url).await?;
    let admins = AdminUserRepository::new(&pool).list_all().await?;

    tracing::info!("{} admin user(s)", admins.len());
    for admin in admins {
        tracing::info!(
            "  {:>4}  {:<8} {} <{}>",
            admin.id,
            admin.role,
            admin.name,
            admin.email
        );
    }
    Ok(())
}
