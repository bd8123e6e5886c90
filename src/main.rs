pub mod auth;
pub mod config;
pub mod err;
pub mod gallery;
pub mod io;
pub mod models;
pub mod notify;
pub mod submissions;
pub mod uniqueness;

use axum::extract::DefaultBodyLimit;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};

use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceBuilder;

use crate::auth::{AuthKeeper, CredentialTable, TokenService};
use crate::config::Config;
use crate::err::{Error, Fine, Maybe, Nothing};
use crate::io::FileStore;
use crate::notify::Notifier;

pub type Payload<T> = axum::response::Result<Maybe<T>, Error>;

pub fn proceeds<V>(value: V) -> Payload<V>
where
    V: Serialize,
{
    Ok(Fine(value))
}

pub fn breaks<V>(err: Error) -> Payload<V>
where
    V: Serialize,
{
    Ok(Nothing(err))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = Config::from_env()?;

    let pg = PgPoolOptions::new()
        .max_connections(8)
        .connect(&config.database_url)
        .await?;
    ensure_schema(&pg).await?;

    let files = Arc::new(FileStore::new(&config.upload_dir));
    files.prepare().await?;

    let keeper = Arc::new(AuthKeeper::new(
        Box::new(CredentialTable::with_defaults()?),
        TokenService::new(&config.session_secret, config.session_ttl),
    ));
    let notifier = Arc::new(Notifier::new(
        config.sendgrid_api_key.clone(),
        config.sender_email.clone(),
    ));

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/admin/login", post(auth::admin_login))
        .route("/admin/verify-token", post(auth::verify_token))
        .route("/admin/dashboard", get(gallery::admin_dashboard))
        .route("/check-email/:email", get(uniqueness::check_email))
        .route("/register-student", post(submissions::register_student))
        .route("/submit-partnership", post(submissions::submit_partnership))
        .route("/registrations", get(submissions::get_registrations))
        .route("/partnerships", get(submissions::get_partnerships))
        .route("/gallery", get(gallery::list_gallery))
        .route("/gallery/upload", post(gallery::upload_image))
        .route("/gallery/:id", delete(gallery::delete_image))
        .fallback(err::handler404)
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
                .layer(Extension(pg))
                .layer(Extension(files))
                .layer(Extension(keeper))
                .layer(Extension(notifier)),
        );

    log::info!("Starting WHIBC portal server on http://{}", config.bind_addr);
    axum::Server::bind(&config.bind_addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Word of Hope International Bible College API",
        "status": "active",
    }))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "whibc-api",
    }))
}

async fn ensure_schema(pg: &PgPool) -> anyhow::Result<()> {
    let statements = [
        "CREATE TABLE IF NOT EXISTS student_registrations (
            id UUID PRIMARY KEY,
            full_name TEXT NOT NULL,
            date_of_birth TEXT NOT NULL,
            gender TEXT NOT NULL,
            address TEXT NOT NULL,
            email TEXT NOT NULL,
            phone_number TEXT NOT NULL,
            educational_background TEXT NOT NULL,
            program_applied TEXT NOT NULL,
            study_mode TEXT NOT NULL,
            document_filename TEXT,
            document_path TEXT,
            created_at TIMESTAMPTZ NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS partnerships (
            id UUID PRIMARY KEY,
            organization_name TEXT NOT NULL,
            contact_person TEXT NOT NULL,
            email TEXT NOT NULL,
            phone_number TEXT NOT NULL,
            partnership_type TEXT NOT NULL,
            message TEXT NOT NULL,
            document_filename TEXT,
            document_path TEXT,
            created_at TIMESTAMPTZ NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS gallery (
            id UUID PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            category TEXT NOT NULL,
            filename TEXT NOT NULL,
            path TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )",
        // closes the same-table race at the store; the cross-table window
        // between check and insert remains
        "CREATE UNIQUE INDEX IF NOT EXISTS student_registrations_email_idx \
         ON student_registrations ((LOWER(email)))",
        "CREATE UNIQUE INDEX IF NOT EXISTS partnerships_email_idx \
         ON partnerships ((LOWER(email)))",
    ];
    for ddl in statements {
        sqlx::query(ddl).execute(pg).await?;
    }
    Ok(())
}
