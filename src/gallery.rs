use axum::extract::{Multipart, Path};
use axum::headers::authorization::Bearer;
use axum::headers::Authorization;
use axum::{Extension, TypedHeader};
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{require_admin, AuthKeeper};
use crate::io::FileStore;
use crate::models::{GalleryImage, Partnership, StudentRegistration};
use crate::submissions::{collect_form, required};
use crate::{breaks, proceeds, Error, Payload};

pub async fn upload_image(
    Extension(pg): Extension<PgPool>,
    Extension(files): Extension<Arc<FileStore>>,
    Extension(keeper): Extension<Arc<AuthKeeper>>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    multipart: Multipart,
) -> Payload<UploadedImage> {
    if let Err(err) = require_admin(auth, &keeper) {
        return breaks(err);
    }

    let form = collect_form(multipart, "image").await?;
    let title = match required(&form.fields, "title") {
        Ok(title) => title,
        Err(err) => return breaks(err),
    };
    let description = match required(&form.fields, "description") {
        Ok(description) => description,
        Err(err) => return breaks(err),
    };
    let category = match required(&form.fields, "category") {
        Ok(category) => category,
        Err(err) => return breaks(err),
    };
    let (original_name, bytes) = match form.document {
        Some(image) => image,
        None => return breaks(Error::validation("`image` file is required")),
    };

    let stored = files.store("gallery", original_name.as_deref(), &bytes).await?;
    let record = GalleryImage {
        id: Uuid::new_v4(),
        title,
        description,
        category,
        filename: stored.filename,
        path: stored.path,
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO gallery (id, title, description, category, filename, path, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(record.id)
    .bind(&record.title)
    .bind(&record.description)
    .bind(&record.category)
    .bind(&record.filename)
    .bind(&record.path)
    .bind(record.created_at)
    .execute(&pg)
    .await
    .map_err(Error::from)?;

    log::info!("Gallery image {} uploaded as `{}`", record.id, record.filename);
    proceeds(UploadedImage {
        id: record.id,
        filename: record.filename,
    })
}

pub async fn list_gallery(Extension(pg): Extension<PgPool>) -> Payload<GalleryList> {
    let images =
        sqlx::query_as::<_, GalleryImage>("SELECT * FROM gallery ORDER BY created_at DESC")
            .fetch_all(&pg)
            .await
            .map_err(Error::from)?;
    proceeds(GalleryList { images })
}

pub async fn delete_image(
    Path(id): Path<String>,
    Extension(pg): Extension<PgPool>,
    Extension(files): Extension<Arc<FileStore>>,
    Extension(keeper): Extension<Arc<AuthKeeper>>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
) -> Payload<DeletedImage> {
    if let Err(err) = require_admin(auth, &keeper) {
        return breaks(err);
    }

    let id = Uuid::from_str(&id)?;
    let image = sqlx::query_as::<_, GalleryImage>("SELECT * FROM gallery WHERE id = $1 LIMIT 1")
        .bind(id)
        .fetch_optional(&pg)
        .await
        .map_err(Error::from)?;
    let image = match image {
        Some(image) => image,
        None => {
            return breaks(Error::not_found(format!(
                "No gallery image with id `{}`",
                id
            )))
        }
    };

    sqlx::query("DELETE FROM gallery WHERE id = $1")
        .bind(id)
        .execute(&pg)
        .await
        .map_err(Error::from)?;

    // metadata is gone either way; a stuck file only shows up in the log
    let file_removed = files.remove(&image.path).await;
    proceeds(DeletedImage { id, file_removed })
}

pub async fn admin_dashboard(
    Extension(pg): Extension<PgPool>,
    Extension(keeper): Extension<Arc<AuthKeeper>>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
) -> Payload<DashboardSummary> {
    if let Err(err) = require_admin(auth, &keeper) {
        return breaks(err);
    }

    let total_registrations =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM student_registrations")
            .fetch_one(&pg)
            .await
            .map_err(Error::from)?;
    let total_partnerships = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM partnerships")
        .fetch_one(&pg)
        .await
        .map_err(Error::from)?;
    let total_gallery = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM gallery")
        .fetch_one(&pg)
        .await
        .map_err(Error::from)?;

    let recent_registrations = sqlx::query_as::<_, StudentRegistration>(
        "SELECT * FROM student_registrations ORDER BY created_at DESC LIMIT 5",
    )
    .fetch_all(&pg)
    .await
    .map_err(Error::from)?;
    let recent_partnerships = sqlx::query_as::<_, Partnership>(
        "SELECT * FROM partnerships ORDER BY created_at DESC LIMIT 5",
    )
    .fetch_all(&pg)
    .await
    .map_err(Error::from)?;

    proceeds(DashboardSummary {
        stats: DashboardStats {
            total_registrations,
            total_partnerships,
            total_gallery,
        },
        recent_registrations,
        recent_partnerships,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadedImage {
    pub id: Uuid,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GalleryList {
    pub images: Vec<GalleryImage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedImage {
    pub id: Uuid,
    pub file_removed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_registrations: i64,
    pub total_partnerships: i64,
    pub total_gallery: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub stats: DashboardStats,
    pub recent_registrations: Vec<StudentRegistration>,
    pub recent_partnerships: Vec<Partnership>,
}
