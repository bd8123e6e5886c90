use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StudentRegistration {
    pub id: Uuid,
    pub full_name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub address: String,
    pub email: String,
    pub phone_number: String,
    pub educational_background: String,
    pub program_applied: String,
    pub study_mode: String,
    pub document_filename: Option<String>,
    pub document_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Partnership {
    pub id: Uuid,
    pub organization_name: String,
    pub contact_person: String,
    pub email: String,
    pub phone_number: String,
    pub partnership_type: String,
    pub message: String,
    pub document_filename: Option<String>,
    pub document_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GalleryImage {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub filename: String,
    pub path: String,
    pub created_at: DateTime<Utc>,
}

/// Response body for both submission endpoints, worded for the applicant.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub status: &'static str,
    pub message: &'static str,
}

impl SubmissionReceipt {
    pub fn registration() -> Self {
        Self {
            status: "success",
            message: "Registration submitted successfully! Check your email for confirmation.",
        }
    }

    pub fn partnership() -> Self {
        Self {
            status: "success",
            message: "Partnership application submitted successfully! We'll contact you soon.",
        }
    }
}
