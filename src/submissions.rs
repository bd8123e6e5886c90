use axum::extract::Multipart;
use axum::headers::authorization::Bearer;
use axum::headers::Authorization;
use axum::{Extension, TypedHeader};
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{require_admin, AuthKeeper};
use crate::io::{FileStore, StoredFile};
use crate::models::{Partnership, StudentRegistration, SubmissionReceipt};
use crate::notify::{self, Notifier};
use crate::uniqueness::{
    duplicate_for, email_is_valid, lookup_email, normalize_email, SubmissionKind,
};
use crate::{breaks, proceeds, Error, Payload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudyMode {
    OnCampus,
    Online,
    Hybrid,
}

impl StudyMode {
    pub fn parse(raw: &str) -> Option<StudyMode> {
        match raw.trim().to_lowercase().as_str() {
            "on-campus" => Some(StudyMode::OnCampus),
            "online" => Some(StudyMode::Online),
            "hybrid" => Some(StudyMode::Hybrid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StudyMode::OnCampus => "On-campus",
            StudyMode::Online => "Online",
            StudyMode::Hybrid => "Hybrid",
        }
    }
}

/// Text fields plus at most one uploaded file, as read off the multipart
/// stream. Empty file parts count as "no document attached".
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub document: Option<(Option<String>, Vec<u8>)>,
}

pub async fn collect_form(mut multipart: Multipart, file_field: &str) -> Result<FormData, Error> {
    let mut fields = HashMap::new();
    let mut document = None;
    while let Some(field) = multipart.next_field().await? {
        let name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        if name == file_field {
            let original = field.file_name().map(|s| s.to_string());
            let bytes = field.bytes().await?;
            if !bytes.is_empty() {
                document = Some((original, bytes.to_vec()));
            }
        } else {
            fields.insert(name, field.text().await?);
        }
    }
    Ok(FormData { fields, document })
}

pub fn required(fields: &HashMap<String, String>, name: &'static str) -> Result<String, Error> {
    match fields.get(name).map(|value| value.trim()) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(Error::validation(format!("`{}` is required", name))),
    }
}

fn required_email(fields: &HashMap<String, String>) -> Result<String, Error> {
    let email = required(fields, "email")?;
    if !email_is_valid(&normalize_email(&email)) {
        return Err(Error::validation("`email` must be a valid email address"));
    }
    Ok(email)
}

#[derive(Debug)]
pub struct StudentSubmission {
    pub full_name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub address: String,
    pub email: String,
    pub phone_number: String,
    pub educational_background: String,
    pub program_applied: String,
    pub study_mode: StudyMode,
}

impl StudentSubmission {
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, Error> {
        let study_mode_raw = required(fields, "study_mode")?;
        let study_mode = StudyMode::parse(&study_mode_raw).ok_or_else(|| {
            Error::validation("`study_mode` must be one of On-campus, Online or Hybrid")
        })?;
        Ok(Self {
            full_name: required(fields, "full_name")?,
            date_of_birth: required(fields, "date_of_birth")?,
            gender: required(fields, "gender")?,
            address: required(fields, "address")?,
            email: required_email(fields)?,
            phone_number: required(fields, "phone_number")?,
            educational_background: required(fields, "educational_background")?,
            program_applied: required(fields, "program_applied")?,
            study_mode,
        })
    }
}

pub struct PartnershipSubmission {
    pub organization_name: String,
    pub contact_person: String,
    pub email: String,
    pub phone_number: String,
    pub partnership_type: String,
    pub message: String,
}

impl PartnershipSubmission {
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, Error> {
        Ok(Self {
            organization_name: required(fields, "organization_name")?,
            contact_person: required(fields, "contact_person")?,
            email: required_email(fields)?,
            phone_number: required(fields, "phone_number")?,
            partnership_type: required(fields, "partnership_type")?,
            message: required(fields, "message")?,
        })
    }
}

async fn store_document(
    files: &FileStore,
    document: &Option<(Option<String>, Vec<u8>)>,
) -> Result<Option<StoredFile>, Error> {
    match document {
        Some((original, bytes)) => {
            let stored = files.store("document", original.as_deref(), bytes).await?;
            Ok(Some(stored))
        }
        None => Ok(None),
    }
}

pub async fn register_student(
    Extension(pg): Extension<PgPool>,
    Extension(files): Extension<Arc<FileStore>>,
    Extension(notifier): Extension<Arc<Notifier>>,
    multipart: Multipart,
) -> Payload<SubmissionReceipt> {
    let form = collect_form(multipart, "document").await?;
    let submission = match StudentSubmission::from_fields(&form.fields) {
        Ok(submission) => submission,
        Err(err) => return breaks(err),
    };

    let check = lookup_email(&pg, &submission.email).await?;
    if let Some(err) = duplicate_for(SubmissionKind::Student, &check, &submission.email) {
        return breaks(err);
    }

    let stored = store_document(&files, &form.document).await?;
    let record = StudentRegistration {
        id: Uuid::new_v4(),
        full_name: submission.full_name,
        date_of_birth: submission.date_of_birth,
        gender: submission.gender,
        address: submission.address,
        email: submission.email,
        phone_number: submission.phone_number,
        educational_background: submission.educational_background,
        program_applied: submission.program_applied,
        study_mode: submission.study_mode.as_str().to_string(),
        document_filename: stored.as_ref().map(|f| f.filename.clone()),
        document_path: stored.as_ref().map(|f| f.path.clone()),
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO student_registrations \
         (id, full_name, date_of_birth, gender, address, email, phone_number, \
          educational_background, program_applied, study_mode, document_filename, \
          document_path, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(record.id)
    .bind(&record.full_name)
    .bind(&record.date_of_birth)
    .bind(&record.gender)
    .bind(&record.address)
    .bind(&record.email)
    .bind(&record.phone_number)
    .bind(&record.educational_background)
    .bind(&record.program_applied)
    .bind(&record.study_mode)
    .bind(&record.document_filename)
    .bind(&record.document_path)
    .bind(record.created_at)
    .execute(&pg)
    .await
    .map_err(Error::from)?;

    log::info!("Registered student application {}", record.id);
    let (subject, html) =
        notify::registration_confirmation(&record.full_name, &record.program_applied);
    notifier.dispatch(record.email.clone(), subject, html);

    proceeds(SubmissionReceipt::registration())
}

pub async fn submit_partnership(
    Extension(pg): Extension<PgPool>,
    Extension(files): Extension<Arc<FileStore>>,
    Extension(notifier): Extension<Arc<Notifier>>,
    multipart: Multipart,
) -> Payload<SubmissionReceipt> {
    let form = collect_form(multipart, "document").await?;
    let submission = match PartnershipSubmission::from_fields(&form.fields) {
        Ok(submission) => submission,
        Err(err) => return breaks(err),
    };

    let check = lookup_email(&pg, &submission.email).await?;
    if let Some(err) = duplicate_for(SubmissionKind::Partnership, &check, &submission.email) {
        return breaks(err);
    }

    let stored = store_document(&files, &form.document).await?;
    let record = Partnership {
        id: Uuid::new_v4(),
        organization_name: submission.organization_name,
        contact_person: submission.contact_person,
        email: submission.email,
        phone_number: submission.phone_number,
        partnership_type: submission.partnership_type,
        message: submission.message,
        document_filename: stored.as_ref().map(|f| f.filename.clone()),
        document_path: stored.as_ref().map(|f| f.path.clone()),
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO partnerships \
         (id, organization_name, contact_person, email, phone_number, partnership_type, \
          message, document_filename, document_path, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(record.id)
    .bind(&record.organization_name)
    .bind(&record.contact_person)
    .bind(&record.email)
    .bind(&record.phone_number)
    .bind(&record.partnership_type)
    .bind(&record.message)
    .bind(&record.document_filename)
    .bind(&record.document_path)
    .bind(record.created_at)
    .execute(&pg)
    .await
    .map_err(Error::from)?;

    log::info!("Recorded partnership application {}", record.id);
    let (subject, html) =
        notify::partnership_acknowledgment(&record.organization_name, &record.partnership_type);
    notifier.dispatch(record.email.clone(), subject, html);

    proceeds(SubmissionReceipt::partnership())
}

pub async fn get_registrations(
    Extension(pg): Extension<PgPool>,
    Extension(keeper): Extension<Arc<AuthKeeper>>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
) -> Payload<RegistrationList> {
    if let Err(err) = require_admin(auth, &keeper) {
        return breaks(err);
    }

    let registrations = sqlx::query_as::<_, StudentRegistration>(
        "SELECT * FROM student_registrations ORDER BY created_at DESC",
    )
    .fetch_all(&pg)
    .await
    .map_err(Error::from)?;
    proceeds(RegistrationList { registrations })
}

pub async fn get_partnerships(
    Extension(pg): Extension<PgPool>,
    Extension(keeper): Extension<Arc<AuthKeeper>>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
) -> Payload<PartnershipList> {
    if let Err(err) = require_admin(auth, &keeper) {
        return breaks(err);
    }

    let partnerships = sqlx::query_as::<_, Partnership>(
        "SELECT * FROM partnerships ORDER BY created_at DESC",
    )
    .fetch_all(&pg)
    .await
    .map_err(Error::from)?;
    proceeds(PartnershipList { partnerships })
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationList {
    pub registrations: Vec<StudentRegistration>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartnershipList {
    pub partnerships: Vec<Partnership>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student_fields() -> HashMap<String, String> {
        [
            ("full_name", "Alice Example"),
            ("date_of_birth", "1990-01-15"),
            ("gender", "Female"),
            ("address", "123 Test Street"),
            ("email", "alice@example.com"),
            ("phone_number", "+1234567890"),
            ("educational_background", "Bachelor's Degree in Theology"),
            ("program_applied", "Certificate in Biblical Studies"),
            ("study_mode", "Online"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn partnership_fields() -> HashMap<String, String> {
        [
            ("organization_name", "First Church"),
            ("contact_person", "Jane Smith"),
            ("email", "partner@example.com"),
            ("phone_number", "+1987654321"),
            ("partnership_type", "Ministry Support"),
            ("message", "We are interested in a ministry support partnership."),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn study_mode_parses_case_insensitively() {
        assert_eq!(StudyMode::parse("Online"), Some(StudyMode::Online));
        assert_eq!(StudyMode::parse("ON-CAMPUS"), Some(StudyMode::OnCampus));
        assert_eq!(StudyMode::parse(" hybrid "), Some(StudyMode::Hybrid));
        assert_eq!(StudyMode::parse("evening"), None);
        assert_eq!(StudyMode::parse(""), None);
        assert_eq!(StudyMode::parse("Hybrid").unwrap().as_str(), "Hybrid");
    }

    #[test]
    fn student_submission_accepts_complete_fields() {
        let submission = StudentSubmission::from_fields(&student_fields()).unwrap();
        assert_eq!(submission.full_name, "Alice Example");
        assert_eq!(submission.study_mode, StudyMode::Online);
    }

    #[test]
    fn student_submission_rejects_missing_required_field() {
        for field in ["full_name", "email", "program_applied", "study_mode"] {
            let mut fields = student_fields();
            fields.remove(field);
            let err = StudentSubmission::from_fields(&fields).unwrap_err();
            assert!(
                matches!(err, Error::ValidationError { .. }),
                "field {} gave {:?}",
                field,
                err
            );
        }
    }

    #[test]
    fn student_submission_rejects_blank_and_invalid_values() {
        let mut fields = student_fields();
        fields.insert("gender".to_string(), "   ".to_string());
        assert!(StudentSubmission::from_fields(&fields).is_err());

        let mut fields = student_fields();
        fields.insert("email".to_string(), "not-an-email".to_string());
        assert!(StudentSubmission::from_fields(&fields).is_err());

        let mut fields = student_fields();
        fields.insert("study_mode".to_string(), "weekend".to_string());
        assert!(StudentSubmission::from_fields(&fields).is_err());
    }

    #[test]
    fn partnership_submission_validation() {
        assert!(PartnershipSubmission::from_fields(&partnership_fields()).is_ok());

        for field in ["organization_name", "contact_person", "email", "message"] {
            let mut fields = partnership_fields();
            fields.remove(field);
            assert!(
                PartnershipSubmission::from_fields(&fields).is_err(),
                "missing {} accepted",
                field
            );
        }

        let mut fields = partnership_fields();
        fields.insert("email".to_string(), "bad@".to_string());
        assert!(PartnershipSubmission::from_fields(&fields).is_err());
    }
}
