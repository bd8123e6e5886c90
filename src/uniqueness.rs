use axum::extract::Path;
use axum::Extension;
use serde::Serialize;
use sqlx::PgPool;

use crate::{proceeds, Error, Payload};

/// Emails are compared case-insensitively on both read and write paths, so
/// `Alice@Example.com` and `alice@example.com` count as the same address.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Structural check only: one `@`, a non-empty local part, and a dotted
/// domain. Deliverability is the notifier's problem.
pub fn email_is_valid(email: &str) -> bool {
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = match parts.next() {
        Some(domain) => domain,
        None => return false,
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    if email.chars().any(char::is_whitespace) || domain.contains('@') {
        return false;
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return false;
    }
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    Student,
    Partnership,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct EmailCheck {
    pub available: bool,
    pub student_registered: bool,
    pub partnership_registered: bool,
}

impl EmailCheck {
    pub fn from_flags(student_registered: bool, partnership_registered: bool) -> Self {
        Self {
            available: !student_registered && !partnership_registered,
            student_registered,
            partnership_registered,
        }
    }
}

/// Queries existence of `email` in both collections independently. No side
/// effects; used as the public pre-check and inside both submission
/// pipelines.
pub async fn lookup_email(pg: &PgPool, email: &str) -> Result<EmailCheck, Error> {
    let email = normalize_email(email);
    let student_registered = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM student_registrations WHERE LOWER(email) = $1)",
    )
    .bind(&email)
    .fetch_one(pg)
    .await
    .map_err(Error::from)?;
    let partnership_registered = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM partnerships WHERE LOWER(email) = $1)",
    )
    .bind(&email)
    .fetch_one(pg)
    .await
    .map_err(Error::from)?;

    Ok(EmailCheck::from_flags(
        student_registered,
        partnership_registered,
    ))
}

/// Decides whether a submission targeting `kind` must be rejected, checking
/// the target collection first and the opposite one second. The window
/// between this check and the insert is not covered by a transaction; two
/// simultaneous submissions with the same email can both pass.
pub fn duplicate_for(kind: SubmissionKind, check: &EmailCheck, email: &str) -> Option<Error> {
    match kind {
        SubmissionKind::Student => {
            if check.student_registered {
                Some(Error::DuplicateEmail {
                    kind: "student",
                    message: format!(
                        "A student with email {} is already registered. Please use a different email address.",
                        email
                    ),
                })
            } else if check.partnership_registered {
                Some(Error::DuplicateEmail {
                    kind: "cross",
                    message: format!(
                        "The email {} is already registered for a partnership. Please use a different email address.",
                        email
                    ),
                })
            } else {
                None
            }
        }
        SubmissionKind::Partnership => {
            if check.partnership_registered {
                Some(Error::DuplicateEmail {
                    kind: "partnership",
                    message: format!(
                        "A partnership application with email {} already exists. Please use a different email address.",
                        email
                    ),
                })
            } else if check.student_registered {
                Some(Error::DuplicateEmail {
                    kind: "cross",
                    message: format!(
                        "The email {} is already registered as a student. Please use a different email address.",
                        email
                    ),
                })
            } else {
                None
            }
        }
    }
}

pub async fn check_email(
    Path(email): Path<String>,
    Extension(pg): Extension<PgPool>,
) -> Payload<EmailCheck> {
    let check = lookup_email(&pg, &email).await?;
    proceeds(check)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(err: Option<Error>) -> &'static str {
        match err {
            Some(Error::DuplicateEmail { kind, .. }) => kind,
            Some(_) => panic!("expected DuplicateEmail"),
            None => "none",
        }
    }

    #[test]
    fn availability_follows_the_two_flags() {
        assert!(EmailCheck::from_flags(false, false).available);
        assert!(!EmailCheck::from_flags(true, false).available);
        assert!(!EmailCheck::from_flags(false, true).available);
        assert!(!EmailCheck::from_flags(true, true).available);
    }

    #[test]
    fn student_submission_duplicate_decisions() {
        let email = "alice@example.com";
        let fresh = EmailCheck::from_flags(false, false);
        assert_eq!(kind_of(duplicate_for(SubmissionKind::Student, &fresh, email)), "none");

        let as_student = EmailCheck::from_flags(true, false);
        let err = duplicate_for(SubmissionKind::Student, &as_student, email).unwrap();
        match &err {
            Error::DuplicateEmail { kind, message } => {
                assert_eq!(*kind, "student");
                assert!(message.contains("A student with email alice@example.com is already registered"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let as_partner = EmailCheck::from_flags(false, true);
        let err = duplicate_for(SubmissionKind::Student, &as_partner, email).unwrap();
        match &err {
            Error::DuplicateEmail { kind, message } => {
                assert_eq!(*kind, "cross");
                assert!(message.contains("already registered for a partnership"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn partnership_submission_duplicate_decisions() {
        let email = "org@example.com";
        let fresh = EmailCheck::from_flags(false, false);
        assert_eq!(
            kind_of(duplicate_for(SubmissionKind::Partnership, &fresh, email)),
            "none"
        );

        let as_partner = EmailCheck::from_flags(false, true);
        let err = duplicate_for(SubmissionKind::Partnership, &as_partner, email).unwrap();
        match &err {
            Error::DuplicateEmail { kind, message } => {
                assert_eq!(*kind, "partnership");
                assert!(message.contains("A partnership application with email org@example.com already exists"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let as_student = EmailCheck::from_flags(true, false);
        let err = duplicate_for(SubmissionKind::Partnership, &as_student, email).unwrap();
        match &err {
            Error::DuplicateEmail { kind, message } => {
                assert_eq!(*kind, "cross");
                assert!(message.contains("already registered as a student"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn target_collection_wins_when_both_match() {
        let both = EmailCheck::from_flags(true, true);
        assert_eq!(kind_of(duplicate_for(SubmissionKind::Student, &both, "e@x.com")), "student");
        assert_eq!(
            kind_of(duplicate_for(SubmissionKind::Partnership, &both, "e@x.com")),
            "partnership"
        );
    }

    #[test]
    fn emails_compare_case_insensitively() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
        assert_eq!(normalize_email("alice@example.com"), normalize_email("ALICE@EXAMPLE.COM"));
    }

    #[test]
    fn email_syntax_check() {
        for good in [
            "alice@example.com",
            "first.last@sub.domain.org",
            "a+tag@x.co",
        ] {
            assert!(email_is_valid(good), "rejected: {:?}", good);
        }
        for bad in [
            "",
            "plain",
            "@example.com",
            "alice@",
            "alice@nodot",
            "alice@.com",
            "alice@example.com.",
            "a b@example.com",
            "a@b@example.com",
        ] {
            assert!(!email_is_valid(bad), "accepted: {:?}", bad);
        }
    }
}
