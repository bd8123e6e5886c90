#![allow(non_snake_case)]

use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

use serde::Serialize;

pub async fn handler404(path: Uri) -> (StatusCode, Json<Error>) {
    (
        StatusCode::NOT_FOUND,
        Json(Error::NotFound {
            message: format!("Invalid path: {}", path),
        }),
    )
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Maybe<T> {
    Nothing(Error),
    Fine(Success<T>),
}

pub fn Fine<V>(v: V) -> Maybe<V>
where
    V: Serialize,
{
    Maybe::Fine(Success::of(v))
}

pub fn Nothing<V>(err: Error) -> Maybe<V> {
    Maybe::Nothing(err)
}

#[derive(Debug, Clone, Serialize)]
pub struct Success<V> {
    success: bool,
    #[serde(flatten)]
    value: V,
}

impl<T> IntoResponse for Maybe<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        match self {
            Maybe::Nothing(err) => err.into_response(),
            Maybe::Fine(success) => Json::into_response(Json(success)),
        }
    }
}

impl<V: Serialize> Success<V> {
    pub fn of(value: V) -> Self {
        Self {
            success: true,
            value,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "error")]
pub enum Error {
    ValidationError { message: String },
    DuplicateEmail { kind: &'static str, message: String },
    Unauthorized { message: String },
    NotFound { message: String },
    StorageError { message: String },
    InternalError { kind: &'static str, message: String },
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::ValidationError { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::DuplicateEmail { .. } => StatusCode::BAD_REQUEST,
            Error::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::StorageError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn validation<S: Into<String>>(msg: S) -> Error {
        Error::ValidationError {
            message: msg.into(),
        }
    }

    pub fn unauthorized<S: Into<String>>(msg: S) -> Error {
        Error::Unauthorized {
            message: msg.into(),
        }
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Error {
        Error::NotFound {
            message: msg.into(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<std::io::Error> for Error {
    fn from(io: std::io::Error) -> Self {
        log::error!("I/O failure: {}", io);
        Self::StorageError {
            message: "File storage failed. Please try again.".to_string(),
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        log::error!("Database failure: {}", err);
        Self::InternalError {
            kind: "DatabaseError",
            message: "Operation failed. Please try again.".to_string(),
        }
    }
}

impl From<uuid::Error> for Error {
    fn from(id: uuid::Error) -> Self {
        Self::ValidationError {
            message: format!("Invalid id: {}", id),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for Error {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        Self::ValidationError {
            message: format!("Malformed form data: {}", err),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        log::error!("Unexpected failure: {}", err);
        Self::InternalError {
            kind: "Unknown",
            message: "Operation failed. Please try again.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            Error::validation("x").status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            Error::DuplicateEmail {
                kind: "student",
                message: "dup".to_string()
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(Error::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::StorageError {
                message: "x".to_string()
            }
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::InternalError {
                kind: "DatabaseError",
                message: "x".to_string()
            }
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn serializes_with_error_tag() {
        let err = Error::DuplicateEmail {
            kind: "cross",
            message: "The email a@b.com is already registered for a partnership".to_string(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["error"], "DuplicateEmail");
        assert_eq!(json["kind"], "cross");
    }

    #[test]
    fn success_envelope_flattens_value() {
        #[derive(Serialize)]
        struct Body {
            answer: u32,
        }
        let json = serde_json::to_value(Success::of(Body { answer: 42 })).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["answer"], 42);
    }
}
