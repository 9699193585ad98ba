//! Exception taxonomy for the database access layer.
//!
//! Every fallible operation in this crate reports failures as an [`Exception`]:
//! a classified wrapper around the low-level error that caused it. Callers branch
//! on [`ExceptionKind`] (for example treating `NotFound` as "record absent") and
//! use the title/detail for logging or user-facing responses.

use serde::{Serialize, Serializer, ser::SerializeStruct};
use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Boxed error accepted by [`Exception::throw`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Classification of an [`Exception`].
///
/// Only `Unexpected` and `NotFound` are produced by the data layer itself. The
/// remaining kinds are reserved for business logic built on top of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionKind {
    /// Any failure that has not been classified more precisely.
    #[default]
    Unexpected,
    /// Expected data is missing.
    NotFound,
    /// Data that must be unique already exists.
    Duplicated,
    /// The caller supplied invalid input.
    BadInput,
    /// The caller is not authenticated.
    Unauthorized,
    /// The caller is authenticated but not allowed.
    Forbidden,
}

impl ExceptionKind {
    /// Human readable name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unexpected => "unexpected",
            Self::NotFound => "not found",
            Self::Duplicated => "duplicated",
            Self::BadInput => "bad input",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
        }
    }
}

impl std::fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified error value.
///
/// Created with [`Exception::throw`] and refined with the `with_*` builders.
/// Immutable once handed to a caller; cloning shares the wrapped error.
#[derive(Error, Debug, Clone)]
#[error("{cause}")]
pub struct Exception {
    kind: ExceptionKind,
    title: String,
    detail: String,
    #[source]
    cause: Arc<dyn StdError + Send + Sync + 'static>,
}

impl Exception {
    /// Wrap an error as an `Unexpected` exception with empty title and detail.
    ///
    /// Accepts any error type as well as plain `&str`/`String` messages.
    pub fn throw(err: impl Into<BoxError>) -> Self {
        let cause: BoxError = err.into();
        Self {
            kind: ExceptionKind::default(),
            title: String::new(),
            detail: String::new(),
            cause: Arc::from(cause),
        }
    }

    /// Override the classification.
    pub fn with_kind(mut self, kind: ExceptionKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set a short human readable title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set a longer explanation.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn kind(&self) -> ExceptionKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Message of the wrapped error.
    pub fn message(&self) -> String {
        self.cause.to_string()
    }

    /// Shorthand for `kind() == ExceptionKind::NotFound`.
    pub fn is_not_found(&self) -> bool {
        self.kind == ExceptionKind::NotFound
    }

    /// Borrow the wrapped error, e.g. to downcast to `sqlx::Error`.
    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.cause.as_ref()
    }
}

/// Serialized as `{kind, title, detail, message}` for response formatting layers.
impl Serialize for Exception {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Exception", 4)?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("title", &self.title)?;
        state.serialize_field("detail", &self.detail)?;
        state.serialize_field("message", &self.message())?;
        state.end()
    }
}
