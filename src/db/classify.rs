//! The single point where driver errors become exceptions.

use crate::context::ContextError;
use crate::error::{Exception, ExceptionKind};

/// Whether `err` is the driver's "no rows" signal.
pub fn is_no_rows(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::RowNotFound)
}

/// Classify a driver error: "no rows" is `NotFound`, everything else `Unexpected`.
pub fn classify(err: sqlx::Error) -> Exception {
    if is_no_rows(&err) {
        Exception::throw(err).with_kind(ExceptionKind::NotFound)
    } else {
        Exception::throw(err)
    }
}

/// Wrap a driver error as `Unexpected` regardless of its variant.
pub fn unexpected(err: sqlx::Error) -> Exception {
    Exception::throw(err)
}

/// Flatten the outcome of a context-guarded driver call.
///
/// A fired context is always `Unexpected`; driver errors go through `on_error`.
pub(crate) fn settle<T>(
    outcome: Result<Result<T, sqlx::Error>, ContextError>,
    on_error: fn(sqlx::Error) -> Exception,
) -> Result<T, Exception> {
    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(on_error(err)),
        Err(err) => Err(Exception::throw(err)),
    }
}
