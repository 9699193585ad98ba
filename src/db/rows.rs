//! Result, row and cursor adapters.
//!
//! These wrap what the driver hands back after a statement ran and report
//! failures through the exception taxonomy. `ResultAdapter` is the exception to
//! that rule: its accessors are queried lazily after a successful exec, so they
//! report plain [`ResultError`]s.

use crate::db::capability::{ExecResult, Row, Rows};
use crate::db::classify::classify;
use crate::error::Exception;
use sqlx::any::{AnyQueryResult, AnyRow};
use sqlx::{Column, FromRow};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResultError {
    #[error("LastInsertId is not supported by this driver")]
    LastInsertIdUnsupported,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowsError {
    #[error("sql: Rows are closed")]
    Closed,

    #[error("sql: Scan called without calling Next")]
    NoCurrentRow,
}

/// Summary of an executed statement.
#[derive(Debug, Clone, Default)]
pub struct ResultAdapter {
    rows_affected: u64,
    last_insert_id: Option<i64>,
}

impl ResultAdapter {
    pub fn new(rows_affected: u64, last_insert_id: Option<i64>) -> Self {
        Self {
            rows_affected,
            last_insert_id,
        }
    }
}

impl From<AnyQueryResult> for ResultAdapter {
    fn from(result: AnyQueryResult) -> Self {
        Self::new(result.rows_affected(), result.last_insert_id())
    }
}

impl ExecResult for ResultAdapter {
    fn last_insert_id(&self) -> Result<i64, ResultError> {
        self.last_insert_id
            .ok_or(ResultError::LastInsertIdUnsupported)
    }

    fn rows_affected(&self) -> Result<u64, ResultError> {
        Ok(self.rows_affected)
    }
}

/// Outcome of a single-row query, resolved when scanned.
pub struct RowAdapter {
    outcome: Result<Option<AnyRow>, Exception>,
}

impl RowAdapter {
    pub(crate) fn new(outcome: Result<Option<AnyRow>, Exception>) -> Self {
        Self { outcome }
    }
}

impl std::fmt::Debug for RowAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let outcome = match &self.outcome {
            Ok(Some(_)) => "row",
            Ok(None) => "no rows",
            Err(_) => "error",
        };
        f.debug_struct("RowAdapter").field("outcome", &outcome).finish()
    }
}

impl Row for RowAdapter {
    fn scan<T>(self) -> Result<T, Exception>
    where
        T: for<'r> FromRow<'r, AnyRow>,
    {
        let row = self
            .outcome?
            .ok_or_else(|| classify(sqlx::Error::RowNotFound))?;
        T::from_row(&row).map_err(classify)
    }
}

/// Forward-only cursor over a query's rows.
///
/// Rows are buffered when the query runs. A driver error raised after the
/// first row is kept and reported by [`Rows::err`] once iteration stops.
pub struct RowsAdapter {
    rows: std::vec::IntoIter<AnyRow>,
    columns: Vec<String>,
    current: Option<AnyRow>,
    deferred: Option<Exception>,
    closed: bool,
}

impl RowsAdapter {
    pub(crate) fn new(rows: Vec<AnyRow>, deferred: Option<sqlx::Error>) -> Self {
        let columns = rows
            .first()
            .map(|row| {
                sqlx::Row::columns(row)
                    .iter()
                    .map(|column| column.name().to_string())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            rows: rows.into_iter(),
            columns,
            current: None,
            deferred: deferred.map(Exception::throw),
            closed: false,
        }
    }

    /// Rows not yet visited by [`Rows::next`].
    pub fn remaining(&self) -> usize {
        if self.closed { 0 } else { self.rows.len() }
    }
}

impl std::fmt::Debug for RowsAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowsAdapter")
            .field("columns", &self.columns)
            .field("remaining", &self.remaining())
            .field("deferred", &self.deferred)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Rows for RowsAdapter {
    fn next(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.current = self.rows.next();
        if self.current.is_none() && self.deferred.is_none() {
            // Exhausted cleanly, release the buffer like an auto-close.
            self.closed = true;
        }
        self.current.is_some()
    }

    fn next_result_set(&mut self) -> bool {
        false
    }

    fn scan<T>(&self) -> Result<T, Exception>
    where
        T: for<'r> FromRow<'r, AnyRow>,
    {
        if self.closed {
            return Err(Exception::throw(RowsError::Closed));
        }
        let row = self
            .current
            .as_ref()
            .ok_or_else(|| Exception::throw(RowsError::NoCurrentRow))?;
        T::from_row(row).map_err(Exception::throw)
    }

    fn columns(&self) -> Result<Vec<String>, Exception> {
        if self.closed {
            return Err(Exception::throw(RowsError::Closed));
        }
        Ok(self.columns.clone())
    }

    fn err(&self) -> Result<(), Exception> {
        match &self.deferred {
            Some(exc) => Err(exc.clone()),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> Result<(), Exception> {
        self.closed = true;
        self.current = None;
        self.rows = Vec::new().into_iter();
        Ok(())
    }
}
