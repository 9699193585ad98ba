//! Capability traits.
//!
//! Each role a value can play against the database is a trait: [`Db`] for a
//! connection, [`Tx`] for an open transaction, and [`ExecResult`], [`Row`] and
//! [`Rows`] for what comes back. Every operation takes the caller's
//! [`Context`] and an opaque query identifier that is only used for tracing.

use crate::context::Context;
use crate::db::rows::ResultError;
use crate::error::Exception;
use crate::models::QueryParam;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use sqlx::FromRow;
use sqlx::any::AnyRow;

/// A database connection.
#[async_trait]
pub trait Db: Send + Sync {
    type ExecResult: ExecResult;
    type Rows: Rows;
    type Row: Row;
    type Tx: Tx<ExecResult = Self::ExecResult, Rows = Self::Rows, Row = Self::Row>;

    /// Check that the database is reachable.
    async fn ping(&self, ctx: &Context) -> Result<(), Exception>;

    /// Execute a statement that returns no rows.
    async fn exec_context(
        &self,
        ctx: &Context,
        query_id: &str,
        query: &str,
        args: &[QueryParam],
    ) -> Result<Self::ExecResult, Exception>;

    /// Execute a query that returns rows.
    async fn query_context(
        &self,
        ctx: &Context,
        query_id: &str,
        query: &str,
        args: &[QueryParam],
    ) -> Result<Self::Rows, Exception>;

    /// Execute a query expected to return at most one row.
    ///
    /// Never fails by itself; errors surface from [`Row::scan`].
    async fn query_row_context(
        &self,
        ctx: &Context,
        query_id: &str,
        query: &str,
        args: &[QueryParam],
    ) -> Self::Row;

    /// Run `f` inside a transaction.
    ///
    /// Commits when `f` succeeds and rolls back when it fails. The exception
    /// returned by `f` is returned unchanged.
    ///
    /// The future returned by `f` may only borrow the transaction; anything
    /// else it uses must be moved in. [`Context`] clones are cheap.
    ///
    /// ```ignore
    /// let scoped = ctx.clone();
    /// db.transaction(&ctx, "rename_user", move |tx| {
    ///     Box::pin(async move {
    ///         tx.exec_context(&scoped, "rename", "UPDATE users SET name = ? WHERE id = ?", &params!["bob", 1])
    ///             .await?;
    ///         Ok(())
    ///     })
    /// })
    /// .await?;
    /// ```
    async fn transaction<F, T>(
        &self,
        ctx: &Context,
        transaction_key: &str,
        f: F,
    ) -> Result<T, Exception>
    where
        F: for<'t> FnOnce(&'t mut Self::Tx) -> BoxFuture<'t, Result<T, Exception>> + Send,
        T: Send;
}

/// An open transaction. Only reachable inside [`Db::transaction`].
#[async_trait]
pub trait Tx: Send {
    type ExecResult: ExecResult;
    type Rows: Rows;
    type Row: Row;

    async fn exec_context(
        &mut self,
        ctx: &Context,
        query_id: &str,
        query: &str,
        args: &[QueryParam],
    ) -> Result<Self::ExecResult, Exception>;

    async fn query_context(
        &mut self,
        ctx: &Context,
        query_id: &str,
        query: &str,
        args: &[QueryParam],
    ) -> Result<Self::Rows, Exception>;

    async fn query_row_context(
        &mut self,
        ctx: &Context,
        query_id: &str,
        query: &str,
        args: &[QueryParam],
    ) -> Self::Row;
}

/// Summary of an executed statement.
pub trait ExecResult: Send {
    /// Id generated by the database for the last inserted row.
    ///
    /// PostgreSQL and SQLite do not report one through the `Any` driver; use
    /// `RETURNING` or `last_insert_rowid()` there.
    fn last_insert_id(&self) -> Result<i64, ResultError>;

    fn rows_affected(&self) -> Result<u64, ResultError>;
}

/// A single-use scan target.
pub trait Row: Send {
    fn scan<T>(self) -> Result<T, Exception>
    where
        Self: Sized,
        T: for<'r> FromRow<'r, AnyRow>;
}

/// A forward-only cursor.
///
/// The whole result is read into memory before the query returns, so large
/// results should be bounded with `LIMIT` or paged by the caller.
pub trait Rows: Send {
    /// Advance to the next row.
    fn next(&mut self) -> bool;

    /// Advance to the next result set.
    fn next_result_set(&mut self) -> bool;

    /// Decode the current row.
    fn scan<T>(&self) -> Result<T, Exception>
    where
        T: for<'r> FromRow<'r, AnyRow>;

    fn columns(&self) -> Result<Vec<String>, Exception>;

    /// Error encountered during iteration, if any.
    fn err(&self) -> Result<(), Exception>;

    /// Release the cursor. Safe to call more than once.
    fn close(&mut self) -> Result<(), Exception>;
}
