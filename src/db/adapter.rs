//! Connection adapter.
//!
//! [`DbAdapter`] wraps a physical connection pool and implements [`Db`]. Every
//! driver call is raced against the caller's [`Context`] and every driver
//! error goes through [`classify`](crate::db::classify).
//!
//! The statement helpers in this module are shared with the transaction
//! adapter; they are generic over the sqlx executor so the pool and an open
//! transaction run the exact same code.

use crate::context::Context;
use crate::db::capability::Db;
use crate::db::classify::{classify, settle, unexpected};
use crate::db::params::prepare;
use crate::db::rows::{ResultAdapter, RowAdapter, RowsAdapter};
use crate::db::transaction::TxAdapter;
use crate::error::Exception;
use crate::models::QueryParam;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use futures_util::{Stream, StreamExt};
use sqlx::any::AnyRow;
use sqlx::{Any, AnyPool, Connection, Executor};
use std::time::Instant;
use tracing::{Instrument, debug, debug_span, warn};

/// Implements [`Db`] on top of a shared pool handle.
///
/// Cloning is cheap; clones share the same physical pool.
#[derive(Debug, Clone)]
pub struct DbAdapter {
    pool: AnyPool,
}

impl DbAdapter {
    /// Adapt an already opened pool.
    pub fn adapt(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// The physical connection this adapter runs on.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

#[async_trait]
impl Db for DbAdapter {
    type ExecResult = ResultAdapter;
    type Rows = RowsAdapter;
    type Row = RowAdapter;
    type Tx = TxAdapter;

    async fn ping(&self, ctx: &Context) -> Result<(), Exception> {
        let span = debug_span!("sql", level = "db", operation = "ping");
        let outcome = ctx
            .run(async {
                let mut conn = self.pool.acquire().await?;
                conn.ping().await
            })
            .instrument(span)
            .await;
        settle(outcome, unexpected)
    }

    async fn exec_context(
        &self,
        ctx: &Context,
        query_id: &str,
        query: &str,
        args: &[QueryParam],
    ) -> Result<ResultAdapter, Exception> {
        let span = debug_span!("sql", level = "db", operation = "exec_context", query_id = %query_id);
        exec_with(&self.pool, ctx, query, args).instrument(span).await
    }

    async fn query_context(
        &self,
        ctx: &Context,
        query_id: &str,
        query: &str,
        args: &[QueryParam],
    ) -> Result<RowsAdapter, Exception> {
        let span = debug_span!("sql", level = "db", operation = "query_context", query_id = %query_id);
        query_with(&self.pool, ctx, query, args).instrument(span).await
    }

    async fn query_row_context(
        &self,
        ctx: &Context,
        query_id: &str,
        query: &str,
        args: &[QueryParam],
    ) -> RowAdapter {
        let span = debug_span!("sql", level = "db", operation = "query_row_context", query_id = %query_id);
        query_row_with(&self.pool, ctx, query, args)
            .instrument(span)
            .await
    }

    async fn transaction<F, T>(
        &self,
        ctx: &Context,
        transaction_key: &str,
        f: F,
    ) -> Result<T, Exception>
    where
        F: for<'t> FnOnce(&'t mut TxAdapter) -> BoxFuture<'t, Result<T, Exception>> + Send,
        T: Send,
    {
        let span = debug_span!("sql", level = "db", operation = "transaction", transaction_key = %transaction_key);
        async move {
            let tx = settle(ctx.run(self.pool.begin()).await, unexpected)?;
            let mut adapter = TxAdapter::new(tx);

            match f(&mut adapter).await {
                Err(exc) => {
                    // The callback's exception explains the outcome; rollback
                    // failures are only logged.
                    match ctx.run(adapter.into_inner().rollback()).await {
                        Ok(Ok(())) => debug!("Transaction rolled back"),
                        Ok(Err(err)) => warn!(error = %err, "Rollback failed"),
                        Err(err) => warn!(error = %err, "Rollback interrupted by context"),
                    }
                    Err(exc)
                }
                Ok(value) => {
                    // A failed or interrupted commit drops the transaction,
                    // which makes the driver roll it back on the connection.
                    settle(ctx.run(adapter.into_inner().commit()).await, unexpected)
                        .inspect_err(|exc| warn!(error = %exc, "Commit failed, transaction rolled back"))?;
                    debug!("Transaction committed");
                    Ok(value)
                }
            }
        }
        .instrument(span)
        .await
    }
}

pub(crate) async fn exec_with<'c, E>(
    executor: E,
    ctx: &Context,
    query: &str,
    args: &[QueryParam],
) -> Result<ResultAdapter, Exception>
where
    E: Executor<'c, Database = Any>,
{
    let start = Instant::now();
    let outcome = ctx.run(prepare(query, args).execute(executor)).await;
    let result = settle(outcome, unexpected).map(ResultAdapter::from);
    debug!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        ok = result.is_ok(),
        "Executed statement"
    );
    result
}

pub(crate) async fn query_with<'c, E>(
    executor: E,
    ctx: &Context,
    query: &str,
    args: &[QueryParam],
) -> Result<RowsAdapter, Exception>
where
    E: Executor<'c, Database = Any>,
{
    let start = Instant::now();
    let outcome = ctx.run(gather(prepare(query, args).fetch(executor))).await;
    let rows = settle(outcome, classify);
    debug!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        rows = rows.as_ref().map(RowsAdapter::remaining).unwrap_or_default(),
        "Executed query"
    );
    rows
}

pub(crate) async fn query_row_with<'c, E>(
    executor: E,
    ctx: &Context,
    query: &str,
    args: &[QueryParam],
) -> RowAdapter
where
    E: Executor<'c, Database = Any>,
{
    let outcome = ctx.run(prepare(query, args).fetch_optional(executor)).await;
    RowAdapter::new(settle(outcome, classify))
}

/// Buffer a row stream.
///
/// An error before the first row fails the query itself; an error after it is
/// kept on the cursor and reported by `Rows::err`.
async fn gather<S>(mut stream: S) -> Result<RowsAdapter, sqlx::Error>
where
    S: Stream<Item = Result<AnyRow, sqlx::Error>> + Unpin,
{
    let mut rows = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(row) => rows.push(row),
            Err(err) if rows.is_empty() => return Err(err),
            Err(err) => return Ok(RowsAdapter::new(rows, Some(err))),
        }
    }
    Ok(RowsAdapter::new(rows, None))
}
