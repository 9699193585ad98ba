//! Transaction adapter.
//!
//! A [`TxAdapter`] only exists for the duration of a [`Db::transaction`]
//! callback. Commit and rollback stay with the connection adapter.
//!
//! [`Db::transaction`]: crate::db::Db::transaction

use crate::context::Context;
use crate::db::adapter::{exec_with, query_row_with, query_with};
use crate::db::capability::Tx;
use crate::db::rows::{ResultAdapter, RowAdapter, RowsAdapter};
use crate::error::Exception;
use crate::models::QueryParam;
use async_trait::async_trait;
use sqlx::{Any, Transaction};
use tracing::{Instrument, debug_span};

/// Implements [`Tx`] on top of an open driver transaction.
pub struct TxAdapter {
    tx: Transaction<'static, Any>,
}

impl std::fmt::Debug for TxAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxAdapter").finish_non_exhaustive()
    }
}

impl TxAdapter {
    pub(crate) fn new(tx: Transaction<'static, Any>) -> Self {
        Self { tx }
    }

    pub(crate) fn into_inner(self) -> Transaction<'static, Any> {
        self.tx
    }
}

#[async_trait]
impl Tx for TxAdapter {
    type ExecResult = ResultAdapter;
    type Rows = RowsAdapter;
    type Row = RowAdapter;

    async fn exec_context(
        &mut self,
        ctx: &Context,
        query_id: &str,
        query: &str,
        args: &[QueryParam],
    ) -> Result<ResultAdapter, Exception> {
        let span = debug_span!("sql", level = "tx", operation = "exec_context", query_id = %query_id);
        exec_with(&mut *self.tx, ctx, query, args)
            .instrument(span)
            .await
    }

    async fn query_context(
        &mut self,
        ctx: &Context,
        query_id: &str,
        query: &str,
        args: &[QueryParam],
    ) -> Result<RowsAdapter, Exception> {
        let span = debug_span!("sql", level = "tx", operation = "query_context", query_id = %query_id);
        query_with(&mut *self.tx, ctx, query, args)
            .instrument(span)
            .await
    }

    async fn query_row_context(
        &mut self,
        ctx: &Context,
        query_id: &str,
        query: &str,
        args: &[QueryParam],
    ) -> RowAdapter {
        let span = debug_span!("sql", level = "tx", operation = "query_row_context", query_id = %query_id);
        query_row_with(&mut *self.tx, ctx, query, args)
            .instrument(span)
            .await
    }
}
