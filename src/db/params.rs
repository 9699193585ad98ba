//! Parameter binding utilities for database queries.
//!
//! Binds `QueryParam` values onto `Any` driver queries so the same argument list
//! works against every supported backend.

use crate::models::QueryParam;
use sqlx::Any;
use sqlx::any::AnyArguments;
use sqlx::query::Query;

/// Bind a parameter to a query.
pub(crate) fn bind_param<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    param: &'q QueryParam,
) -> Query<'q, Any, AnyArguments<'q>> {
    match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
        QueryParam::Bytes(v) => query.bind(v.as_slice()),
    }
}

/// Prepare `sql` with every parameter bound in order.
pub(crate) fn prepare<'q>(sql: &'q str, params: &'q [QueryParam]) -> Query<'q, Any, AnyArguments<'q>> {
    params
        .iter()
        .fold(sqlx::query(sql), |query, param| bind_param(query, param))
}
