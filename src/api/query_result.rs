//! API operations concerning stored query results.

use serde::Deserialize;

use crate::api::{ApiRequest, JsonResponse};

/// A column in a query result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Column {
    /// The column name, used as the key in each row.
    pub name: String,
    /// The display name.
    pub friendly_name: String,
    /// The declared type, such as `integer`, `float` or `string`. The service
    /// leaves this empty when it cannot tell.
    #[serde(rename = "type", default)]
    pub r#type: Option<String>,
}

/// A row in a query result, keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// The tabular payload of a query result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryData {
    /// Columns, in declared order.
    pub columns: Vec<Column>,
    /// Rows, in result order.
    #[serde(default)]
    pub rows: Vec<Row>,
}

/// The stored output of a completed query.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResult {
    /// The result ID.
    pub id: i64,
    /// The query text that produced the result.
    #[serde(default)]
    pub query: String,
    /// How long the query took, in seconds.
    #[serde(default)]
    pub runtime: Option<f64>,
    /// The data itself.
    pub data: QueryData,
}

/// The envelope the service wraps query results in.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResultResponse {
    /// The result.
    pub query_result: QueryResult,
}

impl JsonResponse for QueryResultResponse {}

/// Load a query result by ID.
#[derive(Debug, Clone, Copy)]
pub struct GetQueryResult {
    /// The result ID.
    pub id: i64,
}

impl ApiRequest for GetQueryResult {
    type Response = QueryResultResponse;

    fn path(&self) -> String {
        format!("query_results/{}", self.id)
    }
}
