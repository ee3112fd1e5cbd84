//! API operations concerning data sources.

use serde::{Deserialize, Serialize};

use crate::api::{ApiRequest, JsonResponse};

/// A database or other backend that queries can run against.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataSource {
    /// The data source ID.
    pub id: i64,
    /// The display name.
    pub name: String,
    /// The kind of backend, such as `pg` or `bigquery`.
    #[serde(rename = "type", default)]
    pub r#type: String,
}

impl JsonResponse for Vec<DataSource> {}

/// List the data sources visible to the API key.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListDataSources;

impl ApiRequest for ListDataSources {
    type Response = Vec<DataSource>;

    fn path(&self) -> String {
        "data_sources".to_string()
    }
}
