use serde::{Deserialize, Serialize};

/// Body for creating a dataset or a dataset version
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatasetRequest {
    pub name: String,
    pub description: Option<String>,
    pub org_id: String,
}

/// Response to dataset version creation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVersionResponse {
    pub dataset_version_id: String,
}

/// One dataset row as listed by the service.
///
/// The service sometimes returns rows without an id or name; those
/// deserialize as `None` and get skipped by the listing.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetSummary {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
}

/// One dataset version row as listed by the service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetVersionSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub dataset_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub created_at: Option<String>,
}

/// Storage location of one remote shard archive
#[derive(Debug, Clone, Deserialize)]
pub struct ShardLocation {
    pub url: String,
}

/// Response to a shard archive upload; `file` is the hosted URL.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadDataResponse {
    pub file: String,
}
