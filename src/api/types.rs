use serde::{Deserialize, Serialize};

/// Body for creating a project
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: Option<String>,
    pub org_id: Option<String>,
}

/// Response to project creation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectResponse {
    pub endpoint_id: String,
}

/// Body for deploying a model version
///
/// The handler/requirements/isCustom fields only appear on pre-exported
/// artifact deployments that ship a custom serving handler.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployVersionRequest {
    pub title: String,
    pub description: Option<String>,
    pub file: String,
    pub org_id: Option<String>,
    pub endpoint_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_custom: Option<bool>,
}

/// Response to a multipart file upload; `image` is the hosted URL.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub image: String,
}
