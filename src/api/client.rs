use crate::api::types::{CreateProjectRequest, CreateProjectResponse, UploadResponse};
use crate::errors::{ForefrontError, Result};
use reqwest::{multipart, Client, Method};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// Base URL of the project API.
pub const BASE_ENDPOINT: &str = "https://api.app.tryforefront.com/api";

/// Base URL of the web dashboard.
pub const DASHBOARD_ENDPOINT: &str = "https://app.tryforefront.com/endpoints";

/// Logical actions the project API understands.
///
/// Each action resolves to a fixed HTTP method and path suffix, so an
/// unknown action is unrepresentable rather than a runtime lookup failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateProject,
    GetVersions,
    Deploy,
    Upload,
    GetProjects,
}

impl Action {
    pub fn method(self) -> Method {
        match self {
            Action::CreateProject | Action::Deploy | Action::Upload => Method::POST,
            Action::GetVersions | Action::GetProjects => Method::GET,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Action::CreateProject | Action::GetProjects => "endpoints",
            Action::GetVersions | Action::Deploy => "versions",
            Action::Upload => "upload",
        }
    }
}

/// Thin transport for the project API.
///
/// Holds the bearer token, project id, and optional organization id; the
/// raw token goes in the Authorization header. Intentionally does no
/// retrying and no status validation; response handling belongs to the
/// caller.
pub struct ApiClient {
    client: Client,
    base_endpoint: String,
    token: String,
    project_id: String,
    organization_id: Option<String>,
}

impl ApiClient {
    /// Create a new client against the production API.
    ///
    /// Succeeds even with an empty token; the first authenticated call
    /// will surface the rejection instead.
    pub fn new(
        token: impl Into<String>,
        project_id: impl Into<String>,
        organization_id: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build().map_err(ForefrontError::Http)?,
            base_endpoint: BASE_ENDPOINT.to_string(),
            token: token.into(),
            project_id: project_id.into(),
            organization_id,
        })
    }

    /// Point the client at a different base endpoint (tests, staging).
    pub fn with_base_endpoint(mut self, base: impl Into<String>) -> Self {
        self.base_endpoint = base.into();
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn organization_id(&self) -> Option<&str> {
        self.organization_id.as_deref()
    }

    /// Full URL for an action.
    pub fn endpoint(&self, action: Action) -> String {
        format!("{}/{}", self.base_endpoint, action.path())
    }

    /// Dashboard URL of this client's project.
    pub fn dashboard_url(&self) -> String {
        format!("{}/{}", DASHBOARD_ENDPOINT, self.project_id)
    }

    /// Issue `action` with an optional JSON body and decode the JSON reply.
    pub async fn request(&self, action: Action, body: Option<&Value>) -> Result<Value> {
        let url = self.endpoint(action);
        debug!(action = ?action, url = %url, "Issuing API request");

        let mut request = self
            .client
            .request(action.method(), &url)
            .header("Authorization", &self.token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        response
            .json()
            .await
            .map_err(|e| ForefrontError::MalformedResponse(e.to_string()))
    }

    /// Create a project and return its id.
    pub async fn create_project(&self, name: &str, description: Option<&str>) -> Result<String> {
        let body = CreateProjectRequest {
            title: name.to_string(),
            description: description.map(str::to_string),
            org_id: self.organization_id.clone(),
        };
        let body =
            serde_json::to_value(&body).map_err(|e| ForefrontError::Serialization(e.to_string()))?;

        let response = self.request(Action::CreateProject, Some(&body)).await?;
        let parsed: CreateProjectResponse = serde_json::from_value(response)
            .map_err(|e| ForefrontError::MalformedResponse(e.to_string()))?;

        Ok(parsed.endpoint_id)
    }

    /// List versions of this client's project.
    pub async fn get_versions(&self) -> Result<Value> {
        self.request(Action::GetVersions, None).await
    }

    /// List projects visible to this token.
    pub async fn get_projects(&self) -> Result<Value> {
        self.request(Action::GetProjects, None).await
    }

    /// Send the file at `path` as multipart form data; returns the hosted
    /// URL from the response.
    pub async fn upload_file(&self, path: &Path) -> Result<String> {
        info!(path = %path.display(), "Uploading file");

        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let form =
            multipart::Form::new().part("file", multipart::Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(self.endpoint(Action::Upload))
            .header("Authorization", &self.token)
            .multipart(form)
            .send()
            .await?;

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| ForefrontError::MalformedResponse(e.to_string()))?;

        Ok(parsed.image)
    }
}
