pub mod client;
pub mod types;

pub use client::{Action, ApiClient, BASE_ENDPOINT, DASHBOARD_ENDPOINT};
pub use types::{CreateProjectRequest, CreateProjectResponse, DeployVersionRequest, UploadResponse};
