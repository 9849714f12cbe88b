//! Model deployment dispatch.
//!
//! Decides how a model artifact reaches the service and drives it there:
//! pre-exported file upload, framework-specific conversion, or generic
//! custom serialization. The decision is a linear first-match list: a
//! filesystem path always wins, then an explicit kind tag, then a
//! best-effort kind inferred from the model's runtime type name.

mod converter;

pub use converter::{ConvertOptions, Converter, ConverterRegistry, ModelArtifact, ModelKind};

use crate::api::types::DeployVersionRequest;
use crate::api::{Action, ApiClient};
use crate::errors::{ForefrontError, Result};
use crate::state::StateStore;
use ndarray::ArrayD;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Name of the interchange-format file a converter produces.
const ARTIFACT_FILE: &str = "model.onnx";

/// Name of the generically serialized custom model file.
const CUSTOM_MODEL_FILE: &str = "model.cbor";

/// Reference to the model being deployed.
pub enum ModelSource {
    /// Path to a pre-exported artifact on disk.
    Path(PathBuf),
    /// In-memory model object.
    Object(Box<dyn ModelArtifact>),
}

/// One deployment intent. Transient; lives for the duration of one
/// `deploy` call.
pub struct DeployRequest {
    pub name: String,
    pub description: Option<String>,
    pub model: ModelSource,
    /// Explicit model kind; skips runtime inference when set.
    pub kind: Option<ModelKind>,
    /// Input tensor shape for shape-inferring frameworks.
    pub input_shape: Option<Vec<Option<u64>>>,
    /// Sample input for trace-based frameworks.
    pub sample_input: Option<ArrayD<f32>>,
}

impl DeployRequest {
    /// Deployment of a pre-exported artifact already on disk.
    pub fn from_path(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            description: None,
            model: ModelSource::Path(path.into()),
            kind: None,
            input_shape: None,
            sample_input: None,
        }
    }

    /// Deployment of an in-memory model object.
    pub fn from_object(name: impl Into<String>, model: Box<dyn ModelArtifact>) -> Self {
        Self {
            name: name.into(),
            description: None,
            model: ModelSource::Object(model),
            kind: None,
            input_shape: None,
            sample_input: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_kind(mut self, kind: ModelKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_input_shape(mut self, shape: Vec<Option<u64>>) -> Self {
        self.input_shape = Some(shape);
        self
    }

    pub fn with_sample_input(mut self, input: ArrayD<f32>) -> Self {
        self.sample_input = Some(input);
        self
    }
}

/// Drives a deployment intent to completion against the service.
///
/// Context (API client, state store, converter registry) is injected at
/// construction; the dispatcher holds no global state.
pub struct Deployer<'a> {
    api: &'a ApiClient,
    state: &'a StateStore,
    registry: &'a ConverterRegistry,
    artifact_dir: PathBuf,
}

impl<'a> Deployer<'a> {
    pub fn new(api: &'a ApiClient, state: &'a StateStore, registry: &'a ConverterRegistry) -> Self {
        Self {
            api,
            state,
            registry,
            // Interchange artifacts land in the working directory and are
            // left behind for inspection.
            artifact_dir: PathBuf::from("."),
        }
    }

    /// Write interchange artifacts somewhere other than the working
    /// directory.
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    /// Deploy a model version. First match wins: filesystem path, then
    /// explicit kind, then kind inferred from the runtime type name.
    pub async fn deploy(&self, request: DeployRequest) -> Result<()> {
        match &request.model {
            ModelSource::Path(path) => {
                let path = path.clone();
                self.deploy_pre_exported(&path, &request).await
            }
            ModelSource::Object(model) => {
                let kind = match request.kind {
                    Some(kind) => kind,
                    None => {
                        ModelKind::infer_from_type_name(model.type_name()).ok_or_else(|| {
                            ForefrontError::Config(
                                "Can't infer the type of model! Try specifying your model type"
                                    .to_string(),
                            )
                        })?
                    }
                };

                validate(kind, &request)?;

                match kind {
                    ModelKind::Custom => self.deploy_custom(model.as_ref(), &request).await,
                    kind => self.deploy_converted(kind, model.as_ref(), &request).await,
                }
            }
        }
    }

    /// Upload a pre-exported artifact; ship handler and requirements
    /// alongside it when both exist at their well-known per-project paths.
    async fn deploy_pre_exported(&self, path: &Path, request: &DeployRequest) -> Result<()> {
        info!(path = %path.display(), "Uploading the file you specified");
        let url = self.api.upload_file(path).await?;

        let handler = self.state.handler_path(self.api.project_id());
        let requirements = self.state.requirements_path(self.api.project_id());

        let (handler_url, requirements_url, is_custom) =
            if handler.is_file() && requirements.is_file() {
                let handler_url = self.api.upload_file(&handler).await?;
                let requirements_url = self.api.upload_file(&requirements).await?;
                (Some(handler_url), Some(requirements_url), Some(true))
            } else {
                info!("No handler or requirements staged; assuming a simple framework artifact");
                (None, None, None)
            };

        self.issue_deploy(url, handler_url, requirements_url, is_custom, request)
            .await
    }

    /// Convert with the kind's registered converter, then upload + deploy.
    async fn deploy_converted(
        &self,
        kind: ModelKind,
        model: &dyn ModelArtifact,
        request: &DeployRequest,
    ) -> Result<()> {
        let converter = self.registry.get(kind)?;

        let options = ConvertOptions {
            input_shape: request.input_shape.clone(),
            sample_input: request.sample_input.clone(),
        };

        let artifact = self.artifact_dir.join(ARTIFACT_FILE);
        info!(kind = %kind, path = %artifact.display(), "Converting model");
        converter
            .convert(model, &options, &artifact)
            .map_err(wrap_unexpected)?;

        let url = self.api.upload_file(&artifact).await.map_err(wrap_unexpected)?;
        self.issue_deploy(url, None, None, None, request)
            .await
            .map_err(wrap_unexpected)
    }

    /// Serialize the model generically and ship the bytes as-is.
    async fn deploy_custom(
        &self,
        model: &dyn ModelArtifact,
        request: &DeployRequest,
    ) -> Result<()> {
        info!("Serializing model to a portable format");
        let bytes = model.portable_bytes()?;

        fs::create_dir_all(self.state.root())?;
        let path = self.state.root().join(CUSTOM_MODEL_FILE);
        fs::write(&path, &bytes)?;

        let url = self.api.upload_file(&path).await?;
        self.issue_deploy(url, None, None, None, request).await
    }

    async fn issue_deploy(
        &self,
        file_url: String,
        handler: Option<String>,
        requirements: Option<String>,
        is_custom: Option<bool>,
        request: &DeployRequest,
    ) -> Result<()> {
        let body = DeployVersionRequest {
            title: request.name.clone(),
            description: request.description.clone(),
            file: file_url,
            org_id: self.api.organization_id().map(str::to_string),
            endpoint_id: self.api.project_id().to_string(),
            handler,
            requirements,
            is_custom,
        };
        let body =
            serde_json::to_value(&body).map_err(|e| ForefrontError::Serialization(e.to_string()))?;

        self.api.request(Action::Deploy, Some(&body)).await?;

        info!("Deployed successfully!");
        info!(dashboard = %self.api.dashboard_url(), "Version is live");
        Ok(())
    }
}

/// Per-kind required parameters, checked before any conversion or
/// network work.
fn validate(kind: ModelKind, request: &DeployRequest) -> Result<()> {
    match kind {
        ModelKind::Pytorch if request.sample_input.is_none() => Err(ForefrontError::Config(
            "Must include sample input data for a pytorch model!".to_string(),
        )),
        ModelKind::Sklearn
            if request.input_shape.as_ref().is_none_or(|s| s.is_empty()) =>
        {
            Err(ForefrontError::Config(
                "Must include a valid input shape for an sklearn model!".to_string(),
            ))
        }
        _ => Ok(()),
    }
}

fn wrap_unexpected(e: ForefrontError) -> ForefrontError {
    match e {
        e @ (ForefrontError::Dependency { .. } | ForefrontError::Config(_)) => e,
        e => ForefrontError::Unexpected { source: Box::new(e) },
    }
}
