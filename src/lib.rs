//! Client library for the Forefront model-deployment service.
//!
//! Authenticates a user, uploads serialized model artifacts and datasets,
//! and issues REST calls to create projects, deploy model versions, and
//! manage datasets.
//!
//! ## Overview
//!
//! - [`StateStore`] persists the credential token and the session context
//!   (project id, organization id, default dataset id) as one flat file
//!   per key under `~/.forefront`.
//! - [`ApiClient`] is the thin transport for the project API.
//! - [`Deployer`] maps a "deploy this model" intent to the right upload,
//!   conversion, and API-call sequence, dispatching on [`ModelKind`] with
//!   converters registered in a [`ConverterRegistry`].
//! - [`DatasetsClient`] moves array data in fixed-size batches and serves
//!   downloads through the restartable [`ShardStream`].
//! - [`InferenceClient`] calls a deployed endpoint directly.
//!
//! ## Example
//!
//! ```no_run
//! use forefront::{ApiClient, ConverterRegistry, DeployRequest, Deployer, StateStore};
//!
//! # async fn run() -> forefront::Result<()> {
//! let state = StateStore::new()?;
//! let api = ApiClient::new(state.get_token(), state.get_project_id(), None)?;
//! let registry = ConverterRegistry::new();
//!
//! let deployer = Deployer::new(&api, &state, &registry);
//! deployer
//!     .deploy(DeployRequest::from_path("my-model", "model.onnx"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod datasets;
pub mod deploy;
pub mod errors;
pub mod inference;
pub mod logging;
pub mod prompt;
pub mod state;

pub use api::{Action, ApiClient};
pub use datasets::{DatasetsClient, ShardStream, UploadOptions, UploadReport};
pub use deploy::{
    ConvertOptions, Converter, ConverterRegistry, DeployRequest, Deployer, ModelArtifact,
    ModelKind, ModelSource,
};
pub use errors::{ForefrontError, Result};
pub use inference::InferenceClient;
pub use logging::init_logging;
pub use prompt::{ensure_token, Prompt, StdinPrompt};
pub use state::StateStore;
