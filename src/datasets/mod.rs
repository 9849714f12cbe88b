//! Dataset transfer against the versioning API.
//!
//! Moves array-shaped data between local disk and the remote service in
//! fixed-size batches: shards stage as component files, bundle into
//! gzip-compressed tars every `batch_size` shards, and ship as multipart
//! uploads. Downloads run through a restartable [`ShardStream`].

pub mod shard;

mod download;
mod types;

pub use download::ShardStream;
pub use types::{
    CreateDatasetRequest, CreateVersionResponse, DatasetSummary, DatasetVersionSummary,
    ShardLocation, UploadDataResponse,
};

use crate::errors::{ForefrontError, Result};
use crate::prompt::Prompt;
use crate::state::StateStore;
use ndarray::ArrayD;
use reqwest::{multipart, Client};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Base URL of the dataset-versioning API.
pub const DATASETS_ENDPOINT: &str = "https://live-server.forefront.link/api";

/// How many shards accumulate before one group archive is built.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Options for a dataset upload.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Shards per group archive.
    pub batch_size: usize,
    /// Also ship the trailing partial batch instead of dropping it.
    ///
    /// Historically the tail below the batch threshold was discarded;
    /// leaving this off preserves that behavior.
    pub flush_partial: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            flush_partial: false,
        }
    }
}

/// Outcome of a dataset upload.
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub dataset_id: String,
    pub version_id: String,
    /// Shards consumed from the source.
    pub shards: usize,
    /// Group archives actually shipped.
    pub archives: usize,
}

/// Client for the dataset-versioning API.
///
/// Identity and scope come from the injected state store; this endpoint
/// family takes the raw token in the Authorization header.
pub struct DatasetsClient {
    client: Client,
    base_endpoint: String,
    token: String,
    default_dataset: String,
    state: StateStore,
}

impl DatasetsClient {
    pub fn new(state: StateStore) -> Result<Self> {
        let token = state.get_token();
        let default_dataset = state.get_default_dataset();

        Ok(Self {
            client: Client::builder().build().map_err(ForefrontError::Http)?,
            base_endpoint: DATASETS_ENDPOINT.to_string(),
            token,
            default_dataset,
            state,
        })
    }

    /// Point the client at a different base endpoint (tests, staging).
    pub fn with_base_endpoint(mut self, base: impl Into<String>) -> Self {
        self.base_endpoint = base.into();
        self
    }

    pub fn default_dataset(&self) -> &str {
        &self.default_dataset
    }

    /// Select the default dataset, clearing locally cached shards when
    /// the selection actually changes.
    pub fn set_default_dataset(&mut self, dataset_id: &str) -> Result<()> {
        if dataset_id == self.default_dataset {
            info!(dataset = %dataset_id, "Dataset is already selected");
            return Ok(());
        }

        self.state.set_default_dataset(dataset_id)?;
        self.default_dataset = dataset_id.to_string();

        // Cached shards are keyed by index only and belong to the
        // previous selection.
        self.state.reset_data_dirs()?;
        Ok(())
    }

    /// Create a dataset; returns the HTTP status code the service
    /// answered with.
    pub async fn create_dataset(
        &self,
        name: &str,
        description: Option<&str>,
        org_id: &str,
    ) -> Result<u16> {
        self.state.reset_data_dirs()?;

        let body = CreateDatasetRequest {
            name: name.to_string(),
            description: description.map(str::to_string),
            org_id: org_id.to_string(),
        };
        let response = self
            .client
            .post(format!("{}/datasets", self.base_endpoint))
            .header("Authorization", &self.token)
            .json(&body)
            .send()
            .await?;

        Ok(response.status().as_u16())
    }

    /// List datasets visible to this token. Rows the service returns
    /// without an id or name are skipped.
    pub async fn list_datasets(&self) -> Result<Vec<DatasetSummary>> {
        let response = self
            .client
            .get(format!("{}/datasets", self.base_endpoint))
            .header("Authorization", &self.token)
            .send()
            .await?;

        let rows: Vec<DatasetSummary> = response
            .json()
            .await
            .map_err(|e| ForefrontError::MalformedResponse(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter(|row| row.id.is_some() && row.name.is_some())
            .collect())
    }

    /// List versions of `dataset`, falling back to the default dataset.
    pub async fn list_dataset_versions(
        &self,
        dataset: Option<&str>,
    ) -> Result<Vec<DatasetVersionSummary>> {
        let dataset_id = self.dataset_or_default(dataset)?;

        let response = self
            .client
            .get(self.versions_endpoint(&dataset_id))
            .header("Authorization", &self.token)
            .send()
            .await?;

        response
            .json()
            .await
            .map_err(|e| ForefrontError::MalformedResponse(e.to_string()))
    }

    /// Resolve the dataset owning `version_id` by scanning every dataset
    /// and its versions. Unbounded and uncached; returns `""` when no
    /// dataset claims the version.
    pub async fn resolve_dataset_id(&self, version_id: &str) -> Result<String> {
        scan_for_dataset_id(&self.client, &self.base_endpoint, &self.token, version_id).await
    }

    /// Upload a sequence of shards as a new version of a dataset.
    ///
    /// Shards stage to disk as they are consumed; every `batch_size`
    /// shards the staged files bundle into one archive and ship. With
    /// default options the trailing partial batch is dropped.
    pub async fn upload<I>(
        &mut self,
        name: &str,
        description: Option<&str>,
        shards: I,
        dataset: Option<&str>,
        prompt: &mut dyn Prompt,
        options: UploadOptions,
    ) -> Result<UploadReport>
    where
        I: IntoIterator<Item = Vec<ArrayD<f32>>>,
    {
        if options.batch_size == 0 {
            return Err(ForefrontError::Config(
                "Upload batch size must be at least 1".to_string(),
            ));
        }

        self.state.reset_data_dirs()?;

        let dataset_id = match dataset {
            Some(id) => id.to_string(),
            None if !self.default_dataset.is_empty() => {
                info!("Dataset not specified, using the default dataset");
                self.default_dataset.clone()
            }
            None => {
                let listed = self.list_datasets().await?;
                for row in &listed {
                    info!(
                        id = row.id.as_deref().unwrap_or(""),
                        name = row.name.as_deref().unwrap_or(""),
                        "Available dataset"
                    );
                }
                let chosen =
                    prompt.read_line("Dataset not specified.\nEnter the ID of the dataset to use: ")?;
                if chosen.is_empty() {
                    return Err(ForefrontError::Config("No dataset selected".to_string()));
                }
                self.default_dataset = chosen.clone();
                chosen
            }
        };

        let version_id = self
            .create_dataset_version(&dataset_id, name, description)
            .await?;
        info!(dataset = %dataset_id, version = %version_id, "Created dataset version");

        let upload_dir = self.state.upload_dir()?;
        let mut pending: Vec<PathBuf> = Vec::new();
        let mut archives = 0usize;
        let mut shard_count = 0usize;

        for (index, data) in shards.into_iter().enumerate() {
            let mut component_paths = shard::save_shard_components(&data, index, &upload_dir)?;
            pending.append(&mut component_paths);
            shard_count = index + 1;

            if (index + 1) % options.batch_size == 0 {
                let group = (index + 1) / options.batch_size;
                self.ship_archive(&upload_dir, group, &pending, &dataset_id, &version_id)
                    .await?;
                archives += 1;
                info!(archive = group, shards = shard_count, "Uploaded shard archive");
                pending.clear();
            }
        }

        if !pending.is_empty() {
            if options.flush_partial {
                let group = shard_count / options.batch_size + 1;
                self.ship_archive(&upload_dir, group, &pending, &dataset_id, &version_id)
                    .await?;
                archives += 1;
                info!(archive = group, shards = shard_count, "Uploaded trailing partial archive");
            } else {
                warn!(
                    staged = pending.len(),
                    "Trailing partial batch below the threshold was not uploaded"
                );
            }
            pending.clear();
        }

        Ok(UploadReport {
            dataset_id,
            version_id,
            shards: shard_count,
            archives,
        })
    }

    /// Restartable stream over the shards of a dataset version.
    pub fn shard_stream(&self, version_id: &str) -> Result<ShardStream> {
        if version_id.is_empty() {
            return Err(ForefrontError::Config(
                "Must include a dataset version ID! Get yours from the dashboard".to_string(),
            ));
        }

        Ok(ShardStream {
            client: self.client.clone(),
            token: self.token.clone(),
            base_endpoint: self.base_endpoint.clone(),
            version_id: version_id.to_string(),
            data_dir: self.state.data_dir()?,
            tar_dir: self.state.tar_dir()?,
            next_index: 0,
            finished: false,
        })
    }

    /// Prefetch every remote shard into the local cache without yielding
    /// them; returns how many shards were fetched.
    pub async fn quick_download(&self, version_id: &str) -> Result<usize> {
        let mut stream = self.shard_stream(version_id)?.starting_at(1);

        let mut fetched = 0;
        while stream.next().await?.is_some() {
            fetched += 1;
            info!(fetched, "Downloaded shard");
        }

        Ok(fetched)
    }

    async fn create_dataset_version(
        &self,
        dataset_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<String> {
        let body = CreateDatasetRequest {
            name: name.to_string(),
            description: description.map(str::to_string),
            org_id: self.state.get_org_id(),
        };
        let response = self
            .client
            .post(self.versions_endpoint(dataset_id))
            .header("Authorization", &self.token)
            .json(&body)
            .send()
            .await?;

        let parsed: CreateVersionResponse = response
            .json()
            .await
            .map_err(|e| ForefrontError::MalformedResponse(e.to_string()))?;

        Ok(parsed.dataset_version_id)
    }

    async fn ship_archive(
        &self,
        upload_dir: &Path,
        group: usize,
        paths: &[PathBuf],
        dataset_id: &str,
        version_id: &str,
    ) -> Result<String> {
        let archive = upload_dir.join(format!("{}.tar.gz", group));
        shard::group_archive(paths, &archive)?;
        self.upload_archive(&archive, dataset_id, version_id).await
    }

    async fn upload_archive(
        &self,
        archive: &Path,
        dataset_id: &str,
        version_id: &str,
    ) -> Result<String> {
        let bytes = tokio::fs::read(archive).await?;
        let file_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "data.tar.gz".to_string());
        let form =
            multipart::Form::new().part("file", multipart::Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(self.data_endpoint(dataset_id, version_id))
            .header("Authorization", &self.token)
            .multipart(form)
            .send()
            .await?;

        let parsed: UploadDataResponse = response
            .json()
            .await
            .map_err(|e| ForefrontError::MalformedResponse(e.to_string()))?;

        Ok(parsed.file)
    }

    fn dataset_or_default(&self, dataset: Option<&str>) -> Result<String> {
        match dataset {
            Some(id) => Ok(id.to_string()),
            None if !self.default_dataset.is_empty() => {
                info!("Dataset not specified, using the default dataset");
                Ok(self.default_dataset.clone())
            }
            None => Err(ForefrontError::Config(
                "Dataset not specified and no default dataset is selected".to_string(),
            )),
        }
    }

    fn versions_endpoint(&self, dataset_id: &str) -> String {
        format!("{}/datasets/{}/versions", self.base_endpoint, dataset_id)
    }

    fn data_endpoint(&self, dataset_id: &str, version_id: &str) -> String {
        format!(
            "{}/datasets/{}/versions/{}/data",
            self.base_endpoint, dataset_id, version_id
        )
    }
}

/// Find the dataset owning `version_id` by walking `/datasets` and each
/// dataset's `/versions` listing. O(datasets × versions) per call.
pub(crate) async fn scan_for_dataset_id(
    client: &Client,
    base_endpoint: &str,
    token: &str,
    version_id: &str,
) -> Result<String> {
    let response = client
        .get(format!("{}/datasets", base_endpoint))
        .header("Authorization", token)
        .send()
        .await?;
    let datasets: Vec<DatasetSummary> = response
        .json()
        .await
        .map_err(|e| ForefrontError::MalformedResponse(e.to_string()))?;

    for dataset in datasets {
        let Some(dataset_id) = dataset.id else {
            continue;
        };

        let response = client
            .get(format!("{}/datasets/{}/versions", base_endpoint, dataset_id))
            .header("Authorization", token)
            .send()
            .await?;
        let versions: Vec<DatasetVersionSummary> = response
            .json()
            .await
            .map_err(|e| ForefrontError::MalformedResponse(e.to_string()))?;

        if versions.iter().any(|version| version.id == version_id) {
            return Ok(dataset_id);
        }
    }

    Ok(String::new())
}
