//! Restartable shard download stream.

use super::shard;
use super::types::ShardLocation;
use crate::errors::{ForefrontError, Result};
use ndarray::ArrayD;
use reqwest::Client;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Lazily yields dataset shards, resuming from the local cache.
///
/// The resume state is the explicit `next_index`: a fresh stream over a
/// partially consumed dataset serves already-materialized shards from
/// disk and only then returns to the network. The stream ends at the
/// first shard index the service reports as missing.
#[derive(Debug)]
pub struct ShardStream {
    pub(super) client: Client,
    pub(super) token: String,
    pub(super) base_endpoint: String,
    pub(super) version_id: String,
    pub(super) data_dir: PathBuf,
    pub(super) tar_dir: PathBuf,
    pub(super) next_index: usize,
    pub(super) finished: bool,
}

impl ShardStream {
    /// Resume (or begin) at an explicit shard index.
    pub fn starting_at(mut self, index: usize) -> Self {
        self.next_index = index;
        self
    }

    /// Index the next call to [`next`](Self::next) will produce.
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Produce the next shard, or `None` once the service reports the
    /// index does not exist.
    pub async fn next(&mut self) -> Result<Option<Vec<ArrayD<f32>>>> {
        if self.finished {
            return Ok(None);
        }

        let index = self.next_index;

        // Serve from the local cache when an earlier stream already
        // materialized this shard.
        let shard_dir = self.data_dir.join(index.to_string());
        if shard_dir.is_dir() && shard::has_components(&shard_dir) {
            debug!(index, "Serving shard from local cache");
            let arrays = shard::load_shard_components(&shard_dir)?;
            self.next_index += 1;
            return Ok(Some(arrays));
        }

        // The owning dataset is re-resolved on every fetch; the service
        // offers no direct version-to-dataset lookup.
        let dataset_id = super::scan_for_dataset_id(
            &self.client,
            &self.base_endpoint,
            &self.token,
            &self.version_id,
        )
        .await?;

        let endpoint = format!(
            "{}/datasets/{}/versions/{}/data/{}",
            self.base_endpoint, dataset_id, self.version_id, index
        );
        let response = self
            .client
            .get(&endpoint)
            .header("Authorization", &self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            info!(index, "Finished getting data");
            self.finished = true;
            return Ok(None);
        }

        let location: ShardLocation = response
            .json()
            .await
            .map_err(|e| ForefrontError::MalformedResponse(e.to_string()))?;

        // Pull the archive itself from storage; that URL is pre-signed
        // and takes no Authorization header.
        let data = self.client.get(&location.url).send().await?.bytes().await?;

        fs::create_dir_all(&self.tar_dir)?;
        let archive_path = self.tar_dir.join(format!("{}.tar.gz", index));
        fs::write(&archive_path, &data)?;

        shard::extract_archive(&archive_path, &shard_dir)?;
        let arrays = shard::load_shard_components(&shard_dir)?;

        debug!(index, components = arrays.len(), "Downloaded shard");
        self.next_index += 1;
        Ok(Some(arrays))
    }
}
