//! Batch-upload and resumable-download tests against a mock service.

use forefront::datasets::shard;
use forefront::{DatasetsClient, ForefrontError, Prompt, Result, StateStore, UploadOptions};
use ndarray::ArrayD;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct CannedPrompt(Vec<String>);

impl Prompt for CannedPrompt {
    fn read_line(&mut self, _message: &str) -> Result<String> {
        Ok(self.0.remove(0))
    }
}

fn no_prompt() -> CannedPrompt {
    CannedPrompt(Vec::new())
}

fn sample_shard(seed: f32) -> Vec<ArrayD<f32>> {
    vec![
        ArrayD::from_shape_vec(vec![2, 2], vec![seed, seed + 1.0, seed + 2.0, seed + 3.0]).unwrap(),
        ArrayD::from_elem(vec![1], seed),
    ]
}

async fn upload_harness() -> (MockServer, TempDir) {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/datasets/ds-1/versions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"datasetVersionId": "v-1"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/datasets/ds-1/versions/v-1/data"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"file": "https://cdn/1.tar.gz"})),
        )
        .mount(&server)
        .await;

    (server, TempDir::new().unwrap())
}

fn client(server: &MockServer, root: &TempDir) -> DatasetsClient {
    let state = StateStore::with_root(root.path().join(".forefront"));
    state.set_token("tok-123").unwrap();
    state.set_org_id("org-1").unwrap();

    DatasetsClient::new(state)
        .unwrap()
        .with_base_endpoint(format!("{}/api", server.uri()))
}

async fn data_uploads(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|req| req.url.path() == "/api/datasets/ds-1/versions/v-1/data")
        .count()
}

#[tokio::test]
async fn test_exact_batch_produces_exactly_one_archive() {
    let (server, root) = upload_harness().await;
    let mut datasets = client(&server, &root);

    let shards: Vec<_> = (0..4).map(|i| sample_shard(i as f32)).collect();
    let report = datasets
        .upload(
            "train",
            None,
            shards,
            Some("ds-1"),
            &mut no_prompt(),
            UploadOptions {
                batch_size: 4,
                flush_partial: false,
            },
        )
        .await
        .unwrap();

    assert_eq!(report.shards, 4);
    assert_eq!(report.archives, 1);
    assert_eq!(data_uploads(&server).await, 1);
}

#[tokio::test]
async fn test_below_threshold_batch_is_dropped() {
    let (server, root) = upload_harness().await;
    let mut datasets = client(&server, &root);

    let shards: Vec<_> = (0..3).map(|i| sample_shard(i as f32)).collect();
    let report = datasets
        .upload(
            "train",
            None,
            shards,
            Some("ds-1"),
            &mut no_prompt(),
            UploadOptions {
                batch_size: 4,
                flush_partial: false,
            },
        )
        .await
        .unwrap();

    // Documents the drop-last-partial-batch contract.
    assert_eq!(report.shards, 3);
    assert_eq!(report.archives, 0);
    assert_eq!(data_uploads(&server).await, 0);
}

#[tokio::test]
async fn test_flush_partial_ships_the_tail() {
    let (server, root) = upload_harness().await;
    let mut datasets = client(&server, &root);

    let shards: Vec<_> = (0..5).map(|i| sample_shard(i as f32)).collect();
    let report = datasets
        .upload(
            "train",
            None,
            shards,
            Some("ds-1"),
            &mut no_prompt(),
            UploadOptions {
                batch_size: 4,
                flush_partial: true,
            },
        )
        .await
        .unwrap();

    assert_eq!(report.shards, 5);
    assert_eq!(report.archives, 2);
    assert_eq!(data_uploads(&server).await, 2);
}

#[tokio::test]
async fn test_upload_prompts_for_dataset_when_none_configured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/datasets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"_id": "ds-1", "name": "mnist", "createdAt": "2024-01-01"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/datasets/ds-1/versions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"datasetVersionId": "v-1"})),
        )
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    let mut datasets = client(&server, &root);
    let mut prompt = CannedPrompt(vec!["ds-1".to_string()]);

    let report = datasets
        .upload(
            "train",
            None,
            vec![sample_shard(0.0)],
            None,
            &mut prompt,
            UploadOptions {
                batch_size: 4,
                flush_partial: false,
            },
        )
        .await
        .unwrap();

    assert_eq!(report.dataset_id, "ds-1");
    assert_eq!(datasets.default_dataset(), "ds-1");
}

/// Build a downloadable shard archive and return its bytes.
fn archive_bytes(staging: &TempDir, index: usize, seed: f32) -> Vec<u8> {
    let dir = staging.path().join(format!("build-{}", index));
    let paths = shard::save_shard_components(&sample_shard(seed), index, &dir).unwrap();
    let archive = shard::group_archive(&paths, &dir.join("out.tar.gz")).unwrap();
    std::fs::read(archive).unwrap()
}

async fn mount_download_mocks(server: &MockServer, staging: &TempDir, shard_count: usize) {
    Mock::given(method("GET"))
        .and(path("/api/datasets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"_id": "ds-1", "name": "mnist", "createdAt": "2024-01-01"}
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/datasets/ds-1/versions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"_id": "v-1", "datasetId": "ds-1", "name": "train",
             "description": null, "createdAt": "2024-01-01"}
        ])))
        .mount(server)
        .await;

    for index in 0..shard_count {
        Mock::given(method("GET"))
            .and(path(format!("/api/datasets/ds-1/versions/v-1/data/{}", index)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "url": format!("{}/archives/{}", server.uri(), index)
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/archives/{}", index)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(archive_bytes(staging, index, index as f32)),
            )
            .mount(server)
            .await;
    }

    // Every index past the end reports missing.
    Mock::given(method("GET"))
        .and(path(format!("/api/datasets/ds-1/versions/v-1/data/{}", shard_count)))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

async fn shard_fetches(server: &MockServer, index: usize) -> usize {
    let wanted = format!("/api/datasets/ds-1/versions/v-1/data/{}", index);
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|req| req.url.path() == wanted)
        .count()
}

#[tokio::test]
async fn test_download_stops_at_first_missing_shard() {
    let server = MockServer::start().await;
    let staging = TempDir::new().unwrap();
    mount_download_mocks(&server, &staging, 2).await;

    let root = TempDir::new().unwrap();
    let datasets = client(&server, &root);
    let mut stream = datasets.shard_stream("v-1").unwrap();

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[1][[0]], 0.0);

    let second = stream.next().await.unwrap().unwrap();
    assert_eq!(second[1][[0]], 1.0);

    assert!(stream.next().await.unwrap().is_none());
    // A finished stream stays finished without further requests.
    assert!(stream.next().await.unwrap().is_none());
    assert_eq!(shard_fetches(&server, 2).await, 1);
}

#[tokio::test]
async fn test_second_stream_resumes_from_local_cache() {
    let server = MockServer::start().await;
    let staging = TempDir::new().unwrap();
    mount_download_mocks(&server, &staging, 2).await;

    let root = TempDir::new().unwrap();
    let datasets = client(&server, &root);

    // First pass consumes only shard 0.
    let mut stream = datasets.shard_stream("v-1").unwrap();
    stream.next().await.unwrap().unwrap();
    assert_eq!(stream.next_index(), 1);

    // Second pass serves shard 0 from disk, then fetches shard 1.
    let mut resumed = datasets.shard_stream("v-1").unwrap();
    let first = resumed.next().await.unwrap().unwrap();
    assert_eq!(first[1][[0]], 0.0);
    let second = resumed.next().await.unwrap().unwrap();
    assert_eq!(second[1][[0]], 1.0);
    assert!(resumed.next().await.unwrap().is_none());

    assert_eq!(shard_fetches(&server, 0).await, 1, "shard 0 fetched once, then cached");
    assert_eq!(shard_fetches(&server, 1).await, 1);
}

#[tokio::test]
async fn test_quick_download_prefetches_from_index_one() {
    let server = MockServer::start().await;
    let staging = TempDir::new().unwrap();
    mount_download_mocks(&server, &staging, 3).await;

    let root = TempDir::new().unwrap();
    let datasets = client(&server, &root);

    let fetched = datasets.quick_download("v-1").await.unwrap();

    assert_eq!(fetched, 2, "indices 1 and 2; index 3 is missing");
    assert_eq!(shard_fetches(&server, 0).await, 0, "prefetch starts at 1");
}

#[tokio::test]
async fn test_empty_version_id_is_config_error() {
    let root = TempDir::new().unwrap();
    let state = StateStore::with_root(root.path().join(".forefront"));
    let datasets = DatasetsClient::new(state).unwrap();

    let err = datasets.shard_stream("").unwrap_err();
    assert!(matches!(err, ForefrontError::Config(_)));
}

#[tokio::test]
async fn test_resolve_dataset_id_scans_versions() {
    let server = MockServer::start().await;
    let staging = TempDir::new().unwrap();
    mount_download_mocks(&server, &staging, 0).await;

    let root = TempDir::new().unwrap();
    let datasets = client(&server, &root);

    assert_eq!(datasets.resolve_dataset_id("v-1").await.unwrap(), "ds-1");
    assert_eq!(datasets.resolve_dataset_id("v-404").await.unwrap(), "");
}

#[tokio::test]
async fn test_set_default_dataset_clears_cached_shards() {
    let root = TempDir::new().unwrap();
    let state = StateStore::with_root(root.path().join(".forefront"));
    state.set_default_dataset("ds-1").unwrap();

    let data_dir = state.data_dir().unwrap();
    std::fs::create_dir_all(data_dir.join("0")).unwrap();

    let mut datasets = DatasetsClient::new(state).unwrap();

    // Re-selecting the current dataset is a no-op.
    datasets.set_default_dataset("ds-1").unwrap();
    assert!(root
        .path()
        .join(".forefront")
        .join("data")
        .join("0")
        .exists());

    datasets.set_default_dataset("ds-2").unwrap();
    assert!(!root
        .path()
        .join(".forefront")
        .join("data")
        .join("0")
        .exists());
    assert_eq!(datasets.default_dataset(), "ds-2");

    let state = StateStore::with_root(root.path().join(".forefront"));
    assert_eq!(state.get_default_dataset(), "ds-2");
}
