//! Direct invocation of a deployed model endpoint.

use crate::errors::{ForefrontError, Result};
use ndarray::ArrayD;
use reqwest::{multipart, Client, StatusCode};
use serde_json::Value;
use tracing::error;
use uuid::Uuid;

/// Calls a deployed endpoint with one array input.
///
/// Unlike the project and dataset APIs, this endpoint family expects a
/// `Bearer`-prefixed authorization header.
pub struct InferenceClient {
    client: Client,
    key: String,
}

impl InferenceClient {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build().map_err(ForefrontError::Http)?,
            key: key.into(),
        })
    }

    /// POST `input` to `endpoint` and decode the JSON reply.
    pub async fn call(&self, endpoint: &str, input: &ArrayD<f32>) -> Result<Value> {
        if endpoint.is_empty() {
            return Err(ForefrontError::Config(
                "Must include an endpoint to call".to_string(),
            ));
        }

        // The endpoint consumes a file part, so the input is staged to
        // the system temp directory first (and left there, like any other
        // temp file).
        let mut bytes = Vec::new();
        ciborium::into_writer(input, &mut bytes)
            .map_err(|e| ForefrontError::Serialization(e.to_string()))?;

        let file_name = format!("{}.arr", Uuid::new_v4());
        let path = std::env::temp_dir().join(&file_name);
        std::fs::write(&path, &bytes)?;

        let form = multipart::Form::new().part(
            "model_file",
            multipart::Part::bytes(bytes).file_name(file_name),
        );

        let response = self
            .client
            .post(endpoint)
            .header("authorization", format!("Bearer {}", self.key))
            .multipart(form)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ForefrontError::NotFound),
            StatusCode::UNAUTHORIZED => Err(ForefrontError::Unauthorized),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                error!(status = %status, body = %body, "Endpoint request failed");
                Err(ForefrontError::Transport {
                    status: status.as_u16(),
                    body,
                })
            }
            _ => response
                .json()
                .await
                .map_err(|e| ForefrontError::MalformedResponse(e.to_string())),
        }
    }
}
