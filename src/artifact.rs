//! Model artifact loading with remote-then-local fallback
//!
//! The serving process reads three artifacts produced by the offline
//! trainer: the serialized tree ensemble (`model.json`), the feature schema
//! (`columns.json`), and the label table (`label_classes.json`). Metadata is
//! loaded once from local disk; the classifier itself can additionally be
//! fetched from a remote object store, falling back to the local file when
//! the remote source is unconfigured or unavailable. Exactly one fallback
//! attempt is made; there is no retry loop.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::boosting::PenguinClassifier;
use crate::error::{PenguinError, Result};
use crate::features::{FeatureSchema, LabelTable};

pub const MODEL_FILE: &str = "model.json";
pub const COLUMNS_FILE: &str = "columns.json";
pub const LABELS_FILE: &str = "label_classes.json";

const FETCH_TIMEOUT_SECS: u64 = 30;

/// Remote object-store location for the model artifact.
///
/// Configured through `MODEL_BUCKET` and `MODEL_BLOB`; an optional
/// `MODEL_AUTH_TOKEN_FILE` names a file whose contents are sent as a bearer
/// token. Either identifier missing means no remote source is configured.
#[derive(Debug, Clone)]
pub struct RemoteArtifactSource {
    url: String,
    auth_token_path: Option<PathBuf>,
}

impl RemoteArtifactSource {
    pub fn new(url: String, auth_token_path: Option<PathBuf>) -> Self {
        Self {
            url,
            auth_token_path,
        }
    }

    pub fn from_env() -> Option<Self> {
        let bucket = std::env::var("MODEL_BUCKET").ok()?;
        let blob = std::env::var("MODEL_BLOB").ok()?;
        if bucket.is_empty() || blob.is_empty() {
            return None;
        }
        let auth_token_path = std::env::var("MODEL_AUTH_TOKEN_FILE").ok().map(PathBuf::from);
        Some(Self {
            url: format!("https://storage.googleapis.com/{bucket}/{blob}"),
            auth_token_path,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Download the artifact bytes into memory. No temp files, so concurrent
    /// fetches cannot collide on a shared path.
    async fn fetch(&self) -> Result<Vec<u8>> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| PenguinError::Artifact(format!("failed to create HTTP client: {e}")))?;

        let mut request = client.get(&self.url);
        if let Some(ref token_path) = self.auth_token_path {
            let token = std::fs::read_to_string(token_path)
                .map_err(|e| PenguinError::Artifact(format!("failed to read auth token: {e}")))?;
            request = request.bearer_auth(token.trim());
        }

        let response = request
            .send()
            .await
            .map_err(|e| PenguinError::Artifact(format!("remote fetch failed: {e}")))?
            .error_for_status()
            .map_err(|e| PenguinError::Artifact(format!("remote fetch failed: {e}")))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PenguinError::Artifact(format!("remote fetch failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}

/// Paths to the serving artifacts plus the optional remote model source.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    model_path: PathBuf,
    columns_path: PathBuf,
    labels_path: PathBuf,
    remote: Option<RemoteArtifactSource>,
}

impl ArtifactStore {
    /// Store rooted at a data directory, with the remote source taken from
    /// the environment.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            model_path: data_dir.join(MODEL_FILE),
            columns_path: data_dir.join(COLUMNS_FILE),
            labels_path: data_dir.join(LABELS_FILE),
            remote: RemoteArtifactSource::from_env(),
        }
    }

    /// Store with an explicit remote source (or none), bypassing the
    /// environment.
    pub fn with_remote(data_dir: &Path, remote: Option<RemoteArtifactSource>) -> Self {
        Self {
            model_path: data_dir.join(MODEL_FILE),
            columns_path: data_dir.join(COLUMNS_FILE),
            labels_path: data_dir.join(LABELS_FILE),
            remote,
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Load the feature schema and label table from local disk. Called once
    /// at startup; both are immutable afterwards.
    pub fn load_metadata(&self) -> Result<(FeatureSchema, LabelTable)> {
        info!("Loading schema and label metadata");
        let schema = FeatureSchema::load(&self.columns_path).map_err(|e| {
            PenguinError::Artifact(format!(
                "failed to load {}: {e}",
                self.columns_path.display()
            ))
        })?;
        let labels = LabelTable::load(&self.labels_path).map_err(|e| {
            PenguinError::Artifact(format!(
                "failed to load {}: {e}",
                self.labels_path.display()
            ))
        })?;
        Ok((schema, labels))
    }

    /// Load the classifier: try the remote source first when configured, on
    /// failure fall back to the local file. Both failing is an artifact
    /// error; the remote cause is logged, never surfaced to callers.
    pub async fn load_classifier(&self) -> Result<PenguinClassifier> {
        if let Some(ref remote) = self.remote {
            match self.load_remote(remote).await {
                Ok(model) => return Ok(model),
                Err(cause) => {
                    warn!(url = remote.url(), %cause, "Remote model load failed, falling back to local file");
                }
            }
        }

        self.load_local()
    }

    async fn load_remote(&self, remote: &RemoteArtifactSource) -> Result<PenguinClassifier> {
        info!(url = remote.url(), "Loading model from remote source");
        let bytes = remote.fetch().await?;
        let model = PenguinClassifier::from_json_bytes(&bytes)
            .map_err(|e| PenguinError::Artifact(format!("remote artifact is invalid: {e}")))?;
        info!("Model loaded from remote source");
        Ok(model)
    }

    fn load_local(&self) -> Result<PenguinClassifier> {
        info!(path = %self.model_path.display(), "Loading model from local file");
        PenguinClassifier::load(&self.model_path).map_err(|e| {
            PenguinError::Artifact(format!(
                "failed to load {}: {e}",
                self.model_path.display()
            ))
        })
    }
}
