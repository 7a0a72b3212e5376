//! Application state shared across handlers

use std::path::Path;

use crate::artifact::ArtifactStore;
use crate::error::Result;
use crate::service::InferenceService;

use super::ServerConfig;

/// Shared state: the server configuration and the inference service with
/// its immutable schema and label table. Constructed once at startup and
/// read-only afterwards.
pub struct AppState {
    pub config: ServerConfig,
    pub service: InferenceService,
}

impl AppState {
    /// Build the state, loading schema and label metadata from the
    /// configured data directory. Fails if either metadata artifact is
    /// missing or unreadable.
    pub fn new(config: ServerConfig) -> Result<Self> {
        let store = ArtifactStore::new(Path::new(&config.data_dir));
        let service = InferenceService::from_store(store)?;
        Ok(Self { config, service })
    }
}
