//! Inference service: the encode → predict → label pipeline
//!
//! Constructed once at startup from the persisted schema and label table,
//! which stay immutable for the lifetime of the process. The classifier is
//! loaded per prediction through the artifact store, matching the remote
//! store's ability to swap the model artifact between requests; the loaded
//! handle is private to the request, so concurrent predictions share only
//! read-only state.

use tracing::info;

use crate::artifact::ArtifactStore;
use crate::encoder;
use crate::error::Result;
use crate::features::{FeatureRecord, FeatureSchema, LabelTable};

pub struct InferenceService {
    schema: FeatureSchema,
    labels: LabelTable,
    store: ArtifactStore,
}

impl InferenceService {
    /// Build a service from an artifact store, loading the schema and label
    /// metadata once.
    pub fn from_store(store: ArtifactStore) -> Result<Self> {
        let (schema, labels) = store.load_metadata()?;
        info!(
            columns = schema.len(),
            classes = labels.len(),
            "Inference service ready"
        );
        Ok(Self {
            schema,
            labels,
            store,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Predict the species for one record.
    ///
    /// Stateless and idempotent: the result depends only on the record and
    /// the immutable artifacts. The predicted class index is bounds-checked
    /// against the label table before the lookup.
    pub async fn predict(&self, record: &FeatureRecord) -> Result<String> {
        let model = self.store.load_classifier().await?;
        let features = encoder::encode(record, &self.schema);
        let class_index = model.predict_one(&features)?;
        let label = self.labels.label(class_index)?;
        Ok(label.to_string())
    }
}
