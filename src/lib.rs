//! Penguin species inference service
//!
//! Accepts structured biological measurements for penguins and returns a
//! predicted species from a pre-trained gradient-boosted-tree classifier.
//! The request path is a single deterministic pass: validate → one-hot
//! encode → reindex to the persisted feature schema → classifier predict →
//! map class index to label.
//!
//! # Modules
//!
//! - [`features`] - Typed feature records, the feature schema, the label table
//! - [`encoder`] - Deterministic record-to-vector encoding
//! - [`boosting`] - Gradient-boosted-tree classifier with JSON persistence
//! - [`artifact`] - Artifact store with remote-then-local model fallback
//! - [`service`] - The encode → predict → label orchestration
//! - [`training`] - Offline one-shot trainer producing the serving artifacts
//! - [`metrics`] - Evaluation metrics for the trainer's report
//! - [`server`] - HTTP layer (axum routes, validation, error mapping)

pub mod error;

pub mod artifact;
pub mod boosting;
pub mod encoder;
pub mod features;
pub mod metrics;
pub mod service;
pub mod training;

pub mod server;

pub use error::{PenguinError, Result};
