//! Deterministic feature encoding
//!
//! Maps a typed [`FeatureRecord`] into the numeric vector the classifier
//! expects, aligned position-for-position with the persisted
//! [`FeatureSchema`]. Both the offline trainer and the serving path go
//! through [`encode`], which is what keeps the feature layout consistent
//! between the two.

use std::collections::HashMap;

use crate::features::{FeatureRecord, FeatureSchema};

/// Expand a record into named scalar fields: the numeric measurements
/// verbatim plus one-hot indicators named after the literal category value
/// (`sex_male`, `island_Biscoe`).
fn expand(record: &FeatureRecord) -> HashMap<String, f64> {
    let mut fields = HashMap::with_capacity(7);
    fields.insert("bill_length_mm".to_string(), record.bill_length_mm);
    fields.insert("bill_depth_mm".to_string(), record.bill_depth_mm);
    fields.insert("flipper_length_mm".to_string(), record.flipper_length_mm);
    fields.insert("body_mass_g".to_string(), record.body_mass_g);
    fields.insert("year".to_string(), f64::from(record.year));
    fields.insert(format!("sex_{}", record.sex.as_str()), 1.0);
    fields.insert(format!("island_{}", record.island.as_str()), 1.0);
    fields
}

/// Encode a record against the schema.
///
/// The output vector has exactly `schema.len()` entries, one per schema
/// column in order. Schema columns not derivable from the record (the
/// sibling indicator columns of the record's categories, or columns from
/// categories never observed at training time) are filled with 0.0. Values
/// pass through unchanged: no normalization, scaling, or clipping.
///
/// Pure function: identical record and schema always produce a bit-identical
/// vector.
pub fn encode(record: &FeatureRecord, schema: &FeatureSchema) -> Vec<f64> {
    let fields = expand(record);
    schema
        .columns()
        .iter()
        .map(|column| fields.get(column).copied().unwrap_or(0.0))
        .collect()
}
