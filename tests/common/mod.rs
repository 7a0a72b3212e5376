//! Shared helpers for integration tests

use std::path::Path;

use ndarray::Array2;
use tempfile::TempDir;

use penguin_serve::artifact::{COLUMNS_FILE, LABELS_FILE, MODEL_FILE};
use penguin_serve::boosting::{BoostingConfig, PenguinClassifier};
use penguin_serve::encoder;
use penguin_serve::features::{FeatureRecord, FeatureSchema, Island, LabelTable, Sex};

/// Cluster prototypes per species: (bill length, bill depth, flipper length,
/// body mass, sex, island, class index).
pub const PROTOTYPES: [(f64, f64, f64, f64, Sex, Island, usize); 3] = [
    (39.0, 18.5, 190.0, 3700.0, Sex::Male, Island::Torgersen, 0),
    (48.8, 18.4, 196.0, 3730.0, Sex::Female, Island::Dream, 1),
    (47.5, 15.0, 217.0, 5000.0, Sex::Male, Island::Biscoe, 2),
];

pub fn species_labels() -> LabelTable {
    LabelTable::new(vec![
        "Adelie".to_string(),
        "Chinstrap".to_string(),
        "Gentoo".to_string(),
    ])
}

/// Fit a small classifier on synthetic species clusters and write the full
/// artifact set (model, columns, labels) into `dir`.
pub fn write_artifacts(dir: &Path) {
    let schema = FeatureSchema::training_default();
    let labels = species_labels();

    let mut rows: Vec<f64> = Vec::new();
    let mut y = Vec::new();
    for &(bl, bd, fl, bm, sex, island, class) in &PROTOTYPES {
        for i in 0..20 {
            let jitter = i as f64 * 0.05;
            let record = FeatureRecord {
                bill_length_mm: bl + jitter,
                bill_depth_mm: bd - jitter * 0.1,
                flipper_length_mm: fl + jitter,
                body_mass_g: bm + jitter * 10.0,
                year: 2007 + (i % 3),
                sex,
                island,
            };
            rows.extend(encoder::encode(&record, &schema));
            y.push(class);
        }
    }
    let x = Array2::from_shape_vec((60, schema.len()), rows).unwrap();

    let mut model = PenguinClassifier::new(BoostingConfig {
        n_estimators: 20,
        ..Default::default()
    });
    model.fit(&x, &y, 3).unwrap();

    schema.save(&dir.join(COLUMNS_FILE)).unwrap();
    labels.save(&dir.join(LABELS_FILE)).unwrap();
    model.save(&dir.join(MODEL_FILE)).unwrap();
}

/// Temp directory pre-populated with a trained artifact set.
pub fn artifact_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path());
    dir
}
