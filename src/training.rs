//! Offline one-shot training
//!
//! Fits the gradient-boosted classifier on a penguins CSV and writes the
//! three serving artifacts (model, feature schema, label table) plus an
//! evaluation report. Runs once, ahead of serving; the inference path never
//! trains.

use std::fs::File;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use polars::prelude::*;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::info;

use crate::artifact::{COLUMNS_FILE, LABELS_FILE, MODEL_FILE};
use crate::boosting::{BoostingConfig, PenguinClassifier};
use crate::encoder;
use crate::error::{PenguinError, Result};
use crate::features::{FeatureRecord, FeatureSchema, Island, LabelTable, Sex};
use crate::metrics::ClassificationReport;

#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub data_path: PathBuf,
    pub out_dir: PathBuf,
    pub config: BoostingConfig,
    /// Fraction of rows held out for evaluation, stratified by species
    pub test_fraction: f64,
}

impl TrainOptions {
    pub fn new(data_path: PathBuf, out_dir: PathBuf) -> Self {
        Self {
            data_path,
            out_dir,
            config: BoostingConfig::default(),
            test_fraction: 0.2,
        }
    }
}

/// What training produced, for logging and tests
pub struct TrainSummary {
    pub labels: LabelTable,
    pub schema: FeatureSchema,
    pub train_report: ClassificationReport,
    pub test_report: ClassificationReport,
}

fn load_dataset(path: &Path) -> Result<DataFrame> {
    let file = File::open(path).map_err(|e| {
        PenguinError::Data(format!("failed to open {}: {e}", path.display()))
    })?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .into_reader_with_file_handle(file)
        .finish()?;

    // Rows with any missing measurement are dropped, as the original
    // dataset ships with a handful of incomplete observations.
    Ok(df.drop_nulls::<String>(None)?)
}

fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = df
        .column(name)
        .map_err(|_| PenguinError::Data(format!("column not found: {name}")))?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let ca = series.f64().map_err(|e| PenguinError::Data(e.to_string()))?;
    ca.into_iter()
        .map(|v| v.ok_or_else(|| PenguinError::Data(format!("null value in column {name}"))))
        .collect()
}

fn str_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let column = df
        .column(name)
        .map_err(|_| PenguinError::Data(format!("column not found: {name}")))?;
    let ca = column
        .as_materialized_series()
        .str()
        .map_err(|e| PenguinError::Data(e.to_string()))?;
    ca.into_iter()
        .map(|v| {
            v.map(|s| s.to_string())
                .ok_or_else(|| PenguinError::Data(format!("null value in column {name}")))
        })
        .collect()
}

/// Label-encode species names: classes are the sorted distinct values, the
/// same order the label table is persisted in.
fn encode_labels(species: &[String]) -> (LabelTable, Vec<usize>) {
    let mut classes: Vec<String> = species.to_vec();
    classes.sort();
    classes.dedup();

    let y = species
        .iter()
        .map(|s| classes.iter().position(|c| c == s).expect("class from same list"))
        .collect();

    (LabelTable::new(classes), y)
}

fn parse_records(df: &DataFrame) -> Result<Vec<FeatureRecord>> {
    let bill_length = f64_column(df, "bill_length_mm")?;
    let bill_depth = f64_column(df, "bill_depth_mm")?;
    let flipper_length = f64_column(df, "flipper_length_mm")?;
    let body_mass = f64_column(df, "body_mass_g")?;
    let year = f64_column(df, "year")?;
    let sex = str_column(df, "sex")?;
    let island = str_column(df, "island")?;

    (0..df.height())
        .map(|i| {
            let sex = Sex::parse(&sex[i])
                .ok_or_else(|| PenguinError::Data(format!("unknown sex value: {}", sex[i])))?;
            let island = Island::parse(&island[i]).ok_or_else(|| {
                PenguinError::Data(format!("unknown island value: {}", island[i]))
            })?;
            Ok(FeatureRecord {
                bill_length_mm: bill_length[i],
                bill_depth_mm: bill_depth[i],
                flipper_length_mm: flipper_length[i],
                body_mass_g: body_mass[i],
                year: year[i] as i32,
                sex,
                island,
            })
        })
        .collect()
}

/// Seeded stratified split: within each class, shuffle and hold out
/// `test_fraction` of the rows.
fn stratified_split(
    y: &[usize],
    n_classes: usize,
    test_fraction: f64,
    seed: u64,
) -> (Vec<usize>, Vec<usize>) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in 0..n_classes {
        let mut members: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
        members.shuffle(&mut rng);
        let n_test = ((members.len() as f64) * test_fraction).round() as usize;
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort();
    test.sort();
    (train, test)
}

fn design_matrix(
    records: &[FeatureRecord],
    indices: &[usize],
    schema: &FeatureSchema,
) -> Result<Array2<f64>> {
    let mut flat = Vec::with_capacity(indices.len() * schema.len());
    for &i in indices {
        flat.extend(encoder::encode(&records[i], schema));
    }
    Ok(Array2::from_shape_vec((indices.len(), schema.len()), flat)?)
}

/// Train the classifier and write the serving artifacts.
pub fn run_training(opts: &TrainOptions) -> Result<TrainSummary> {
    info!(path = %opts.data_path.display(), "Loading training data");
    let df = load_dataset(&opts.data_path)?;
    info!(rows = df.height(), "Dataset loaded");

    let species = str_column(&df, "species")?;
    let (labels, y) = encode_labels(&species);
    let records = parse_records(&df)?;

    let schema = FeatureSchema::training_default();

    let seed = opts.config.random_state.unwrap_or(42);
    let (train_idx, test_idx) = stratified_split(&y, labels.len(), opts.test_fraction, seed);
    let x_train = design_matrix(&records, &train_idx, &schema)?;
    let x_test = design_matrix(&records, &test_idx, &schema)?;
    let y_train: Vec<usize> = train_idx.iter().map(|&i| y[i]).collect();
    let y_test: Vec<usize> = test_idx.iter().map(|&i| y[i]).collect();

    info!(
        train_rows = y_train.len(),
        test_rows = y_test.len(),
        classes = labels.len(),
        "Fitting classifier"
    );
    let mut model = PenguinClassifier::new(opts.config.clone());
    model.fit(&x_train, &y_train, labels.len())?;

    let train_report =
        ClassificationReport::compute(&y_train, &model.predict(&x_train)?, &labels);
    let test_report = ClassificationReport::compute(&y_test, &model.predict(&x_test)?, &labels);
    info!(
        train_macro_f1 = train_report.macro_f1,
        test_macro_f1 = test_report.macro_f1,
        "Training complete"
    );

    std::fs::create_dir_all(&opts.out_dir)?;
    model.save(&opts.out_dir.join(MODEL_FILE))?;
    schema.save(&opts.out_dir.join(COLUMNS_FILE))?;
    labels.save(&opts.out_dir.join(LABELS_FILE))?;
    info!(dir = %opts.out_dir.display(), "Artifacts written");

    Ok(TrainSummary {
        labels,
        schema,
        train_report,
        test_report,
    })
}
