//! Typed feature records and the persisted schema/label artifacts
//!
//! A [`FeatureRecord`] is the validated input for one prediction. The
//! [`FeatureSchema`] and [`LabelTable`] are fixed at training time and
//! persisted as JSON arrays next to the model; inference loads them once and
//! treats them as immutable for the lifetime of the process.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PenguinError, Result};

/// Penguin sex. Closed set; anything else is a validation error at the
/// request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    /// All categories, in schema column order.
    pub const ALL: [Sex; 2] = [Sex::Female, Sex::Male];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Female => "female",
            Sex::Male => "male",
        }
    }

    /// Case-insensitive parse, used when reading training CSVs where the
    /// column may be capitalized.
    pub fn parse(s: &str) -> Option<Sex> {
        match s.to_ascii_lowercase().as_str() {
            "female" => Some(Sex::Female),
            "male" => Some(Sex::Male),
            _ => None,
        }
    }
}

/// Island of observation. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Island {
    Biscoe,
    Dream,
    Torgersen,
}

impl Island {
    /// All categories, in schema column order.
    pub const ALL: [Island; 3] = [Island::Biscoe, Island::Dream, Island::Torgersen];

    pub fn as_str(&self) -> &'static str {
        match self {
            Island::Biscoe => "Biscoe",
            Island::Dream => "Dream",
            Island::Torgersen => "Torgersen",
        }
    }

    pub fn parse(s: &str) -> Option<Island> {
        match s.to_ascii_lowercase().as_str() {
            "biscoe" => Some(Island::Biscoe),
            "dream" => Some(Island::Dream),
            "torgersen" => Some(Island::Torgersen),
            _ => None,
        }
    }
}

/// One penguin's measurements and categorical attributes.
///
/// All seven fields are required; unknown extra fields in the request body
/// are ignored. There is deliberately no range validation: negative or
/// physically implausible measurements are type-valid and pass straight
/// through to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub bill_length_mm: f64,
    pub bill_depth_mm: f64,
    pub flipper_length_mm: f64,
    pub body_mass_g: f64,
    pub year: i32,
    pub sex: Sex,
    pub island: Island,
}

/// Names of the non-categorical input columns, in schema order.
pub const NUMERIC_COLUMNS: [&str; 5] = [
    "bill_length_mm",
    "bill_depth_mm",
    "flipper_length_mm",
    "body_mass_g",
    "year",
];

/// Fixed ordered list of encoded column names the model expects.
///
/// Produced once at training time, persisted as a JSON array, and never
/// mutated afterwards. The encoder output vector corresponds 1:1, in order,
/// to these columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// The schema produced by training: the five numeric columns verbatim,
    /// then one-hot indicator columns for every sex and island category.
    pub fn training_default() -> Self {
        let mut columns: Vec<String> = NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect();
        for sex in Sex::ALL {
            columns.push(format!("sex_{}", sex.as_str()));
        }
        for island in Island::ALL {
            columns.push(format!("island_{}", island.as_str()));
        }
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let schema: Self = serde_json::from_str(&json)?;
        Ok(schema)
    }
}

/// Ordered list mapping the classifier's integer output to a species name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelTable {
    classes: Vec<String>,
}

impl LabelTable {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }

    /// Bounds-checked lookup. An out-of-range index means the model artifact
    /// does not match the label artifact, which is a data-corruption error
    /// rather than a normal outcome.
    pub fn label(&self, index: usize) -> Result<&str> {
        self.classes
            .get(index)
            .map(|s| s.as_str())
            .ok_or(PenguinError::LabelOutOfRange {
                index,
                len: self.classes.len(),
            })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let table: Self = serde_json::from_str(&json)?;
        Ok(table)
    }
}
