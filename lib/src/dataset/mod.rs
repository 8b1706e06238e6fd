//! Loading and cleaning of the member table.
//!
//! The training export is a delimited file whose headers passed through two
//! encodings. Loading goes through three stages:
//!
//! - **Decode** — bytes are decoded with the configured [`TextEncoding`]
//!   (Latin-1 by default, the encoding the export is written in).
//! - **Repair headers** — every header goes through
//!   [`clean_column_name`]; a header that cannot be repaired aborts the load.
//! - **Filter rows** — rows whose `Filiere` is outside the fixed vocabulary are
//!   dropped, and (for training) so are rows whose `Formations` list is empty.
//!
//! # Example
//!
//! ```no_run
//! use formation_recommender::dataset::{load_dataset, LoadOptions, TextEncoding};
//!
//! let data = load_dataset("train_data.csv", TextEncoding::Latin1, LoadOptions::training())?;
//! println!("{} members kept", data.features.n_rows());
//! # Ok::<(), formation_recommender::dataset::DatasetError>(())
//! ```

pub mod columns;
pub mod frame;
pub mod synthetic;

pub use columns::{
    clean_column_name, feature_columns, is_known_filiere,
    FILIERE_COLUMN, FILIERE_VOCABULARY, ID_COLUMN, NOMINAL_COLUMNS, NUMERIC_COLUMNS,
    OPTIONAL_FEATURE_COLUMNS, ORDINAL_COLUMNS, TARGET_COLUMN,
};
pub use frame::{Cell, FeatureFrame};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while loading the member table.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("data file not found: {0}")]
    NotFound(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot decode input as {encoding}: {message}")]
    Encoding {
        encoding: TextEncoding,
        message: String,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("column header {raw:?} cannot be repaired (got {cleaned:?})")]
    UnrecoverableHeader { raw: String, cleaned: String },
    #[error("two headers repair to the same column {0}")]
    DuplicateColumn(String),
    #[error("required column {0} is missing")]
    MissingColumn(String),
    #[error("no usable rows: {0}")]
    Empty(String),
}

/// Text encoding of a raw input file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    #[serde(alias = "utf8")]
    Utf8,
    #[default]
    #[serde(alias = "iso-8859-1")]
    Latin1,
}

impl TextEncoding {
    /// Decode raw bytes into a string.
    pub fn decode(&self, bytes: &[u8]) -> Result<String, DatasetError> {
        match self {
            TextEncoding::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|e| {
                DatasetError::Encoding {
                    encoding: *self,
                    message: e.to_string(),
                }
            }),
            // ISO-8859-1 maps every byte to the code point of the same value.
            TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextEncoding::Utf8 => write!(f, "utf-8"),
            TextEncoding::Latin1 => write!(f, "latin-1"),
        }
    }
}

impl FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            other => Err(format!("unsupported encoding {:?}", other)),
        }
    }
}

/// How strictly rows are filtered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadOptions {
    /// Drop rows without at least one workshop label, and require the target column.
    pub require_labels: bool,
}

impl LoadOptions {
    /// Options for building a training set.
    pub fn training() -> Self {
        Self {
            require_labels: true,
        }
    }

    /// Options for scoring new members; the target column may be absent.
    pub fn inference() -> Self {
        Self {
            require_labels: false,
        }
    }
}

/// Row accounting for one load.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub total_rows: usize,
    pub dropped_unknown_filiere: usize,
    pub dropped_unlabeled: usize,
    pub kept_rows: usize,
}

/// A cleaned member table.
#[derive(Clone, Debug)]
pub struct LoadedDataset {
    /// Feature cells, one column per repaired header (identifier and target removed).
    pub features: FeatureFrame,
    /// Parsed workshop list per kept row.
    pub labels: Vec<Vec<String>>,
    /// Identifier per kept row; the 1-based row number when the file has no identifier column.
    pub member_ids: Vec<String>,
    pub report: LoadReport,
}

/// Split a raw `Formations` value into trimmed, non-empty labels.
///
/// A missing value yields an empty list.
pub fn parse_labels(raw: Option<&str>) -> Vec<String> {
    match raw {
        Some(text) => text
            .split(',')
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}

/// Load the member table from a file.
pub fn load_dataset<P: AsRef<Path>>(
    path: P,
    encoding: TextEncoding,
    options: LoadOptions,
) -> Result<LoadedDataset, DatasetError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DatasetError::NotFound(path.to_path_buf()),
        _ => DatasetError::Io(e),
    })?;
    let text = encoding.decode(&bytes)?;
    debug!(path = %path.display(), %encoding, bytes = bytes.len(), "decoded input file");
    read_dataset(text.as_bytes(), options)
}

/// Load the member table from any UTF-8 reader.
pub fn read_dataset<R: Read>(reader: R, options: LoadOptions) -> Result<LoadedDataset, DatasetError> {
    let mut rdr = csv::ReaderBuilder::new().from_reader(reader);

    let mut names: Vec<String> = Vec::new();
    for raw in rdr.headers()?.iter() {
        let cleaned = clean_column_name(raw);
        if !columns::is_recoverable(&cleaned) {
            return Err(DatasetError::UnrecoverableHeader {
                raw: raw.to_string(),
                cleaned,
            });
        }
        if names.contains(&cleaned) {
            return Err(DatasetError::DuplicateColumn(cleaned));
        }
        names.push(cleaned);
    }

    for required in feature_columns() {
        if !names.iter().any(|n| n == required) {
            return Err(DatasetError::MissingColumn(required.to_string()));
        }
    }
    let position = |name: &str| names.iter().position(|n| n == name);
    let filiere_idx = position(FILIERE_COLUMN).ok_or_else(|| DatasetError::MissingColumn(FILIERE_COLUMN.into()))?;
    let id_idx = position(ID_COLUMN);
    let target_idx = position(TARGET_COLUMN);
    if options.require_labels && target_idx.is_none() {
        return Err(DatasetError::MissingColumn(TARGET_COLUMN.to_string()));
    }

    let feature_idx: Vec<usize> = (0..names.len())
        .filter(|&i| Some(i) != id_idx && Some(i) != target_idx)
        .collect();
    let mut columns: Vec<Vec<Cell>> = vec![Vec::new(); feature_idx.len()];
    let mut labels = Vec::new();
    let mut member_ids = Vec::new();
    let mut report = LoadReport::default();

    for (row_no, record) in rdr.records().enumerate() {
        let record = record?;
        report.total_rows += 1;

        let filiere = Cell::parse(record.get(filiere_idx).unwrap_or(""));
        if !filiere.category().is_some_and(|f| is_known_filiere(&f)) {
            report.dropped_unknown_filiere += 1;
            continue;
        }

        let row_labels = parse_labels(target_idx.and_then(|i| record.get(i)));
        if options.require_labels && row_labels.is_empty() {
            report.dropped_unlabeled += 1;
            continue;
        }

        for (out, &i) in columns.iter_mut().zip(&feature_idx) {
            out.push(Cell::parse(record.get(i).unwrap_or("")));
        }
        member_ids.push(match id_idx.and_then(|i| record.get(i)) {
            Some(id) => id.trim().to_string(),
            None => (row_no + 1).to_string(),
        });
        labels.push(row_labels);
    }
    report.kept_rows = labels.len();

    let mut features = FeatureFrame::new();
    for (&i, cells) in feature_idx.iter().zip(columns) {
        features
            .push_column(names[i].clone(), cells)
            .map_err(|e| DatasetError::Empty(e.to_string()))?;
    }

    if options.require_labels && report.kept_rows == 0 {
        return Err(DatasetError::Empty(format!(
            "all {} rows were filtered out",
            report.total_rows
        )));
    }

    info!(
        total = report.total_rows,
        kept = report.kept_rows,
        dropped_filiere = report.dropped_unknown_filiere,
        dropped_unlabeled = report.dropped_unlabeled,
        "loaded member table"
    );

    Ok(LoadedDataset {
        features,
        labels,
        member_ids,
        report,
    })
}
