//! Named-column table of raw cells.
//!
//! [`FeatureFrame`] is the input type of the feature pipeline: the loader
//! produces one for a whole CSV file and the inference path builds a
//! single-row one from a JSON object. Columns are addressed by name so the
//! pipeline can select its groups regardless of the source's column order.

use crate::preprocessing::PreprocessingError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Spellings that tabular sources commonly use for "no value".
const MISSING_MARKERS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// One raw value of a record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Text(String),
    Number(f64),
    Missing,
}

impl Cell {
    /// Interpret a raw text field: blank and NA markers become [`Cell::Missing`],
    /// finite numbers become [`Cell::Number`], anything else stays text.
    pub fn parse(raw: &str) -> Cell {
        let trimmed = raw.trim();
        if trimmed.is_empty() || MISSING_MARKERS.contains(&trimmed) {
            return Cell::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Number(v),
            Ok(v) if v.is_nan() => Cell::Missing,
            _ => Cell::Text(trimmed.to_string()),
        }
    }

    /// Numeric view of the cell, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            Cell::Missing => None,
        }
    }

    /// Categorical key of the cell.
    ///
    /// Integral numbers are rendered without a fractional part so that `7`,
    /// `7.0` and `"7"` all name the same category.
    pub fn category(&self) -> Option<String> {
        match self {
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(v) => Some(format_number(*v)),
            Cell::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Number(v) => write!(f, "{}", format_number(*v)),
            Cell::Missing => write!(f, ""),
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

/// A table of [`Cell`]s stored column by column.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureFrame {
    names: Vec<String>,
    columns: Vec<Vec<Cell>>,
    n_rows: usize,
}

impl FeatureFrame {
    /// Create an empty frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a one-row frame from `(column, value)` pairs.
    pub fn single_row<I, S>(pairs: I) -> Result<Self, PreprocessingError>
    where
        I: IntoIterator<Item = (S, Cell)>,
        S: Into<String>,
    {
        let mut frame = FeatureFrame {
            n_rows: 1,
            ..Default::default()
        };
        for (name, cell) in pairs {
            frame.push_column(name, vec![cell])?;
        }
        Ok(frame)
    }

    /// Builder form of [`FeatureFrame::push_column`].
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        cells: Vec<Cell>,
    ) -> Result<Self, PreprocessingError> {
        self.push_column(name, cells)?;
        Ok(self)
    }

    /// Append a column. Its length must match the existing row count.
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        cells: Vec<Cell>,
    ) -> Result<(), PreprocessingError> {
        let name = name.into();
        if self.names.contains(&name) {
            return Err(PreprocessingError::InvalidParameter(format!(
                "duplicate column {}",
                name
            )));
        }
        if self.columns.is_empty() && self.n_rows == 0 {
            self.n_rows = cells.len();
        } else if cells.len() != self.n_rows {
            return Err(PreprocessingError::InvalidShape {
                expected: format!("{} rows", self.n_rows),
                got: format!("{} rows in column {}", cells.len(), name),
            });
        }
        self.names.push(name);
        self.columns.push(cells);
        Ok(())
    }

    /// Remove a column, returning its cells.
    pub fn drop_column(&mut self, name: &str) -> Option<Vec<Cell>> {
        let idx = self.names.iter().position(|n| n == name)?;
        self.names.remove(idx);
        Some(self.columns.remove(idx))
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Column names in insertion order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&[Cell]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.columns[idx].as_slice())
    }

    /// Like [`FeatureFrame::column`] but reports a missing column as an error.
    pub fn require_column(&self, name: &str) -> Result<&[Cell], PreprocessingError> {
        self.column(name)
            .ok_or_else(|| PreprocessingError::MissingColumn(name.to_string()))
    }

    /// New frame holding the named columns, in the given order.
    pub fn select_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<FeatureFrame, PreprocessingError> {
        let mut selected = FeatureFrame {
            n_rows: self.n_rows,
            ..Default::default()
        };
        for name in names {
            let name = name.as_ref();
            let cells = self.require_column(name)?.to_vec();
            selected.push_column(name, cells)?;
        }
        Ok(selected)
    }

    /// New frame holding the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> FeatureFrame {
        let columns = self
            .columns
            .iter()
            .map(|col| indices.iter().map(|&i| col[i].clone()).collect())
            .collect();
        FeatureFrame {
            names: self.names.clone(),
            columns,
            n_rows: indices.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_parse() {
        assert_eq!(Cell::parse("  12.5 "), Cell::Number(12.5));
        assert_eq!(Cell::parse("GL"), Cell::Text("GL".to_string()));
        assert_eq!(Cell::parse("   "), Cell::Missing);
        assert_eq!(Cell::parse("NaN"), Cell::Missing);
        assert_eq!(Cell::parse("N/A"), Cell::Missing);
        assert_eq!(Cell::parse("inf"), Cell::Text("inf".to_string()));
    }

    #[test]
    fn test_cell_category_is_stable_across_representations() {
        assert_eq!(Cell::Number(7.0).category(), Some("7".to_string()));
        assert_eq!(Cell::parse("7.0").category(), Some("7".to_string()));
        assert_eq!(Cell::Text("7".into()).category(), Some("7".to_string()));
        assert_eq!(Cell::Number(2.5).category(), Some("2.5".to_string()));
        assert_eq!(Cell::Missing.category(), None);
    }

    #[test]
    fn test_cell_as_f64() {
        assert_eq!(Cell::Text(" 3 ".into()).as_f64(), Some(3.0));
        assert_eq!(Cell::Text("high".into()).as_f64(), None);
        assert_eq!(Cell::Missing.as_f64(), None);
    }

    #[test]
    fn test_push_column_checks_length() {
        let mut frame = FeatureFrame::new();
        frame
            .push_column("Age", vec![Cell::Number(20.0), Cell::Number(21.0)])
            .unwrap();
        let err = frame.push_column("Sexe", vec![Cell::from("M")]).unwrap_err();
        assert!(matches!(err, PreprocessingError::InvalidShape { .. }));
    }

    #[test]
    fn test_push_column_rejects_duplicates() {
        let frame = FeatureFrame::new()
            .with_column("Age", vec![Cell::Number(20.0)])
            .unwrap();
        assert!(frame.with_column("Age", vec![Cell::Number(1.0)]).is_err());
    }

    #[test]
    fn test_single_row_and_select() {
        let frame = FeatureFrame::single_row(vec![
            ("Age", Cell::Number(19.0)),
            ("Filiere", Cell::from("GL")),
        ])
        .unwrap();
        assert_eq!(frame.n_rows(), 1);
        assert_eq!(frame.names(), &["Age".to_string(), "Filiere".to_string()]);
        assert_eq!(frame.column("Filiere").unwrap()[0], Cell::from("GL"));
        assert!(frame.require_column("Cellule").is_err());
    }

    #[test]
    fn test_select_rows_reorders() {
        let frame = FeatureFrame::new()
            .with_column("x", vec![1.0.into(), 2.0.into(), 3.0.into()])
            .unwrap();
        let picked = frame.select_rows(&[2, 0]);
        assert_eq!(picked.n_rows(), 2);
        assert_eq!(picked.column("x").unwrap(), &[Cell::Number(3.0), Cell::Number(1.0)]);
    }

    #[test]
    fn test_select_columns() {
        let frame = FeatureFrame::new()
            .with_column("a", vec![1.0.into(), 2.0.into()])
            .unwrap()
            .with_column("b", vec!["x".into(), "y".into()])
            .unwrap();
        let picked = frame.select_columns(&["b"]).unwrap();
        assert_eq!(picked.names(), &["b".to_string()]);
        assert_eq!(picked.n_rows(), 2);
        assert!(matches!(
            frame.select_columns(&["c"]),
            Err(PreprocessingError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_drop_column() {
        let mut frame = FeatureFrame::new()
            .with_column("ID_Membre", vec!["m1".into()])
            .unwrap()
            .with_column("Age", vec![20.0.into()])
            .unwrap();
        let ids = frame.drop_column("ID_Membre").unwrap();
        assert_eq!(ids, vec![Cell::from("m1")]);
        assert_eq!(frame.n_columns(), 1);
        assert!(frame.drop_column("ID_Membre").is_none());
    }
}
