//! Matrix inputs: literals, nested rows, owned arrays and text files.
//!
//! Purpose
//! -------
//! Turn every accepted matrix form into an owned `Array2<f64>` before any
//! structural validation happens. Parsing is purely syntactic: squareness,
//! non-negativity and substochasticity are checked later by the
//! decomposition layer.
//!
//! Key behaviors
//! -------------
//! - `Literal`: rows separated by `;` or newlines, columns by whitespace
//!   and/or commas (`"0.1 2; 0.4 0.8"`, `"0.1, 2\n0.4, 0.8"`).
//! - `Rows`: nested sequences; every row must have the same length.
//! - `File`: one row per line, configurable delimiter and comment prefixes
//!   (see [`LoadOptions`]); a leading `~` expands to `$HOME`.
//!
//! Conventions
//! -----------
//! - Empty rows produced by trailing separators are ignored.
//! - Errors carry the offending text or path so they can be reported as-is.
use std::path::{Path, PathBuf};

use ndarray::Array2;

use crate::population::{
    core::options::LoadOptions,
    errors::{MPMError, MPMResult},
};

/// One of the accepted ways of specifying a matrix.
#[derive(Debug, Clone, PartialEq)]
pub enum MatrixInput {
    /// Text literal such as `"0.1 2; 0.4 0.8"`.
    Literal(String),
    /// Nested rows.
    Rows(Vec<Vec<f64>>),
    /// Already materialised array.
    Array(Array2<f64>),
    /// Path to a text file with one row per line.
    File(PathBuf),
}

impl MatrixInput {
    /// Materialise the input as an owned array.
    ///
    /// Parameters
    /// ----------
    /// - `name`: `&'static str`
    ///   Matrix name used in error messages (`"A"`, `"S"`, `"F"`).
    /// - `load`: `&LoadOptions`
    ///   File format options; ignored for in-memory inputs.
    ///
    /// Errors
    /// ------
    /// - [`MPMError::InvalidLiteral`] for unparseable tokens.
    /// - [`MPMError::RaggedRows`] when rows differ in length.
    /// - [`MPMError::EmptyMatrix`] when no entries were found.
    /// - [`MPMError::Io`] when the file cannot be read.
    pub fn to_array(&self, name: &'static str, load: &LoadOptions) -> MPMResult<Array2<f64>> {
        match self {
            MatrixInput::Literal(text) => parse_literal(name, text),
            MatrixInput::Rows(rows) => rows_to_array(name, rows.clone()),
            MatrixInput::Array(arr) => {
                if arr.is_empty() {
                    return Err(MPMError::EmptyMatrix { name });
                }
                Ok(arr.clone())
            }
            MatrixInput::File(path) => load_file(name, path, load),
        }
    }
}

impl From<&str> for MatrixInput {
    fn from(text: &str) -> Self {
        MatrixInput::Literal(text.to_string())
    }
}

impl From<String> for MatrixInput {
    fn from(text: String) -> Self {
        MatrixInput::Literal(text)
    }
}

impl From<Vec<Vec<f64>>> for MatrixInput {
    fn from(rows: Vec<Vec<f64>>) -> Self {
        MatrixInput::Rows(rows)
    }
}

impl From<Array2<f64>> for MatrixInput {
    fn from(arr: Array2<f64>) -> Self {
        MatrixInput::Array(arr)
    }
}

impl From<PathBuf> for MatrixInput {
    fn from(path: PathBuf) -> Self {
        MatrixInput::File(path)
    }
}

impl From<f64> for MatrixInput {
    fn from(value: f64) -> Self {
        MatrixInput::Rows(vec![vec![value]])
    }
}

fn parse_token(text: &str, token: &str) -> MPMResult<f64> {
    token.parse::<f64>().map_err(|_| MPMError::InvalidLiteral {
        source: text.to_string(),
        reason: format!("`{token}` is not a number"),
    })
}

/// Parse a `;`/newline separated literal.
pub fn parse_literal(name: &'static str, text: &str) -> MPMResult<Array2<f64>> {
    let mut rows = Vec::new();
    for line in text.split([';', '\n']) {
        let tokens: Vec<&str> =
            line.split(|c: char| c.is_whitespace() || c == ',').filter(|t| !t.is_empty()).collect();
        if tokens.is_empty() {
            continue;
        }
        let row = tokens.iter().map(|t| parse_token(text, t)).collect::<MPMResult<Vec<f64>>>()?;
        rows.push(row);
    }
    rows_to_array(name, rows)
}

/// Check rows for raggedness and pack them into an array.
pub fn rows_to_array(name: &'static str, rows: Vec<Vec<f64>>) -> MPMResult<Array2<f64>> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    if n_rows == 0 || n_cols == 0 {
        return Err(MPMError::EmptyMatrix { name });
    }
    let mut flat = Vec::with_capacity(n_rows * n_cols);
    for (i, row) in rows.into_iter().enumerate() {
        if row.len() != n_cols {
            return Err(MPMError::RaggedRows { row: i, expected: n_cols, actual: row.len() });
        }
        flat.extend(row);
    }
    Array2::from_shape_vec((n_rows, n_cols), flat).map_err(|e| MPMError::InvalidLiteral {
        source: name.to_string(),
        reason: e.to_string(),
    })
}

fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}

/// Load a matrix from a text file.
pub fn load_file(name: &'static str, path: &Path, load: &LoadOptions) -> MPMResult<Array2<f64>> {
    let path = expand_home(path);
    let display = path.display().to_string();
    let content = std::fs::read_to_string(&path)
        .map_err(|e| MPMError::Io { path: display.clone(), reason: e.to_string() })?;

    let mut rows = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || load.comment_prefixes.iter().any(|p| trimmed.starts_with(p.as_str()))
        {
            continue;
        }
        let tokens: Vec<&str> = match load.delimiter {
            Some(delim) => trimmed.split(delim).map(str::trim).collect(),
            None => trimmed.split_whitespace().collect(),
        };
        let row = tokens.iter().map(|t| parse_token(trimmed, t)).collect::<MPMResult<Vec<f64>>>()?;
        rows.push(row);
    }
    rows_to_array(name, rows)
}
