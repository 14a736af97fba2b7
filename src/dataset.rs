//! Labeled point datasets for the classification task.
//!
//! A dataset is a whitespace-delimited text resource of `x y label`
//! records, one per line. The leading records form the held-out test
//! partition and the remainder the training partition; both are loaded
//! once and stay immutable for the run.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One labeled observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Case {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
    /// Class label.
    pub label: bool,
}

/// A dataset split into test and train partitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Held-out test cases: the file's leading records.
    pub test: Vec<Case>,
    /// Training cases: everything after the test partition.
    pub train: Vec<Case>,
}

impl Dataset {
    /// Load a dataset file, reserving the first `test_size` records for
    /// the test partition.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read, a record fails to
    /// parse, or too few records remain for a training partition.
    pub fn load(path: &Path, test_size: usize) -> Result<Self, DatasetError> {
        let text = fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, test_size)
    }

    /// Parse delimited records, reserving the first `test_size` for the
    /// test partition. Blank lines are skipped; trailing fields beyond
    /// the label are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error on a malformed record (with its line number) or
    /// when no records remain for the training partition.
    pub fn parse(text: &str, test_size: usize) -> Result<Self, DatasetError> {
        let mut cases = Vec::new();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let case = parse_record(line).map_err(|reason| DatasetError::Record {
                line: number + 1,
                reason,
            })?;
            cases.push(case);
        }

        if cases.len() <= test_size {
            return Err(DatasetError::TooSmall {
                records: cases.len(),
                test_size,
            });
        }

        let train = cases.split_off(test_size);
        Ok(Self { test: cases, train })
    }
}

/// Parse one `x y label` record.
fn parse_record(line: &str) -> Result<Case, RecordError> {
    let mut fields = line.split_whitespace();
    let x = next_number(&mut fields)?;
    let y = next_number(&mut fields)?;
    let label = match fields.next().ok_or(RecordError::MissingField)? {
        "0" => false,
        "1" => true,
        _ => return Err(RecordError::BadLabel),
    };
    Ok(Case { x, y, label })
}

fn next_number<'a, I: Iterator<Item = &'a str>>(fields: &mut I) -> Result<f32, RecordError> {
    fields
        .next()
        .ok_or(RecordError::MissingField)?
        .parse::<f32>()
        .map_err(|_| RecordError::BadNumber)
}

/// Why a single record failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    /// Fewer than three fields.
    MissingField,
    /// A coordinate was not a number.
    BadNumber,
    /// The label was neither `0` nor `1`.
    BadLabel,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::MissingField => write!(f, "fewer than three fields"),
            RecordError::BadNumber => write!(f, "coordinate is not a number"),
            RecordError::BadLabel => write!(f, "label must be 0 or 1"),
        }
    }
}

/// Error loading or parsing a dataset.
#[derive(Debug)]
pub enum DatasetError {
    /// The file could not be read.
    Io {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// A record failed to parse.
    Record {
        /// One-based line number.
        line: usize,
        /// What was wrong with the record.
        reason: RecordError,
    },
    /// Not enough records to leave a non-empty training partition.
    TooSmall {
        /// Records found in the file.
        records: usize,
        /// Requested test partition size.
        test_size: usize,
    },
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetError::Io { path, source } => {
                write!(f, "cannot read {}: {source}", path.display())
            }
            DatasetError::Record { line, reason } => {
                write!(f, "bad record on line {line}: {reason}")
            }
            DatasetError::TooSmall { records, test_size } => write!(
                f,
                "{records} records cannot fill a {test_size}-record test partition \
                 and a non-empty training partition"
            ),
        }
    }
}

impl std::error::Error for DatasetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DatasetError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
