//! Result log decoding
//!
//! After a run the controller writes a binary log to its ramdisk: format
//! version, run timestamp, a comma-separated column header and then a flat
//! row-major array of f32 samples. Column 0 is elapsed time in seconds, column 1
//! the executing command number, and the remaining columns joint angles in
//! degrees (repeated per task for multimove runs).

use crate::program::MOTION_PROGRAM_FILE_VERSION;
use crate::wire::WireReader;
use crate::{MotionProgramError, Result};
use serde::{Deserialize, Serialize};

/// Parsed result log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultLog {
    pub timestamp: String,
    pub column_headers: Vec<String>,
    /// Row-major samples, a whole number of `column_headers.len()` wide rows
    data: Vec<f64>,
}

impl ResultLog {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut r = WireReader::new(bytes);

        let version = r.read_num()?;
        if version != MOTION_PROGRAM_FILE_VERSION as f64 {
            return Err(MotionProgramError::Format(format!(
                "Incompatible result log version {} (expected {})",
                version, MOTION_PROGRAM_FILE_VERSION
            )));
        }

        let timestamp = r.read_str()?;
        let header = r.read_str()?;
        let column_headers: Vec<String> = header.split(',').map(|s| s.to_string()).collect();
        let columns = column_headers.len();

        let samples = r.rest();
        let row_bytes = columns * 4;
        if samples.len() % row_bytes != 0 {
            return Err(MotionProgramError::Format(format!(
                "Result log payload of {} bytes is not a whole number of {}-column rows",
                samples.len(),
                columns
            )));
        }

        let data = samples
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect();

        Ok(Self {
            timestamp,
            column_headers,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.data.len() / self.columns().max(1)
    }

    pub fn columns(&self) -> usize {
        self.column_headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_headers.iter().position(|h| h == name)
    }

    /// Flat row-major sample matrix
    pub fn samples(&self) -> &[f64] {
        &self.data
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        let columns = self.columns();
        let start = index.checked_mul(columns)?;
        self.data.get(start..start.checked_add(columns)?)
    }

    /// Iterate rows in sample order
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.columns().max(1))
    }

    /// All samples of one column
    pub fn column(&self, index: usize) -> Option<Vec<f64>> {
        if index >= self.columns() {
            return None;
        }
        Some(self.data.iter().skip(index).step_by(self.columns()).copied().collect())
    }

    pub fn column_by_name(&self, name: &str) -> Option<Vec<f64>> {
        self.column_index(name).and_then(|i| self.column(i))
    }

    /// Elapsed time column
    pub fn time(&self) -> Vec<f64> {
        self.column(0).unwrap_or_default()
    }

    /// Executing command number per sample
    pub fn cmd_nums(&self) -> Vec<f64> {
        self.column(1).unwrap_or_default()
    }
}
