//! Error types for the editor

use thiserror::Error;

use crate::range::FlowRange;

/// Errors raised while validating or applying operations.
///
/// Apart from [`FlowError::InvalidRange`] and [`FlowError::InvalidCell`],
/// which come from malformed input, every variant signals that an operation
/// disagrees with the content it was applied to. History is assumed to be
/// self-consistent, so callers should treat those as bugs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid cell address: {0}")]
    InvalidCell(String),

    #[error("Position {position} is out of bounds (content size is {size})")]
    OutOfBounds { position: usize, size: usize },

    #[error("Range {range} is out of bounds (content size is {size})")]
    RangeOutOfBounds { range: FlowRange, size: usize },

    #[error("Expected {expected} at position {position}")]
    UnexpectedNode {
        position: usize,
        expected: &'static str,
    },

    #[error("Position {0} splits a multi-character node")]
    NotSplittable(usize),

    #[error("Table cell {cell} is outside the {rows}x{columns} table")]
    TableBounds {
        cell: String,
        rows: usize,
        columns: usize,
    },

    #[error("Invalid table: {0}")]
    InvalidTable(String),
}

pub type FlowResult<T> = Result<T, FlowError>;
