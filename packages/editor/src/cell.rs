//! # Table Cell Addressing
//!
//! Cells are addressed spreadsheet-style: the column is written as base-26
//! letters (`A`..`Z`, `AA`, ...) and the row as a 1-based decimal, so `B7`
//! is column 1, row 6 in zero-based terms.
//!
//! A [`CellRange`] is the two-dimensional analogue of a
//! [`FlowRange`](crate::FlowRange). Its row and column spans project onto
//! flow ranges so that table structure transforms reuse the same interval
//! arithmetic as flow positions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::FlowError;
use crate::range::FlowRange;

/// Zero-based `(row, column)` address of a table cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellPosition {
    pub row: usize,
    pub column: usize,
}

impl CellPosition {
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    pub fn parse(input: &str) -> Result<Self, FlowError> {
        let split = input
            .find(|c: char| !c.is_ascii_uppercase())
            .unwrap_or(input.len());
        let (letters, digits) = input.split_at(split);

        if letters.is_empty() || digits.is_empty() {
            return Err(FlowError::InvalidCell(input.to_string()));
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(FlowError::InvalidCell(input.to_string()));
        }

        let mut column: usize = 0;
        for c in letters.chars() {
            column = column
                .checked_mul(26)
                .and_then(|v| v.checked_add((c as u8 - b'A') as usize + 1))
                .ok_or_else(|| FlowError::InvalidCell(input.to_string()))?;
        }

        let row: usize = digits
            .parse()
            .map_err(|_| FlowError::InvalidCell(input.to_string()))?;
        if row == 0 {
            return Err(FlowError::InvalidCell(input.to_string()));
        }

        Ok(Self::new(row - 1, column - 1))
    }

    /// Column index rendered as base-26 letters
    pub fn column_name(&self) -> String {
        let mut letters = Vec::new();
        let mut n = self.column + 1;
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push((b'A' + rem as u8) as char);
            n = (n - 1) / 26;
        }
        letters.iter().rev().collect()
    }
}

impl fmt::Display for CellPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_name(), self.row + 1)
    }
}

impl FromStr for CellPosition {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CellPosition {
    type Error = FlowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CellPosition> for String {
    fn from(cell: CellPosition) -> Self {
        cell.to_string()
    }
}

/// Rectangular, directional selection of table cells.
///
/// Both corners are inclusive. Encoded as `"A1:C3"`; a single cell may be
/// written as `"B2"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellRange {
    anchor: CellPosition,
    focus: CellPosition,
}

impl CellRange {
    pub const fn new(anchor: CellPosition, focus: CellPosition) -> Self {
        Self { anchor, focus }
    }

    pub const fn single(cell: CellPosition) -> Self {
        Self::new(cell, cell)
    }

    pub fn parse(input: &str) -> Result<Self, FlowError> {
        match input.split_once(':') {
            Some((anchor, focus)) => Ok(Self::new(anchor.parse()?, focus.parse()?)),
            None => Ok(Self::single(input.parse()?)),
        }
    }

    /// Rebuild a cell range from its row and column projections.
    ///
    /// Returns `None` when either projection is empty.
    pub fn from_axes(rows: FlowRange, columns: FlowRange) -> Option<Self> {
        if rows.is_collapsed() || columns.is_collapsed() {
            return None;
        }
        let (anchor_row, focus_row) = axis_ends(rows);
        let (anchor_column, focus_column) = axis_ends(columns);
        Some(Self::new(
            CellPosition::new(anchor_row, anchor_column),
            CellPosition::new(focus_row, focus_column),
        ))
    }

    pub fn anchor(&self) -> CellPosition {
        self.anchor
    }

    pub fn focus(&self) -> CellPosition {
        self.focus
    }

    /// Top-left corner
    pub fn first(&self) -> CellPosition {
        CellPosition::new(
            self.anchor.row.min(self.focus.row),
            self.anchor.column.min(self.focus.column),
        )
    }

    /// Bottom-right corner
    pub fn last(&self) -> CellPosition {
        CellPosition::new(
            self.anchor.row.max(self.focus.row),
            self.anchor.column.max(self.focus.column),
        )
    }

    /// Row span as a flow range, directed like the cell range
    pub fn row_range(&self) -> FlowRange {
        FlowRange::from_bounds(
            self.first().row,
            self.last().row + 1,
            self.anchor.row > self.focus.row,
        )
    }

    /// Column span as a flow range, directed like the cell range
    pub fn column_range(&self) -> FlowRange {
        FlowRange::from_bounds(
            self.first().column,
            self.last().column + 1,
            self.anchor.column > self.focus.column,
        )
    }

    pub fn row_count(&self) -> usize {
        self.last().row - self.first().row + 1
    }

    pub fn column_count(&self) -> usize {
        self.last().column - self.first().column + 1
    }

    pub fn is_single_cell(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn contains(&self, cell: CellPosition) -> bool {
        let (first, last) = (self.first(), self.last());
        cell.row >= first.row
            && cell.row <= last.row
            && cell.column >= first.column
            && cell.column <= last.column
    }

    /// All covered cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = CellPosition> {
        let (first, last) = (self.first(), self.last());
        (first.row..=last.row).flat_map(move |row| {
            (first.column..=last.column).map(move |column| CellPosition::new(row, column))
        })
    }
}

fn axis_ends(range: FlowRange) -> (usize, usize) {
    if range.is_backward() {
        (range.last() - 1, range.first())
    } else {
        (range.first(), range.last() - 1)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_cell() {
            write!(f, "{}", self.anchor)
        } else {
            write!(f, "{}:{}", self.anchor, self.focus)
        }
    }
}

impl FromStr for CellRange {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CellRange {
    type Error = FlowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CellRange> for String {
    fn from(range: CellRange) -> Self {
        range.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell_addresses() {
        assert_eq!("A1".parse::<CellPosition>().unwrap(), CellPosition::new(0, 0));
        assert_eq!("B7".parse::<CellPosition>().unwrap(), CellPosition::new(6, 1));
        assert_eq!("Z2".parse::<CellPosition>().unwrap(), CellPosition::new(1, 25));
        assert_eq!("AA10".parse::<CellPosition>().unwrap(), CellPosition::new(9, 26));
    }

    #[test]
    fn test_format_cell_addresses() {
        assert_eq!(CellPosition::new(6, 1).to_string(), "B7");
        assert_eq!(CellPosition::new(0, 26).to_string(), "AA1");
        assert_eq!(CellPosition::new(0, 701).to_string(), "ZZ1");
        assert_eq!(CellPosition::new(0, 702).to_string(), "AAA1");
    }

    #[test]
    fn test_reject_malformed_addresses() {
        for bad in ["", "A", "7", "A0", "a1", "A1B", "1A", "A-1"] {
            assert!(
                matches!(CellPosition::parse(bad), Err(FlowError::InvalidCell(_))),
                "{bad} should not parse"
            );
        }
        assert!(serde_json::from_str::<CellRange>("\"A1:\"").is_err());
    }

    #[test]
    fn test_range_projections() {
        let range: CellRange = "C4:A2".parse().unwrap();
        assert_eq!(range.first(), CellPosition::new(1, 0));
        assert_eq!(range.last(), CellPosition::new(3, 2));
        assert_eq!(range.row_range(), FlowRange::new(4, 1));
        assert_eq!(range.column_range(), FlowRange::new(3, 0));
        assert_eq!(
            CellRange::from_axes(range.row_range(), range.column_range()),
            Some(range)
        );
        assert_eq!(range.cells().count(), 9);
    }

    #[test]
    fn test_range_wire_format() {
        let range: CellRange = serde_json::from_str("\"A1:B2\"").unwrap();
        assert_eq!(range.row_count(), 2);
        assert_eq!(serde_json::to_string(&range).unwrap(), "\"A1:B2\"");
        let single: CellRange = serde_json::from_str("\"B2\"").unwrap();
        assert!(single.is_single_cell());
    }
}
