use serde::{Deserialize, Serialize};

use crate::cell::{CellPosition, CellRange};
use crate::content::FlowContent;
use crate::errors::{FlowError, FlowResult};
use crate::range::FlowRange;
use crate::style::TableColumnStyle;
use crate::transform::{range_after_insertion, range_after_removal};

/// One cell of a table grid.
///
/// A cell with a span greater than one anchors a merged region; the cells it
/// covers keep their own content but are hidden while the merge lasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub content: FlowContent,

    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub colspan: usize,

    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub rowspan: usize,
}

fn one() -> usize {
    1
}

fn is_one(value: &usize) -> bool {
    *value == 1
}

impl Default for TableCell {
    fn default() -> Self {
        Self::new(FlowContent::default())
    }
}

impl TableCell {
    pub fn new(content: FlowContent) -> Self {
        Self {
            content,
            colspan: 1,
            rowspan: 1,
        }
    }

    pub fn is_merged(&self) -> bool {
        self.colspan > 1 || self.rowspan > 1
    }
}

/// Rectangular grid of cells plus one style record per column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableData")]
pub struct TableContent {
    columns: Vec<TableColumnStyle>,
    rows: Vec<Vec<TableCell>>,
}

#[derive(Deserialize)]
struct TableData {
    columns: Vec<TableColumnStyle>,
    rows: Vec<Vec<TableCell>>,
}

impl TryFrom<TableData> for TableContent {
    type Error = FlowError;

    fn try_from(data: TableData) -> Result<Self, Self::Error> {
        let table = TableContent {
            columns: data.columns,
            rows: data.rows,
        };
        table.validate()?;
        Ok(table)
    }
}

impl TableContent {
    /// Table of empty, unmerged cells
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            columns: vec![TableColumnStyle::default(); columns],
            rows: vec![vec![TableCell::default(); columns]; rows],
        }
    }

    pub fn from_rows(rows: Vec<Vec<TableCell>>) -> FlowResult<Self> {
        let columns = rows.first().map(Vec::len).unwrap_or(0);
        let table = Self {
            columns: vec![TableColumnStyle::default(); columns],
            rows,
        };
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> FlowResult<()> {
        for (r, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(FlowError::InvalidTable(format!(
                    "row {} has {} cells, expected {}",
                    r + 1,
                    row.len(),
                    self.columns.len()
                )));
            }
            for (c, cell) in row.iter().enumerate() {
                if cell.colspan == 0 || cell.rowspan == 0 {
                    return Err(FlowError::InvalidTable(format!(
                        "cell {} has an empty span",
                        CellPosition::new(r, c)
                    )));
                }
                if r + cell.rowspan > self.rows.len() || c + cell.colspan > self.columns.len() {
                    return Err(FlowError::InvalidTable(format!(
                        "cell {} spans past the table edge",
                        CellPosition::new(r, c)
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn rows(&self) -> &[Vec<TableCell>] {
        &self.rows
    }

    fn bounds_error(&self, cell: impl ToString) -> FlowError {
        FlowError::TableBounds {
            cell: cell.to_string(),
            rows: self.row_count(),
            columns: self.column_count(),
        }
    }

    fn check_cell(&self, cell: CellPosition) -> FlowResult<()> {
        if cell.row < self.row_count() && cell.column < self.column_count() {
            Ok(())
        } else {
            Err(self.bounds_error(cell))
        }
    }

    fn check_range(&self, range: CellRange) -> FlowResult<()> {
        let last = range.last();
        if last.row < self.row_count() && last.column < self.column_count() {
            Ok(())
        } else {
            Err(self.bounds_error(range))
        }
    }

    pub fn cell(&self, cell: CellPosition) -> FlowResult<&TableCell> {
        self.check_cell(cell)?;
        Ok(&self.rows[cell.row][cell.column])
    }

    pub fn with_cell_content(&self, cell: CellPosition, content: FlowContent) -> FlowResult<Self> {
        self.check_cell(cell)?;
        let mut table = self.clone();
        table.rows[cell.row][cell.column].content = content;
        Ok(table)
    }

    pub fn column_style(&self, column: usize) -> FlowResult<&TableColumnStyle> {
        self.columns
            .get(column)
            .ok_or_else(|| self.bounds_error(format!("column {}", column + 1)))
    }

    pub fn with_column_style(&self, column: usize, style: TableColumnStyle) -> FlowResult<Self> {
        self.column_style(column)?;
        let mut table = self.clone();
        table.columns[column] = style;
        Ok(table)
    }

    /// Every merged region, addressed by its anchor cell
    pub fn merged_regions(&self) -> Vec<CellRange> {
        let mut regions = Vec::new();
        for (r, row) in self.rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if cell.is_merged() {
                    regions.push(CellRange::new(
                        CellPosition::new(r, c),
                        CellPosition::new(r + cell.rowspan - 1, c + cell.colspan - 1),
                    ));
                }
            }
        }
        regions
    }

    pub fn insert_rows(&self, index: usize, count: usize) -> FlowResult<Self> {
        if index > self.row_count() {
            return Err(self.bounds_error(format!("row {}", index + 1)));
        }
        let mut table = self.clone();
        let inserted = FlowRange::at(index, count);
        for (r, row) in table.rows.iter_mut().enumerate() {
            for cell in row.iter_mut() {
                cell.rowspan = range_after_insertion(FlowRange::at(r, cell.rowspan), inserted, false).size();
            }
        }
        let blank = vec![TableCell::default(); self.column_count()];
        table
            .rows
            .splice(index..index, std::iter::repeat(blank).take(count));
        Ok(table)
    }

    pub fn remove_rows(&self, index: usize, count: usize) -> FlowResult<Self> {
        if index + count > self.row_count() {
            return Err(self.bounds_error(format!("row {}", index + count)));
        }
        let mut table = self.clone();
        let removed = FlowRange::at(index, count);
        for (r, row) in table.rows.iter_mut().enumerate() {
            for cell in row.iter_mut() {
                cell.rowspan = range_after_removal(FlowRange::at(r, cell.rowspan), removed, false)
                    .map(|span| span.size().max(1))
                    .unwrap_or(1);
            }
        }
        table.rows.drain(index..index + count);
        Ok(table)
    }

    pub fn insert_columns(&self, index: usize, count: usize) -> FlowResult<Self> {
        if index > self.column_count() {
            return Err(self.bounds_error(format!("column {}", index + 1)));
        }
        let mut table = self.clone();
        let inserted = FlowRange::at(index, count);
        for row in table.rows.iter_mut() {
            for (c, cell) in row.iter_mut().enumerate() {
                cell.colspan = range_after_insertion(FlowRange::at(c, cell.colspan), inserted, false).size();
            }
            row.splice(index..index, std::iter::repeat(TableCell::default()).take(count));
        }
        table.columns.splice(
            index..index,
            std::iter::repeat(TableColumnStyle::default()).take(count),
        );
        Ok(table)
    }

    pub fn remove_columns(&self, index: usize, count: usize) -> FlowResult<Self> {
        if index + count > self.column_count() {
            return Err(self.bounds_error(format!("column {}", index + count)));
        }
        let mut table = self.clone();
        let removed = FlowRange::at(index, count);
        for row in table.rows.iter_mut() {
            for (c, cell) in row.iter_mut().enumerate() {
                cell.colspan = range_after_removal(FlowRange::at(c, cell.colspan), removed, false)
                    .map(|span| span.size().max(1))
                    .unwrap_or(1);
            }
            row.drain(index..index + count);
        }
        table.columns.drain(index..index + count);
        Ok(table)
    }

    /// Merge a rectangular region into its top-left cell
    pub fn merge(&self, range: CellRange) -> FlowResult<Self> {
        self.check_range(range)?;
        let mut table = self.clone();
        for cell in range.cells() {
            let target = &mut table.rows[cell.row][cell.column];
            target.rowspan = 1;
            target.colspan = 1;
        }
        let first = range.first();
        let anchor = &mut table.rows[first.row][first.column];
        anchor.rowspan = range.row_count();
        anchor.colspan = range.column_count();
        Ok(table)
    }

    /// Undo any merge anchored at `cell`
    pub fn split(&self, cell: CellPosition) -> FlowResult<Self> {
        self.check_cell(cell)?;
        let mut table = self.clone();
        let target = &mut table.rows[cell.row][cell.column];
        target.rowspan = 1;
        target.colspan = 1;
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(s: &str) -> CellPosition {
        s.parse().unwrap()
    }

    #[test]
    fn test_insert_rows_inside_merge_grows_it() {
        let table = TableContent::new(4, 3).merge("A1:B3".parse().unwrap()).unwrap();
        let grown = table.insert_rows(1, 2).unwrap();
        assert_eq!(grown.row_count(), 6);
        assert_eq!(grown.cell(cell("A1")).unwrap().rowspan, 5);

        let below = table.insert_rows(3, 1).unwrap();
        assert_eq!(below.cell(cell("A1")).unwrap().rowspan, 3);
    }

    #[test]
    fn test_remove_columns_shrinks_merge() {
        let table = TableContent::new(2, 4).merge("B1:D2".parse().unwrap()).unwrap();
        let shrunk = table.remove_columns(2, 1).unwrap();
        assert_eq!(shrunk.column_count(), 3);
        assert_eq!(shrunk.cell(cell("B1")).unwrap().colspan, 2);

        let anchor_gone = table.remove_columns(1, 1).unwrap();
        assert!(anchor_gone.merged_regions().is_empty());
    }

    #[test]
    fn test_merge_and_split() {
        let table = TableContent::new(3, 3);
        let merged = table.merge("C3:B2".parse().unwrap()).unwrap();
        assert_eq!(merged.merged_regions(), vec!["B2:C3".parse().unwrap()]);
        assert_eq!(merged.split(cell("B2")).unwrap(), table);
    }

    #[test]
    fn test_out_of_bounds_cells() {
        let table = TableContent::new(2, 2);
        assert!(matches!(
            table.cell(cell("C1")),
            Err(FlowError::TableBounds { rows: 2, columns: 2, .. })
        ));
        assert!(table.merge("A1:A3".parse().unwrap()).is_err());
        assert!(table.remove_rows(1, 2).is_err());
    }

    #[test]
    fn test_rejects_ragged_tables() {
        let json = r#"{"columns":[{},{}],"rows":[[{}],[{},{}]]}"#;
        assert!(serde_json::from_str::<TableContent>(json).is_err());

        let json = r#"{"columns":[{},{}],"rows":[[{"colspan":3},{}]]}"#;
        assert!(serde_json::from_str::<TableContent>(json).is_err());

        let json = r#"{"columns":[{},{}],"rows":[[{},{}]]}"#;
        let table: TableContent = serde_json::from_str(json).unwrap();
        assert_eq!(table, TableContent::new(1, 2));
    }
}
