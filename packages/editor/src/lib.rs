//! # Flowdoc Editor
//!
//! Operational-transform core for collaborative rich-flow documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ range / cell / transform                    │
//! │  - Directional ranges over a flat flow      │
//! │  - Index arithmetic for concurrent edits    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ content: immutable flow of typed nodes      │
//! │  - Text runs, breaks, images, boxes, tables │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ operation: apply / invert / merge /         │
//! │            transform                        │
//! │ selection: commands producing operations    │
//! │ undo_stack: per-client history              │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Content is immutable**: every edit returns a new value
//! 2. **Operations are the only channel**: selections never touch content
//! 3. **Transform, don't lock**: concurrent operations are rebased past each
//!    other and the server's order decides ties
//!
//! ## Usage
//!
//! ```rust,ignore
//! use flowdoc_editor::{FlowContent, FlowRange, Operation};
//!
//! let content = FlowContent::from_text("hello there!");
//! let op = Operation::remove(FlowRange::new(2, 9));
//! let inverse = op.invert(&content)?.unwrap();
//!
//! let edited = op.apply_to_content(&content, None)?;
//! assert_eq!(inverse.apply_to_content(&edited, None)?, content);
//! ```

mod cell;
mod content;
mod errors;
mod operation;
mod range;
mod selection;
mod style;
mod transform;
mod undo_stack;

pub use cell::{CellPosition, CellRange};
pub use content::{FlowContent, FlowNode, ImageSource, Peek, TableCell, TableContent};
pub use errors::{FlowError, FlowResult};
pub use operation::{
    BatchOperation, CompleteUpload, EditBox, EditTableCell, FlowOp, FormatBox, FormatParagraph,
    FormatTable, FormatTableColumn, FormatText, InsertContent, InsertTableColumn, InsertTableRow,
    MergeTableCell, Operation, RemoveRange, RemoveTableColumn, RemoveTableRow, ResetContent,
    SplitTableCell, UnformatBox, UnformatParagraph, UnformatTable, UnformatTableColumn,
    UnformatText,
};
pub use range::FlowRange;
pub use selection::{
    BoxSelection, FlowSelection, RangeSelection, SelectionOps, TableCellSelection, TableSelection,
};
pub use style::{
    BoxStyle, FlowTheme, ParagraphStyle, TableColumnStyle, TableStyle, TextStyle, LIST_LEVEL,
};
pub use transform::{
    node_after_insertion, node_after_removal, point_after_insertion, point_after_removal,
    range_after_insertion, range_after_removal, EditKind, FlowEdit, TableAxis, TableEdit,
};
pub use undo_stack::{UndoEntry, UndoStack};
