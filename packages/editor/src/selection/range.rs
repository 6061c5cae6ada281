use serde::{Deserialize, Serialize};

use crate::content::FlowContent;
use crate::errors::FlowResult;
use crate::operation::{
    BatchOperation, FormatBox, FormatParagraph, FormatText, Operation, UnformatParagraph,
    UnformatText,
};
use crate::range::FlowRange;
use crate::selection::{FlowSelection, SelectionOps};
use crate::style::{BoxStyle, ParagraphStyle, TextStyle, LIST_LEVEL};
use crate::transform::{range_after_insertion, range_after_removal};

/// A span of flow, or a caret when collapsed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSelection {
    pub range: FlowRange,
}

impl RangeSelection {
    pub fn new(range: FlowRange) -> Self {
        Self { range }
    }

    fn selected(&self) -> Option<FlowRange> {
        (!self.range.is_collapsed()).then(|| self.range.forward())
    }
}

impl SelectionOps for RangeSelection {
    fn after_insertion(&self, inserted: FlowRange, mine: bool) -> Option<FlowSelection> {
        let range = if self.range.is_collapsed() && inserted.first() == self.range.first() {
            if mine {
                self.range.translate(inserted.size() as isize)
            } else {
                self.range
            }
        } else {
            range_after_insertion(self.range, inserted, false)
        };
        Some(RangeSelection::new(range).into())
    }

    fn after_removal(&self, removed: FlowRange, _mine: bool) -> Option<FlowSelection> {
        let range = range_after_removal(self.range, removed, true)?;
        Some(RangeSelection::new(range).into())
    }

    /// Replace the selected span with `content`
    fn insert(&self, content: &FlowContent) -> Option<Operation> {
        let insert = Operation::insert(self.range.first(), content.clone());
        match self.selected() {
            Some(range) => BatchOperation::from_vec(vec![Operation::remove(range), insert]),
            None => Some(insert),
        }
    }

    fn remove(&self) -> Option<Operation> {
        self.selected().map(Operation::remove)
    }

    fn format_text(&self, style: &TextStyle) -> Option<Operation> {
        let range = self.selected()?;
        Some(FormatText::new(range, style.clone()).into())
    }

    fn unformat_text(&self, style: &TextStyle) -> Option<Operation> {
        let range = self.selected()?;
        Some(UnformatText::new(range, style.clone()).into())
    }

    fn format_paragraph(&self, style: &ParagraphStyle) -> Option<Operation> {
        Some(FormatParagraph::new(self.range.forward(), style.clone()).into())
    }

    fn unformat_paragraph(&self, style: &ParagraphStyle) -> Option<Operation> {
        Some(UnformatParagraph::new(self.range.forward(), style.clone()).into())
    }

    fn increment_list_level(&self, content: &FlowContent, delta: i64) -> FlowResult<Option<Operation>> {
        let mut ops = Vec::new();
        for (at, style) in content.paragraph_styles(self.range)? {
            let level = (style.list_level() + delta).max(0);
            let unit = FlowRange::at(at, 1);
            if level > 0 {
                let style = ParagraphStyle::new().with(LIST_LEVEL, level);
                ops.push(FormatParagraph::new(unit, style).into());
            } else if style.get(LIST_LEVEL).is_some() {
                let style = ParagraphStyle::new().with(LIST_LEVEL, 0);
                ops.push(UnformatParagraph::new(unit, style).into());
            }
        }
        Ok(BatchOperation::from_vec(ops))
    }

    fn format_box(&self, style: &BoxStyle) -> Option<Operation> {
        let range = self.selected()?;
        Some(FormatBox::new(range, style.clone()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sel(anchor: usize, focus: usize) -> RangeSelection {
        RangeSelection::new(FlowRange::new(anchor, focus))
    }

    #[test]
    fn test_own_caret_tracks_its_insertion() {
        let caret = sel(4, 4);
        let inserted = FlowRange::new(4, 6);
        assert_eq!(
            caret.after_insertion(inserted, true),
            Some(FlowSelection::caret(6))
        );
        assert_eq!(
            caret.after_insertion(inserted, false),
            Some(FlowSelection::caret(4))
        );
    }

    #[test]
    fn test_range_survives_removal_as_caret() {
        assert_eq!(
            sel(3, 5).after_removal(FlowRange::new(2, 8), false),
            Some(FlowSelection::caret(2))
        );
        assert_eq!(
            sel(8, 3).after_removal(FlowRange::new(0, 2), false),
            Some(FlowSelection::range(FlowRange::new(6, 1)))
        );
    }

    #[test]
    fn test_insert_replaces_selection() {
        let op = sel(5, 2).insert(&FlowContent::from_text("x")).unwrap();
        let content = FlowContent::from_text("abcdefg");
        let after = op.apply_to_content(&content, None).unwrap();
        assert_eq!(after.plain_text(), "abxfg");
    }

    #[test]
    fn test_caret_commands() {
        let caret = sel(3, 3);
        assert_eq!(caret.remove(), None);
        assert_eq!(caret.format_text(&TextStyle::new().with("bold", true)), None);
        assert!(caret
            .format_paragraph(&ParagraphStyle::new().with("align", "center"))
            .is_some());
    }

    #[test]
    fn test_list_levels() {
        let content = FlowContent::from_text("a\nb\nc\n");
        let indented = sel(0, 3).increment_list_level(&content, 1).unwrap().unwrap();
        let after = indented.apply_to_content(&content, None).unwrap();
        let levels: Vec<i64> = after
            .paragraph_styles(FlowRange::new(0, 6))
            .unwrap()
            .iter()
            .map(|(_, style)| style.list_level())
            .collect();
        assert_eq!(levels, vec![1, 1, 0]);

        let outdented = sel(0, 1)
            .increment_list_level(&after, -3)
            .unwrap()
            .unwrap();
        let back = outdented.apply_to_content(&after, None).unwrap();
        assert_eq!(back.paragraph_styles(FlowRange::collapsed(0)).unwrap()[0].1, ParagraphStyle::new());

        assert_eq!(sel(4, 4).increment_list_level(&content, -1).unwrap(), None);
    }
}
