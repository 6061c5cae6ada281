//! Range formatting operations.
//!
//! Formatting never moves content, so these never affect the transform of
//! another operation. Their own ranges absorb insertions at either edge.

use serde::{Deserialize, Serialize};

use crate::content::FlowContent;
use crate::errors::FlowResult;
use crate::operation::{BatchOperation, FlowOp, Operation};
use crate::range::FlowRange;
use crate::style::{BoxStyle, FlowTheme, ParagraphStyle, TextStyle};
use crate::transform::{range_after_insertion, range_after_removal};

macro_rules! range_format_ops {
    (
        $format:ident, $unformat:ident, $style:ty,
        name: ($format_name:literal, $unformat_name:literal),
        apply: ($apply:ident, $unapply:ident),
        styles: |$content:ident, $range:ident| $styles:expr
    ) => {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $format {
            pub range: FlowRange,
            pub style: $style,
        }

        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $unformat {
            pub range: FlowRange,
            pub style: $style,
        }

        impl $format {
            pub fn new(range: FlowRange, style: $style) -> Self {
                Self { range, style }
            }
        }

        impl $unformat {
            pub fn new(range: FlowRange, style: $style) -> Self {
                Self { range, style }
            }
        }

        impl FlowOp for $format {
            fn name(&self) -> &'static str {
                $format_name
            }

            fn apply_to_content(
                &self,
                content: &FlowContent,
                _theme: Option<&FlowTheme>,
            ) -> FlowResult<FlowContent> {
                content.$apply(self.range, &self.style)
            }

            fn invert(&self, before: &FlowContent) -> FlowResult<Option<Operation>> {
                let $content = before;
                let $range = self.range;
                let mut ops = Vec::new();
                for (span, prior) in $styles? {
                    let (remove, restore) = <$style>::restore_parts(&prior, &self.style);
                    if !remove.is_empty() {
                        ops.push($unformat::new(span, remove).into());
                    }
                    if !restore.is_empty() {
                        ops.push($format::new(span, restore).into());
                    }
                }
                Ok(Some(BatchOperation::from_vec(ops).unwrap_or_else(Operation::noop)))
            }

            fn merge_next(&self, next: &Operation) -> Option<Operation> {
                match next {
                    Operation::$format(next) if next.range == self.range => {
                        Some($format::new(self.range, self.style.merge(&next.style)).into())
                    }
                    _ => None,
                }
            }

            fn after_insertion(&self, inserted: FlowRange) -> Option<Operation> {
                let range = range_after_insertion(self.range, inserted, true);
                Some($format::new(range, self.style.clone()).into())
            }

            fn after_removal(&self, removed: FlowRange) -> Option<Operation> {
                let range = range_after_removal(self.range, removed, false)?;
                Some($format::new(range, self.style.clone()).into())
            }
        }

        impl FlowOp for $unformat {
            fn name(&self) -> &'static str {
                $unformat_name
            }

            fn apply_to_content(
                &self,
                content: &FlowContent,
                _theme: Option<&FlowTheme>,
            ) -> FlowResult<FlowContent> {
                content.$unapply(self.range, &self.style)
            }

            fn invert(&self, before: &FlowContent) -> FlowResult<Option<Operation>> {
                let $content = before;
                let $range = self.range;
                let mut ops = Vec::new();
                for (span, prior) in $styles? {
                    let restore = prior.pick(&self.style);
                    if !restore.is_empty() {
                        ops.push($format::new(span, restore).into());
                    }
                }
                Ok(Some(BatchOperation::from_vec(ops).unwrap_or_else(Operation::noop)))
            }

            fn merge_next(&self, next: &Operation) -> Option<Operation> {
                match next {
                    Operation::$unformat(next) if next.range == self.range => {
                        Some($unformat::new(self.range, self.style.merge(&next.style)).into())
                    }
                    _ => None,
                }
            }

            fn after_insertion(&self, inserted: FlowRange) -> Option<Operation> {
                let range = range_after_insertion(self.range, inserted, true);
                Some($unformat::new(range, self.style.clone()).into())
            }

            fn after_removal(&self, removed: FlowRange) -> Option<Operation> {
                let range = range_after_removal(self.range, removed, false)?;
                Some($unformat::new(range, self.style.clone()).into())
            }
        }
    };
}

/// Style records of single-position nodes, keyed by their unit range
fn unit_spans<S>(styles: Vec<(usize, S)>) -> Vec<(FlowRange, S)> {
    styles
        .into_iter()
        .map(|(at, style)| (FlowRange::at(at, 1), style))
        .collect()
}

range_format_ops!(
    FormatText, UnformatText, TextStyle,
    name: ("format_text", "unformat_text"),
    apply: (format_text, unformat_text),
    styles: |content, range| content.text_styles(range)
);

range_format_ops!(
    FormatParagraph, UnformatParagraph, ParagraphStyle,
    name: ("format_paragraph", "unformat_paragraph"),
    apply: (format_paragraph, unformat_paragraph),
    styles: |content, range| content.paragraph_styles(range).map(unit_spans)
);

range_format_ops!(
    FormatBox, UnformatBox, BoxStyle,
    name: ("format_box", "unformat_box"),
    apply: (format_box, unformat_box),
    styles: |content, range| content.box_styles(range).map(unit_spans)
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::FlowNode;

    fn bold() -> TextStyle {
        TextStyle::new().with("bold", true)
    }

    #[test]
    fn test_format_text_round_trip() {
        let content = FlowContent::from_nodes(vec![
            FlowNode::styled_text("ab", TextStyle::new().with("color", "red")),
            FlowNode::text("cd"),
        ]);
        let op = FormatText::new(
            FlowRange::new(1, 4),
            bold().with("color", "blue"),
        );

        let after = op.apply_to_content(&content, None).unwrap();
        let inverse = op.invert(&content).unwrap().unwrap();
        assert_eq!(inverse.apply_to_content(&after, None).unwrap(), content);
    }

    #[test]
    fn test_unformat_restores_removed_properties() {
        let content = FlowContent::from_nodes(vec![FlowNode::styled_text("abc", bold())]);
        let op = UnformatText::new(FlowRange::new(0, 2), bold());

        let after = op.apply_to_content(&content, None).unwrap();
        let inverse = op.invert(&content).unwrap().unwrap();
        assert_eq!(inverse, FormatText::new(FlowRange::new(0, 2), bold()).into());
        assert_eq!(inverse.apply_to_content(&after, None).unwrap(), content);
    }

    #[test]
    fn test_format_absorbs_edge_insertions() {
        let op = FormatText::new(FlowRange::new(2, 5), bold());
        assert_eq!(
            op.after_insertion(FlowRange::new(5, 7)),
            Some(FormatText::new(FlowRange::new(2, 7), bold()).into())
        );
        assert_eq!(op.after_removal(FlowRange::new(1, 6)), None);
    }

    #[test]
    fn test_paragraph_format_round_trip() {
        let content = FlowContent::from_text("ab\ncd\n");
        let heading = ParagraphStyle::new().with("variant", "h1");
        let op = FormatParagraph::new(FlowRange::new(0, 4), heading.clone());

        let after = op.apply_to_content(&content, None).unwrap();
        assert_eq!(
            after.paragraph_styles(FlowRange::new(0, 6)).unwrap(),
            vec![(2, heading.clone()), (5, heading)]
        );
        let inverse = op.invert(&content).unwrap().unwrap();
        assert_eq!(inverse.apply_to_content(&after, None).unwrap(), content);
    }

    #[test]
    fn test_merge_same_range_formats() {
        let op = FormatText::new(FlowRange::new(0, 3), bold());
        let italic = TextStyle::new().with("italic", true);
        let merged = op.merge_next(&FormatText::new(FlowRange::new(0, 3), italic.clone()).into());
        assert_eq!(
            merged,
            Some(FormatText::new(FlowRange::new(0, 3), bold().merge(&italic)).into())
        );
        assert_eq!(
            op.merge_next(&FormatText::new(FlowRange::new(0, 4), italic).into()),
            None
        );
    }
}
