//! Operations that change the flow itself: insertion, removal, wholesale
//! replacement and upload completion.

use serde::{Deserialize, Serialize};

use crate::content::{FlowContent, FlowNode, ImageSource};
use crate::errors::FlowResult;
use crate::operation::{FlowOp, Operation};
use crate::range::FlowRange;
use crate::selection::FlowSelection;
use crate::style::FlowTheme;
use crate::transform::{
    node_after_insertion, node_after_removal, point_after_insertion, point_after_removal,
    range_after_insertion, range_after_removal,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertContent {
    pub position: usize,
    pub content: FlowContent,
}

impl InsertContent {
    pub fn new(position: usize, content: FlowContent) -> Self {
        Self { position, content }
    }

    /// Range the inserted content occupies once applied
    pub fn inserted_range(&self) -> FlowRange {
        FlowRange::at(self.position, self.content.size())
    }
}

impl FlowOp for InsertContent {
    fn name(&self) -> &'static str {
        "insert"
    }

    fn apply_to_content(
        &self,
        content: &FlowContent,
        theme: Option<&FlowTheme>,
    ) -> FlowResult<FlowContent> {
        match theme {
            Some(theme) => {
                let ambient = theme.ambient_text_style(&content.paragraph_style_at(self.position));
                let inserted = self.content.map_text_styles(|s| s.without_ambient(&ambient));
                content.insert(self.position, &inserted)
            }
            None => content.insert(self.position, &self.content),
        }
    }

    fn invert(&self, _before: &FlowContent) -> FlowResult<Option<Operation>> {
        Ok(Some(RemoveRange::new(self.inserted_range()).into()))
    }

    fn merge_next(&self, next: &Operation) -> Option<Operation> {
        let ours = self.inserted_range();
        match next {
            Operation::Insert(next) if next.position >= ours.first() && next.position <= ours.last() => {
                let content = self
                    .content
                    .insert(next.position - self.position, &next.content)
                    .ok()?;
                Some(InsertContent::new(self.position, content).into())
            }
            Operation::Remove(next) if ours.covers(&next.range) => {
                let local = next.range.forward().translate(-(self.position as isize));
                let content = self.content.remove(local).ok()?;
                if content.is_empty() {
                    return Some(Operation::noop());
                }
                Some(InsertContent::new(self.position, content).into())
            }
            _ => None,
        }
    }

    fn after_insertion(&self, inserted: FlowRange) -> Option<Operation> {
        let position = point_after_insertion(self.position, inserted, false);
        Some(InsertContent::new(position, self.content.clone()).into())
    }

    fn after_insertion_behind(&self, inserted: FlowRange) -> Option<Operation> {
        let position = point_after_insertion(self.position, inserted, true);
        Some(InsertContent::new(position, self.content.clone()).into())
    }

    fn after_removal(&self, removed: FlowRange) -> Option<Operation> {
        let position = point_after_removal(self.position, removed)?;
        Some(InsertContent::new(position, self.content.clone()).into())
    }

    fn apply_to_selection(&self, selection: &FlowSelection, mine: bool) -> Option<FlowSelection> {
        selection.after_insertion(self.inserted_range(), mine)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveRange {
    pub range: FlowRange,
}

impl RemoveRange {
    pub fn new(range: FlowRange) -> Self {
        Self { range }
    }
}

impl FlowOp for RemoveRange {
    fn name(&self) -> &'static str {
        "remove"
    }

    fn apply_to_content(
        &self,
        content: &FlowContent,
        _theme: Option<&FlowTheme>,
    ) -> FlowResult<FlowContent> {
        content.remove(self.range)
    }

    fn invert(&self, before: &FlowContent) -> FlowResult<Option<Operation>> {
        let removed = before.copy(self.range)?;
        Ok(Some(InsertContent::new(self.range.first(), removed).into()))
    }

    fn merge_next(&self, next: &Operation) -> Option<Operation> {
        let Operation::Remove(next) = next else {
            return None;
        };
        let (ours, theirs) = (self.range, next.range);
        if theirs.last() == ours.first() {
            // backspace
            Some(RemoveRange::new(FlowRange::new(theirs.first(), ours.last())).into())
        } else if theirs.first() == ours.first() {
            // forward delete
            Some(RemoveRange::new(ours.forward().inflate(theirs.size() as isize)).into())
        } else {
            None
        }
    }

    fn after_insertion(&self, inserted: FlowRange) -> Option<Operation> {
        Some(RemoveRange::new(range_after_insertion(self.range, inserted, false)).into())
    }

    fn after_removal(&self, removed: FlowRange) -> Option<Operation> {
        let range = range_after_removal(self.range, removed, false)?;
        Some(RemoveRange::new(range).into())
    }

    fn apply_to_selection(&self, selection: &FlowSelection, mine: bool) -> Option<FlowSelection> {
        selection.after_removal(self.range, mine)
    }
}

/// Replace the whole content.
///
/// A reset conceived concurrently with anything else wins: it survives every
/// transform and cancels every operation transformed against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetContent {
    pub content: FlowContent,
}

impl ResetContent {
    pub fn new(content: FlowContent) -> Self {
        Self { content }
    }
}

impl FlowOp for ResetContent {
    fn name(&self) -> &'static str {
        "reset"
    }

    fn apply_to_content(
        &self,
        _content: &FlowContent,
        _theme: Option<&FlowTheme>,
    ) -> FlowResult<FlowContent> {
        Ok(self.content.clone())
    }

    fn invert(&self, before: &FlowContent) -> FlowResult<Option<Operation>> {
        Ok(Some(ResetContent::new(before.clone()).into()))
    }

    fn merge_next(&self, next: &Operation) -> Option<Operation> {
        match next {
            Operation::Reset(_) => Some(next.clone()),
            _ => None,
        }
    }

    fn after_insertion(&self, _inserted: FlowRange) -> Option<Operation> {
        Some(self.clone().into())
    }

    fn after_removal(&self, _removed: FlowRange) -> Option<Operation> {
        Some(self.clone().into())
    }

    fn apply_to_selection(&self, _selection: &FlowSelection, _mine: bool) -> Option<FlowSelection> {
        None
    }
}

/// Swap a pending upload's placeholder url for the uploaded one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteUpload {
    pub position: usize,
    pub upload: String,
    pub url: String,
}

impl FlowOp for CompleteUpload {
    fn name(&self) -> &'static str {
        "complete_upload"
    }

    fn apply_to_content(
        &self,
        content: &FlowContent,
        _theme: Option<&FlowTheme>,
    ) -> FlowResult<FlowContent> {
        let (source, style) = content.image_at(self.position)?;
        if source.upload.as_deref() != Some(self.upload.as_str()) {
            return Ok(content.clone());
        }
        let image = FlowNode::Image {
            source: ImageSource {
                url: self.url.clone(),
                upload: None,
                ..source.clone()
            },
            style: style.clone(),
        };
        content.replace_node(self.position, image)
    }

    fn invert(&self, _before: &FlowContent) -> FlowResult<Option<Operation>> {
        Ok(None)
    }

    fn after_insertion(&self, inserted: FlowRange) -> Option<Operation> {
        let position = node_after_insertion(self.position, inserted)?;
        Some(CompleteUpload {
            position,
            ..self.clone()
        }
        .into())
    }

    fn after_removal(&self, removed: FlowRange) -> Option<Operation> {
        let position = node_after_removal(self.position, removed)?;
        Some(CompleteUpload {
            position,
            ..self.clone()
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::TextStyle;

    fn text(s: &str) -> FlowContent {
        FlowContent::from_text(s)
    }

    #[test]
    fn test_insert_strips_ambient_style() {
        let theme = FlowTheme {
            default_text: TextStyle::new().with("font", "serif"),
            ..Default::default()
        };
        let inserted = FlowContent::from_nodes(vec![FlowNode::styled_text(
            "x",
            TextStyle::new().with("font", "serif").with("bold", true),
        )]);

        let result = InsertContent::new(1, inserted)
            .apply_to_content(&text("ab"), Some(&theme))
            .unwrap();
        let styles = result.text_styles(FlowRange::new(1, 2)).unwrap();
        assert_eq!(styles[0].1, TextStyle::new().with("bold", true));
    }

    #[test]
    fn test_insert_absorbed_by_surrounding_removal() {
        let insert = InsertContent::new(4, text("xy"));
        assert_eq!(insert.after_removal(FlowRange::new(2, 6)), None);
        assert_eq!(
            insert.after_removal(FlowRange::new(4, 6)),
            Some(InsertContent::new(4, text("xy")).into())
        );
    }

    #[test]
    fn test_merge_typing() {
        let first = InsertContent::new(3, text("ab"));
        let merged = first.merge_next(&InsertContent::new(5, text("c")).into());
        assert_eq!(merged, Some(InsertContent::new(3, text("abc")).into()));

        let corrected = first.merge_next(&RemoveRange::new(FlowRange::new(5, 4)).into());
        assert_eq!(corrected, Some(InsertContent::new(3, text("a")).into()));

        let unrelated = first.merge_next(&InsertContent::new(9, text("c")).into());
        assert_eq!(unrelated, None);
    }

    #[test]
    fn test_merge_deletions() {
        let remove = RemoveRange::new(FlowRange::new(5, 6));
        assert_eq!(
            remove.merge_next(&RemoveRange::new(FlowRange::new(4, 5)).into()),
            Some(RemoveRange::new(FlowRange::new(4, 6)).into())
        );
        assert_eq!(
            remove.merge_next(&RemoveRange::new(FlowRange::new(5, 7)).into()),
            Some(RemoveRange::new(FlowRange::new(5, 8)).into())
        );
    }

    #[test]
    fn test_complete_upload() {
        let pending = FlowNode::Image {
            source: ImageSource {
                url: "blob:local".into(),
                width: 10,
                height: 20,
                upload: Some("u1".into()),
            },
            style: TextStyle::new(),
        };
        let content = FlowContent::from_nodes(vec![FlowNode::text("a"), pending]);
        let op = CompleteUpload {
            position: 1,
            upload: "u1".into(),
            url: "https://cdn/img.png".into(),
        };

        let done = op.apply_to_content(&content, None).unwrap();
        let (source, _) = done.image_at(1).unwrap();
        assert_eq!(source.url, "https://cdn/img.png");
        assert_eq!(source.upload, None);
        assert_eq!(op.invert(&content), Ok(None));
        assert_eq!(op.after_removal(FlowRange::new(0, 2)), None);
    }
}
