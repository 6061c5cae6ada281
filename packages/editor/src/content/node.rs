use serde::{Deserialize, Serialize};

use crate::content::{FlowContent, TableContent};
use crate::style::{BoxStyle, ParagraphStyle, TableStyle, TextStyle};

/// A single node of flow content.
///
/// Text runs occupy one position per character; every other node occupies
/// exactly one position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum FlowNode {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "TextStyle::is_empty")]
        style: TextStyle,
    },

    LineBreak {
        #[serde(default, skip_serializing_if = "TextStyle::is_empty")]
        style: TextStyle,
    },

    ParagraphBreak {
        #[serde(default, skip_serializing_if = "ParagraphStyle::is_empty")]
        style: ParagraphStyle,
    },

    Image {
        source: ImageSource,
        #[serde(default, skip_serializing_if = "TextStyle::is_empty")]
        style: TextStyle,
    },

    Box {
        content: FlowContent,
        #[serde(default, skip_serializing_if = "BoxStyle::is_empty")]
        style: BoxStyle,
    },

    Table {
        content: TableContent,
        #[serde(default, skip_serializing_if = "TableStyle::is_empty")]
        style: TableStyle,
    },
}

/// Where an image comes from.
///
/// While an upload is in flight `upload` holds its id and `url` is a
/// placeholder; completing the upload swaps in the final url.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSource {
    pub url: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<String>,
}

impl FlowNode {
    pub fn text(text: impl Into<String>) -> Self {
        FlowNode::Text {
            text: text.into(),
            style: TextStyle::default(),
        }
    }

    pub fn styled_text(text: impl Into<String>, style: TextStyle) -> Self {
        FlowNode::Text {
            text: text.into(),
            style,
        }
    }

    pub fn paragraph_break() -> Self {
        FlowNode::ParagraphBreak {
            style: ParagraphStyle::default(),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            FlowNode::Text { text, .. } => text.chars().count(),
            _ => 1,
        }
    }

    /// Name used in structural-mismatch errors
    pub fn kind(&self) -> &'static str {
        match self {
            FlowNode::Text { .. } => "text",
            FlowNode::LineBreak { .. } => "line break",
            FlowNode::ParagraphBreak { .. } => "paragraph break",
            FlowNode::Image { .. } => "image",
            FlowNode::Box { .. } => "box",
            FlowNode::Table { .. } => "table",
        }
    }

    /// Character style, for nodes that carry one
    pub fn text_style(&self) -> Option<&TextStyle> {
        match self {
            FlowNode::Text { style, .. }
            | FlowNode::LineBreak { style }
            | FlowNode::Image { style, .. } => Some(style),
            _ => None,
        }
    }

    pub(crate) fn map_text_style(self, f: impl Fn(&TextStyle) -> TextStyle) -> Self {
        match self {
            FlowNode::Text { text, style } => FlowNode::Text {
                text,
                style: f(&style),
            },
            FlowNode::LineBreak { style } => FlowNode::LineBreak { style: f(&style) },
            FlowNode::Image { source, style } => FlowNode::Image {
                source,
                style: f(&style),
            },
            other => other,
        }
    }

    /// Split a text run at a character offset
    pub(crate) fn split_text(self, offset: usize) -> (FlowNode, FlowNode) {
        match self {
            FlowNode::Text { text, style } => {
                let byte = text
                    .char_indices()
                    .nth(offset)
                    .map(|(i, _)| i)
                    .unwrap_or(text.len());
                let (head, tail) = text.split_at(byte);
                (
                    FlowNode::styled_text(head, style.clone()),
                    FlowNode::styled_text(tail, style),
                )
            }
            other => (other, FlowNode::text("")),
        }
    }
}
