//! # Flow Content
//!
//! Content is a flat sequence of [`FlowNode`]s addressed by position. Text
//! runs occupy one position per character, every other node occupies one.
//! Boxes and tables nest further content, which nested operations reach by
//! addressing the single position the container occupies.
//!
//! Values are immutable: every mutator returns new content. Content is kept
//! normalised (adjacent text runs with equal style merge, empty runs drop) so
//! that structural equality matches visible equality.

mod node;
mod table;

pub use node::{FlowNode, ImageSource};
pub use table::{TableCell, TableContent};

use serde::{Deserialize, Serialize};

use crate::errors::{FlowError, FlowResult};
use crate::range::FlowRange;
use crate::style::{BoxStyle, ParagraphStyle, TableStyle, TextStyle};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<FlowNode>", into = "Vec<FlowNode>")]
pub struct FlowContent {
    nodes: Vec<FlowNode>,
}

/// The node containing a position, and the offset into it
#[derive(Debug, Clone, Copy)]
pub struct Peek<'a> {
    pub node: &'a FlowNode,
    pub offset: usize,
}

impl From<Vec<FlowNode>> for FlowContent {
    fn from(nodes: Vec<FlowNode>) -> Self {
        Self::from_nodes(nodes)
    }
}

impl From<FlowContent> for Vec<FlowNode> {
    fn from(content: FlowContent) -> Self {
        content.nodes
    }
}

impl FlowContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: Vec<FlowNode>) -> Self {
        Self {
            nodes: normalize(nodes),
        }
    }

    /// Plain text with every `\n` turned into a paragraph break
    pub fn from_text(text: &str) -> Self {
        let mut nodes = Vec::new();
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                nodes.push(FlowNode::paragraph_break());
            }
            nodes.push(FlowNode::text(line));
        }
        Self::from_nodes(nodes)
    }

    pub fn nodes(&self) -> &[FlowNode] {
        &self.nodes
    }

    pub fn size(&self) -> usize {
        self.nodes.iter().map(FlowNode::size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes paired with the position they start at
    pub fn positioned(&self) -> impl Iterator<Item = (usize, &FlowNode)> {
        self.nodes.iter().scan(0usize, |offset, node| {
            let at = *offset;
            *offset += node.size();
            Some((at, node))
        })
    }

    /// Text rendering: breaks become newlines, embedded objects become U+FFFC
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                FlowNode::Text { text, .. } => out.push_str(text),
                FlowNode::LineBreak { .. } | FlowNode::ParagraphBreak { .. } => out.push('\n'),
                _ => out.push('\u{FFFC}'),
            }
        }
        out
    }

    fn check_position(&self, position: usize) -> FlowResult<()> {
        let size = self.size();
        if position > size {
            return Err(FlowError::OutOfBounds { position, size });
        }
        Ok(())
    }

    fn check_range(&self, range: FlowRange) -> FlowResult<()> {
        let size = self.size();
        if range.last() > size {
            return Err(FlowError::RangeOutOfBounds { range, size });
        }
        Ok(())
    }

    /// Split into the nodes before, inside and after `range`
    fn partition(&self, range: FlowRange) -> FlowResult<(Vec<FlowNode>, Vec<FlowNode>, Vec<FlowNode>)> {
        self.check_range(range)?;
        let (head, after) = split_nodes(&self.nodes, range.last());
        let (before, inside) = split_nodes(&head, range.first());
        Ok((before, inside, after))
    }

    pub fn peek(&self, position: usize) -> FlowResult<Peek<'_>> {
        self.positioned()
            .find(|(at, node)| position < at + node.size())
            .map(|(at, node)| Peek {
                node,
                offset: position - at,
            })
            .ok_or(FlowError::OutOfBounds {
                position,
                size: self.size(),
            })
    }

    /// The single-position node at `position`
    pub fn node_at(&self, position: usize) -> FlowResult<&FlowNode> {
        let peek = self.peek(position)?;
        if peek.node.size() != 1 {
            return Err(FlowError::NotSplittable(position));
        }
        Ok(peek.node)
    }

    pub fn box_at(&self, position: usize) -> FlowResult<(&FlowContent, &BoxStyle)> {
        match self.node_at(position)? {
            FlowNode::Box { content, style } => Ok((content, style)),
            _ => Err(FlowError::UnexpectedNode {
                position,
                expected: "box",
            }),
        }
    }

    pub fn table_at(&self, position: usize) -> FlowResult<(&TableContent, &TableStyle)> {
        match self.node_at(position)? {
            FlowNode::Table { content, style } => Ok((content, style)),
            _ => Err(FlowError::UnexpectedNode {
                position,
                expected: "table",
            }),
        }
    }

    pub fn image_at(&self, position: usize) -> FlowResult<(&ImageSource, &TextStyle)> {
        match self.node_at(position)? {
            FlowNode::Image { source, style } => Ok((source, style)),
            _ => Err(FlowError::UnexpectedNode {
                position,
                expected: "image",
            }),
        }
    }

    pub fn copy(&self, range: FlowRange) -> FlowResult<FlowContent> {
        let (_, inside, _) = self.partition(range)?;
        Ok(Self::from_nodes(inside))
    }

    pub fn insert(&self, position: usize, content: &FlowContent) -> FlowResult<FlowContent> {
        self.check_position(position)?;
        let (mut nodes, after) = split_nodes(&self.nodes, position);
        nodes.extend(content.nodes.iter().cloned());
        nodes.extend(after);
        Ok(Self::from_nodes(nodes))
    }

    pub fn remove(&self, range: FlowRange) -> FlowResult<FlowContent> {
        self.replace(range, &FlowContent::default())
    }

    pub fn replace(&self, range: FlowRange, content: &FlowContent) -> FlowResult<FlowContent> {
        let (mut nodes, _, after) = self.partition(range)?;
        nodes.extend(content.nodes.iter().cloned());
        nodes.extend(after);
        Ok(Self::from_nodes(nodes))
    }

    /// Swap the single-position node at `position` for `node`
    pub fn replace_node(&self, position: usize, node: FlowNode) -> FlowResult<FlowContent> {
        self.node_at(position)?;
        self.replace(FlowRange::at(position, 1), &Self::from_nodes(vec![node]))
    }

    fn map_range(&self, range: FlowRange, f: impl Fn(FlowNode) -> FlowNode) -> FlowResult<FlowContent> {
        let (mut nodes, inside, after) = self.partition(range)?;
        nodes.extend(inside.into_iter().map(f));
        nodes.extend(after);
        Ok(Self::from_nodes(nodes))
    }

    fn map_positions(&self, positions: &[usize], f: impl Fn(FlowNode) -> FlowNode) -> FlowContent {
        let nodes = self
            .positioned()
            .map(|(at, node)| {
                if node.size() == 1 && positions.contains(&at) {
                    f(node.clone())
                } else {
                    node.clone()
                }
            })
            .collect();
        Self::from_nodes(nodes)
    }

    /// Same content with every text style passed through `f`
    pub fn map_text_styles(&self, f: impl Fn(&TextStyle) -> TextStyle) -> FlowContent {
        let nodes = self
            .nodes
            .iter()
            .map(|node| node.clone().map_text_style(&f))
            .collect();
        Self::from_nodes(nodes)
    }

    pub fn format_text(&self, range: FlowRange, style: &TextStyle) -> FlowResult<FlowContent> {
        self.map_range(range, |node| node.map_text_style(|s| s.merge(style)))
    }

    pub fn unformat_text(&self, range: FlowRange, style: &TextStyle) -> FlowResult<FlowContent> {
        self.map_range(range, |node| node.map_text_style(|s| s.unmerge(style)))
    }

    /// Text style runs within `range`, coalesced where adjacent runs agree
    pub fn text_styles(&self, range: FlowRange) -> FlowResult<Vec<(FlowRange, TextStyle)>> {
        let (_, inside, _) = self.partition(range)?;
        let mut runs: Vec<(FlowRange, TextStyle)> = Vec::new();
        let mut offset = range.first();
        for node in &inside {
            let span = FlowRange::at(offset, node.size());
            offset += node.size();
            let Some(style) = node.text_style() else {
                continue;
            };
            if let Some((last, last_style)) = runs.last_mut() {
                if last.last() == span.first() && *last_style == *style {
                    *last = last.inflate(span.size() as isize);
                    continue;
                }
            }
            runs.push((span, style.clone()));
        }
        Ok(runs)
    }

    /// Paragraph breaks terminating the paragraphs `range` touches.
    ///
    /// A paragraph's style lives on the break that ends it, so this is every
    /// break from the start of the range up to and including the first break
    /// at or past its end.
    pub fn paragraph_styles(&self, range: FlowRange) -> FlowResult<Vec<(usize, ParagraphStyle)>> {
        self.check_range(range)?;
        let stop = if range.is_collapsed() {
            range.first()
        } else {
            range.last() - 1
        };
        let mut breaks = Vec::new();
        for (at, node) in self.positioned() {
            if at < range.first() {
                continue;
            }
            if let FlowNode::ParagraphBreak { style } = node {
                breaks.push((at, style.clone()));
                if at >= stop {
                    break;
                }
            }
        }
        Ok(breaks)
    }

    /// Style of the paragraph containing `position`
    pub fn paragraph_style_at(&self, position: usize) -> ParagraphStyle {
        self.positioned()
            .find_map(|(at, node)| match node {
                FlowNode::ParagraphBreak { style } if at >= position => Some(style.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn format_paragraph(&self, range: FlowRange, style: &ParagraphStyle) -> FlowResult<FlowContent> {
        self.map_paragraphs(range, |s| s.merge(style))
    }

    pub fn unformat_paragraph(&self, range: FlowRange, style: &ParagraphStyle) -> FlowResult<FlowContent> {
        self.map_paragraphs(range, |s| s.unmerge(style))
    }

    fn map_paragraphs(
        &self,
        range: FlowRange,
        f: impl Fn(&ParagraphStyle) -> ParagraphStyle,
    ) -> FlowResult<FlowContent> {
        let positions: Vec<usize> = self
            .paragraph_styles(range)?
            .into_iter()
            .map(|(at, _)| at)
            .collect();
        Ok(self.map_positions(&positions, |node| match node {
            FlowNode::ParagraphBreak { style } => FlowNode::ParagraphBreak { style: f(&style) },
            other => other,
        }))
    }

    /// Boxes whose position lies within `range`
    pub fn box_styles(&self, range: FlowRange) -> FlowResult<Vec<(usize, BoxStyle)>> {
        self.check_range(range)?;
        Ok(self
            .positioned()
            .filter_map(|(at, node)| match node {
                FlowNode::Box { style, .. } if range.contains(at) => Some((at, style.clone())),
                _ => None,
            })
            .collect())
    }

    pub fn format_box(&self, range: FlowRange, style: &BoxStyle) -> FlowResult<FlowContent> {
        self.map_boxes(range, |s| s.merge(style))
    }

    pub fn unformat_box(&self, range: FlowRange, style: &BoxStyle) -> FlowResult<FlowContent> {
        self.map_boxes(range, |s| s.unmerge(style))
    }

    fn map_boxes(&self, range: FlowRange, f: impl Fn(&BoxStyle) -> BoxStyle) -> FlowResult<FlowContent> {
        let positions: Vec<usize> = self
            .box_styles(range)?
            .into_iter()
            .map(|(at, _)| at)
            .collect();
        Ok(self.map_positions(&positions, |node| match node {
            FlowNode::Box { content, style } => FlowNode::Box {
                content,
                style: f(&style),
            },
            other => other,
        }))
    }
}

fn normalize(nodes: Vec<FlowNode>) -> Vec<FlowNode> {
    let mut out: Vec<FlowNode> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if let FlowNode::Text { text, .. } = &node {
            if text.is_empty() {
                continue;
            }
        }
        if let (Some(FlowNode::Text { text: prev, style: prev_style }), FlowNode::Text { text, style }) =
            (out.last_mut(), &node)
        {
            if prev_style == style {
                prev.push_str(text);
                continue;
            }
        }
        out.push(node);
    }
    out
}

/// Split a node list at a position, cutting a text run if needed
fn split_nodes(nodes: &[FlowNode], position: usize) -> (Vec<FlowNode>, Vec<FlowNode>) {
    let mut head = Vec::new();
    let mut tail = Vec::new();
    let mut offset = 0;
    for node in nodes {
        let size = node.size();
        if offset + size <= position {
            head.push(node.clone());
        } else if offset >= position {
            tail.push(node.clone());
        } else {
            let (a, b) = node.clone().split_text(position - offset);
            head.push(a);
            tail.push(b);
        }
        offset += size;
    }
    (head, tail)
}
