//! # Flow Ranges
//!
//! A [`FlowRange`] is a one-dimensional interval over the linear position
//! space of flow content. It has a direction: `anchor` is where the range
//! started and `focus` is where it ends, so a backward range has
//! `anchor > focus`.
//!
//! Ranges are plain `Copy` values. Every mutator returns a new range.
//!
//! On the wire a range is the tuple `[anchor, focus]`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A directional interval `[first, last)` of flow positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(usize, usize)", into = "(usize, usize)")]
pub struct FlowRange {
    anchor: usize,
    focus: usize,
}

impl FlowRange {
    pub const fn new(anchor: usize, focus: usize) -> Self {
        Self { anchor, focus }
    }

    /// Forward range starting at `position` covering `size` positions
    pub const fn at(position: usize, size: usize) -> Self {
        Self {
            anchor: position,
            focus: position + size,
        }
    }

    /// Collapsed range at `position`
    pub const fn collapsed(position: usize) -> Self {
        Self::at(position, 0)
    }

    /// Build a range from its bounds, keeping the requested direction
    pub fn from_bounds(first: usize, last: usize, backward: bool) -> Self {
        debug_assert!(first <= last);
        if backward {
            Self::new(last, first)
        } else {
            Self::new(first, last)
        }
    }

    pub fn anchor(&self) -> usize {
        self.anchor
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn first(&self) -> usize {
        self.anchor.min(self.focus)
    }

    pub fn last(&self) -> usize {
        self.anchor.max(self.focus)
    }

    pub fn size(&self) -> usize {
        self.last() - self.first()
    }

    /// Signed distance from anchor to focus
    pub fn distance(&self) -> isize {
        self.focus as isize - self.anchor as isize
    }

    pub fn is_backward(&self) -> bool {
        self.anchor > self.focus
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Whether `position` lies within `[first, last)`
    pub fn contains(&self, position: usize) -> bool {
        position >= self.first() && position < self.last()
    }

    /// Whether `other` lies entirely within this range
    pub fn covers(&self, other: &FlowRange) -> bool {
        other.first() >= self.first() && other.last() <= self.last()
    }

    /// Forward intersection of two ranges.
    ///
    /// Disjoint ranges intersect in a collapsed range positioned at the
    /// start of whichever range comes later.
    pub fn intersect(&self, other: &FlowRange) -> FlowRange {
        let first = self.first().max(other.first());
        let last = self.last().min(other.last()).max(first);
        FlowRange::new(first, last)
    }

    /// Move both ends by `delta`, saturating at zero
    pub fn translate(&self, delta: isize) -> FlowRange {
        FlowRange::new(
            self.anchor.saturating_add_signed(delta),
            self.focus.saturating_add_signed(delta),
        )
    }

    /// Grow (or shrink, for negative `delta`) the trailing end of the range.
    ///
    /// The leading end stays put and the direction is preserved.
    pub fn inflate(&self, delta: isize) -> FlowRange {
        let first = self.first();
        let last = self.last().saturating_add_signed(delta).max(first);
        FlowRange::from_bounds(first, last, self.is_backward())
    }

    pub fn deflate(&self, delta: isize) -> FlowRange {
        self.inflate(-delta)
    }

    /// Swap anchor and focus
    pub fn reverse(&self) -> FlowRange {
        FlowRange::new(self.focus, self.anchor)
    }

    /// Same bounds, forward direction
    pub fn forward(&self) -> FlowRange {
        FlowRange::new(self.first(), self.last())
    }
}

impl From<(usize, usize)> for FlowRange {
    fn from((anchor, focus): (usize, usize)) -> Self {
        FlowRange::new(anchor, focus)
    }
}

impl From<FlowRange> for (usize, usize) {
    fn from(range: FlowRange) -> Self {
        (range.anchor, range.focus)
    }
}

impl fmt::Display for FlowRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.anchor, self.focus)
    }
}
