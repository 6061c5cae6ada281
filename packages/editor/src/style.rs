//! # Style Records
//!
//! Styles are sparse property maps. A property that is absent is inherited
//! from the surrounding context (ultimately the [`FlowTheme`]), which is what
//! makes formatting operations composable: formatting merges properties in,
//! unformatting takes them back out.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

macro_rules! style_record {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(BTreeMap<String, Value>);

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            /// Builder-style setter
            pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
                self.0.insert(key.into(), value.into());
                self
            }

            pub fn get(&self, key: &str) -> Option<&Value> {
                self.0.get(key)
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
                self.0.iter()
            }

            /// Properties of `other` override ours
            pub fn merge(&self, other: &Self) -> Self {
                let mut merged = self.0.clone();
                merged.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
                Self(merged)
            }

            /// Drop every property that `other` names, whatever its value
            pub fn unmerge(&self, other: &Self) -> Self {
                Self(
                    self.0
                        .iter()
                        .filter(|(k, _)| !other.0.contains_key(*k))
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                )
            }

            /// Keep only the properties that `other` names
            pub fn pick(&self, other: &Self) -> Self {
                Self(
                    self.0
                        .iter()
                        .filter(|(k, _)| other.0.contains_key(*k))
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                )
            }

            /// Drop properties whose value equals the one in `ambient`
            pub fn without_ambient(&self, ambient: &Self) -> Self {
                Self(
                    self.0
                        .iter()
                        .filter(|(k, v)| ambient.0.get(*k) != Some(*v))
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                )
            }

            /// Split the undo of applying `applied` on top of `before` into
            /// the properties to remove and the properties to restore
            pub fn restore_parts(before: &Self, applied: &Self) -> (Self, Self) {
                let restore = before.pick(applied);
                let remove = applied.unmerge(before);
                (remove, restore)
            }
        }
    };
}

style_record!(
    /// Character-level style (bold, italic, color, ...)
    TextStyle
);

style_record!(
    /// Paragraph-level style, carried by paragraph breaks
    ParagraphStyle
);

style_record!(
    /// Style of an embedded box
    BoxStyle
);

style_record!(
    /// Style of a whole table
    TableStyle
);

style_record!(
    /// Style of a single table column
    TableColumnStyle
);

/// Paragraph property holding the list nesting level
pub const LIST_LEVEL: &str = "listLevel";

impl ParagraphStyle {
    pub fn list_level(&self) -> i64 {
        self.get(LIST_LEVEL).and_then(Value::as_i64).unwrap_or(0)
    }
}

/// Ambient style resolution.
///
/// Only the parts the OT core consults are modelled: the default text style
/// inserted content falls back to, and named paragraph variants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowTheme {
    #[serde(default)]
    pub default_text: TextStyle,

    #[serde(default)]
    pub paragraphs: BTreeMap<String, TextStyle>,
}

impl FlowTheme {
    /// Text style in effect for a paragraph of the given variant
    pub fn ambient_text_style(&self, paragraph: &ParagraphStyle) -> TextStyle {
        let variant = paragraph.get("variant").and_then(Value::as_str);
        match variant.and_then(|v| self.paragraphs.get(v)) {
            Some(style) => self.default_text.merge(style),
            None => self.default_text.clone(),
        }
    }
}
