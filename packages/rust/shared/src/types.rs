//! Core domain types for extracted IOD schemas.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Tag
// ---------------------------------------------------------------------------

/// An 8-character attribute identifier: 4-char group followed by 4-char element.
///
/// Repeating-group tags keep their placeholder characters (e.g. `60xx0010`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

/// Result of parsing a `(GGGG,EEEE)` tag cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTag {
    /// The normalized tag.
    pub tag: Tag,
    /// Whether the cell used a space instead of a comma and had to be fixed.
    pub corrected: bool,
}

impl Tag {
    /// Wrap an already-normalized 8-character tag string.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Parse a tag cell such as `(0010,0010)`.
    ///
    /// A cell written `(0010 0010)` is a known typo in the standard; it is
    /// accepted and flagged as corrected. Returns `None` for anything else
    /// that does not look like a tag.
    pub fn parse_cell(text: &str) -> Option<ParsedTag> {
        let inner = text.trim().strip_prefix('(')?.strip_suffix(')')?;

        let (group, element, corrected) = match inner.split_once(',') {
            Some((group, element)) => (group, element, false),
            None => {
                let (group, element) = inner.trim().split_once(' ')?;
                (group, element, true)
            }
        };

        let (group, element) = (group.trim(), element.trim());
        if !is_tag_half(group) || !is_tag_half(element) {
            return None;
        }

        Some(ParsedTag {
            tag: Self(format!("{group}{element}")),
            corrected,
        })
    }

    /// The tag as an 8-character string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_tag_half(s: &str) -> bool {
    s.len() == 4
        && s
            .chars()
            .all(|c| c.is_ascii_hexdigit() || c == 'x' || c == 'X')
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Data dictionary
// ---------------------------------------------------------------------------

/// Value representation of a dictionary entry.
///
/// Most entries have a single VR; a few list alternatives (`US or SS`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueRepresentation {
    Single(String),
    Alternatives(Vec<String>),
}

impl ValueRepresentation {
    /// Build from a dictionary VR cell, splitting on ` or `.
    pub fn from_cell(text: &str) -> Self {
        let mut parts: Vec<String> = text
            .trim()
            .split(" or ")
            .map(|part| part.trim().to_string())
            .collect();

        if parts.len() == 1 {
            Self::Single(parts.remove(0))
        } else {
            Self::Alternatives(parts)
        }
    }

    /// Whether this VR denotes a sequence of items.
    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Single(vr) if vr == "SQ")
    }
}

/// One entry of the flat data dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    /// Attribute name.
    pub name: String,
    /// Value representation.
    pub vr: ValueRepresentation,
    /// Value multiplicity, verbatim (`1`, `1-n`, `1-n or 1`, ...).
    pub vm: String,
}

/// The flat tag → entry lookup, key-sorted.
pub type Dictionary = BTreeMap<Tag, DictionaryEntry>;

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// Allowed number of items in a sequence attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemCount {
    /// The count equals the value of another attribute.
    FromTag {
        #[serde(rename = "countFromTag")]
        count_from_tag: Tag,
    },
    /// A literal range; an unbounded `max` is left out of the JSON.
    Range {
        min: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<u32>,
    },
}

/// One schema field parsed from a module or macro table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub tag: Tag,
    /// Requirement type from the "Type" column.
    #[serde(rename = "type")]
    pub label: String,
    /// Nesting depth; 0 is the top level of a module.
    pub depth: usize,
    pub vr: ValueRepresentation,
    pub vm: String,
    #[serde(flatten)]
    pub kind: AttributeKind,
}

/// The VR-dependent part of an [`Attribute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeKind {
    Sequence {
        #[serde(
            rename = "itemCount",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        item_count: Option<ItemCount>,
        #[serde(rename = "itemAttributes")]
        item_attributes: Vec<Attribute>,
    },
    Element {
        #[serde(
            rename = "enumeratedValues",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        enumerated_values: Option<Vec<String>>,
        #[serde(
            rename = "definedTerms",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        defined_terms: Option<Vec<String>>,
    },
}

impl Attribute {
    /// Whether this attribute is a sequence.
    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, AttributeKind::Sequence { .. })
    }

    /// Child attributes of a sequence (empty for plain elements).
    pub fn item_attributes(&self) -> &[Attribute] {
        match &self.kind {
            AttributeKind::Sequence {
                item_attributes, ..
            } => item_attributes,
            AttributeKind::Element { .. } => &[],
        }
    }

    /// Copy of this subtree with every depth shifted by `offset`.
    pub fn rebased(&self, offset: usize) -> Self {
        let mut copy = self.clone();
        copy.shift_depth(offset);
        copy
    }

    fn shift_depth(&mut self, offset: usize) {
        self.depth += offset;
        if let AttributeKind::Sequence {
            item_attributes, ..
        } = &mut self.kind
        {
            for child in item_attributes {
                child.shift_depth(offset);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// IODs and output
// ---------------------------------------------------------------------------

/// A module referenced by an IOD with its usage constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleUsage {
    /// Module name as written in the IOD table.
    pub name: String,
    /// Usage constraint: `M`, `U` or `C`.
    pub usage: String,
}

/// A composite object definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Iod {
    pub name: String,
    pub modules: Vec<ModuleUsage>,
}

/// Root structure written to `IODs.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaOutput {
    /// IOD name → definition.
    pub iods: BTreeMap<String, Iod>,
    /// Module name → top-level attributes.
    pub modules: BTreeMap<String, Vec<Attribute>>,
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Category of a recoverable anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    UnparsableRow,
    CorrectedTag,
    UnresolvedReference,
    UnrecognizedItemCount,
    MissingItemCount,
    SkippedModuleRow,
    SkippedDictionaryRow,
}

/// A recoverable anomaly encountered while parsing. Never halts the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cell_accepts_standard_form() {
        let parsed = Tag::parse_cell("(0010,0010)").unwrap();
        assert_eq!(parsed.tag.as_str(), "00100010");
        assert!(!parsed.corrected);
    }

    #[test]
    fn parse_cell_fixes_missing_comma() {
        let parsed = Tag::parse_cell(" (0010 0010) ").unwrap();
        assert_eq!(parsed.tag.as_str(), "00100010");
        assert!(parsed.corrected);
    }

    #[test]
    fn parse_cell_keeps_repeating_group_placeholders() {
        let parsed = Tag::parse_cell("(60xx,0010)").unwrap();
        assert_eq!(parsed.tag.as_str(), "60xx0010");
    }

    #[test]
    fn parse_cell_rejects_non_tags() {
        assert!(Tag::parse_cell("Include Table 10-11").is_none());
        assert!(Tag::parse_cell("(0010,00100)").is_none());
        assert!(Tag::parse_cell("").is_none());
    }

    #[test]
    fn vr_alternatives_split_on_or() {
        assert_eq!(
            ValueRepresentation::from_cell("US or SS"),
            ValueRepresentation::Alternatives(vec!["US".into(), "SS".into()])
        );
        assert!(ValueRepresentation::from_cell("SQ").is_sequence());
        assert!(!ValueRepresentation::from_cell("US or SS").is_sequence());
    }

    #[test]
    fn attribute_serializes_with_schema_field_names() {
        let attribute = Attribute {
            tag: Tag::new("00081115"),
            label: "1".into(),
            depth: 0,
            vr: ValueRepresentation::Single("SQ".into()),
            vm: "1".into(),
            kind: AttributeKind::Sequence {
                item_count: Some(ItemCount::Range {
                    min: 1,
                    max: None,
                }),
                item_attributes: vec![],
            },
        };

        let json = serde_json::to_value(&attribute).unwrap();
        assert_eq!(json["type"], "1");
        assert_eq!(json["itemCount"]["min"], 1);
        assert!(json["itemCount"].get("max").is_none());
        assert!(json["itemAttributes"].as_array().unwrap().is_empty());
        assert!(json.get("enumeratedValues").is_none());
    }

    #[test]
    fn rebased_shifts_whole_subtree() {
        let child = Attribute {
            tag: Tag::new("00080100"),
            label: "1".into(),
            depth: 1,
            vr: ValueRepresentation::Single("SH".into()),
            vm: "1".into(),
            kind: AttributeKind::Element {
                enumerated_values: None,
                defined_terms: None,
            },
        };
        let parent = Attribute {
            tag: Tag::new("00400260"),
            label: "3".into(),
            depth: 0,
            vr: ValueRepresentation::Single("SQ".into()),
            vm: "1".into(),
            kind: AttributeKind::Sequence {
                item_count: None,
                item_attributes: vec![child],
            },
        };

        let shifted = parent.rebased(2);
        assert_eq!(shifted.depth, 2);
        assert_eq!(shifted.item_attributes()[0].depth, 3);
        assert_eq!(parent.item_attributes()[0].depth, 1);
    }
}
