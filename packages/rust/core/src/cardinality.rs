//! Item-count constraints of sequence attributes.
//!
//! The standard states how many items a sequence may hold in prose. Two forms
//! are recognized:
//!
//! - referential: "The number of Items shall equal the value of X (GGGG,EEEE)"
//!   becomes `{countFromTag}`;
//! - literal: the sentence ending in "in this Sequence" is matched against
//!   ordered rule tables, e.g. "One or more Items shall be included in this
//!   Sequence." becomes `{min: 1, max: None}`.
//!
//! Phrasing that matches no rule is reported, never guessed.

use std::sync::LazyLock;

use iodschema_docbook::roxmltree::Node;
use iodschema_docbook::{children_named, text_content};
use regex::Regex;

use iodschema_shared::{DiagnosticKind, ItemCount, Tag};

use crate::diagnostics::DiagnosticLog;

/// Lower-case phrases meaning "the item count equals another attribute's value".
const REFERENTIAL_PHRASES: [&str; 10] = [
    "number of items shall be identical to the value of",
    "number of items shall be equal to the value of",
    "number of items shall be equal to",
    "number of items shall match the value of",
    "number of items shall equal the value of",
    "number of items in the sequence is given by",
    "number of items in this sequence shall equal the value of",
    "number of items in the sequence shall be equal to",
    "number of items included in this sequence shall equal the value of",
    "shall have the same number of items as the value of",
];

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*([0-9A-Fa-fxX]{4})\s*,\s*([0-9A-Fa-fxX]{4})\s*\)").expect("tag regex")
});

static SENTENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[^.]*\.)*([^.]*in this sequence)").expect("sequence sentence regex")
});

/// How a rule phrase is located in a sentence.
#[derive(Debug, Clone, Copy)]
enum Phrase {
    StartsWith(&'static str),
    Contains(&'static str),
}

impl Phrase {
    fn matches(self, sentence: &str) -> bool {
        match self {
            Self::StartsWith(p) => sentence.starts_with(p),
            Self::Contains(p) => sentence.contains(p),
        }
    }
}

/// Phrases that fix both bounds at once. Checked first.
const RANGE_RULES: [(Phrase, u32, Option<u32>); 1] =
    [(Phrase::StartsWith("no more than one"), 0, Some(1))];

const MINIMUM_RULES: [(Phrase, u32); 6] = [
    (Phrase::Contains("single"), 1),
    (Phrase::StartsWith("one"), 1),
    (Phrase::StartsWith("only one"), 1),
    (Phrase::StartsWith("only two"), 2),
    (Phrase::StartsWith("two"), 2),
    (Phrase::StartsWith("zero"), 0),
];

/// `None` is unbounded. Without a match the maximum equals the minimum.
const MAXIMUM_RULES: [(Phrase, Option<u32>); 4] = [
    (Phrase::Contains("or more"), None),
    (Phrase::Contains("or one"), Some(1)),
    (Phrase::Contains("or two"), Some(2)),
    (Phrase::Contains("or three"), Some(3)),
];

/// Outcome of reading a sequence description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cardinality {
    Resolved(ItemCount),
    /// A "... in this Sequence" sentence matched no rule.
    Unrecognized(String),
    /// The description says nothing about the item count.
    NotStated,
}

/// `{countFromTag}` when a paragraph names the attribute holding the count.
pub fn referential_item_count(description: Node<'_, '_>) -> Option<ItemCount> {
    children_named(description, "para").find_map(|para| {
        let text = text_content(para);
        // ASCII lowering keeps byte offsets aligned with `text`.
        let lower = text.to_ascii_lowercase();
        let after = REFERENTIAL_PHRASES
            .iter()
            .find_map(|phrase| lower.find(phrase).map(|at| at + phrase.len()))?;

        let caps = TAG_RE.captures(&text[after..])?;
        let tag = format!("{}{}", &caps[1], &caps[2]);
        Some(ItemCount::FromTag {
            count_from_tag: Tag::new(normalize_tag(&tag)),
        })
    })
}

/// Upper-case hex digits; repeating-group placeholders stay `x`.
fn normalize_tag(tag: &str) -> String {
    tag.chars()
        .map(|c| {
            if c.eq_ignore_ascii_case(&'x') {
                'x'
            } else {
                c.to_ascii_uppercase()
            }
        })
        .collect()
}

/// Classify the "... in this Sequence" sentences of a description.
///
/// The first sentence any rule accepts wins. When none is accepted the first
/// candidate is returned as unrecognized.
pub fn literal_item_count(description: Node<'_, '_>) -> Cardinality {
    let mut unrecognized = None;

    for para in children_named(description, "para") {
        let text = text_content(para);
        let Some(caps) = SENTENCE_RE.captures(&text) else {
            continue;
        };
        let sentence = caps[1].trim().to_ascii_lowercase();

        match classify_sentence(&sentence) {
            Some(count) => return Cardinality::Resolved(count),
            None => {
                unrecognized.get_or_insert(sentence);
            }
        }
    }

    unrecognized.map_or(Cardinality::NotStated, Cardinality::Unrecognized)
}

/// Apply the rule tables to one lower-case sentence.
pub fn classify_sentence(sentence: &str) -> Option<ItemCount> {
    let sentence = sentence.trim();

    if let Some((_, min, max)) = RANGE_RULES.iter().find(|(p, ..)| p.matches(sentence)) {
        return Some(ItemCount::Range {
            min: *min,
            max: *max,
        });
    }

    let (_, min) = MINIMUM_RULES.iter().find(|(p, _)| p.matches(sentence))?;
    let max = MAXIMUM_RULES
        .iter()
        .find(|(p, _)| p.matches(sentence))
        .map_or(Some(*min), |(_, max)| *max);

    Some(ItemCount::Range { min: *min, max })
}

/// Item count of a sequence, reporting when it cannot be determined.
pub fn resolve_item_count(
    tag: &Tag,
    description: Node<'_, '_>,
    log: &mut DiagnosticLog,
) -> Option<ItemCount> {
    if let Some(count) = referential_item_count(description) {
        return Some(count);
    }

    match literal_item_count(description) {
        Cardinality::Resolved(count) => Some(count),
        Cardinality::Unrecognized(sentence) => {
            log.report(
                DiagnosticKind::UnrecognizedItemCount,
                format!("unrecognized item count for {tag}: '{sentence}'"),
            );
            None
        }
        Cardinality::NotStated => {
            log.report(
                DiagnosticKind::MissingItemCount,
                format!("could not find number of items allowed for {tag}"),
            );
            None
        }
    }
}
