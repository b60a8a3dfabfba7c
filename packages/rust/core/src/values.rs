//! Enumerated values and defined terms from description cells.
//!
//! A description either carries the list itself as a `variablelist` or
//! points at the section that does with a "See Section X" paragraph. Only one
//! level of reference is followed.

use std::sync::LazyLock;

use iodschema_docbook::roxmltree::Node;
use iodschema_docbook::{children_named, first_child_named, is_element, text_content};
use regex::Regex;

use iodschema_shared::DiagnosticKind;

use crate::diagnostics::DiagnosticLog;
use crate::index::TabularIndex;

/// Reference targets that never hold value lists.
const IGNORED_TARGET_PREFIXES: [&str; 3] = ["note", "figure", "biblio"];

static SEE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bsee\b").expect("see-reference regex"));

/// The two kinds of value list a description can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueListKind {
    EnumeratedValues,
    DefinedTerms,
}

impl ValueListKind {
    /// Title prefix of the `variablelist` holding this kind of list.
    pub fn heading(self) -> &'static str {
        match self {
            Self::EnumeratedValues => "Enumerated Values",
            Self::DefinedTerms => "Defined Terms",
        }
    }
}

/// Value lists found for one attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueLists {
    pub enumerated_values: Option<Vec<String>>,
    pub defined_terms: Option<Vec<String>>,
}

/// Terms of the first `variablelist` child of `node` titled with `kind`'s heading.
pub fn local_value_list(node: Node<'_, '_>, kind: ValueListKind) -> Option<Vec<String>> {
    let list = children_named(node, "variablelist").find(|list| {
        first_child_named(*list, "title")
            .is_some_and(|title| text_content(title).trim().starts_with(kind.heading()))
    })?;

    Some(
        children_named(list, "varlistentry")
            .filter_map(|entry| first_child_named(entry, "term"))
            .map(|term| text_content(term).trim().to_string())
            .collect(),
    )
}

/// Sections referenced from "see" paragraphs of a description, in order.
///
/// Targets missing from the index are reported and skipped.
pub fn referenced_sections<'a, 'input>(
    description: Node<'a, 'input>,
    index: &TabularIndex<'a, 'input>,
    log: &mut DiagnosticLog,
) -> Vec<Node<'a, 'input>> {
    let targets = children_named(description, "para")
        .filter(|para| SEE_RE.is_match(&text_content(*para)))
        .flat_map(|para| para.descendants().filter(|n| is_element(*n, "xref")))
        .filter_map(|xref| xref.attribute("linkend"))
        .filter(|target| !IGNORED_TARGET_PREFIXES.iter().any(|p| target.starts_with(p)));

    let mut sections = Vec::new();
    for target in targets {
        match index.section(target) {
            Some(section) => sections.push(section),
            None => log.report(
                DiagnosticKind::UnresolvedReference,
                format!("cannot find referenced section {target}"),
            ),
        }
    }
    sections
}

/// Resolve both value lists for a description cell.
///
/// Local lists win; referenced sections are only consulted for a kind that
/// is not found locally, and the first section carrying it is used.
pub fn resolve_value_lists<'a, 'input>(
    description: Node<'a, 'input>,
    index: &TabularIndex<'a, 'input>,
    log: &mut DiagnosticLog,
) -> ValueLists {
    let mut lists = ValueLists {
        enumerated_values: local_value_list(description, ValueListKind::EnumeratedValues),
        defined_terms: local_value_list(description, ValueListKind::DefinedTerms),
    };

    if lists.enumerated_values.is_some() && lists.defined_terms.is_some() {
        return lists;
    }

    let sections = referenced_sections(description, index, log);
    let from_sections = |kind: ValueListKind| {
        sections
            .iter()
            .find_map(|section| local_value_list(*section, kind))
    };

    if lists.enumerated_values.is_none() {
        lists.enumerated_values = from_sections(ValueListKind::EnumeratedValues);
    }
    if lists.defined_terms.is_none() {
        lists.defined_terms = from_sections(ValueListKind::DefinedTerms);
    }
    lists
}
