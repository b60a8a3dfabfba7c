//! DocBook XML loading and node helpers.
//!
//! The DICOM standard is published as DocBook. This crate parses the cleaned
//! source text with `roxmltree` and provides the handful of structural queries
//! the parsers need: cells of a table row, text of a cell, `xml:id` and `xref`
//! targets. Element names are matched on their local name, so the DocBook
//! default namespace never needs to be spelled out.

mod cleanup;

use roxmltree::{Document, Node, ParsingOptions};
use tracing::{debug, instrument};

use iodschema_shared::{Result, SchemaError};

pub use cleanup::clean_source;
pub use roxmltree;

/// Namespace bound to the reserved `xml:` prefix.
const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parse cleaned DocBook source text into a document tree.
#[instrument(skip_all, fields(len = text.len()))]
pub fn parse_document(text: &str) -> Result<Document<'_>> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };

    let doc = Document::parse_with_options(text, options)
        .map_err(|e| SchemaError::xml(e.to_string()))?;

    debug!(root = doc.root_element().tag_name().name(), "document parsed");
    Ok(doc)
}

// ---------------------------------------------------------------------------
// Node helpers
// ---------------------------------------------------------------------------

/// Whether `node` is an element with the given local name.
pub fn is_element(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

/// Element children with the given local name, in document order.
pub fn children_named<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |child| is_element(*child, name))
}

/// First element child with the given local name.
pub fn first_child_named<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &str,
) -> Option<Node<'a, 'input>> {
    node.children().find(|child| is_element(*child, name))
}

/// The node's `xml:id`, if declared.
pub fn xml_id<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.attribute((XML_NAMESPACE, "id"))
}

/// Concatenated text of every descendant text node.
pub fn text_content(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// The rows (`tbody/tr`) of a table element.
pub fn table_rows<'a, 'input>(table: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    first_child_named(table, "tbody")
        .map(|tbody| {
            tbody
                .children()
                .filter(|child| is_element(*child, "tr"))
                .collect()
        })
        .unwrap_or_default()
}

/// The `position`-th (1-based) cell of a table row.
///
/// Cells are `td`, but the standard occasionally uses `th` in data rows, so
/// the `position`-th `th` is used when there are not enough `td` cells.
pub fn cell<'a, 'input>(row: Node<'a, 'input>, position: usize) -> Option<Node<'a, 'input>> {
    let index = position.checked_sub(1)?;
    row.children()
        .filter(|child| is_element(*child, "td"))
        .nth(index)
        .or_else(|| {
            row.children()
                .filter(|child| is_element(*child, "th"))
                .nth(index)
        })
}

/// All `td` cells of a row, in order.
pub fn data_cells<'a, 'input>(row: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    row.children()
        .filter(|child| is_element(*child, "td"))
        .collect()
}

/// Trimmed text of a cell's first `para`, or of the cell itself when it has none.
pub fn cell_text(cell: Node<'_, '_>) -> String {
    let source = first_child_named(cell, "para").unwrap_or(cell);
    text_content(source).trim().to_string()
}

/// `linkend` of the first `xref` anywhere below `node`.
pub fn first_xref_target<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.descendants()
        .filter(|n| is_element(*n, "xref"))
        .find_map(|n| n.attribute("linkend"))
}
