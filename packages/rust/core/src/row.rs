//! Classification of a single module or macro table row.

use iodschema_docbook::roxmltree::Node;
use iodschema_docbook::{cell, cell_text, first_xref_target, is_element, xml_id};

use iodschema_shared::{DiagnosticKind, Tag};

use crate::diagnostics::DiagnosticLog;

/// Header rows that appear inside attribute tables and carry no attribute.
const BENIGN_HEADERS: [&str; 2] = ["BASIC CODED ENTRY ATTRIBUTES", "ENHANCED ENCODING MODE"];

/// A row describing one attribute.
#[derive(Debug, Clone)]
pub struct AttributeRow<'a, 'input> {
    pub depth: usize,
    pub tag: Tag,
    /// Requirement type cell text.
    pub label: String,
    /// Description cell, searched later for value lists and item counts.
    pub description: Node<'a, 'input>,
}

/// What a row turned out to be.
#[derive(Debug, Clone)]
pub enum RowKind<'a, 'input> {
    Attribute(AttributeRow<'a, 'input>),
    /// `>Include Table X` row splicing a macro's attributes in at `depth`.
    Macro { table_id: &'a str, depth: usize },
    Unparsable,
}

/// Number of leading `>` markers on a name cell.
pub fn depth_of(name: &str) -> usize {
    name.chars().take_while(|c| *c == '>').count()
}

/// Classify a row, reporting anything that has to be skipped.
pub fn classify_row<'a, 'input>(
    row: Node<'a, 'input>,
    log: &mut DiagnosticLog,
) -> RowKind<'a, 'input> {
    let name = cell(row, 1).map(cell_text).unwrap_or_default();
    let depth = depth_of(&name);

    if name.contains("Include") {
        if let Some(table_id) = first_xref_target(row).filter(|id| id.starts_with("table")) {
            return RowKind::Macro { table_id, depth };
        }
    }

    let Some(description) = cell(row, 4) else {
        if !BENIGN_HEADERS.contains(&name.as_str()) {
            log.report(
                DiagnosticKind::UnparsableRow,
                format!("{}: no description cell in row '{name}'", table_of(row)),
            );
        }
        return RowKind::Unparsable;
    };

    let tag_text = cell(row, 2).map(cell_text).unwrap_or_default();
    let Some(parsed) = Tag::parse_cell(&tag_text) else {
        log.report(
            DiagnosticKind::UnparsableRow,
            format!("{}: cannot read tag '{tag_text}' in row '{name}'", table_of(row)),
        );
        return RowKind::Unparsable;
    };

    if parsed.corrected {
        log.report(
            DiagnosticKind::CorrectedTag,
            format!("{}: corrected tag '{tag_text}' to {}", table_of(row), parsed.tag),
        );
    }

    RowKind::Attribute(AttributeRow {
        depth,
        tag: parsed.tag,
        label: cell(row, 3).map(cell_text).unwrap_or_default(),
        description,
    })
}

/// `xml:id` of the table holding `row`, for messages.
fn table_of<'a>(row: Node<'a, '_>) -> &'a str {
    row.ancestors()
        .find(|n| is_element(*n, "table"))
        .and_then(xml_id)
        .unwrap_or("<unnamed table>")
}
