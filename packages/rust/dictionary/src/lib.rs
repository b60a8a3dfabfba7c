//! Flat data-dictionary parser for PS3.6.
//!
//! PS3.6 lists every attribute in the registry tables of chapters 6–9. Each
//! row becomes one `tag → {name, vr, vm}` entry. The parsed dictionary is slow
//! to produce from the full document, so it is cached as JSON and reloaded on
//! later runs.

use std::path::Path;

use iodschema_docbook::roxmltree::Document;
use iodschema_docbook::{cell, cell_text, children_named, is_element, table_rows};
use tracing::{debug, info, instrument, warn};

use iodschema_shared::{
    Diagnostic, DiagnosticKind, Dictionary, DictionaryEntry, Result, SchemaError, Tag,
    ValueRepresentation,
};

/// Chapter labels holding attribute registries.
const REGISTRY_CHAPTERS: [&str; 4] = ["6", "7", "8", "9"];

/// Output of [`parse_dictionary`].
#[derive(Debug, Clone, Default)]
pub struct DictionaryParse {
    /// Parsed entries, key-sorted.
    pub dictionary: Dictionary,
    /// Rows that could not be read.
    pub diagnostics: Vec<Diagnostic>,
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse the attribute registry tables of a PS3.6 document.
#[instrument(skip_all)]
pub fn parse_dictionary(doc: &Document<'_>) -> Result<DictionaryParse> {
    let book = doc.root_element();
    if !is_element(book, "book") {
        return Err(SchemaError::structure(format!(
            "expected a DocBook <book> root, found <{}>",
            book.tag_name().name()
        )));
    }

    let mut parse = DictionaryParse::default();

    for chapter in children_named(book, "chapter") {
        let Some(label) = chapter.attribute("label") else {
            continue;
        };
        if !REGISTRY_CHAPTERS.contains(&label) {
            continue;
        }

        for table in children_named(chapter, "table") {
            let rows = table_rows(table);
            debug!(chapter = label, rows = rows.len(), "reading registry table");

            for row in rows {
                parse_row(row, &mut parse);
            }
        }
    }

    info!(
        entries = parse.dictionary.len(),
        skipped = parse.diagnostics.len(),
        "data dictionary parsed"
    );

    Ok(parse)
}

fn parse_row(row: iodschema_docbook::roxmltree::Node<'_, '_>, parse: &mut DictionaryParse) {
    let cells = (cell(row, 1), cell(row, 3), cell(row, 4), cell(row, 5));
    let (Some(tag_cell), Some(name_cell), Some(vr_cell), Some(vm_cell)) = cells else {
        report(parse, "registry row has fewer than five cells".to_string());
        return;
    };

    let tag_text = cell_text(tag_cell);
    let Some(parsed) = Tag::parse_cell(&tag_text) else {
        report(parse, format!("cannot read tag '{tag_text}'"));
        return;
    };

    parse.dictionary.insert(
        parsed.tag,
        DictionaryEntry {
            name: cell_text(name_cell),
            vr: ValueRepresentation::from_cell(&cell_text(vr_cell)),
            vm: cell_text(vm_cell),
        },
    );
}

fn report(parse: &mut DictionaryParse, message: String) {
    warn!(%message, "skipping dictionary row");
    parse
        .diagnostics
        .push(Diagnostic::new(DiagnosticKind::SkippedDictionaryRow, message));
}

// ---------------------------------------------------------------------------
// JSON cache
// ---------------------------------------------------------------------------

/// Load a cached dictionary written by [`save_dictionary`].
pub fn load_dictionary(path: &Path) -> Result<Dictionary> {
    let content = std::fs::read_to_string(path).map_err(|e| SchemaError::io(path, e))?;

    let dictionary: Dictionary = serde_json::from_str(&content).map_err(|e| {
        SchemaError::validation(format!("invalid dictionary {}: {e}", path.display()))
    })?;

    debug!(path = %path.display(), entries = dictionary.len(), "loaded cached dictionary");
    Ok(dictionary)
}

/// Write the dictionary as key-sorted JSON.
pub fn save_dictionary(path: &Path, dictionary: &Dictionary) -> Result<()> {
    let json = serde_json::to_string(dictionary)
        .map_err(|e| SchemaError::validation(format!("JSON serialization failed: {e}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SchemaError::io(parent, e))?;
    }
    std::fs::write(path, json).map_err(|e| SchemaError::io(path, e))?;

    info!(path = %path.display(), entries = dictionary.len(), "wrote dictionary");
    Ok(())
}
