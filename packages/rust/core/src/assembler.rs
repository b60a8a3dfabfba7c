//! IOD discovery and module assembly.
//!
//! IODs are listed in Annex A as tables captioned "<Name> IOD Modules". Each
//! row names a module, its usage and the section defining it. Modules are
//! parsed once (keyed by section) no matter how many IODs reference them.

use std::collections::BTreeMap;
use std::rc::Rc;

use iodschema_docbook::roxmltree::{Document, Node};
use iodschema_docbook::{
    cell_text, children_named, data_cells, first_child_named, first_xref_target, is_element,
    table_rows, text_content, xml_id,
};
use tracing::{debug, info, instrument};

use iodschema_shared::{
    Attribute, Diagnostic, DiagnosticKind, Dictionary, Iod, ModuleUsage, Result, SchemaError,
    SchemaOutput,
};

use crate::diagnostics::DiagnosticLog;
use crate::index::TabularIndex;
use crate::tree::TreeBuilder;

/// Label of the chapter holding the IOD tables.
const IOD_CHAPTER: &str = "A";

const IOD_CAPTION_SUFFIX: &str = " IOD Modules";

/// Result of [`parse_iods`].
#[derive(Debug, Clone, Default)]
pub struct SchemaParse {
    pub output: SchemaOutput,
    /// Every recoverable anomaly, in the order it was met.
    pub diagnostics: Vec<Diagnostic>,
}

/// An IOD table found in Annex A.
#[derive(Debug, Clone)]
pub struct IodTable<'a, 'input> {
    pub name: String,
    pub table: Node<'a, 'input>,
}

/// A module row of an IOD table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRow<'a> {
    pub name: String,
    pub usage: String,
    pub section_id: &'a str,
}

/// Parse the requested IODs (every IOD when `requested` is empty) and all
/// modules they reference.
#[instrument(skip_all, fields(requested = requested.len()))]
pub fn parse_iods(
    doc: &Document<'_>,
    dictionary: &Dictionary,
    requested: &[String],
) -> Result<SchemaParse> {
    let index = TabularIndex::build(doc)?;
    let mut builder = TreeBuilder::new(&index, dictionary);
    let mut output = SchemaOutput::default();

    for iod in find_iod_tables(doc) {
        if !requested.is_empty() && !requested.contains(&iod.name) {
            continue;
        }

        let mut modules = Vec::new();
        for row in table_rows(iod.table) {
            let Some(module) = read_module_row(row, &iod.name, &mut builder.log) else {
                continue;
            };

            let attributes = builder.resolve_module(module.section_id)?;
            output
                .modules
                .entry(module.name.clone())
                .or_insert_with(|| attributes.as_ref().clone());
            modules.push(ModuleUsage {
                name: module.name,
                usage: module.usage,
            });
        }

        debug!(iod = %iod.name, modules = modules.len(), "IOD assembled");
        output.iods.insert(
            iod.name.clone(),
            Iod {
                name: iod.name,
                modules,
            },
        );
    }

    let missing = missing_names(requested, &output.iods);
    if !missing.is_empty() {
        return Err(SchemaError::IodsNotFound { names: missing });
    }

    info!(
        iods = output.iods.len(),
        modules = output.modules.len(),
        macros = builder.macros.len(),
        diagnostics = builder.diagnostics().len(),
        "IODs parsed"
    );

    Ok(SchemaParse {
        output,
        diagnostics: builder.into_diagnostics(),
    })
}

/// Tables under the Annex A chapter whose caption names an IOD.
pub fn find_iod_tables<'a, 'input>(doc: &'a Document<'input>) -> Vec<IodTable<'a, 'input>> {
    children_named(doc.root_element(), "chapter")
        .filter(|chapter| chapter.attribute("label") == Some(IOD_CHAPTER))
        .flat_map(|chapter| chapter.descendants())
        .filter(|node| is_element(*node, "table"))
        .filter_map(|table| {
            let caption = first_child_named(table, "caption")?;
            let name = caption_name(caption)?;
            Some(IodTable { name, table })
        })
        .collect()
}

/// IOD name from a caption such as "CT Image IOD Modules".
fn caption_name(caption: Node<'_, '_>) -> Option<String> {
    let text = text_content(caption);
    text.contains(IOD_CAPTION_SUFFIX)
        .then(|| text.replace(IOD_CAPTION_SUFFIX, "").trim().to_string())
}

/// Read one row of an IOD table, reporting rows that cannot be used.
fn read_module_row<'a>(
    row: Node<'a, '_>,
    iod: &str,
    log: &mut DiagnosticLog,
) -> Option<ModuleRow<'a>> {
    let cells = data_cells(row);
    let Some(section_id) = first_xref_target(row) else {
        let text = cells.iter().map(|c| cell_text(*c)).collect::<Vec<_>>().join(" | ");
        log.report(
            DiagnosticKind::SkippedModuleRow,
            format!("{iod}: module row without a section reference: {text}"),
        );
        return None;
    };

    // Leading IE cells span several rows, so count from the end.
    if cells.len() < 3 {
        log.report(
            DiagnosticKind::SkippedModuleRow,
            format!("{iod}: module row for {section_id} has {} cells", cells.len()),
        );
        return None;
    }

    let name = cell_text(cells[cells.len() - 3]);
    let usage = cell_text(cells[cells.len() - 1])
        .chars()
        .next()
        .map(String::from)
        .unwrap_or_default();

    Some(ModuleRow {
        name,
        usage,
        section_id,
    })
}

/// Requested names with no IOD in the output, in request order.
fn missing_names(requested: &[String], found: &BTreeMap<String, Iod>) -> Vec<String> {
    let mut missing: Vec<String> = Vec::new();
    for name in requested {
        if !found.contains_key(name) && !missing.contains(name) {
            missing.push(name.clone());
        }
    }
    missing
}

impl TreeBuilder<'_, '_, '_> {
    /// Attributes of the module defined in a section, parsed once per section.
    ///
    /// The module table is the first table directly inside the section.
    pub fn resolve_module(&mut self, section_id: &str) -> Result<Rc<Vec<Attribute>>> {
        if let Some(cached) = self.modules.get(section_id) {
            return Ok(cached);
        }

        let section = self
            .index
            .section(section_id)
            .ok_or_else(|| SchemaError::MissingSection {
                section_id: section_id.to_string(),
            })?;

        let attributes = match first_child_named(section, "table") {
            Some(table) => {
                let table_id = xml_id(table).unwrap_or(section_id);
                self.build(table_id, &table_rows(table))?
            }
            None => Vec::new(),
        };

        debug!(section_id, attributes = attributes.len(), "module resolved");
        Ok(self.modules.insert(section_id, attributes))
    }
}
