//! One-pass index of a DocBook document's sections and tables.

use std::collections::HashMap;

use iodschema_docbook::roxmltree::{Document, Node};
use iodschema_docbook::{is_element, table_rows, xml_id};
use tracing::{debug, instrument};

use iodschema_shared::{Result, SchemaError};

/// Lookups from `xml:id` to section nodes and to table rows.
///
/// Built once before parsing; every later reference resolves through it.
/// Nodes without an `xml:id` are simply not indexed.
#[derive(Debug)]
pub struct TabularIndex<'a, 'input> {
    sections: HashMap<&'a str, Node<'a, 'input>>,
    tables: HashMap<&'a str, Vec<Node<'a, 'input>>>,
}

impl<'a, 'input> TabularIndex<'a, 'input> {
    /// Scan every `section` and `table` of the document.
    #[instrument(skip_all)]
    pub fn build(doc: &'a Document<'input>) -> Result<Self> {
        let root = doc.root_element();
        if !is_element(root, "book") {
            return Err(SchemaError::structure(format!(
                "expected a DocBook <book> root, found <{}>",
                root.tag_name().name()
            )));
        }

        let mut sections = HashMap::new();
        let mut tables = HashMap::new();

        for node in root.descendants() {
            let Some(id) = xml_id(node) else {
                continue;
            };
            if is_element(node, "section") {
                sections.insert(id, node);
            } else if is_element(node, "table") {
                tables.insert(id, table_rows(node));
            }
        }

        debug!(
            sections = sections.len(),
            tables = tables.len(),
            "document indexed"
        );

        Ok(Self { sections, tables })
    }

    pub fn section(&self, id: &str) -> Option<Node<'a, 'input>> {
        self.sections.get(id).copied()
    }

    /// Rows of the table with the given id, in document order.
    pub fn table_rows(&self, id: &str) -> Option<&[Node<'a, 'input>]> {
        self.tables.get(id).map(Vec::as_slice)
    }
}
