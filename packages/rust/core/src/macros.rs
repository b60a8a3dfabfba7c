//! Resolution of macro tables spliced in by `>Include` rows.

use std::rc::Rc;

use tracing::debug;

use iodschema_shared::{Attribute, Result, SchemaError};

use crate::tree::TreeBuilder;

impl TreeBuilder<'_, '_, '_> {
    /// Attributes of a macro table, parsed on first use and cached after.
    ///
    /// Every call for the same id returns the same shared list. A table that
    /// includes itself, directly or through other macros, is an error.
    pub fn resolve_macro(&mut self, table_id: &str) -> Result<Rc<Vec<Attribute>>> {
        if let Some(cached) = self.macros.get(table_id) {
            return Ok(cached);
        }

        if self.resolving.iter().any(|id| id == table_id) {
            return Err(SchemaError::MacroCycle {
                table_id: table_id.to_string(),
            });
        }

        let index = self.index;
        let rows = index
            .table_rows(table_id)
            .ok_or_else(|| SchemaError::MissingTable {
                table_id: table_id.to_string(),
            })?;

        self.resolving.push(table_id.to_string());
        let built = self.build(table_id, rows);
        self.resolving.pop();
        let attributes = built?;

        debug!(table_id, attributes = attributes.len(), "macro resolved");
        Ok(self.macros.insert(table_id, attributes))
    }
}

/// Independent copy of a macro's attributes placed at `depth`.
pub fn expand(attributes: &[Attribute], depth: usize) -> Vec<Attribute> {
    attributes.iter().map(|a| a.rebased(depth)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::TabularIndex;
    use crate::test_support::{book, dictionary, include_row, row, table};
    use iodschema_docbook::parse_document;
    use iodschema_shared::Dictionary;

    fn dict() -> Dictionary {
        dictionary(&[("00081150", "UI"), ("00081155", "UI"), ("00081120", "SQ")])
    }

    fn macro_doc() -> String {
        book(&table(
            "table_10-11",
            &[
                row("Referenced SOP Class UID", "00081150", "Class."),
                row("Referenced SOP Instance UID", "00081155", "Instance."),
            ],
        ))
    }

    #[test]
    fn repeated_resolution_is_reference_identical() {
        let xml = macro_doc();
        let doc = parse_document(&xml).unwrap();
        let index = TabularIndex::build(&doc).unwrap();
        let dictionary = dict();
        let mut builder = TreeBuilder::new(&index, &dictionary);

        let first = builder.resolve_macro("table_10-11").unwrap();
        let second = builder.resolve_macro("table_10-11").unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn expansions_are_independent_of_each_other_and_the_cache() {
        let xml = macro_doc();
        let doc = parse_document(&xml).unwrap();
        let index = TabularIndex::build(&doc).unwrap();
        let dictionary = dict();
        let mut builder = TreeBuilder::new(&index, &dictionary);

        let shared = builder.resolve_macro("table_10-11").unwrap();
        let mut first = expand(&shared, 0);
        let second = expand(&shared, 2);

        first[0].label = "3".into();

        assert_eq!(second[0].label, "1");
        assert_eq!(second[0].depth, 2);
        assert_eq!(shared[0].label, "1");
        assert_eq!(shared[0].depth, 0);
    }

    #[test]
    fn missing_table_is_fatal() {
        let xml = macro_doc();
        let doc = parse_document(&xml).unwrap();
        let index = TabularIndex::build(&doc).unwrap();
        let dictionary = dict();
        let mut builder = TreeBuilder::new(&index, &dictionary);

        let err = builder.resolve_macro("table_C.99-1").unwrap_err();
        assert!(matches!(
            err,
            SchemaError::MissingTable { table_id } if table_id == "table_C.99-1"
        ));
    }

    #[test]
    fn self_inclusion_is_a_cycle() {
        let xml = book(&format!(
            "{}{}",
            table(
                "table_a",
                &[
                    row("Seq", "00081120", "Zero or more Items shall be included in this Sequence."),
                    include_row(">", "table_b"),
                ],
            ),
            table("table_b", &[include_row("", "table_a")]),
        ));
        let doc = parse_document(&xml).unwrap();
        let index = TabularIndex::build(&doc).unwrap();
        let dictionary = dict();
        let mut builder = TreeBuilder::new(&index, &dictionary);

        let err = builder.resolve_macro("table_a").unwrap_err();
        assert!(matches!(err, SchemaError::MacroCycle { table_id } if table_id == "table_a"));
        assert!(builder.resolving.is_empty());
    }
}
