//! Reconstruction of nested attribute trees from depth-marked rows.
//!
//! Attribute tables are flattened outlines: a row's nesting is only given by
//! the number of `>` markers on its name. The builder walks the rows once,
//! front to back. Every sequence attribute immediately consumes the rows of
//! its item body (one marker deeper). The first row that is shallower ends
//! the body, and its parsed content is handed back up to the caller, which
//! merges it into its own tiers ("merge-up").
//!
//! The row position is threaded through the calls and returned, so nothing
//! but the caches and the diagnostic log is shared between levels.

use std::collections::BTreeMap;

use iodschema_docbook::roxmltree::Node;
use tracing::{debug, instrument};

use iodschema_shared::{Attribute, AttributeKind, Diagnostic, Dictionary, Result, SchemaError};

use crate::cache::{MacroCache, ModuleCache};
use crate::cardinality::resolve_item_count;
use crate::diagnostics::DiagnosticLog;
use crate::index::TabularIndex;
use crate::macros::expand;
use crate::row::{AttributeRow, RowKind, classify_row};
use crate::values::resolve_value_lists;

/// Attributes parsed so far, grouped by depth. Each tier keeps document order.
pub(crate) type DepthMap = BTreeMap<usize, Vec<Attribute>>;

/// Parser state shared across every table of one run.
#[derive(Debug)]
pub struct TreeBuilder<'i, 'a, 'input> {
    pub(crate) index: &'i TabularIndex<'a, 'input>,
    dictionary: &'i Dictionary,
    pub(crate) macros: MacroCache,
    pub(crate) modules: ModuleCache,
    /// Macro tables currently being resolved, outermost first.
    pub(crate) resolving: Vec<String>,
    pub(crate) log: DiagnosticLog,
}

impl<'i, 'a, 'input> TreeBuilder<'i, 'a, 'input> {
    pub fn new(index: &'i TabularIndex<'a, 'input>, dictionary: &'i Dictionary) -> Self {
        Self {
            index,
            dictionary,
            macros: MacroCache::default(),
            modules: ModuleCache::default(),
            resolving: Vec::new(),
            log: DiagnosticLog::new(),
        }
    }

    /// Build the top-level attribute list of one table.
    ///
    /// Anything left at a depth other than 0 once the rows run out means the
    /// outline skipped a level, which is fatal.
    #[instrument(level = "debug", skip(self, rows), fields(rows = rows.len()))]
    pub fn build(&mut self, table_id: &str, rows: &[Node<'a, 'input>]) -> Result<Vec<Attribute>> {
        let mut tiers = DepthMap::new();
        let mut pos = 0;

        while pos < rows.len() {
            let (parsed, next) = self.parse_row(table_id, rows, pos)?;
            merge(&mut tiers, parsed);
            pos = next;
        }

        let attributes = tiers.remove(&0).unwrap_or_default();
        if !tiers.is_empty() {
            return Err(SchemaError::UnconsumedDepth {
                table: table_id.to_string(),
                depths: tiers.into_keys().collect(),
            });
        }

        debug!(attributes = attributes.len(), "table built");
        Ok(attributes)
    }

    /// Parse the row at `pos`, including the body of a sequence it opens.
    /// Returns the parsed tiers and the position of the next unread row.
    fn parse_row(
        &mut self,
        table_id: &str,
        rows: &[Node<'a, 'input>],
        pos: usize,
    ) -> Result<(DepthMap, usize)> {
        let next = pos + 1;

        match classify_row(rows[pos], &mut self.log) {
            RowKind::Unparsable => Ok((DepthMap::new(), next)),
            RowKind::Macro {
                table_id: macro_id,
                depth,
            } => {
                let attributes = self.resolve_macro(macro_id)?;
                Ok((DepthMap::from([(depth, expand(&attributes, depth))]), next))
            }
            RowKind::Attribute(row) => {
                let depth = row.depth;
                let mut attribute = self.build_attribute(row)?;

                let (mut parsed, next) = if attribute.is_sequence() {
                    let (items, rest, after) =
                        self.parse_sequence(table_id, depth + 1, rows, next)?;
                    if let AttributeKind::Sequence {
                        item_attributes, ..
                    } = &mut attribute.kind
                    {
                        *item_attributes = items;
                    }
                    (rest, after)
                } else {
                    (DepthMap::new(), next)
                };

                // Siblings handed back from the body follow the sequence itself.
                parsed.entry(depth).or_default().insert(0, attribute);
                Ok((parsed, next))
            }
        }
    }

    /// Consume the item body of a sequence starting at `pos`.
    ///
    /// Returns the items, the tiers of the first shallower row (with anything
    /// that row carried along), and the next position.
    fn parse_sequence(
        &mut self,
        table_id: &str,
        item_depth: usize,
        rows: &[Node<'a, 'input>],
        mut pos: usize,
    ) -> Result<(Vec<Attribute>, DepthMap, usize)> {
        let mut items = Vec::new();

        while pos < rows.len() {
            let (mut parsed, next) = self.parse_row(table_id, rows, pos)?;
            pos = next;

            let orphans: Vec<usize> = parsed.range(item_depth + 1..).map(|(d, _)| *d).collect();
            if !orphans.is_empty() {
                return Err(SchemaError::UnconsumedDepth {
                    table: table_id.to_string(),
                    depths: orphans,
                });
            }

            if let Some(mut tier) = parsed.remove(&item_depth) {
                items.append(&mut tier);
            }
            if !parsed.is_empty() {
                return Ok((items, parsed, pos));
            }
        }

        Ok((items, DepthMap::new(), pos))
    }

    fn build_attribute(&mut self, row: AttributeRow<'a, 'input>) -> Result<Attribute> {
        let entry = self
            .dictionary
            .get(&row.tag)
            .ok_or_else(|| SchemaError::UnknownTag {
                tag: row.tag.to_string(),
            })?;

        let kind = if entry.vr.is_sequence() {
            AttributeKind::Sequence {
                item_count: resolve_item_count(&row.tag, row.description, &mut self.log),
                item_attributes: Vec::new(),
            }
        } else {
            let lists = resolve_value_lists(row.description, self.index, &mut self.log);
            AttributeKind::Element {
                enumerated_values: lists.enumerated_values,
                defined_terms: lists.defined_terms,
            }
        };

        Ok(Attribute {
            tag: row.tag,
            label: row.label,
            depth: row.depth,
            vr: entry.vr.clone(),
            vm: entry.vm.clone(),
            kind,
        })
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.log.entries()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.log.into_entries()
    }
}

/// Append every tier of `other` to the matching tier of `into`.
fn merge(into: &mut DepthMap, other: DepthMap) {
    for (depth, mut attributes) in other {
        into.entry(depth).or_default().append(&mut attributes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{book, dictionary, include_row, row, table};
    use iodschema_docbook::parse_document;
    use iodschema_shared::{DiagnosticKind, ItemCount, Tag, ValueRepresentation};

    const SINGLE: &str = "Only a single Item shall be included in this Sequence.";
    const MANY: &str = "One or more Items shall be included in this Sequence.";

    fn dict() -> Dictionary {
        dictionary(&[
            ("00100010", "PN"),
            ("00100020", "LO"),
            ("00100030", "DA"),
            ("00081120", "SQ"),
            ("00081150", "UI"),
            ("00081155", "UI"),
            ("00101002", "SQ"),
            ("00100024", "SQ"),
            ("00400032", "UT"),
        ])
    }

    fn build_table(xml: &str, table_id: &str) -> Result<Vec<Attribute>> {
        let doc = parse_document(xml).unwrap();
        let index = TabularIndex::build(&doc).unwrap();
        let dictionary = dict();
        let mut builder = TreeBuilder::new(&index, &dictionary);
        builder.build(table_id, index.table_rows(table_id).unwrap())
    }

    /// Pre-order `(depth, tag)` walk of a tree.
    fn flatten(attributes: &[Attribute]) -> Vec<(usize, String)> {
        let mut out = Vec::new();
        for attribute in attributes {
            out.push((attribute.depth, attribute.tag.to_string()));
            out.extend(flatten(attribute.item_attributes()));
        }
        out
    }

    fn tags(attributes: &[Attribute]) -> Vec<&str> {
        attributes.iter().map(|a| a.tag.as_str()).collect()
    }

    #[test]
    fn sequence_body_ends_at_shallower_row() {
        let xml = book(&table(
            "table_1",
            &[
                row("A", "00100010", "Name."),
                row("B", "00081120", SINGLE),
                row(">C", "00081150", "Class."),
                row("D", "00100030", "Birth date."),
            ],
        ));

        let attributes = build_table(&xml, "table_1").unwrap();
        assert_eq!(tags(&attributes), ["00100010", "00081120", "00100030"]);

        let sequence = &attributes[1];
        assert_eq!(tags(sequence.item_attributes()), ["00081150"]);
        assert_eq!(sequence.item_attributes()[0].depth, 1);
        match &sequence.kind {
            AttributeKind::Sequence { item_count, .. } => {
                assert_eq!(*item_count, Some(ItemCount::Range { min: 1, max: Some(1) }));
            }
            other => panic!("expected sequence, got {other:?}"),
        }
    }

    #[test]
    fn flattening_reproduces_the_rows() {
        let input = [
            (0, "00100010"),
            (0, "00101002"),
            (1, "00100020"),
            (1, "00100024"),
            (2, "00400032"),
            (2, "00081120"),
            (3, "00081150"),
            (3, "00081155"),
            (1, "00100030"),
            (0, "00081120"),
            (1, "00081155"),
        ];
        let rows: Vec<String> = input
            .iter()
            .map(|(depth, tag)| row(&format!("{}Field", ">".repeat(*depth)), tag, MANY))
            .collect();
        let xml = book(&table("table_1", &rows));

        let attributes = build_table(&xml, "table_1").unwrap();
        let expected: Vec<(usize, String)> =
            input.iter().map(|(d, t)| (*d, t.to_string())).collect();
        assert_eq!(flatten(&attributes), expected);
        assert_eq!(attributes.len(), 3);
    }

    #[test]
    fn sequence_at_end_of_table_keeps_its_items() {
        let xml = book(&table(
            "table_1",
            &[row("B", "00081120", SINGLE), row(">C", "00081150", "Class.")],
        ));

        let attributes = build_table(&xml, "table_1").unwrap();
        assert_eq!(attributes.len(), 1);
        assert_eq!(tags(attributes[0].item_attributes()), ["00081150"]);
    }

    #[test]
    fn empty_table_is_an_empty_list() {
        let xml = book(&table("table_1", &[]));
        assert!(build_table(&xml, "table_1").unwrap().is_empty());
    }

    #[test]
    fn unknown_tag_fails_the_parse() {
        let xml = book(&table(
            "table_1",
            &[row("A", "00100010", "Name."), row("Mystery", "FFFFFFFF", "?")],
        ));

        let err = build_table(&xml, "table_1").unwrap_err();
        assert!(matches!(&err, SchemaError::UnknownTag { tag } if tag == "FFFFFFFF"));
        assert_eq!(err.to_string(), "Tag FFFFFFFF was not in the dictionary.");
    }

    #[test]
    fn nested_row_under_plain_attribute_is_fatal() {
        let xml = book(&table(
            "table_1",
            &[row("A", "00100010", "Name."), row(">B", "00100020", "ID.")],
        ));

        match build_table(&xml, "table_1") {
            Err(SchemaError::UnconsumedDepth { table, depths }) => {
                assert_eq!(table, "table_1");
                assert_eq!(depths, vec![1]);
            }
            other => panic!("expected unconsumed depth, got {other:?}"),
        }
    }

    #[test]
    fn row_skipping_a_level_inside_a_sequence_is_fatal() {
        let xml = book(&table(
            "table_1",
            &[row("B", "00081120", SINGLE), row(">>C", "00081150", "Class.")],
        ));

        assert!(matches!(
            build_table(&xml, "table_1"),
            Err(SchemaError::UnconsumedDepth { depths, .. }) if depths == vec![2]
        ));
    }

    #[test]
    fn macro_rows_splice_rebased_copies() {
        let xml = book(&format!(
            "{}{}",
            table(
                "table_module",
                &[
                    include_row("", "table_macro"),
                    row("B", "00081120", SINGLE),
                    include_row(">", "table_macro"),
                ],
            ),
            table(
                "table_macro",
                &[row("X", "00081150", "Class."), row("Y", "00081155", "Instance.")],
            ),
        ));

        let attributes = build_table(&xml, "table_module").unwrap();
        assert_eq!(
            flatten(&attributes),
            vec![
                (0, "00081150".to_string()),
                (0, "00081155".to_string()),
                (0, "00081120".to_string()),
                (1, "00081150".to_string()),
                (1, "00081155".to_string()),
            ]
        );
    }

    #[test]
    fn rows_with_unreadable_tags_are_skipped() {
        let xml = book(&table(
            "table_1",
            &[
                row("A", "00100010", "Name."),
                "<tr><td><para>Broken</para></td><td><para>n/a</para></td><td><para>3</para></td><td><para>-</para></td></tr>".to_string(),
                row("D", "00100030", "Birth date."),
            ],
        ));

        let doc = parse_document(&xml).unwrap();
        let index = TabularIndex::build(&doc).unwrap();
        let dictionary = dict();
        let mut builder = TreeBuilder::new(&index, &dictionary);
        let attributes = builder
            .build("table_1", index.table_rows("table_1").unwrap())
            .unwrap();

        assert_eq!(tags(&attributes), ["00100010", "00100030"]);
        assert_eq!(builder.diagnostics().len(), 1);
        assert_eq!(builder.into_diagnostics()[0].kind, DiagnosticKind::UnparsableRow);
    }

    #[test]
    fn attributes_carry_dictionary_fields() {
        let xml = book(&table("table_1", &[row("A", "00100010", "Name.")]));
        let attributes = build_table(&xml, "table_1").unwrap();

        let attribute = &attributes[0];
        assert_eq!(attribute.tag, Tag::new("00100010"));
        assert_eq!(attribute.label, "1");
        assert_eq!(attribute.vm, "1");
        assert_eq!(attribute.vr, ValueRepresentation::Single("PN".into()));
    }
}
