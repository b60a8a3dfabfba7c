//! Fixture loading and small DocBook builders shared by the unit tests.

use iodschema_docbook::parse_document;
use iodschema_shared::{Dictionary, DictionaryEntry, Tag, ValueRepresentation};

pub(crate) fn load_part03() -> String {
    std::fs::read_to_string("../../../fixtures/docbook/part03-sample.xml")
        .expect("read part03 fixture")
}

/// Dictionary parsed from the Part 6 fixture.
pub(crate) fn fixture_dictionary() -> Dictionary {
    let text = std::fs::read_to_string("../../../fixtures/docbook/part06-sample.xml")
        .expect("read part06 fixture");
    let doc = parse_document(&text).unwrap();
    iodschema_dictionary::parse_dictionary(&doc)
        .unwrap()
        .dictionary
}

/// Dictionary from `(tag, vr)` pairs.
pub(crate) fn dictionary(entries: &[(&str, &str)]) -> Dictionary {
    entries
        .iter()
        .map(|(tag, vr)| {
            (
                Tag::new(*tag),
                DictionaryEntry {
                    name: format!("Attribute{tag}"),
                    vr: ValueRepresentation::from_cell(vr),
                    vm: "1".into(),
                },
            )
        })
        .collect()
}

/// An attribute row. `tag` is `GGGGEEEE`.
pub(crate) fn row(name: &str, tag: &str, description: &str) -> String {
    format!(
        "<tr><td><para>{name}</para></td><td><para>({},{})</para></td><td><para>1</para></td><td><para>{description}</para></td></tr>",
        &tag[..4],
        &tag[4..]
    )
}

/// A `>Include` row referencing a macro table.
pub(crate) fn include_row(markers: &str, table_id: &str) -> String {
    format!(
        r#"<tr><td><para>{markers}Include <xref linkend="{table_id}"/></para></td><td colspan="3"><para/></td></tr>"#
    )
}

pub(crate) fn table(id: &str, rows: &[String]) -> String {
    format!(
        r#"<table xml:id="{id}"><tbody>{}</tbody></table>"#,
        rows.concat()
    )
}

pub(crate) fn book(body: &str) -> String {
    format!(r#"<book xmlns="http://docbook.org/ns/docbook"><chapter label="C">{body}</chapter></book>"#)
}
