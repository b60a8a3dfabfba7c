//! Serialization of the extracted schema to `IODs.json`.

use std::path::Path;

use tracing::{debug, info, instrument};

use iodschema_shared::{Result, SchemaError, SchemaOutput};

/// Serialize the output as JSON. Map keys come out sorted.
pub fn to_json(output: &SchemaOutput, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(output)
    } else {
        serde_json::to_string(output)
    };
    json.map_err(|e| SchemaError::validation(format!("JSON serialization failed: {e}")))
}

/// Write the output file atomically (temp file, then rename).
///
/// Missing parent directories are created.
#[instrument(skip_all, fields(path = %path.display(), pretty))]
pub fn write_output(path: &Path, output: &SchemaOutput, pretty: bool) -> Result<()> {
    let json = to_json(output, pretty)?;

    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        std::fs::create_dir_all(parent).map_err(|e| SchemaError::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| SchemaError::config(format!("invalid output path {}", path.display())))?;
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, &json).map_err(|e| SchemaError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| SchemaError::io(path, e))?;
    debug!(size = json.len(), "wrote JSON file");

    info!(
        iods = output.iods.len(),
        modules = output.modules.len(),
        "schema written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use iodschema_shared::{
        Attribute, AttributeKind, Iod, ItemCount, ModuleUsage, Tag, ValueRepresentation,
    };

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("iodschema-output-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample_output() -> SchemaOutput {
        let mut output = SchemaOutput::default();
        output.iods.insert(
            "CT Image".into(),
            Iod {
                name: "CT Image".into(),
                modules: vec![ModuleUsage {
                    name: "Patient".into(),
                    usage: "M".into(),
                }],
            },
        );
        output.modules.insert(
            "Patient".into(),
            vec![
                Attribute {
                    tag: Tag::new("00100040"),
                    label: "2".into(),
                    depth: 0,
                    vr: ValueRepresentation::Single("CS".into()),
                    vm: "1".into(),
                    kind: AttributeKind::Element {
                        enumerated_values: Some(vec!["M".into(), "F".into(), "O".into()]),
                        defined_terms: None,
                    },
                },
                Attribute {
                    tag: Tag::new("00081115"),
                    label: "1".into(),
                    depth: 0,
                    vr: ValueRepresentation::Single("SQ".into()),
                    vm: "1".into(),
                    kind: AttributeKind::Sequence {
                        item_count: Some(ItemCount::FromTag {
                            count_from_tag: Tag::new("00201209"),
                        }),
                        item_attributes: Vec::new(),
                    },
                },
            ],
        );
        output
    }

    #[test]
    fn json_shape_uses_schema_field_names() {
        let json = to_json(&sample_output(), false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let patient = &value["modules"]["Patient"];
        assert_eq!(patient[0]["type"], "2");
        assert_eq!(patient[0]["depth"], 0);
        assert_eq!(patient[0]["enumeratedValues"][2], "O");
        assert!(patient[0].get("definedTerms").is_none());
        assert_eq!(patient[1]["itemCount"]["countFromTag"], "00201209");
        assert_eq!(patient[1]["itemAttributes"].as_array().unwrap().len(), 0);
        assert_eq!(value["iods"]["CT Image"]["modules"][0]["usage"], "M");
    }

    #[test]
    fn unbounded_range_omits_max() {
        let count = ItemCount::Range { min: 1, max: None };
        let json = serde_json::to_string(&count).unwrap();
        assert_eq!(json, r#"{"min":1}"#);

        let back: ItemCount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, count);

        let bounded = ItemCount::Range { min: 0, max: Some(2) };
        assert_eq!(serde_json::to_string(&bounded).unwrap(), r#"{"min":0,"max":2}"#);
    }

    #[test]
    fn write_output_creates_parents_and_leaves_no_temp_file() {
        let tmp = temp_dir();
        let path = tmp.join("out").join("IODs.json");

        write_output(&path, &sample_output(), true).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\n  \"iods\""));
        assert!(!tmp.join("out").join(".IODs.json.tmp").exists());

        let roundtrip: SchemaOutput = serde_json::from_str(&written).unwrap();
        assert_eq!(roundtrip, sample_output());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn output_is_deterministic() {
        let first = to_json(&sample_output(), false).unwrap();
        let second = to_json(&sample_output(), false).unwrap();
        assert_eq!(first, second);
        assert!(first.find("\"iods\"").unwrap() < first.find("\"modules\"").unwrap());
    }
}
