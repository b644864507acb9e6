//! Config validation - warns about unknown fields

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Validate JSON config and warn about unknown fields.
pub fn warn_unknown_fields(content: &str, config_name: &str) {
    let Ok(value) = serde_json::from_str::<Value>(content) else {
        return;
    };

    let expected = expected_config_keys();
    let unknowns = find_unknown_keys(&value, &expected, "");

    for path in unknowns {
        warn!("Unknown config field in {config_name}: {path}");
    }
}

/// Find unknown keys in JSON value compared to expected keys.
/// Returns paths like "general.unknownField" for unknown fields.
fn find_unknown_keys(value: &Value, expected: &ExpectedKeys, prefix: &str) -> Vec<String> {
    let mut unknowns = Vec::new();

    let Value::Object(obj) = value else {
        return unknowns;
    };

    for (key, child) in obj {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        if let Some(nested) = expected.nested.get(key.as_str()) {
            unknowns.extend(find_unknown_keys(child, nested, &path));
        } else if !expected.fields.contains(key.as_str()) {
            unknowns.push(path);
        }
    }

    unknowns
}

/// Expected keys for a config section.
/// `fields` are leaf fields, `nested` are nested objects with their own expected keys.
struct ExpectedKeys {
    fields: HashSet<&'static str>,
    nested: HashMap<&'static str, ExpectedKeys>,
}

impl ExpectedKeys {
    fn new(fields: &[&'static str]) -> Self {
        Self {
            fields: fields.iter().copied().collect(),
            nested: HashMap::new(),
        }
    }

    fn with_nested(mut self, key: &'static str, nested: ExpectedKeys) -> Self {
        self.nested.insert(key, nested);
        self
    }
}

/// Expected keys for `Config` (settings.rs)
fn expected_config_keys() -> ExpectedKeys {
    let general_keys = ExpectedKeys::new(&["recentsCount", "searchDeveloperInfo"]);
    let catalog_keys = ExpectedKeys::new(&["soundEffectGroups"]);
    let list_keys = ExpectedKeys::new(&["rowHeight", "viewportHeight"]);
    let persistence_keys =
        ExpectedKeys::new(&["translationSaveDelaySecs", "curationSaveDelayMs"]);
    let thumbnail_keys = ExpectedKeys::new(&[
        "outputDirectory",
        "bundledDirectory",
        "manualAdjust",
        "darkBackground",
        "captureSize",
        "unloadEvery",
    ]);

    ExpectedKeys::new(&[])
        .with_nested("general", general_keys)
        .with_nested("catalog", catalog_keys)
        .with_nested("list", list_keys)
        .with_nested("persistence", persistence_keys)
        .with_nested("thumbnails", thumbnail_keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unknowns_of(json: &str) -> Vec<String> {
        let value: Value = serde_json::from_str(json).unwrap();
        find_unknown_keys(&value, &expected_config_keys(), "")
    }

    #[test]
    fn test_valid_config_no_warnings() {
        let unknowns = unknowns_of(
            r#"{
                "general": {"recentsCount": 10},
                "list": {"rowHeight": 32.0},
                "thumbnails": {"manualAdjust": true, "captureSize": 128}
            }"#,
        );

        assert!(
            unknowns.is_empty(),
            "Expected no unknowns, got: {unknowns:?}"
        );
    }

    #[test]
    fn test_unknown_top_level_field() {
        let unknowns = unknowns_of(r#"{"general": {}, "unknownSection": {}}"#);
        assert_eq!(unknowns, vec!["unknownSection"]);
    }

    #[test]
    fn test_unknown_nested_field() {
        let unknowns = unknowns_of(r#"{"persistence": {"curationSaveDelayMs": 5, "typo": 1}}"#);
        assert_eq!(unknowns, vec!["persistence.typo"]);
    }

    #[test]
    fn test_multiple_unknown_fields() {
        let unknowns = unknowns_of(
            r#"{
                "catalog": {"typo1": 1, "typo2": 2},
                "badSection": {}
            }"#,
        );

        assert!(unknowns.contains(&"catalog.typo1".to_string()));
        assert!(unknowns.contains(&"catalog.typo2".to_string()));
        assert!(unknowns.contains(&"badSection".to_string()));
    }

    #[test]
    fn test_warn_unknown_fields_does_not_panic_on_invalid_json() {
        warn_unknown_fields("not valid json", "test");
    }

    #[test]
    fn test_empty_config_no_warnings() {
        assert!(unknowns_of("{}").is_empty());
    }
}
