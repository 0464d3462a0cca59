//! Operator-supplied custom facts
//!
//! Custom facts come from a YAML mapping. Nested mappings expand into
//! deeper paths, so a file can override a single leaf such as
//! `networking.hostname` without replacing the rest of `networking`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::{debug, instrument};

use crate::error::CoreError;
use crate::fact::{Fact, FactValue};

/// When custom facts are merged relative to reporter facts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomFactsOrder {
    /// Merge first; reporters overwrite coinciding paths
    #[default]
    BeforeReporters,
    /// Merge last; custom values overwrite coinciding paths
    AfterReporters,
}

/// Facts loaded from a custom facts file
#[derive(Debug, Clone, Default)]
pub struct CustomFacts {
    facts: Vec<Fact>,
}

impl CustomFacts {
    /// Load custom facts from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a YAML mapping.
    #[instrument]
    pub async fn load(path: &Path) -> Result<Self, CoreError> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| CoreError::CustomFactsRead {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
        let custom = Self::from_yaml_str(&content)?;
        debug!(count = custom.len(), "loaded custom facts");
        Ok(custom)
    }

    /// Parse custom facts from YAML text
    ///
    /// An empty document yields no facts.
    ///
    /// # Errors
    /// Returns an error if the text is not valid YAML or its top level is
    /// not a mapping.
    pub fn from_yaml_str(content: &str) -> Result<Self, CoreError> {
        let document: Value =
            serde_yaml::from_str(content).map_err(|e| CoreError::CustomFactsParse(e.to_string()))?;

        let mapping = match document {
            Value::Mapping(mapping) => mapping,
            Value::Null => return Ok(Self::default()),
            other => {
                return Err(CoreError::CustomFactsParse(format!(
                    "expected a mapping at the top level, found {}",
                    yaml_kind(&other)
                )));
            }
        };

        let mut facts = Vec::new();
        let mut prefix = Vec::new();
        expand_mapping(mapping, &mut prefix, &mut facts);
        Ok(Self { facts })
    }

    /// Facts in file order
    #[must_use]
    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

/// Walk a mapping, emitting one fact per non-mapping value
fn expand_mapping(mapping: serde_yaml::Mapping, prefix: &mut Vec<String>, out: &mut Vec<Fact>) {
    for (key, value) in mapping {
        let Some(key) = key_to_string(&key) else {
            debug!(key = ?key, "skipping custom fact with non-scalar key");
            continue;
        };
        prefix.push(key);
        match value {
            Value::Mapping(nested) => expand_mapping(nested, prefix, out),
            other => {
                if let Some(value) = to_fact_value(other) {
                    out.push(Fact::new(prefix.iter().cloned(), value));
                }
            }
        }
        prefix.pop();
    }
}

/// Convert a YAML value into a fact value; nulls have no fact value
fn to_fact_value(value: Value) -> Option<FactValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(FactValue::Bool(b)),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Some(FactValue::UInt(u))
            } else if let Some(i) = n.as_i64() {
                Some(FactValue::Int(i))
            } else {
                n.as_f64().map(FactValue::Float)
            }
        }
        Value::String(s) => Some(FactValue::String(s)),
        Value::Sequence(items) => Some(FactValue::List(
            items.into_iter().filter_map(to_fact_value).collect(),
        )),
        Value::Mapping(mapping) => {
            let entries: BTreeMap<String, FactValue> = mapping
                .into_iter()
                .filter_map(|(k, v)| Some((key_to_string(&k)?, to_fact_value(v)?)))
                .collect();
            Some(FactValue::Map(entries))
        }
        Value::Tagged(tagged) => to_fact_value(tagged.value),
    }
}

fn key_to_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn yaml_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_nested_mapping_expands_to_paths() {
        let custom = CustomFacts::from_yaml_str(
            "datacenter: brno\nnetworking:\n  hostname: web01\n  dns:\n    search: example.com\n",
        )
        .unwrap();

        let paths: Vec<String> = custom.facts().iter().map(Fact::dotted).collect();
        assert_eq!(
            paths,
            vec!["datacenter", "networking.hostname", "networking.dns.search"]
        );
        assert!(custom.facts().iter().all(|f| f.is_native() && !f.is_volatile()));
    }

    #[test]
    fn test_scalar_and_sequence_values() {
        let custom =
            CustomFacts::from_yaml_str("rack: 12\nweight: -3\nratio: 0.5\ntags: [web, prod]\nnote: ~\n")
                .unwrap();

        let values: Vec<&FactValue> = custom.facts().iter().filter_map(Fact::value).collect();
        assert_eq!(
            values,
            vec![
                &FactValue::UInt(12),
                &FactValue::Int(-3),
                &FactValue::Float(0.5),
                &FactValue::from(vec!["web", "prod"]),
            ]
        );
    }

    #[test]
    fn test_empty_document() {
        assert!(CustomFacts::from_yaml_str("").unwrap().is_empty());
    }

    #[test]
    fn test_top_level_must_be_mapping() {
        let err = CustomFacts::from_yaml_str("- a\n- b\n").unwrap_err();
        assert!(matches!(err, CoreError::CustomFactsParse(_)));
        assert!(err.to_string().contains("a sequence"));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = CustomFacts::from_yaml_str("key: [unclosed").unwrap_err();
        assert!(matches!(err, CoreError::CustomFactsParse(_)));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "role: database").unwrap();

        let custom = CustomFacts::load(file.path()).await.unwrap();
        assert_eq!(custom.len(), 1);
        assert_eq!(custom.facts()[0].dotted(), "role");
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CustomFacts::load(&dir.path().join("missing.yaml"))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::CustomFactsRead { .. }));
        assert!(err.is_user_error());
    }
}
