use crate::error::{PackError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::io::Read;

/// Contents of a `Chart.yaml` descriptor.
///
/// Only the informational keys are typed; everything else is carried in
/// `extra` so the config blob reproduces the whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_text"
    )]
    pub api_version: Option<String>,
    #[serde(deserialize_with = "text")]
    pub name: String,
    #[serde(deserialize_with = "text")]
    pub version: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_text"
    )]
    pub app_version: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_text"
    )]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChartMetadata {
    pub fn from_yaml_reader<R: Read>(reader: R) -> Result<Self> {
        serde_yaml::from_reader(reader).map_err(|e| PackError::parse("chart descriptor", e))
    }

    pub fn from_yaml_str(document: &str) -> Result<Self> {
        serde_yaml::from_str(document).map_err(|e| PackError::parse("chart descriptor", e))
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| PackError::parse("chart config", e))
    }

    /// Serialized form pushed as the artifact's config blob.
    pub fn to_config_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| PackError::parse("chart config", e))
    }

    /// `<name>-<version>.tgz`, the file name Helm expects for this chart.
    pub fn tarball_name(&self) -> String {
        format!("{}-{}.tgz", self.name, self.version)
    }
}

// YAML has already turned `version: 1.10` into the float 1.1 by the time it
// reaches us, so numbers and booleans are refused instead of re-printed.
fn text<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        value @ (Value::Number(_) | Value::Bool(_)) => Err(serde::de::Error::custom(format!(
            "unquoted value {value} is not a string; quote it to keep its exact text, \
             e.g. version: \"1.10\""
        ))),
        other => Err(serde::de::Error::custom(format!("expected a string, found {other}"))),
    }
}

fn optional_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => text(value).map(Some).map_err(serde::de::Error::custom),
    }
}
