//! OCI image manifest for Helm chart artifacts.
//!
//! Descriptors are `oci-spec` values; the manifest wrapper itself is local so
//! that its config descriptor can stay unset (and unserialized) until the
//! config blob has been measured.

use crate::digest::Digest;
use crate::error::{PackError, Result};
use oci_spec::image::{Descriptor, DescriptorBuilder, MediaType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const SCHEMA_VERSION: u32 = 2;
pub const MANIFEST_MEDIA_TYPE: &str = "application/vnd.oci.image.manifest.v1+json";
pub const HELM_CONFIG_MEDIA_TYPE: &str = "application/vnd.cncf.helm.config.v1+json";
pub const HELM_CHART_CONTENT_MEDIA_TYPE: &str =
    "application/vnd.cncf.helm.chart.content.v1.tar+gzip";
/// Annotation carrying the chart tarball file name.
pub const TITLE_ANNOTATION: &str = "org.opencontainers.image.title";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    schema_version: u32,
    media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    config: Option<Descriptor>,
    #[serde(default)]
    layers: Vec<Descriptor>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

impl Manifest {
    pub fn new() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            media_type: MANIFEST_MEDIA_TYPE.to_string(),
            config: None,
            layers: Vec::new(),
        }
    }

    /// Sets the Helm config descriptor for a config blob of `size` bytes.
    pub fn set_config(&mut self, size: u64, digest: &Digest) -> Result<()> {
        let descriptor = descriptor(HELM_CONFIG_MEDIA_TYPE, size, digest, HashMap::new())?;
        self.config = Some(descriptor);
        Ok(())
    }

    /// Appends a Helm chart content layer. The artifact carries exactly one.
    pub fn add_layer(
        &mut self,
        size: u64,
        digest: &Digest,
        annotations: HashMap<String, String>,
    ) -> Result<()> {
        if !self.layers.is_empty() {
            return Err(PackError::Validation(
                "a Helm chart artifact carries exactly one layer".to_string(),
            ));
        }
        let descriptor = descriptor(HELM_CHART_CONTENT_MEDIA_TYPE, size, digest, annotations)?;
        self.layers.push(descriptor);
        Ok(())
    }

    /// Adds the chart layer annotated with its tarball title.
    pub fn add_chart_layer(&mut self, size: u64, digest: &Digest, title: &str) -> Result<()> {
        let annotations = HashMap::from([(TITLE_ANNOTATION.to_string(), title.to_string())]);
        self.add_layer(size, digest, annotations)
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn config(&self) -> Option<&Descriptor> {
        self.config.as_ref()
    }

    pub fn layers(&self) -> &[Descriptor] {
        &self.layers
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| PackError::parse("manifest", e))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| PackError::parse("manifest", e))
    }

    /// Parses a serialized Helm manifest, rejecting any other shape.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let manifest: Manifest =
            serde_json::from_slice(bytes).map_err(|e| PackError::parse("manifest", e))?;
        if manifest.schema_version != SCHEMA_VERSION {
            return Err(PackError::Validation(format!(
                "unsupported manifest schema version {}",
                manifest.schema_version
            )));
        }
        if manifest.layers.len() != 1 {
            return Err(PackError::Validation(format!(
                "expected exactly one layer, found {}",
                manifest.layers.len()
            )));
        }
        Ok(manifest)
    }
}

fn descriptor(
    media_type: &str,
    size: u64,
    digest: &Digest,
    annotations: HashMap<String, String>,
) -> Result<Descriptor> {
    let mut builder = DescriptorBuilder::default()
        .media_type(MediaType::Other(media_type.to_string()))
        .size(size)
        .digest(digest.to_oci()?);
    if !annotations.is_empty() {
        builder = builder.annotations(annotations);
    }
    builder
        .build()
        .map_err(|e| PackError::Validation(format!("invalid descriptor: {e}")))
}
