use super::{base_url, http_agent, map_ureq_error};
use crate::config::RegistryInformations;
use crate::error::{PackError, Result};
use log::info;
use std::fs::File;
use std::path::Path;
use ureq::SendBody;

const DEFAULT_TAG: &str = "latest";

/// Uploads chart tarballs to a plain HTTP chart repository.
///
/// Charts land at `<server>/mano/<image>-<tag>.tgz`; the repository index is
/// expected at `<server>/index.yaml`.
pub struct LegacyHttpClient {
    base_url: String,
    auth: Option<String>,
}

impl LegacyHttpClient {
    pub fn new(registry: &RegistryInformations) -> Result<Self> {
        registry.validate()?;
        Ok(Self {
            base_url: base_url(&registry.server),
            auth: registry.basic_auth_header(),
        })
    }

    pub fn chart_url(&self, image_name: &str, tag: Option<&str>) -> String {
        format!(
            "{}/mano/{}-{}.tgz",
            self.base_url,
            image_name,
            tag.unwrap_or(DEFAULT_TAG)
        )
    }

    /// PUTs the staged tarball; anything but HTTP 200 is a failure.
    pub fn upload(&self, tarball: &Path, image_name: &str, tag: Option<&str>) -> Result<()> {
        let url = self.chart_url(image_name, tag);
        let mut file = File::open(tarball)?;

        let mut request = http_agent()
            .put(&url)
            .header("Content-Type", "application/gzip");
        if let Some(auth) = &self.auth {
            request = request.header("Authorization", auth.as_str());
        }
        let response = request
            .send(SendBody::from_reader(&mut file))
            .map_err(|e| map_ureq_error(&url, e))?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(PackError::Transport(format!(
                "error uploading file to {url}: HTTP {status}"
            )));
        }
        info!("Uploaded chart to {}", url);
        Ok(())
    }

    pub fn verify_connection(&self) -> Result<()> {
        let url = format!("{}/index.yaml", self.base_url);
        let mut request = http_agent().get(&url);
        if let Some(auth) = &self.auth {
            request = request.header("Authorization", auth.as_str());
        }
        request.call().map_err(|e| map_ureq_error(&url, e))?;
        Ok(())
    }
}
