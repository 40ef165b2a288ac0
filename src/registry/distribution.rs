use super::{base_url, http_agent, map_ureq_error, origin, CountingReader, RegistryPushClient};
use crate::config::RegistryInformations;
use crate::digest::{sha256_bytes, Digest};
use crate::error::{PackError, Result};
use crate::manifest::{Manifest, MANIFEST_MEDIA_TYPE};
use log::{debug, info};
use std::io::Read;
use ureq::SendBody;

/// OCI Distribution client for one repository on one registry.
pub struct DistributionClient {
    base_url: String,
    repository: String,
    auth: Option<String>,
}

impl DistributionClient {
    pub fn new(registry: &RegistryInformations, repository: &str) -> Result<Self> {
        registry.validate()?;
        let repository = repository.trim_matches('/');
        if repository.is_empty() {
            return Err(PackError::Validation("image name is empty".to_string()));
        }
        Ok(Self {
            base_url: base_url(&registry.server),
            repository: repository.to_string(),
            auth: registry.basic_auth_header(),
        })
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/v2/{}/{}", self.base_url, self.repository, path)
    }

    fn blob_exists(&self, digest: &Digest) -> Result<bool> {
        let url = self.api_url(&format!("blobs/{digest}"));
        let mut request = http_agent().head(&url);
        if let Some(auth) = &self.auth {
            request = request.header("Authorization", auth.as_str());
        }
        match request.call() {
            Ok(_) => Ok(true),
            Err(ureq::Error::StatusCode(404)) => Ok(false),
            Err(e) => Err(map_ureq_error(&url, e)),
        }
    }

    /// Opens an upload session and returns its absolute location.
    fn start_upload(&self) -> Result<String> {
        let url = self.api_url("blobs/uploads/");
        let mut request = http_agent().post(&url);
        if let Some(auth) = &self.auth {
            request = request.header("Authorization", auth.as_str());
        }
        let response = request.send_empty().map_err(|e| map_ureq_error(&url, e))?;
        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                PackError::Transport(format!("{url}: upload response has no Location header"))
            })?;

        if location.starts_with("http://") || location.starts_with("https://") {
            Ok(location.to_string())
        } else {
            Ok(format!(
                "{}/{}",
                origin(&self.base_url),
                location.trim_start_matches('/')
            ))
        }
    }
}

fn with_digest(location: &str, digest: &Digest) -> String {
    let separator = if location.contains('?') { '&' } else { '?' };
    format!("{location}{separator}digest={digest}")
}

impl RegistryPushClient for DistributionClient {
    fn push_blob(&mut self, blob: &mut dyn Read, digest: &Digest) -> Result<u64> {
        if self.blob_exists(digest)? {
            info!("Blob {} already present in {}", digest, self.repository);
            return Ok(0);
        }

        let url = with_digest(&self.start_upload()?, digest);
        debug!("Uploading blob {} to {}", digest, url);

        let mut counter = CountingReader::new(blob);
        let mut request = http_agent()
            .put(&url)
            .header("Content-Type", "application/octet-stream");
        if let Some(auth) = &self.auth {
            request = request.header("Authorization", auth.as_str());
        }
        request
            .send(SendBody::from_reader(&mut counter))
            .map_err(|e| map_ureq_error(&url, e))?;

        Ok(counter.count())
    }

    fn push_config(&mut self, config: &[u8]) -> Result<()> {
        let digest = sha256_bytes(config);
        let mut reader = config;
        self.push_blob(&mut reader, &digest)?;
        Ok(())
    }

    fn push_manifest(&mut self, manifest: &Manifest, tag: &str) -> Result<()> {
        let url = self.api_url(&format!("manifests/{tag}"));
        let body = manifest.to_json()?;
        let mut request = http_agent()
            .put(&url)
            .header("Content-Type", MANIFEST_MEDIA_TYPE);
        if let Some(auth) = &self.auth {
            request = request.header("Authorization", auth.as_str());
        }
        request.send(&body[..]).map_err(|e| map_ureq_error(&url, e))?;
        info!("Pushed manifest {}:{}", self.repository, tag);
        Ok(())
    }

    fn verify_connection(&self) -> Result<()> {
        let url = format!("{}/v2/", self.base_url);
        let mut request = http_agent().get(&url);
        if let Some(auth) = &self.auth {
            request = request.header("Authorization", auth.as_str());
        }
        request.call().map_err(|e| map_ureq_error(&url, e))?;
        Ok(())
    }
}
