//! Registry transports.
//!
//! [`RegistryPushClient`] is the contract the packager pushes through;
//! [`DistributionClient`] implements it over the OCI Distribution HTTP API.
//! [`LegacyHttpClient`] uploads whole chart tarballs to a plain HTTP
//! repository instead.

mod distribution;
mod legacy;

pub use distribution::DistributionClient;
pub use legacy::LegacyHttpClient;

use crate::digest::Digest;
use crate::error::{PackError, Result};
use crate::manifest::Manifest;
use std::io::{self, Read};
use std::sync::OnceLock;
use std::time::Duration;

/// Upper bound for any single registry request, body transfer included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Destination for the blobs and manifest of one artifact.
///
/// Calls arrive in push order: layer blob, config blob, manifest.
pub trait RegistryPushClient {
    /// Uploads a blob whose content hashes to `digest`; returns the bytes sent.
    fn push_blob(&mut self, blob: &mut dyn Read, digest: &Digest) -> Result<u64>;

    fn push_config(&mut self, config: &[u8]) -> Result<()>;

    fn push_manifest(&mut self, manifest: &Manifest, tag: &str) -> Result<()>;

    /// Fails if the endpoint is unreachable or rejects the credentials.
    fn verify_connection(&self) -> Result<()>;
}

pub(crate) fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

pub(crate) fn map_ureq_error(url: &str, err: ureq::Error) -> PackError {
    match err {
        ureq::Error::StatusCode(code @ (401 | 403)) => {
            PackError::Transport(format!("{url}: credentials rejected (HTTP {code})"))
        }
        ureq::Error::StatusCode(code) => {
            PackError::Transport(format!("{url} returned HTTP {code}"))
        }
        other => PackError::Transport(format!("{url}: {other}")),
    }
}

/// Normalizes a configured server into a base URL without trailing slash.
///
/// Bare host names get `https://`, except loopback addresses which get
/// `http://`.
pub(crate) fn base_url(server: &str) -> String {
    let server = server.trim().trim_end_matches('/');
    if server.starts_with("http://") || server.starts_with("https://") {
        return server.to_string();
    }
    let host = server.split(['/', ':']).next().unwrap_or(server);
    let scheme = if host == "localhost" || host == "127.0.0.1" {
        "http"
    } else {
        "https"
    };
    format!("{scheme}://{server}")
}

/// `scheme://host[:port]` part of a base URL.
pub(crate) fn origin(base_url: &str) -> &str {
    let after_scheme = base_url.find("://").map(|i| i + 3).unwrap_or(0);
    match base_url[after_scheme..].find('/') {
        Some(i) => &base_url[..after_scheme + i],
        None => base_url,
    }
}

/// Counts the bytes pulled through it.
pub(crate) struct CountingReader<'a> {
    inner: &'a mut dyn Read,
    count: u64,
}

impl<'a> CountingReader<'a> {
    pub(crate) fn new(inner: &'a mut dyn Read) -> Self {
        Self { inner, count: 0 }
    }

    pub(crate) fn count(&self) -> u64 {
        self.count
    }
}

impl Read for CountingReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}
