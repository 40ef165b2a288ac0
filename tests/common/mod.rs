//! Chart archive fixtures shared by the integration tests

use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;
use helm2oci::digest::Digest;
use helm2oci::error::Result;
use helm2oci::{Manifest, PackError, RegistryPushClient};
use std::io::{Read, Write};

#[allow(dead_code)]
pub const DEMO_CHART: &str = "apiVersion: v2\nname: demo\nversion: 1.0.0\n";

/// Builds an uncompressed tar holding `entries` in order.
#[allow(dead_code)]
pub fn tar_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar_rs::Builder::new(Vec::new());
    for (path, content) in entries {
        let mut header = tar_rs::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        builder
            .append_data(&mut header, path, *content)
            .expect("append tar entry");
    }
    builder.into_inner().expect("finish tar")
}

/// A minimal chart: `folder/Chart.yaml` plus a template.
#[allow(dead_code)]
pub fn demo_chart_tar() -> Vec<u8> {
    tar_of(&[
        ("folder/Chart.yaml", DEMO_CHART.as_bytes()),
        ("folder/templates/cm.yaml", b"kind: ConfigMap\n"),
    ])
}

/// Gzips `data` as one member per chunk, the way concatenated or
/// block-compressed files look.
#[allow(dead_code)]
pub fn gzip_members(data: &[u8], split_at: usize) -> Vec<u8> {
    let (head, tail) = data.split_at(split_at);
    [gzip(head), gzip(tail)].concat()
}

#[allow(dead_code)]
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).expect("gzip");
    encoder.finish().expect("gzip finish")
}

#[allow(dead_code)]
pub fn bzip2(data: &[u8]) -> Vec<u8> {
    let mut encoder = BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder.write_all(data).expect("bzip2");
    encoder.finish().expect("bzip2 finish")
}

#[allow(dead_code)]
pub fn gunzip(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    flate2::read::GzDecoder::new(data)
        .read_to_end(&mut out)
        .expect("gunzip");
    out
}

#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Blob,
    Config,
    Manifest(String),
}

/// Keeps everything it is sent, in order.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingClient {
    pub calls: Vec<Call>,
    pub blobs: Vec<(Digest, Vec<u8>)>,
    pub configs: Vec<Vec<u8>>,
    pub manifests: Vec<Manifest>,
    pub fail_config: bool,
}

impl RegistryPushClient for RecordingClient {
    fn push_blob(&mut self, blob: &mut dyn Read, digest: &Digest) -> Result<u64> {
        let mut bytes = Vec::new();
        blob.read_to_end(&mut bytes)?;
        self.calls.push(Call::Blob);
        let sent = bytes.len() as u64;
        self.blobs.push((digest.clone(), bytes));
        Ok(sent)
    }

    fn push_config(&mut self, config: &[u8]) -> Result<()> {
        self.calls.push(Call::Config);
        if self.fail_config {
            return Err(PackError::Transport("registry went away".to_string()));
        }
        self.configs.push(config.to_vec());
        Ok(())
    }

    fn push_manifest(&mut self, manifest: &Manifest, tag: &str) -> Result<()> {
        self.calls.push(Call::Manifest(tag.to_string()));
        self.manifests.push(manifest.clone());
        Ok(())
    }

    fn verify_connection(&self) -> Result<()> {
        Ok(())
    }
}
