//! Turn a staged chart tarball into a ready-to-push Helm OCI artifact.
//!
//! [`HelmArtifact::open`] does all the local work up front:
//! - checks the staged file is a plain `.tar`,
//! - picks the root `Chart.yaml` (shortest path, ties broken lexically),
//! - serializes the chart metadata into the config blob and digests it,
//! - digests the layer exactly as it will be transmitted (gzip-encoded on the
//!   fly unless the file is already compressed),
//! - assembles the manifest.
//!
//! [`HelmArtifact::push_to`] then sends layer, config and manifest in that
//! order, re-reading the staged file rather than buffering the layer.

use crate::archive::ArchiveReader;
use crate::chart::ChartMetadata;
use crate::digest::{sha256_bytes, sha256_reader, Digest};
use crate::error::{PackError, Result};
use crate::gzip_stream::GzipStreamEncoder;
use crate::manifest::Manifest;
use crate::notifier::Notifier;
use crate::registry::RegistryPushClient;
use crate::staging::Compression;
use indicatif::ProgressBar;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

const CHART_DESCRIPTOR: &str = "Chart.yaml";

#[derive(Debug)]
pub struct HelmArtifact {
    path: PathBuf,
    chart: ChartMetadata,
    config: Vec<u8>,
    layer_digest: Digest,
    layer_size: u64,
    manifest: Manifest,
}

impl HelmArtifact {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = verify_tar_extension(path.as_ref())?;
        let archive = ArchiveReader::open(&path)?;

        let descriptor = pick_root_chart(&archive.search(CHART_DESCRIPTOR)).ok_or_else(|| {
            PackError::NotFound(format!(
                "no {} entry in {}",
                CHART_DESCRIPTOR,
                path.display()
            ))
        })?;
        log::debug!("Using chart descriptor {}", descriptor);

        let chart = ChartMetadata::from_yaml_reader(archive.input_stream(&descriptor)?)?;
        let config = chart.to_config_json()?;
        let config_digest = sha256_bytes(&config);

        let (layer_digest, layer_size) = sha256_reader(layer_stream(&path)?)?;
        log::debug!("Layer {} is {} bytes", layer_digest, layer_size);

        let mut manifest = Manifest::new();
        manifest.set_config(config.len() as u64, &config_digest)?;
        manifest.add_chart_layer(layer_size, &layer_digest, &chart.tarball_name())?;

        Ok(Self {
            path,
            chart,
            config,
            layer_digest,
            layer_size,
            manifest,
        })
    }

    pub fn chart(&self) -> &ChartMetadata {
        &self.chart
    }

    pub fn config(&self) -> &[u8] {
        &self.config
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn layer_digest(&self) -> &Digest {
        &self.layer_digest
    }

    pub fn layer_size(&self) -> u64 {
        self.layer_size
    }

    /// Pushes layer blob, config blob, then the manifest under `tag`.
    pub fn push_to<C: RegistryPushClient + ?Sized>(
        &self,
        client: &mut C,
        tag: &str,
        notifier: &Notifier,
    ) -> Result<()> {
        notifier.info(&format!("Uploading layer {}", self.layer_digest));
        let bar = notifier.transfer_bar(self.layer_size, &self.chart.tarball_name());
        let sent = self.push_layer(client, &bar)?;
        notifier.debug(&format!("Sent {} layer bytes", sent));

        notifier.info("Uploading chart config");
        client.push_config(&self.config)?;

        notifier.info(&format!("Pushing manifest for tag {}", tag));
        client.push_manifest(&self.manifest, tag)
    }

    /// Streams the layer through `bar`; the bar is cleared whatever the outcome.
    fn push_layer<C: RegistryPushClient + ?Sized>(
        &self,
        client: &mut C,
        bar: &ProgressBar,
    ) -> Result<u64> {
        let sent = layer_stream(&self.path).and_then(|stream| {
            let mut layer = bar.wrap_read(stream);
            client.push_blob(&mut layer, &self.layer_digest)
        });
        bar.finish_and_clear();
        sent
    }
}

fn verify_tar_extension(path: &Path) -> Result<PathBuf> {
    let is_tar = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(".tar"));
    if !is_tar {
        return Err(PackError::Validation(format!(
            "OCI Helm artifact must be staged as a .tar file, got {}",
            path.display()
        )));
    }
    Ok(path.to_path_buf())
}

/// Shortest candidate path wins; equal lengths fall back to byte order.
fn pick_root_chart(candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
        .cloned()
}

/// The exact bytes sent as the layer blob.
fn layer_stream(path: &Path) -> Result<Box<dyn Read>> {
    let file = BufReader::new(File::open(path)?);
    Ok(match Compression::from_path(path) {
        Compression::Gzip => Box::new(file),
        _ => Box::new(GzipStreamEncoder::new(file)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tar_rs as tar;
    use tempfile::NamedTempFile;

    /// Reads a little of the layer, then gives up.
    #[derive(Default)]
    struct RefusingClient {
        later_calls: usize,
    }

    impl RegistryPushClient for RefusingClient {
        fn push_blob(&mut self, blob: &mut dyn Read, _digest: &Digest) -> Result<u64> {
            let mut head = [0u8; 16];
            blob.read_exact(&mut head)?;
            Err(PackError::Transport("connection reset".to_string()))
        }

        fn push_config(&mut self, _config: &[u8]) -> Result<()> {
            self.later_calls += 1;
            Ok(())
        }

        fn push_manifest(&mut self, _manifest: &Manifest, _tag: &str) -> Result<()> {
            self.later_calls += 1;
            Ok(())
        }

        fn verify_connection(&self) -> Result<()> {
            Ok(())
        }
    }

    fn staged_chart() -> NamedTempFile {
        let chart = b"name: demo\nversion: 1.0.0\n";
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_size(chart.len() as u64);
        header.set_mode(0o644);
        builder
            .append_data(&mut header, "demo/Chart.yaml", &chart[..])
            .unwrap();
        let file = tempfile::Builder::new().suffix(".tar").tempfile().unwrap();
        std::fs::write(file.path(), builder.into_inner().unwrap()).unwrap();
        file
    }

    #[test]
    fn test_pick_root_chart_prefers_shallow() {
        let candidates = vec![
            "chart/charts/sub/Chart.yaml".to_string(),
            "chart/Chart.yaml".to_string(),
        ];
        assert_eq!(pick_root_chart(&candidates).as_deref(), Some("chart/Chart.yaml"));
    }

    #[test]
    fn test_pick_root_chart_tie_is_lexical() {
        let candidates = vec!["b/Chart.yaml".to_string(), "a/Chart.yaml".to_string()];
        assert_eq!(pick_root_chart(&candidates).as_deref(), Some("a/Chart.yaml"));
        assert_eq!(pick_root_chart(&[]), None);
    }

    #[test]
    fn test_rejects_non_tar_extension() {
        for name in ["chart.tgz", "chart.tar.gz", "chart"] {
            let err = HelmArtifact::open(Path::new("/nonexistent").join(name)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{name}");
        }
    }

    #[test]
    fn test_transfer_bar_cleared_when_layer_push_fails() {
        let staged = staged_chart();
        let artifact = HelmArtifact::open(staged.path()).unwrap();
        let mut client = RefusingClient::default();
        let bar = ProgressBar::hidden();

        let err = artifact.push_layer(&mut client, &bar).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(bar.is_finished());
    }

    #[test]
    fn test_failed_layer_push_stops_the_sequence() {
        let staged = staged_chart();
        let artifact = HelmArtifact::open(staged.path()).unwrap();
        let mut client = RefusingClient::default();

        let err = artifact
            .push_to(&mut client, "1.0.0", &Notifier::silent())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(client.later_calls, 0);
    }
}
