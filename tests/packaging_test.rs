use helm2oci::digest::sha256_bytes;
use helm2oci::manifest::{
    HELM_CHART_CONTENT_MEDIA_TYPE, HELM_CONFIG_MEDIA_TYPE, MANIFEST_MEDIA_TYPE, TITLE_ANNOTATION,
};
use helm2oci::{ErrorKind, Manifest, Notifier, OciHelmService};

mod common;
use common::*;

fn push(
    client: &mut RecordingClient,
    archive: &[u8],
    filename: &str,
    tag: Option<&str>,
) -> std::result::Result<(), helm2oci::PushError> {
    let notifier = Notifier::silent();
    let mut input = archive;
    OciHelmService::new(&notifier).send_with(client, &mut input, filename, "demo", tag)
}

#[test]
fn test_push_demo_chart_end_to_end() {
    let tar = demo_chart_tar();
    let mut client = RecordingClient::default();
    push(&mut client, &tar, "demo.tar", None).unwrap();

    assert_eq!(
        client.calls,
        vec![Call::Blob, Call::Config, Call::Manifest("1.0.0".to_string())]
    );

    let config = &client.configs[0];
    assert_eq!(config.as_slice(), br#"{"apiVersion":"v2","name":"demo","version":"1.0.0"}"#);

    let (layer_digest, layer) = &client.blobs[0];
    assert_eq!(*layer_digest, sha256_bytes(layer));
    assert_eq!(gunzip(layer), tar);

    let manifest = &client.manifests[0];
    assert_eq!(manifest.schema_version(), 2);
    assert_eq!(manifest.media_type(), MANIFEST_MEDIA_TYPE);

    let config_descriptor = manifest.config().expect("config descriptor");
    assert_eq!(config_descriptor.media_type().to_string(), HELM_CONFIG_MEDIA_TYPE);
    assert_eq!(config_descriptor.size(), config.len() as u64);
    assert_eq!(
        config_descriptor.digest().to_string(),
        sha256_bytes(config).to_string()
    );

    assert_eq!(manifest.layers().len(), 1);
    let layer_descriptor = &manifest.layers()[0];
    assert_eq!(
        layer_descriptor.media_type().to_string(),
        HELM_CHART_CONTENT_MEDIA_TYPE
    );
    assert_eq!(layer_descriptor.size(), layer.len() as u64);
    assert_eq!(layer_descriptor.digest().to_string(), layer_digest.to_string());
    let title = layer_descriptor
        .annotations()
        .as_ref()
        .and_then(|annotations| annotations.get(TITLE_ANNOTATION))
        .cloned();
    assert_eq!(title.as_deref(), Some("demo-1.0.0.tgz"));
}

#[test]
fn test_every_archive_suffix_yields_same_artifact() {
    let tar = demo_chart_tar();
    let inputs = [
        ("demo.tar", tar.clone()),
        ("demo.tgz", gzip(&tar)),
        ("demo.tar.gz", gzip(&tar)),
        ("demo.tar.bz2", bzip2(&tar)),
    ];

    let mut digests = Vec::new();
    for (name, bytes) in inputs {
        let mut client = RecordingClient::default();
        push(&mut client, &bytes, name, Some("ci")).unwrap();
        assert_eq!(client.calls.last(), Some(&Call::Manifest("ci".to_string())), "{name}");
        let (digest, layer) = &client.blobs[0];
        assert_eq!(gunzip(layer), tar, "{name}");
        digests.push(digest.clone());
    }

    // Staging always decompresses, so the layer is re-encoded identically.
    assert!(digests.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn test_multi_member_gzip_is_staged_whole() {
    let tar = demo_chart_tar();
    let mut client = RecordingClient::default();
    push(&mut client, &gzip_members(&tar, 700), "demo.tgz", None).unwrap();

    let (_, layer) = &client.blobs[0];
    assert_eq!(gunzip(layer), tar);
    assert_eq!(client.calls.last(), Some(&Call::Manifest("1.0.0".to_string())));
}

#[test]
fn test_shallowest_chart_descriptor_wins() {
    let tar = tar_of(&[
        (
            "parent/charts/child/Chart.yaml",
            b"apiVersion: v2\nname: child\nversion: 0.1.0\n",
        ),
        ("parent/Chart.yaml", b"apiVersion: v2\nname: parent\nversion: 2.3.4\n"),
    ]);
    let mut client = RecordingClient::default();
    push(&mut client, &tar, "parent.tar", None).unwrap();

    assert_eq!(client.calls.last(), Some(&Call::Manifest("2.3.4".to_string())));
    let chart: serde_json::Value = serde_json::from_slice(&client.configs[0]).unwrap();
    assert_eq!(chart["name"], "parent");
}

#[test]
fn test_archive_without_chart_is_not_found() {
    let tar = tar_of(&[("folder/values.yaml", b"replicas: 1\n")]);
    let mut client = RecordingClient::default();
    let err = push(&mut client, &tar, "nochart.tar", None).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.image(), "demo");
    assert!(client.calls.is_empty());
}

#[test]
fn test_invalid_tar_pushes_nothing() {
    let garbage = vec![b'x'; 1024];
    let mut client = RecordingClient::default();
    let err = push(&mut client, &garbage, "broken.tar", None).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(client.calls.is_empty());
}

#[test]
fn test_chart_missing_version_is_parse_error() {
    let tar = tar_of(&[("c/Chart.yaml", b"apiVersion: v2\nname: demo\n")]);
    let mut client = RecordingClient::default();
    let err = push(&mut client, &tar, "c.tar", None).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(client.calls.is_empty());
}

#[test]
fn test_failed_config_push_stops_before_manifest() {
    let tar = demo_chart_tar();
    let mut client = RecordingClient {
        fail_config: true,
        ..Default::default()
    };
    let err = push(&mut client, &tar, "demo.tar", None).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(client.calls, vec![Call::Blob, Call::Config]);
    assert!(client.manifests.is_empty());
}

#[test]
fn test_staged_file_removed_after_packaging() {
    let notifier = Notifier::silent();
    let tar = demo_chart_tar();
    let mut input = tar.as_slice();
    let (staged, artifact) = OciHelmService::new(&notifier)
        .package(&mut input, "demo.tar")
        .unwrap();

    assert_eq!(artifact.chart().name, "demo");
    assert_eq!(artifact.layer_digest().algorithm(), "sha256");

    let path = staged.path().to_path_buf();
    assert!(path.exists());
    drop(artifact);
    drop(staged);
    assert!(!path.exists());
}

#[test]
fn test_manifest_round_trips_through_validation() {
    let notifier = Notifier::silent();
    let tar = demo_chart_tar();
    let mut input = tar.as_slice();
    let (_staged, artifact) = OciHelmService::new(&notifier)
        .package(&mut input, "demo.tar")
        .unwrap();

    let json = artifact.manifest().to_json().unwrap();
    let parsed = Manifest::from_slice(&json).unwrap();
    assert_eq!(&parsed, artifact.manifest());
    assert_eq!(parsed.layers()[0].size(), artifact.layer_size());
}
