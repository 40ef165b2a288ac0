pub mod archive;
pub mod chart;
pub mod config;
pub mod digest;
pub mod error;
pub mod gzip_stream;
pub mod manifest;
pub mod notifier;
pub mod packager;
pub mod registry;
pub mod service;
pub mod staging;

// Re-exports for easy access
pub use archive::ArchiveReader;
pub use chart::ChartMetadata;
pub use config::RegistryInformations;
pub use digest::{Digest, DIGEST_ALGORITHM};
pub use error::{ErrorKind, PackError, PushError, VerifyError};
pub use gzip_stream::GzipStreamEncoder;
pub use manifest::Manifest;
pub use notifier::Notifier;
pub use packager::HelmArtifact;
pub use registry::{DistributionClient, LegacyHttpClient, RegistryPushClient};
pub use service::{HelmService, HttpHelmService, OciHelmService};
pub use staging::{Compression, TemporaryArtifact};
