use crate::config::RegistryInformations;
use crate::error::{PushError, Result, VerifyError};
use crate::notifier::Notifier;
use crate::packager::HelmArtifact;
use crate::registry::{DistributionClient, LegacyHttpClient, RegistryPushClient};
use crate::staging::TemporaryArtifact;
use std::io::Read;

/// A way of delivering a Helm chart archive to a registry.
pub trait HelmService {
    /// Stages `input` (named `filename`, used only to sniff compression) and
    /// pushes it as `image_name`. The attempt is all-or-nothing.
    fn send_to_registry(
        &self,
        input: &mut dyn Read,
        filename: &str,
        registry: &RegistryInformations,
        image_name: &str,
        tag: Option<&str>,
    ) -> std::result::Result<(), PushError>;

    fn verify_connection(
        &self,
        registry: &RegistryInformations,
    ) -> std::result::Result<(), VerifyError>;

    /// Short identifier of the delivery mode.
    fn connection_type(&self) -> &'static str;
}

/// Pushes charts as OCI artifacts through the Distribution API.
pub struct OciHelmService<'n> {
    notifier: &'n Notifier,
}

impl<'n> OciHelmService<'n> {
    pub fn new(notifier: &'n Notifier) -> Self {
        Self { notifier }
    }

    /// Stages and packages `input` without any network traffic.
    pub fn package(
        &self,
        input: &mut dyn Read,
        filename: &str,
    ) -> Result<(TemporaryArtifact, HelmArtifact)> {
        self.notifier.info(&format!("Staging {}", filename));
        let staged = TemporaryArtifact::stage_tar(input, filename)?;
        self.notifier.info("Reading chart metadata");
        let artifact = HelmArtifact::open(staged.path())?;
        Ok((staged, artifact))
    }

    /// Same as [`HelmService::send_to_registry`], through a caller-supplied client.
    ///
    /// Without a tag the chart version is used.
    pub fn send_with<C: RegistryPushClient + ?Sized>(
        &self,
        client: &mut C,
        input: &mut dyn Read,
        filename: &str,
        image_name: &str,
        tag: Option<&str>,
    ) -> std::result::Result<(), PushError> {
        let tag = self
            .package_and_push(client, input, filename, tag)
            .map_err(|e| PushError::new(image_name, e))?;
        self.notifier
            .finish(&format!("Pushed {}:{}", image_name, tag));
        Ok(())
    }

    fn package_and_push<C: RegistryPushClient + ?Sized>(
        &self,
        client: &mut C,
        input: &mut dyn Read,
        filename: &str,
        tag: Option<&str>,
    ) -> Result<String> {
        // `_staged` keeps the temporary file alive until the push is over.
        let (_staged, artifact) = self.package(input, filename)?;
        let tag = tag.unwrap_or(&artifact.chart().version).to_string();
        artifact.push_to(client, &tag, self.notifier)?;
        Ok(tag)
    }
}

impl HelmService for OciHelmService<'_> {
    fn send_to_registry(
        &self,
        input: &mut dyn Read,
        filename: &str,
        registry: &RegistryInformations,
        image_name: &str,
        tag: Option<&str>,
    ) -> std::result::Result<(), PushError> {
        let mut client = DistributionClient::new(registry, image_name)
            .map_err(|e| PushError::new(image_name, e))?;
        self.send_with(&mut client, input, filename, image_name, tag)
    }

    fn verify_connection(
        &self,
        registry: &RegistryInformations,
    ) -> std::result::Result<(), VerifyError> {
        DistributionClient::new(registry, "dummy")
            .and_then(|client| client.verify_connection())
            .map_err(|e| VerifyError::new(&registry.server, e))
    }

    fn connection_type(&self) -> &'static str {
        "OCI"
    }
}

/// Uploads charts as gzip tarballs to a plain HTTP repository.
pub struct HttpHelmService<'n> {
    notifier: &'n Notifier,
}

impl<'n> HttpHelmService<'n> {
    pub fn new(notifier: &'n Notifier) -> Self {
        Self { notifier }
    }

    fn upload(
        &self,
        input: &mut dyn Read,
        filename: &str,
        registry: &RegistryInformations,
        image_name: &str,
        tag: Option<&str>,
    ) -> Result<()> {
        let client = LegacyHttpClient::new(registry)?;
        self.notifier.info(&format!("Staging {}", filename));
        let staged = TemporaryArtifact::stage_tgz(input, filename)?;
        self.notifier
            .info(&format!("Uploading to {}", client.chart_url(image_name, tag)));
        client.upload(staged.path(), image_name, tag)
    }
}

impl HelmService for HttpHelmService<'_> {
    fn send_to_registry(
        &self,
        input: &mut dyn Read,
        filename: &str,
        registry: &RegistryInformations,
        image_name: &str,
        tag: Option<&str>,
    ) -> std::result::Result<(), PushError> {
        self.upload(input, filename, registry, image_name, tag)
            .map_err(|e| PushError::new(image_name, e))?;
        self.notifier.finish(&format!("Uploaded {}", image_name));
        Ok(())
    }

    fn verify_connection(
        &self,
        registry: &RegistryInformations,
    ) -> std::result::Result<(), VerifyError> {
        LegacyHttpClient::new(registry)
            .and_then(|client| client.verify_connection())
            .map_err(|e| VerifyError::new(&registry.server, e))
    }

    fn connection_type(&self) -> &'static str {
        "HELM"
    }
}
