use anyhow::{Context, Result};
use oci_distribution::client::{ClientConfig, ImageLayer};
use oci_distribution::manifest::{self, OciDescriptor, OciImageManifest, OciManifest};
use oci_distribution::secrets::RegistryAuth;
use oci_distribution::{Client, Reference};
use tracing::{debug, info};

use crate::constants::media_type;

#[cfg(test)]
mod tests;

/// Base image contents pulled from a registry: the runtime config blob and
/// the layer blobs exactly as stored.
pub struct BaseImage {
    pub config_data: Vec<u8>,
    /// (blob data, media type) pairs, bottom layer first
    pub layers: Vec<(Vec<u8>, String)>,
}

pub struct RegistryClient {
    client: Client,
}

impl RegistryClient {
    /// Create a client that resolves multi-arch indexes to `platform`
    /// (`os/arch`).
    pub fn new(platform: &str) -> Result<Self> {
        let (os, arch) = parse_platform(platform)?;
        let config = ClientConfig {
            platform_resolver: Some(Box::new(move |entries: &[manifest::ImageIndexEntry]| {
                entries
                    .iter()
                    .find(|entry| {
                        entry.platform.as_ref().is_some_and(|p| {
                            p.os == os && p.architecture == arch
                        })
                    })
                    .map(|entry| entry.digest.clone())
            })),
            ..Default::default()
        };
        Ok(Self {
            client: Client::new(config),
        })
    }

    /// Pull a base image: manifest resolution, config blob, and all layer
    /// blobs. Fails when the reference does not resolve.
    pub async fn pull_base(&mut self, image_ref: &str, auth: &RegistryAuth) -> Result<BaseImage> {
        let reference: Reference = image_ref
            .parse()
            .with_context(|| format!("Failed to parse image reference: {}", image_ref))?;

        info!("Pulling base image {}", reference);

        let data = self
            .client
            .pull(
                &reference,
                auth,
                vec![
                    manifest::IMAGE_DOCKER_LAYER_GZIP_MEDIA_TYPE,
                    manifest::IMAGE_DOCKER_LAYER_TAR_MEDIA_TYPE,
                    manifest::IMAGE_LAYER_GZIP_MEDIA_TYPE,
                    manifest::IMAGE_LAYER_MEDIA_TYPE,
                ],
            )
            .await
            .with_context(|| format!("Failed to pull base image {}", image_ref))?;

        debug!(
            "Pulled base image: {} layers, {} byte config",
            data.layers.len(),
            data.config.data.len()
        );

        Ok(BaseImage {
            config_data: data.config.data,
            layers: data
                .layers
                .into_iter()
                .map(|layer: ImageLayer| (layer.data, layer.media_type))
                .collect(),
        })
    }

    /// Push an assembled image: config blob, every layer blob, then the
    /// manifest. Returns the digest reference.
    pub async fn push_image(
        &mut self,
        image_ref: &str,
        config_data: Vec<u8>,
        layers: Vec<(Vec<u8>, String)>,
        auth: &RegistryAuth,
    ) -> Result<String> {
        let reference: Reference = image_ref
            .parse()
            .with_context(|| format!("Failed to parse image reference: {}", image_ref))?;

        info!("Pushing image to {}", reference);

        // Authenticate with the registry
        self.client
            .auth(&reference, auth, oci_distribution::RegistryOperation::Push)
            .await
            .context("Failed to authenticate with registry")?;

        // Push config blob
        let config_digest = format!("sha256:{}", sha256::digest(&config_data));
        debug!("Pushing config blob: {}", config_digest);

        self.client
            .push_blob(&reference, &config_data, &config_digest)
            .await
            .context("Failed to push config blob")?;

        // Push layers
        let mut manifest_layers = Vec::new();
        for (layer_data, layer_media_type) in layers {
            let digest = format!("sha256:{}", sha256::digest(&layer_data));
            debug!("Pushing layer: {}", digest);

            self.client
                .push_blob(&reference, &layer_data, &digest)
                .await
                .context("Failed to push layer")?;

            manifest_layers.push(OciDescriptor {
                media_type: layer_media_type,
                digest,
                size: layer_data.len() as i64,
                urls: None,
                annotations: None,
            });
        }

        // Create and push manifest
        let image_manifest = OciImageManifest {
            schema_version: 2,
            media_type: Some(media_type::OCI_MANIFEST.to_string()),
            artifact_type: None,
            config: OciDescriptor {
                media_type: media_type::IMAGE_CONFIG.to_string(),
                digest: config_digest,
                size: config_data.len() as i64,
                urls: None,
                annotations: None,
            },
            layers: manifest_layers,
            annotations: None,
        };

        let manifest_digest = format!(
            "sha256:{}",
            sha256::digest(serde_json::to_string(&image_manifest)?)
        );
        let manifest = OciManifest::Image(image_manifest);

        debug!("Pushing manifest");
        let manifest_url = self
            .client
            .push_manifest(&reference, &manifest)
            .await
            .context("Failed to push manifest")?;

        info!("Successfully pushed image to {}", manifest_url);

        let digest_ref = format!(
            "{}/{}@{}",
            reference.registry(),
            reference.repository(),
            manifest_digest
        );
        Ok(digest_ref)
    }
}

pub fn parse_image_reference(image: &str) -> Result<(String, String, String)> {
    let reference: Reference = image.parse().context("Failed to parse image reference")?;

    let registry = reference.registry().to_string();
    let repository = reference.repository().to_string();
    let tag = reference.tag().unwrap_or("latest").to_string();

    Ok((registry, repository, tag))
}

pub fn parse_platform(platform: &str) -> Result<(String, String)> {
    match platform.split('/').collect::<Vec<_>>()[..] {
        [os, arch] if !os.is_empty() && !arch.is_empty() => {
            Ok((os.to_string(), arch.to_string()))
        }
        _ => anyhow::bail!("Invalid platform format: {}", platform),
    }
}
