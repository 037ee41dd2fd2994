//! Registry credential resolution from Docker config files.

use anyhow::{Context, Result};
use base64::Engine;
use oci_distribution::secrets::RegistryAuth;
use oci_distribution::Reference;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;


/// Docker config file structure (`~/.docker/config.json`)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DockerConfig {
    #[serde(default)]
    pub auths: HashMap<String, DockerAuthEntry>,
}

/// Entry in the Docker config auths section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DockerAuthEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(rename = "identitytoken", skip_serializing_if = "Option::is_none")]
    pub identity_token: Option<String>,
    #[serde(rename = "registrytoken", skip_serializing_if = "Option::is_none")]
    pub registry_token: Option<String>,
}

impl DockerAuthEntry {
    /// Convert to oci-distribution RegistryAuth
    pub fn to_registry_auth(&self) -> RegistryAuth {
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            return RegistryAuth::Basic(username.clone(), password.clone());
        }

        if let Some(auth) = &self.auth {
            // base64-encoded "user:pass"
            if let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(auth) {
                if let Ok(decoded_str) = String::from_utf8(decoded) {
                    if let Some((user, pass)) = decoded_str.split_once(':') {
                        return RegistryAuth::Basic(user.to_string(), pass.to_string());
                    }
                }
            }
        }

        if let Some(token) = &self.registry_token {
            return RegistryAuth::Bearer(token.clone());
        }
        if let Some(token) = &self.identity_token {
            return RegistryAuth::Bearer(token.clone());
        }

        RegistryAuth::Anonymous
    }
}

/// Resolve credentials for an image reference, falling back to anonymous
/// access when no Docker config entry matches.
pub fn resolve_auth(image_ref: &str) -> Result<RegistryAuth> {
    let path = match docker_config_path() {
        Some(path) if path.is_file() => path,
        _ => {
            debug!("No Docker config file, using anonymous auth");
            return Ok(RegistryAuth::Anonymous);
        }
    };
    resolve_auth_from(&path, image_ref)
}

fn resolve_auth_from(path: &std::path::Path, image_ref: &str) -> Result<RegistryAuth> {
    let reference: Reference = image_ref
        .parse()
        .with_context(|| format!("Failed to parse image reference: {}", image_ref))?;
    let registry = reference.registry().to_string();

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read Docker config {:?}", path))?;
    let config: DockerConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse Docker config {:?}", path))?;

    for key in registry_keys(&registry) {
        if let Some(entry) = config.auths.get(&key) {
            debug!("Using Docker config credentials for {}", key);
            return Ok(entry.to_registry_auth());
        }
    }

    Ok(RegistryAuth::Anonymous)
}

/// Config keys to try for a registry host. Docker Hub entries are stored
/// under several historical aliases.
fn registry_keys(registry: &str) -> Vec<String> {
    let mut keys = vec![registry.to_string(), format!("https://{}", registry)];
    if registry == "docker.io" || registry == "registry-1.docker.io" {
        keys.push("index.docker.io".to_string());
        keys.push("https://index.docker.io/v1/".to_string());
    }
    keys
}

fn docker_config_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("DOCKER_CONFIG") {
        return Some(PathBuf::from(dir).join("config.json"));
    }
    dirs::home_dir().map(|home| home.join(".docker").join("config.json"))
}
