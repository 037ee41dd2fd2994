use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::edit::{MissingPolicy, Substitution};

#[cfg(test)]
mod tests;

/// Recipe file looked up inside the build context when `--recipe` is not
/// given.
pub const RECIPE_FILE_NAME: &str = "disbuild.toml";

/// Declarative description of one image assembly.
///
/// The built-in defaults reproduce the dislib distributed-computing image:
/// the dislib base, the source tree overlaid at `/dislib`, the three
/// environment variables the COMPSs runtime expects, the requirements
/// install, the two resource-configuration edits, sshd as the foreground
/// command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Image name used when the target reference is derived from a repo
    /// prefix
    #[serde(default = "default_name")]
    pub name: String,

    /// Base image reference
    #[serde(default = "default_base_image")]
    pub base_image: String,

    /// Target platform, `os/arch`
    #[serde(default = "default_platform")]
    pub platform: String,

    /// Source tree overlay
    #[serde(default)]
    pub source: SourceSpec,

    /// Environment directives, applied in order
    #[serde(default = "default_env")]
    pub env: Vec<EnvDirective>,

    /// Dependency installation
    #[serde(default)]
    pub install: InstallSpec,

    /// In-place file edits, applied in order
    #[serde(default = "default_edits")]
    pub edits: Vec<EditSpec>,

    /// Ports declared in image metadata; `22` and `22/tcp` forms accepted
    #[serde(default = "default_expose")]
    pub expose: Vec<String>,

    /// Container command; empty keeps the base image's command
    #[serde(default = "default_cmd")]
    pub cmd: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Context-relative path of the tree to copy
    #[serde(default = "default_source_path")]
    pub path: PathBuf,

    /// Absolute destination inside the image
    #[serde(default = "default_source_dest")]
    pub dest: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum EnvDirective {
    /// Replace or add `name` with exactly `value`
    Set { name: String, value: String },
    /// Join `value` onto the base image's `name` with `separator`
    Append {
        name: String,
        value: String,
        #[serde(default = "default_separator")]
        separator: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallSpec {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Context-relative path of the dependency manifest
    #[serde(default = "default_requirements")]
    pub requirements: PathBuf,

    /// In-image directory the staged packages land in; must be on the
    /// interpreter's path in the base image
    #[serde(default = "default_site_dir")]
    pub site_dir: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditSpec {
    /// Absolute path of the file inside the image
    pub path: String,

    #[serde(default)]
    pub substitute: Vec<Substitution>,

    #[serde(default)]
    pub on_missing: MissingPolicy,
}

fn default_name() -> String {
    "dislib".to_string()
}

fn default_base_image() -> String {
    "bscwdc/dislib-base:latest".to_string()
}

fn default_platform() -> String {
    "linux/amd64".to_string()
}

fn default_source_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_source_dest() -> String {
    "/dislib".to_string()
}

fn default_separator() -> String {
    ":".to_string()
}

fn default_true() -> bool {
    true
}

fn default_requirements() -> PathBuf {
    PathBuf::from("requirements.txt")
}

fn default_site_dir() -> String {
    "/usr/local/lib/python3.5/dist-packages".to_string()
}

fn default_env() -> Vec<EnvDirective> {
    vec![
        EnvDirective::Append {
            name: "PYTHONPATH".to_string(),
            value: "/dislib".to_string(),
            separator: default_separator(),
        },
        EnvDirective::Set {
            name: "LC_ALL".to_string(),
            value: "C.UTF-8".to_string(),
        },
        EnvDirective::Set {
            name: "COMPSS_LOAD_SOURCE".to_string(),
            value: "false".to_string(),
        },
    ]
}

fn default_edits() -> Vec<EditSpec> {
    vec![EditSpec {
        path: "/opt/COMPSs/Runtime/configuration/xml/resources/default_resources.xml"
            .to_string(),
        substitute: vec![
            Substitution {
                find: ">4<".to_string(),
                replace: ">16<".to_string(),
            },
            Substitution {
                find: ">43002<".to_string(),
                replace: ">45000<".to_string(),
            },
        ],
        on_missing: MissingPolicy::default(),
    }]
}

fn default_expose() -> Vec<String> {
    vec!["22".to_string()]
}

fn default_cmd() -> Vec<String> {
    vec!["/usr/sbin/sshd".to_string(), "-D".to_string()]
}

impl Default for Recipe {
    fn default() -> Self {
        Self {
            name: default_name(),
            base_image: default_base_image(),
            platform: default_platform(),
            source: SourceSpec::default(),
            env: default_env(),
            install: InstallSpec::default(),
            edits: default_edits(),
            expose: default_expose(),
            cmd: default_cmd(),
        }
    }
}

impl Default for SourceSpec {
    fn default() -> Self {
        Self {
            path: default_source_path(),
            dest: default_source_dest(),
        }
    }
}

impl Default for InstallSpec {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            requirements: default_requirements(),
            site_dir: default_site_dir(),
        }
    }
}

impl Recipe {
    /// Load a recipe: an explicit path wins, then `disbuild.toml` in the
    /// context, then the built-in defaults.
    pub fn load(context: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = context.join(RECIPE_FILE_NAME);
                if !candidate.exists() {
                    debug!("No recipe file in {:?}, using built-in defaults", context);
                    return Ok(Recipe::default());
                }
                candidate
            }
        };

        debug!("Loading recipe from {:?}", path);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read recipe file {:?}", path))?;
        let recipe: Recipe = toml::from_str(&content)
            .with_context(|| format!("Failed to parse recipe file {:?}", path))?;
        Ok(recipe)
    }

    /// Check the recipe against the build context without touching the
    /// network.
    pub fn validate(&self, context: &Path) -> Result<()> {
        if !context.is_dir() {
            anyhow::bail!("Build context not found: {:?}", context);
        }

        let source = context.join(&self.source.path);
        if !source.is_dir() {
            anyhow::bail!("Source tree not found: {:?}", source);
        }
        if !self.source.dest.starts_with('/') {
            anyhow::bail!(
                "Source destination must be an absolute path: {}",
                self.source.dest
            );
        }

        for directive in &self.env {
            let name = match directive {
                EnvDirective::Set { name, .. } => name,
                EnvDirective::Append { name, .. } => name,
            };
            if name.is_empty() || name.contains('=') {
                anyhow::bail!("Invalid environment variable name: {:?}", name);
            }
        }

        if self.install.enabled {
            let requirements = context.join(&self.install.requirements);
            if !requirements.is_file() {
                anyhow::bail!("Dependency manifest not found: {:?}", requirements);
            }
            if !self.install.site_dir.starts_with('/') {
                anyhow::bail!(
                    "Install site_dir must be an absolute path: {}",
                    self.install.site_dir
                );
            }
        }

        for edit in &self.edits {
            if !edit.path.starts_with('/') {
                anyhow::bail!("Edit path must be absolute: {}", edit.path);
            }
            for sub in &edit.substitute {
                if sub.find.is_empty() {
                    anyhow::bail!("Empty find pattern in edit of {}", edit.path);
                }
            }
        }

        for port in &self.expose {
            parse_port(port)?;
        }

        Ok(())
    }
}

fn parse_port(port: &str) -> Result<u16> {
    let (number, protocol) = match port.split_once('/') {
        Some((number, protocol)) => (number, protocol),
        None => (port, "tcp"),
    };
    if protocol != "tcp" && protocol != "udp" {
        anyhow::bail!("Unsupported port protocol: {}", port);
    }
    number
        .parse::<u16>()
        .with_context(|| format!("Invalid port: {}", port))
}
