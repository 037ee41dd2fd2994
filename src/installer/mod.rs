use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, error, info};


/// Runs the Python package installer against a requirements manifest,
/// staging the installed distributions into a temporary directory that is
/// later packaged as an image layer.
pub struct PipInstaller {
    requirements: PathBuf,
    pip_args: Vec<String>,
}

#[derive(Debug)]
pub struct InstallResult {
    pub staged_dir: PathBuf,
    _temp_dir: TempDir, // Keep temp dir alive until InstallResult is dropped
}

impl PipInstaller {
    pub fn new(requirements: impl AsRef<Path>) -> Self {
        Self {
            requirements: requirements.as_ref().to_path_buf(),
            pip_args: Vec::new(),
        }
    }

    pub fn with_pip_args(mut self, args: Vec<String>) -> Self {
        self.pip_args = args;
        self
    }

    pub fn install(&self) -> Result<InstallResult> {
        if !self.requirements.is_file() {
            anyhow::bail!(
                "Dependency manifest not found: {:?}",
                self.requirements
            );
        }

        let python = which::which("python3").context("python3 not found in PATH")?;

        let temp_dir = tempfile::tempdir().context("Failed to create staging directory")?;
        let staged_dir = temp_dir.path().join("site-packages");
        std::fs::create_dir_all(&staged_dir).context("Failed to create staging directory")?;

        let mut cmd = Command::new(&python);
        cmd.arg("-m")
            .arg("pip")
            .arg("install")
            // timestamped .pyc files would make the layer non-reproducible
            .arg("--no-compile")
            .arg("--target")
            .arg(&staged_dir)
            .arg("-r")
            .arg(&self.requirements);

        for arg in &self.pip_args {
            cmd.arg(arg);
        }

        debug!("Running command: {:?}", cmd);
        info!("Installing dependencies from {:?}", self.requirements);

        let output = cmd.output().context("Failed to execute pip install")?;

        if !output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("pip install failed!");
            error!("stdout:\n{}", stdout);
            error!("stderr:\n{}", stderr);
            anyhow::bail!("pip install failed: {}", stderr);
        }

        info!("Staged dependencies at {:?}", staged_dir);

        Ok(InstallResult {
            staged_dir,
            _temp_dir: temp_dir,
        })
    }
}
