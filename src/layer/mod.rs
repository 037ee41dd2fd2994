use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use sha256::digest;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::media_type;


/// A finished image layer: gzip-compressed tar bytes plus the digests the
/// manifest and config need.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Compressed layer blob, as pushed to the registry
    pub data: Vec<u8>,
    /// sha256 of the uncompressed tar, for `rootfs.diff_ids`
    pub diff_id: String,
    /// sha256 of `data`, for the manifest descriptor
    pub digest: String,
    pub media_type: String,
    /// Describes the layer in the image config history
    pub description: String,
}

/// Package a directory tree as a layer rooted at `dest` inside the image.
///
/// Entries are sorted and carry zeroed timestamps and ownership so the same
/// tree always produces the same bytes. Top-level names in `exclude` and
/// `.git` directories at any depth are skipped.
pub fn from_dir(src: &Path, dest: &str, exclude: &[&str], description: &str) -> Result<Layer> {
    debug!("Creating layer from directory {:?} -> {}", src, dest);

    if !src.is_dir() {
        anyhow::bail!("Source directory not found: {:?}", src);
    }

    let mut entries = Vec::new();
    collect_entries(src, PathBuf::new(), exclude, &mut entries)?;
    entries.sort();

    let prefix = dest.trim_matches('/');
    let mut tar_data = Vec::new();
    {
        let mut tar = tar::Builder::new(&mut tar_data);

        for rel in &entries {
            let abs = src.join(rel);
            let meta = std::fs::symlink_metadata(&abs)
                .with_context(|| format!("Failed to stat {:?}", abs))?;
            let name = Path::new(prefix).join(rel);

            let mut header = tar::Header::new_gnu();
            header.set_mtime(0);
            header.set_uid(0);
            header.set_gid(0);

            if meta.is_dir() {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                header.set_mode(0o755);
                tar.append_data(&mut header, &name, std::io::empty())?;
            } else if meta.file_type().is_symlink() {
                let target = std::fs::read_link(&abs)
                    .with_context(|| format!("Failed to read symlink {:?}", abs))?;
                header.set_entry_type(tar::EntryType::Symlink);
                header.set_size(0);
                header.set_mode(0o777);
                tar.append_link(&mut header, &name, &target)?;
            } else {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_size(meta.len());
                header.set_mode(file_mode(&meta));
                let mut file = File::open(&abs)
                    .with_context(|| format!("Failed to open {:?}", abs))?;
                tar.append_data(&mut header, &name, &mut file)?;
            }
        }
        tar.finish()?;
    }

    finish(tar_data, description)
}

/// Package a single file as a layer, shadowing `dest` in lower layers.
pub fn from_file(dest: &str, content: &[u8], mode: u32, description: &str) -> Result<Layer> {
    debug!("Creating single-file layer for {}", dest);

    let mut tar_data = Vec::new();
    {
        let mut tar = tar::Builder::new(&mut tar_data);

        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(content.len() as u64);
        header.set_mode(mode);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        tar.append_data(&mut header, dest.trim_start_matches('/'), content)?;
        tar.finish()?;
    }

    finish(tar_data, description)
}

fn finish(tar_data: Vec<u8>, description: &str) -> Result<Layer> {
    // diff_id is the digest of the uncompressed tar
    let diff_id = format!("sha256:{}", digest(&tar_data));

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar_data)?;
    let compressed = encoder.finish()?;
    let blob_digest = format!("sha256:{}", digest(&compressed));

    Ok(Layer {
        data: compressed,
        diff_id,
        digest: blob_digest,
        media_type: media_type::LAYER_TAR_GZIP.to_string(),
        description: description.to_string(),
    })
}

fn collect_entries(
    root: &Path,
    rel: PathBuf,
    exclude: &[&str],
    entries: &mut Vec<PathBuf>,
) -> Result<()> {
    let dir = root.join(&rel);
    for entry in std::fs::read_dir(&dir).with_context(|| format!("Failed to read {:?}", dir))? {
        let entry = entry?;
        let name = entry.file_name();

        if name == ".git" {
            continue;
        }
        if rel.as_os_str().is_empty() && exclude.iter().any(|e| name == *e) {
            continue;
        }

        let entry_rel = rel.join(&name);
        let file_type = entry.file_type()?;
        entries.push(entry_rel.clone());
        if file_type.is_dir() {
            collect_entries(root, entry_rel, exclude, entries)?;
        }
    }
    Ok(())
}

fn file_mode(meta: &std::fs::Metadata) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if meta.permissions().mode() & 0o111 != 0 {
            return 0o755;
        }
    }
    0o644
}
