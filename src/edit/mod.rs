use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::io::Read;
use tracing::debug;


/// One literal find/replace pair, applied globally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    pub find: String,
    pub replace: String,
}

/// What to do when an edit has nothing to act on: the target file is absent
/// from the base image, or a pattern matches nowhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPolicy {
    /// Log a warning and keep going
    #[default]
    Warn,
    /// Abort the build
    Error,
    /// Silent no-op
    Skip,
}

/// Apply `substitutions` in declared order, each replacing every occurrence.
/// Returns the edited text and the per-substitution match counts.
pub fn apply(content: &str, substitutions: &[Substitution]) -> (String, Vec<usize>) {
    let mut text = content.to_string();
    let mut counts = Vec::with_capacity(substitutions.len());
    for sub in substitutions {
        let count = text.matches(sub.find.as_str()).count();
        if count > 0 {
            text = text.replace(sub.find.as_str(), &sub.replace);
        }
        counts.push(count);
    }
    (text, counts)
}

/// Recover the content of `path` from an image's layer stack.
///
/// Layers are scanned bottom to top; the highest layer that carries the path
/// wins, matching overlay semantics. Returns `None` when no layer has it.
pub fn extract_from_layers<'a, I>(layers: I, path: &str) -> Result<Option<Vec<u8>>>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let wanted = path.trim_start_matches('/');
    let mut found = None;

    for (idx, blob) in layers.into_iter().enumerate() {
        let tar_data = maybe_gunzip(blob)
            .with_context(|| format!("Failed to decompress layer {}", idx))?;

        let mut archive = tar::Archive::new(&tar_data[..]);
        for entry in archive
            .entries()
            .with_context(|| format!("Failed to read layer {} as tar", idx))?
        {
            let mut entry = entry?;
            let entry_path = entry.path()?;
            let name = entry_path.to_string_lossy();
            if name.trim_start_matches("./").trim_start_matches('/') != wanted {
                continue;
            }
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let mut content = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut content)?;
            debug!("Found {} in layer {} ({} bytes)", path, idx, content.len());
            found = Some(content);
        }
    }

    Ok(found)
}

/// Layer blobs arrive compressed or plain depending on their media type;
/// sniff the gzip magic rather than trusting the label.
fn maybe_gunzip(blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() >= 2 && blob[0] == 0x1f && blob[1] == 0x8b {
        let mut out = Vec::new();
        GzDecoder::new(blob).read_to_end(&mut out)?;
        Ok(out)
    } else {
        Ok(blob.to_vec())
    }
}
