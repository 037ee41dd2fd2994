//! The sequential assembly pipeline.
//!
//! Pulls the base image, overlays the source tree and staged dependencies,
//! applies the declared file edits, rewrites the image config, and pushes
//! the result. Any failing step aborts the whole assembly.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::{
    auth::resolve_auth,
    constants::rootfs,
    edit,
    edit::MissingPolicy,
    image::{self, History, ImageConfig},
    installer::PipInstaller,
    layer::{self, Layer},
    recipe::{EditSpec, EnvDirective, Recipe, RECIPE_FILE_NAME},
    registry::{BaseImage, RegistryClient},
};

/// Configuration for one assembly run
pub struct AssembleOptions {
    pub context: PathBuf,
    pub recipe: Recipe,
    pub target_image: String,
    pub no_push: bool,
}

/// Result of an assembly run
pub struct AssembleOutcome {
    /// Digest reference of the pushed image; `None` with `--no-push`
    pub image_ref: Option<String>,
}

pub struct Assembler;

impl Assembler {
    pub async fn run(options: AssembleOptions) -> Result<AssembleOutcome> {
        let AssembleOptions {
            context,
            recipe,
            target_image,
            no_push,
        } = options;

        recipe.validate(&context)?;

        let mut client = RegistryClient::new(&recipe.platform)?;

        // 1. resolve and pull the base image
        let base_auth = resolve_auth(&recipe.base_image)?;
        let base = client.pull_base(&recipe.base_image, &base_auth).await?;

        // 2. source tree overlay
        let source_dir = context.join(&recipe.source.path);
        info!(
            "Copying source tree {:?} -> {}",
            source_dir, recipe.source.dest
        );
        let source_layer = layer::from_dir(
            &source_dir,
            &recipe.source.dest,
            &[RECIPE_FILE_NAME],
            &format!("copy {} to {}", recipe.source.path.display(), recipe.source.dest),
        )?;

        // 4. dependency installation (the env step is config-side, below)
        let install_layer = if recipe.install.enabled {
            let requirements = context.join(&recipe.install.requirements);
            let staged = PipInstaller::new(&requirements).install()?;
            Some(layer::from_dir(
                &staged.staged_dir,
                &recipe.install.site_dir,
                &[],
                &format!(
                    "install {} to {}",
                    recipe.install.requirements.display(),
                    recipe.install.site_dir
                ),
            )?)
        } else {
            None
        };

        // 5. file edits against the base layer stack
        let mut edit_layers = Vec::new();
        for spec in &recipe.edits {
            if let Some(edited) = apply_edit(&base, spec)? {
                edit_layers.push(edited);
            }
        }

        // 3, 6, 7. environment, ports, and command land in the config
        let mut new_layers: Vec<&Layer> = vec![&source_layer];
        new_layers.extend(install_layer.iter());
        new_layers.extend(edit_layers.iter());

        let created = chrono::Utc::now().to_rfc3339();
        let config_data = rewrite_config(&base.config_data, &recipe, &new_layers, &created)?;

        if no_push {
            info!("Successfully assembled image: {}", target_image);
            info!("Skipping push (--no-push specified)");
            return Ok(AssembleOutcome { image_ref: None });
        }

        let push_auth = resolve_auth(&target_image)?;
        let mut blobs = base.layers;
        for l in &new_layers {
            blobs.push((l.data.clone(), l.media_type.clone()));
        }

        let digest_ref = client
            .push_image(&target_image, config_data, blobs, &push_auth)
            .await?;

        Ok(AssembleOutcome {
            image_ref: Some(digest_ref),
        })
    }
}

/// Apply one edit spec against the base image, producing a shadowing layer
/// when the file changed.
fn apply_edit(base: &BaseImage, spec: &EditSpec) -> Result<Option<Layer>> {
    let blobs = base.layers.iter().map(|(data, _)| data.as_slice());
    let content = match edit::extract_from_layers(blobs, &spec.path)? {
        Some(bytes) => String::from_utf8(bytes)
            .with_context(|| format!("Edit target {} is not valid UTF-8", spec.path))?,
        None => {
            on_missing(
                spec.on_missing,
                &format!("Edit target {} not found in base image", spec.path),
            )?;
            return Ok(None);
        }
    };

    let (edited, counts) = edit::apply(&content, &spec.substitute);
    for (sub, count) in spec.substitute.iter().zip(&counts) {
        if *count == 0 {
            on_missing(
                spec.on_missing,
                &format!("Pattern {:?} matched nothing in {}", sub.find, spec.path),
            )?;
        } else {
            debug!(
                "Replaced {} occurrence(s) of {:?} in {}",
                count, sub.find, spec.path
            );
        }
    }

    if edited == content {
        return Ok(None);
    }

    let layer = layer::from_file(
        &spec.path,
        edited.as_bytes(),
        0o644,
        &format!("edit {}", spec.path),
    )?;
    Ok(Some(layer))
}

fn on_missing(policy: MissingPolicy, message: &str) -> Result<()> {
    match policy {
        MissingPolicy::Error => anyhow::bail!("{}", message),
        MissingPolicy::Warn => warn!("{}", message),
        MissingPolicy::Skip => debug!("{}", message),
    }
    Ok(())
}

/// Rewrite the base image config for the recipe: environment directives,
/// exposed ports, command, and the diff IDs and history of the appended
/// layers. Pure, and deterministic for a fixed `created` timestamp.
pub fn rewrite_config(
    base_config: &[u8],
    recipe: &Recipe,
    new_layers: &[&Layer],
    created: &str,
) -> Result<Vec<u8>> {
    let mut config: ImageConfig =
        serde_json::from_slice(base_config).context("Failed to parse base image config")?;

    if config.rootfs.fs_type != rootfs::FS_TYPE {
        anyhow::bail!("Unsupported rootfs type: {}", config.rootfs.fs_type);
    }

    let env = config.config.env.get_or_insert_with(Vec::new);
    for directive in &recipe.env {
        match directive {
            EnvDirective::Set { name, value } => image::set_env(env, name, value),
            EnvDirective::Append {
                name,
                value,
                separator,
            } => image::append_env(env, name, value, separator),
        }
    }

    for port in &recipe.expose {
        image::expose_port(&mut config.config.exposed_ports, port);
    }

    if !recipe.cmd.is_empty() {
        config.config.cmd = Some(recipe.cmd.clone());
    }

    for layer in new_layers {
        config.rootfs.diff_ids.push(layer.diff_id.clone());
        config.history.push(History {
            created: created.to_string(),
            created_by: "disbuild".to_string(),
            comment: layer.description.clone(),
            empty_layer: false,
            extra: serde_json::Map::new(),
        });
    }

    Ok(serde_json::to_vec_pretty(&config)?)
}
