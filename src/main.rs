use anyhow::{Context, Result};
use clap::Parser;
use disbuild::{
    assembler::{AssembleOptions, Assembler},
    cli::{Cli, Commands},
    constants::tag,
    recipe::Recipe,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Build {
            path,
            recipe,
            image,
            repo,
            tag: tag_arg,
            no_push,
        } => {
            let context = path.unwrap_or_else(|| PathBuf::from("."));
            let recipe = Recipe::load(&context, recipe.as_deref())?;

            // Determine the image name
            let target_image = if let Some(image) = image {
                // Use explicit image if provided
                image
            } else {
                // Build image name from repo and recipe name
                let repo = repo.context("Either --image or DISBUILD_REPO must be set")?;
                let tag = tag_arg.unwrap_or_else(|| tag::DEFAULT.to_string());
                format!("{}/{}:{}", repo, recipe.name, tag)
            };

            let outcome = Assembler::run(AssembleOptions {
                context,
                recipe,
                target_image,
                no_push,
            })
            .await?;

            // Print only the digest reference to stdout
            if let Some(image_ref) = outcome.image_ref {
                println!("{}", image_ref);
            }
        }
        Commands::Check { path, recipe } => {
            let context = path.unwrap_or_else(|| PathBuf::from("."));
            let recipe = Recipe::load(&context, recipe.as_deref())?;
            recipe.validate(&context)?;
            let (registry, repository, tag) =
                disbuild::registry::parse_image_reference(&recipe.base_image)?;
            info!(
                "Recipe OK: {} from {}/{}:{} ({} env directives, {} edits)",
                recipe.name,
                registry,
                repository,
                tag,
                recipe.env.len(),
                recipe.edits.len()
            );
        }
        Commands::Version => {
            println!("disbuild {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
