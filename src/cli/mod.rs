use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "disbuild")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Assemble a container image from a build context and recipe
    Build {
        /// Path to the build context directory
        #[arg(value_name = "DIRECTORY")]
        path: Option<PathBuf>,

        /// Path to the recipe file
        /// Defaults to disbuild.toml in the context, then to the built-in recipe
        #[arg(short, long)]
        recipe: Option<PathBuf>,

        /// Image reference to push (e.g. registry.example.com/dislib:latest)
        #[arg(long)]
        image: Option<String>,

        /// Repository prefix (e.g. ghcr.io/username)
        #[arg(long, env = "DISBUILD_REPO")]
        repo: Option<String>,

        /// Tag to apply to the image when the reference is derived from the repo
        #[arg(long)]
        tag: Option<String>,

        /// Skip pushing the image to the registry after assembling
        #[arg(long)]
        no_push: bool,
    },

    /// Validate a recipe and build context without touching the network
    Check {
        /// Path to the build context directory
        #[arg(value_name = "DIRECTORY")]
        path: Option<PathBuf>,

        /// Path to the recipe file
        #[arg(short, long)]
        recipe: Option<PathBuf>,
    },

    /// Show version information
    Version,
}
