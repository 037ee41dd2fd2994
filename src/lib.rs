pub mod assembler;
pub mod auth;
pub mod cli;
pub mod constants;
pub mod edit;
pub mod image;
pub mod installer;
pub mod layer;
pub mod recipe;
pub mod registry;

pub use anyhow::Result;
