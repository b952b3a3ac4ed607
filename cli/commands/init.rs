use crate::cli_args::InitArgs;
use crate::commands::expand_path;
use anyhow::{Context, Result};
use colored::*;
use log;
use std::path::PathBuf;

pub fn handle_init_command(args: &InitArgs, quiet: bool) -> Result<()> {
    let dir = args
        .root_dir
        .as_deref()
        .map(expand_path)
        .unwrap_or_else(|| PathBuf::from("."));
    log::debug!("Initializing configuration in {}", dir.display());

    let path = reposcribe_core::init_config(&dir, args.force)
        .with_context(|| format!("Failed to initialize configuration in {}", dir.display()))?;

    if !quiet {
        println!(
            "{} Created default configuration at {}",
            "✔".green(),
            path.display().to_string().blue()
        );
    }
    Ok(())
}
