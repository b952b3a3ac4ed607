use crate::cli_args::ProcessArgs;
use crate::commands::expand_path;
use crate::output::{print_completion, print_quick_stats};
use anyhow::{Context, Result};
use log;
use reposcribe_core::{
    self as core, CancelToken, CliOverrides, ConfigFile, Defaults, EffectiveConfig, LogReporter,
    OutputFormat, RenderInput, RepoHandler,
};
use std::path::{Path, PathBuf};

pub fn handle_process_command(args: ProcessArgs, quiet: bool) -> Result<()> {
    let config = build_config(&args)?;
    let cancel = match &args.timeout {
        Some(raw) => {
            let timeout = parse_duration::parse(raw)
                .with_context(|| format!("Invalid --timeout value '{}'", raw))?;
            log::debug!("Run will be aborted after {:?}", timeout);
            CancelToken::with_timeout(timeout)
        }
        None => CancelToken::new(),
    };
    let reporter = LogReporter;

    let mut repo = RepoHandler::new(
        config.repo_url().map(String::from),
        config.target_root().to_path_buf(),
        config.branch().map(String::from),
    );
    let root = repo
        .prepare_repository(args.force, &reporter, &cancel)
        .context("Failed to prepare repository")?;
    log::info!("Processing {}", root.display());
    let branch = repo.current_branch();

    let output = core::run(&config, &branch, &reporter, &cancel)
        .context("Failed to process project files")?;

    if config.summary_enabled() && !quiet {
        print_quick_stats(&output.stats);
    }

    let stats = config.stats_enabled().then_some(&output.stats);
    let input = RenderInput::new(&root, &output.records, &output.tree, stats);
    let renderer = core::renderer_for(config.output_format());
    core::render_to_file(renderer.as_ref(), &input, config.output_path(), &reporter)
        .with_context(|| {
            format!(
                "Failed to write documentation to {}",
                config.output_path().display()
            )
        })?;

    if !quiet {
        print_completion(config.output_path());
    }
    Ok(())
}

/// Collects every configuration layer and merges them.
fn build_config(args: &ProcessArgs) -> Result<EffectiveConfig> {
    let target = args
        .root_dir
        .as_deref()
        .or(args.target.as_deref())
        .map(expand_path)
        .unwrap_or_else(|| PathBuf::from("."));
    let is_remote = args.repo.is_some();

    let explicit = args.config.as_deref().map(expand_path);
    let mut search_dirs: Vec<&Path> = vec![Path::new(".")];
    if !is_remote {
        search_dirs.push(&target);
    }
    let config_path = ConfigFile::resolve_path(explicit.as_deref(), &search_dirs)
        .context("Failed to resolve configuration path")?;
    let file_config = match &config_path {
        Some(path) => Some(
            ConfigFile::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
        ),
        None => None,
    };

    let ignore_patterns = if is_remote {
        Vec::new()
    } else {
        core::read_ignore_file(&target).context("Failed to read ignore file")?
    };

    let format = match &args.format {
        Some(raw) => Some(raw.parse::<OutputFormat>()?),
        None => None,
    };
    let overrides = CliOverrides {
        repo_url: args.repo.clone(),
        target_dir: Some(target),
        output_path: args.output.as_deref().map(expand_path),
        branch: args.branch.clone(),
        format,
        include: args.filters.include.clone(),
        exclude: args.filters.exclude.clone(),
        include_extra: args.filters.include_extra.clone(),
        exclude_extra: args.filters.exclude_extra.clone(),
    };
    log::trace!("CLI overrides: {:?}", overrides);

    EffectiveConfig::build(Defaults::builtin(), file_config, ignore_patterns, &overrides)
        .context("Invalid configuration")
}
