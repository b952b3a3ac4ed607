use crate::error::{AppError, Result};
use crate::patterns::{PatternSet, validate_patterns};
use log;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CONFIG_FILENAME: &str = ".reposcribe.yml";
pub const IGNORE_FILENAME: &str = ".gitignore";
pub const DEFAULT_OUTPUT_STEM: &str = "project_summary";
pub const DEFAULT_MAX_DEPTH: i64 = 10;
pub const DEFAULT_MAX_FILE_SIZE: &str = "1MB";

pub const DEFAULT_CONFIG_TEMPLATE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../data/reposcribe.yml"));

static BUILTIN_DEFAULTS: Lazy<Defaults> = Lazy::new(|| {
    let yaml_content = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../data/default_patterns.yaml"
    ));
    serde_yml::from_str(yaml_content).expect("Failed to parse embedded data/default_patterns.yaml")
});

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Markdown => f.write_str("markdown"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            other => Err(AppError::Config(format!(
                "Unknown output format '{}'. Use 'markdown' or 'json'.",
                other
            ))),
        }
    }
}

/// On-disk configuration, mirrored 1:1 from `.reposcribe.yml`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub include: PathPatterns,
    #[serde(default)]
    pub exclude: PathPatterns,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: i64,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: String,
    #[serde(default = "default_true")]
    pub stats_in_output: bool,
    #[serde(default = "default_true")]
    pub collapse_empty_dirs: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "default_true")]
    pub stats: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct PathPatterns {
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub dirs: Vec<String>,
}

impl PathPatterns {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }
}

fn default_true() -> bool {
    true
}
fn default_max_depth() -> i64 {
    DEFAULT_MAX_DEPTH
}
fn default_max_file_size() -> String {
    DEFAULT_MAX_FILE_SIZE.to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_file_size: default_max_file_size(),
            stats_in_output: default_true(),
            collapse_empty_dirs: default_true(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            stats: default_true(),
        }
    }
}

impl ConfigFile {
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let yaml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        if yaml_content.trim().is_empty() {
            log::debug!("Config file is empty, using defaults.");
            return Ok(Self::default());
        }
        serde_yml::from_str::<ConfigFile>(&yaml_content).map_err(|e| {
            AppError::Config(format!(
                "Invalid YAML in config file '{}': {}",
                config_path.display(),
                e
            ))
        })
    }

    /// An explicit path must exist. Otherwise the first `.reposcribe.yml`
    /// found in `search_dirs` is used; `None` means built-in defaults.
    pub fn resolve_path(explicit: Option<&Path>, search_dirs: &[&Path]) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(AppError::Config(format!(
                    "Specified config file not found at path: {}",
                    path.display()
                )));
            }
            log::debug!("Using specified config file path: {}", path.display());
            return Ok(Some(path.to_path_buf()));
        }
        for dir in search_dirs {
            let candidate = dir.join(CONFIG_FILENAME);
            if candidate.is_file() {
                log::debug!("Using config file found at: {}", candidate.display());
                return Ok(Some(candidate));
            }
        }
        log::debug!("No config file found, using built-in defaults.");
        Ok(None)
    }
}

/// Built-in include/exclude lists embedded from `data/default_patterns.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Defaults {
    #[serde(default)]
    pub include: PathPatterns,
    #[serde(default)]
    pub exclude: PathPatterns,
}

impl Defaults {
    pub fn builtin() -> &'static Defaults {
        &BUILTIN_DEFAULTS
    }
}

/// Values supplied on the command line. Patterns are appended; the scalar
/// fields replace whatever the lower layers said.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub repo_url: Option<String>,
    pub target_dir: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub branch: Option<String>,
    pub format: Option<OutputFormat>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub include_extra: Vec<String>,
    pub exclude_extra: Vec<String>,
}

/// The merged, validated decision table driving one run.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    max_depth: usize,
    max_file_size_bytes: u64,
    include_files: PatternSet,
    include_dirs: PatternSet,
    exclude_files: PatternSet,
    exclude_dirs: PatternSet,
    output_format: OutputFormat,
    stats_enabled: bool,
    summary_enabled: bool,
    collapse_empty_dirs: bool,
    target_root: PathBuf,
    output_path: PathBuf,
    branch: Option<String>,
    repo_url: Option<String>,
}

impl EffectiveConfig {
    /// Layers, lowest first: built-in defaults, config file, ignore file, CLI.
    pub fn build(
        defaults: &Defaults,
        file_config: Option<ConfigFile>,
        ignore_patterns: Vec<String>,
        cli: &CliOverrides,
    ) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let mut include = if file.include.is_empty() {
            log::debug!("No include patterns configured, using built-in include defaults.");
            defaults.include.clone()
        } else {
            file.include.clone()
        };
        let mut exclude = if file.exclude.is_empty() {
            log::debug!("No exclude patterns configured, using built-in exclude defaults.");
            defaults.exclude.clone()
        } else {
            file.exclude.clone()
        };

        if cli.repo_url.is_none() {
            if !ignore_patterns.is_empty() {
                log::debug!(
                    "Appending {} ignore-file patterns to file excludes.",
                    ignore_patterns.len()
                );
            }
            exclude.files.extend(ignore_patterns);
        } else if !ignore_patterns.is_empty() {
            log::debug!("Remote source requested, ignoring local ignore-file patterns.");
        }

        include.files.extend(cli.include.iter().cloned());
        include.files.extend(cli.include_extra.iter().cloned());
        exclude.files.extend(cli.exclude.iter().cloned());
        exclude.files.extend(cli.exclude_extra.iter().cloned());

        if file.general.max_depth < 1 {
            return Err(AppError::Config(format!(
                "max_depth must be greater than 0 (got {})",
                file.general.max_depth
            )));
        }
        let max_depth = usize::try_from(file.general.max_depth).map_err(|_| {
            AppError::Config(format!("max_depth {} is too large", file.general.max_depth))
        })?;

        let max_file_size_bytes = parse_size(&file.general.max_file_size)?;
        if max_file_size_bytes < 1 {
            return Err(AppError::Config(
                "max_file_size must be greater than 0".to_string(),
            ));
        }

        let target_root = cli
            .target_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        if target_root.exists() {
            if !target_root.is_dir() {
                return Err(AppError::Config(format!(
                    "Target path is not a directory: {}",
                    target_root.display()
                )));
            }
        } else if cli.repo_url.is_some() {
            log::debug!(
                "Target directory {} will be created by the clone.",
                target_root.display()
            );
        } else {
            return Err(AppError::Config(format!(
                "Target directory does not exist: {}",
                target_root.display()
            )));
        }

        validate_patterns(&include.files, "include files")?;
        validate_patterns(&include.dirs, "include dirs")?;
        validate_patterns(&exclude.files, "exclude files")?;
        validate_patterns(&exclude.dirs, "exclude dirs")?;

        let output_format = cli.format.unwrap_or(file.output.format);
        let output_path = cli.output_path.clone().unwrap_or_else(|| {
            PathBuf::from(format!(
                "{}.{}",
                DEFAULT_OUTPUT_STEM,
                output_format.extension()
            ))
        });

        let config = Self {
            max_depth,
            max_file_size_bytes,
            include_files: PatternSet::new(&include.files)?,
            include_dirs: PatternSet::new(&include.dirs)?,
            exclude_files: PatternSet::new(&exclude.files)?,
            exclude_dirs: PatternSet::new(&exclude.dirs)?,
            output_format,
            stats_enabled: file.output.stats,
            summary_enabled: file.general.stats_in_output,
            collapse_empty_dirs: file.general.collapse_empty_dirs,
            target_root,
            output_path,
            branch: cli.branch.clone(),
            repo_url: cli.repo_url.clone(),
        };
        log::trace!("Effective configuration: {:?}", config);
        Ok(config)
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_bytes
    }
    pub fn include_files(&self) -> &PatternSet {
        &self.include_files
    }
    pub fn include_dirs(&self) -> &PatternSet {
        &self.include_dirs
    }
    pub fn exclude_files(&self) -> &PatternSet {
        &self.exclude_files
    }
    pub fn exclude_dirs(&self) -> &PatternSet {
        &self.exclude_dirs
    }
    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }
    pub fn stats_enabled(&self) -> bool {
        self.stats_enabled
    }
    /// Whether the console summary is printed after a run.
    pub fn summary_enabled(&self) -> bool {
        self.summary_enabled
    }
    pub fn collapse_empty_dirs(&self) -> bool {
        self.collapse_empty_dirs
    }
    pub fn target_root(&self) -> &Path {
        &self.target_root
    }
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }
    pub fn repo_url(&self) -> Option<&str> {
        self.repo_url.as_deref()
    }
}

/// Parses `<integer><unit>` with unit in B, KB, MB, GB (case-insensitive,
/// powers of 1024).
pub fn parse_size(size_str: &str) -> Result<u64> {
    let trimmed = size_str.trim();
    let invalid = || {
        AppError::Config(format!(
            "Invalid size format: '{}'. Use e.g. '500KB' or '1MB'.",
            size_str
        ))
    };

    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (number, unit) = trimmed.split_at(digits_end);
    if number.is_empty() {
        return Err(invalid());
    }
    let unit = unit.trim_start();
    let multiplier: u64 = match unit.to_uppercase().as_str() {
        "B" => 1,
        "KB" => 1024,
        "MB" => 1024 * 1024,
        "GB" => 1024 * 1024 * 1024,
        "" => return Err(invalid()),
        other => {
            return Err(AppError::Config(format!(
                "Invalid size unit '{}' in '{}'. Use B, KB, MB or GB.",
                other, size_str
            )));
        }
    };
    let value: u64 = number.parse().map_err(|_| invalid())?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| AppError::Config(format!("Size '{}' is too large", size_str)))
}

/// Reads `.gitignore` from `dir`, dropping blank lines and comments.
pub fn read_ignore_file(dir: &Path) -> Result<Vec<String>> {
    let path = dir.join(IGNORE_FILENAME);
    if !path.is_file() {
        log::trace!("No ignore file at {}", path.display());
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(&path).map_err(|e| AppError::FileRead {
        path: path.clone(),
        source: e,
    })?;
    let patterns: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect();
    log::debug!(
        "Loaded {} patterns from {}",
        patterns.len(),
        path.display()
    );
    Ok(patterns)
}

/// Writes the default configuration into `dir`. Refuses to overwrite an
/// existing file unless `force` is set.
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let target_path = dir.join(CONFIG_FILENAME);
    if target_path.exists() && !force {
        return Err(AppError::Config(format!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            target_path.display()
        )));
    }
    fs::create_dir_all(dir).map_err(|e| AppError::DirCreation {
        path: dir.to_path_buf(),
        source: e,
    })?;
    fs::write(&target_path, DEFAULT_CONFIG_TEMPLATE).map_err(|e| AppError::FileWrite {
        path: target_path.clone(),
        source: e,
    })?;
    log::info!("Created default configuration at {}", target_path.display());
    Ok(target_path)
}

#[cfg(test)]
pub(crate) fn test_config(
    root: &Path,
    customize: impl FnOnce(&mut ConfigFile, &mut CliOverrides),
) -> EffectiveConfig {
    let mut file = ConfigFile::default();
    let mut cli = CliOverrides {
        target_dir: Some(root.to_path_buf()),
        ..Default::default()
    };
    customize(&mut file, &mut cli);
    EffectiveConfig::build(&Defaults::default(), Some(file), Vec::new(), &cli)
        .expect("valid test config")
}
