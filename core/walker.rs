//! Directory traversal and per-path selection.
//!
//! Directories are decided before descent, so an excluded directory is a hard
//! cut: nothing beneath it is visited and no file pattern can bring it back.

use crate::config::EffectiveConfig;
use crate::error::{AppError, Result};
use crate::reporter::{CancelToken, Reporter, SelectionWarning, Stage, WarningKind};
use log;
use serde::Serialize;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

const VCS_DIR: &str = ".git";
const PROGRESS_EVERY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub relative_path: PathBuf,
    pub absolute_path: PathBuf,
    pub size_bytes: u64,
    pub extension: String,
}

impl FileEntry {
    pub fn new(relative_path: PathBuf, absolute_path: PathBuf, size_bytes: u64) -> Self {
        let extension = extension_of(&relative_path);
        Self {
            relative_path,
            absolute_path,
            size_bytes,
            extension,
        }
    }

    /// Relative path with `/` separators, as shown in rendered output.
    pub fn display_path(&self) -> String {
        to_slash(&self.relative_path)
    }
}

/// Lowercased suffix without the dot, or `unknown`.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionRule {
    ExcludeDirs,
    ExcludeFiles,
    NotInIncludeDirs,
    NotInIncludeFiles,
    VcsMetadata,
    OutputArtifact,
}

/// Outcome of the pattern rules for one path. Excluded paths are never read
/// and never counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Selected,
    Excluded(ExclusionRule),
}

/// Files to embed plus every directory that was descended into, both in
/// walk order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub files: Vec<FileEntry>,
    pub dirs: Vec<PathBuf>,
}

pub struct FileSelector<'a> {
    config: &'a EffectiveConfig,
}

impl<'a> FileSelector<'a> {
    pub fn new(config: &'a EffectiveConfig) -> Self {
        Self { config }
    }

    /// Hard cuts only. Include-dirs never prune, since a directory that does
    /// not match may still hold one that does.
    pub fn decide_dir(&self, relative_path: &Path) -> Decision {
        if relative_path.file_name() == Some(OsStr::new(VCS_DIR)) {
            return Decision::Excluded(ExclusionRule::VcsMetadata);
        }
        if self.config.exclude_dirs().matches(relative_path, true) {
            return Decision::Excluded(ExclusionRule::ExcludeDirs);
        }
        // Directory-only lines from an ignore file (`target/`) live in the
        // file excludes but still prune whole directories.
        if self.config.exclude_files().matches(relative_path, true) {
            return Decision::Excluded(ExclusionRule::ExcludeFiles);
        }
        Decision::Selected
    }

    /// True when `dir` or one of its ancestors matches include-dirs. The root
    /// (empty path) always passes.
    pub fn within_include_dirs(&self, dir: &Path) -> bool {
        let include_dirs = self.config.include_dirs();
        include_dirs.is_empty()
            || dir.as_os_str().is_empty()
            || dir
                .ancestors()
                .filter(|p| !p.as_os_str().is_empty())
                .any(|p| include_dirs.matches(p, true))
    }

    pub fn decide_file(&self, relative_path: &Path) -> Decision {
        if self.config.exclude_files().matches(relative_path, false) {
            return Decision::Excluded(ExclusionRule::ExcludeFiles);
        }
        let parent = relative_path.parent().unwrap_or(Path::new(""));
        if !self.within_include_dirs(parent) {
            return Decision::Excluded(ExclusionRule::NotInIncludeDirs);
        }
        let include_files = self.config.include_files();
        if !include_files.is_empty() && !include_files.matches(relative_path, false) {
            return Decision::Excluded(ExclusionRule::NotInIncludeFiles);
        }
        Decision::Selected
    }

    /// Walks `root` depth-first in lexicographic order within each directory.
    pub fn collect(
        &self,
        root: &Path,
        reporter: &dyn Reporter,
        cancel: &CancelToken,
    ) -> Result<Selection> {
        log::info!("Walking project directory: {}", root.display());
        cancel.check()?;
        let canonical_root = root.canonicalize().map_err(|e| AppError::FileRead {
            path: root.to_path_buf(),
            source: e,
        })?;
        let output_artifact = canonical_output_path(self.config.output_path());
        let max_depth = self.config.max_depth();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| self.keep_entry(entry, root));

        let mut selection = Selection::default();
        for entry_result in walker {
            cancel.check()?;
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                    let kind = match e.io_error().map(io::Error::kind) {
                        Some(io::ErrorKind::PermissionDenied) => WarningKind::PermissionDenied,
                        _ => WarningKind::WalkError,
                    };
                    reporter.on_warning(&SelectionWarning::new(path, kind, e.to_string()));
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }
            let Ok(relative_path) = entry.path().strip_prefix(root) else {
                log::warn!("Could not get relative path for: {}", entry.path().display());
                continue;
            };
            let relative_path = relative_path.to_path_buf();
            let file_type = entry.file_type();

            if file_type.is_dir() {
                if entry.depth() >= max_depth {
                    log::trace!("Depth limit reached at: {}", relative_path.display());
                } else if self.within_include_dirs(&relative_path) {
                    log::trace!("Descending into: {}", relative_path.display());
                    selection.dirs.push(relative_path);
                } else {
                    log::trace!("Searching for included dirs in: {}", relative_path.display());
                }
                continue;
            }

            if let Decision::Excluded(rule) = self.decide_file(&relative_path) {
                log::trace!("Excluding file {} ({:?})", relative_path.display(), rule);
                continue;
            }
            if output_artifact
                .as_ref()
                .is_some_and(|out| *out == canonical_root.join(&relative_path))
            {
                log::debug!(
                    "Excluding file {} ({:?})",
                    relative_path.display(),
                    ExclusionRule::OutputArtifact
                );
                continue;
            }

            let size_bytes = if file_type.is_symlink() {
                match self.resolve_symlink(entry.path(), &canonical_root, reporter) {
                    Some(size) => size,
                    None => continue,
                }
            } else if file_type.is_file() {
                match entry.metadata() {
                    Ok(meta) => meta.len(),
                    Err(e) => {
                        reporter.on_warning(&SelectionWarning::new(
                            entry.path(),
                            WarningKind::WalkError,
                            format!("cannot read metadata: {}", e),
                        ));
                        continue;
                    }
                }
            } else {
                log::trace!("Skipping special file: {}", relative_path.display());
                continue;
            };

            log::trace!("Selected file: {}", relative_path.display());
            selection.files.push(FileEntry::new(
                relative_path,
                entry.path().to_path_buf(),
                size_bytes,
            ));
            if selection.files.len() % PROGRESS_EVERY == 0 {
                reporter.on_progress(Stage::Walk, selection.files.len(), None);
            }
        }

        reporter.on_progress(Stage::Walk, selection.files.len(), Some(selection.files.len()));
        log::info!(
            "Directory walk complete. Selected {} files in {} directories.",
            selection.files.len(),
            selection.dirs.len()
        );
        Ok(selection)
    }

    fn keep_entry(&self, entry: &DirEntry, root: &Path) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        let Ok(relative_path) = entry.path().strip_prefix(root) else {
            return true;
        };
        match self.decide_dir(relative_path) {
            Decision::Selected => true,
            Decision::Excluded(rule) => {
                log::trace!("Pruning directory {} ({:?})", relative_path.display(), rule);
                false
            }
        }
    }

    /// Links are never descended. A link to a regular file inside the root
    /// is treated as that file; anything else is dropped with a warning.
    fn resolve_symlink(
        &self,
        link: &Path,
        canonical_root: &Path,
        reporter: &dyn Reporter,
    ) -> Option<u64> {
        let target = match fs::canonicalize(link) {
            Ok(target) => target,
            Err(e) => {
                reporter.on_warning(&SelectionWarning::new(
                    link,
                    WarningKind::BrokenSymlink,
                    format!("broken symbolic link: {}", e),
                ));
                return None;
            }
        };
        if !target.starts_with(canonical_root) {
            reporter.on_warning(&SelectionWarning::new(
                link,
                WarningKind::SymlinkOutsideRoot,
                format!("symbolic link points outside the root: {}", target.display()),
            ));
            return None;
        }
        match fs::metadata(&target) {
            Ok(meta) if meta.is_file() => Some(meta.len()),
            Ok(_) => {
                log::trace!("Not following directory link: {}", link.display());
                None
            }
            Err(e) => {
                reporter.on_warning(&SelectionWarning::new(
                    link,
                    WarningKind::BrokenSymlink,
                    e.to_string(),
                ));
                None
            }
        }
    }
}

fn canonical_output_path(output: &Path) -> Option<PathBuf> {
    let file_name = output.file_name()?;
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    parent.canonicalize().ok().map(|p| p.join(file_name))
}
