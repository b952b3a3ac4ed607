//! Repository acquisition: clone a remote or validate a local checkout.

use crate::error::{AppError, Result};
use crate::reporter::{CancelToken, Reporter, Stage};
use git2::build::RepoBuilder;
use git2::{ErrorCode, FetchOptions, RemoteCallbacks, Repository, StatusOptions};
use log;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const UNKNOWN_BRANCH: &str = "unknown";
pub const DETACHED_HEAD: &str = "detached-head";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoInfo {
    pub branch: String,
    pub is_repo: bool,
    pub has_uncommitted_changes: bool,
    pub remotes: Vec<String>,
    pub root_path: Option<PathBuf>,
}

pub struct RepoHandler {
    repo_url: Option<String>,
    target_dir: PathBuf,
    branch: Option<String>,
    repo: Option<Repository>,
}

impl RepoHandler {
    pub fn new(repo_url: Option<String>, target_dir: PathBuf, branch: Option<String>) -> Self {
        Self {
            repo_url,
            target_dir,
            branch,
            repo: None,
        }
    }

    /// Returns the root to walk. Clones when a URL was given, otherwise
    /// validates the local directory (skipped when `force_non_repo`).
    pub fn prepare_repository(
        &mut self,
        force_non_repo: bool,
        reporter: &dyn Reporter,
        cancel: &CancelToken,
    ) -> Result<PathBuf> {
        cancel.check()?;
        match self.repo_url.clone() {
            Some(url) => self.clone_repository(&url, reporter, cancel),
            None => self.open_local(force_non_repo),
        }
    }

    fn clone_repository(
        &mut self,
        url: &str,
        reporter: &dyn Reporter,
        cancel: &CancelToken,
    ) -> Result<PathBuf> {
        let target = self.target_dir.clone();
        log::info!("Cloning repository from {} to {}", url, target.display());

        if target.exists() && !is_empty_dir(&target)? {
            return Err(AppError::Acquisition(format!(
                "Target directory {} exists and is not empty",
                target.display()
            )));
        }
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AppError::DirCreation {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut callbacks = RemoteCallbacks::new();
        callbacks.transfer_progress(|progress| {
            reporter.on_progress(
                Stage::Acquire,
                progress.received_objects(),
                Some(progress.total_objects()),
            );
            !cancel.is_cancelled()
        });
        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(callbacks);

        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_options);
        if let Some(branch) = &self.branch {
            builder.branch(branch);
        }

        let repo = builder.clone(url, &target).map_err(|e| {
            if cancel.is_cancelled() {
                AppError::Cancelled(format!("clone of {} aborted", url))
            } else {
                AppError::Acquisition(format!("Git clone failed: {}", e.message()))
            }
        })?;
        log::info!("Repository cloned successfully");
        self.repo = Some(repo);
        Ok(target)
    }

    fn open_local(&mut self, force_non_repo: bool) -> Result<PathBuf> {
        let path = self.target_dir.canonicalize().map_err(|_| {
            AppError::Acquisition(format!(
                "Directory does not exist: {}",
                self.target_dir.display()
            ))
        })?;

        if force_non_repo {
            log::warn!("Force flag used - processing directory without Git validation");
            self.repo = Repository::open(&path).ok();
            return Ok(path);
        }

        let repo = Repository::open(&path).map_err(|e| match e.code() {
            ErrorCode::NotFound => AppError::Acquisition(format!(
                "Directory is not a Git repository: {}\nUse --force to process it anyway",
                path.display()
            )),
            _ => AppError::Acquisition(format!(
                "Failed to open repository at {}: {}",
                path.display(),
                e.message()
            )),
        })?;
        if repo.is_bare() {
            return Err(AppError::Acquisition(
                "Cannot process bare repositories".to_string(),
            ));
        }
        if is_dirty(&repo) {
            log::warn!("Repository has uncommitted changes");
        }
        if let Some(wanted) = &self.branch {
            let current = current_branch(&repo);
            if *wanted != current {
                log::warn!(
                    "Requested branch '{}' but the checkout is on '{}'; using the checkout as is",
                    wanted,
                    current
                );
            }
        }
        log::info!("Using local repository at {}", path.display());
        self.repo = Some(repo);
        Ok(path)
    }

    pub fn current_branch(&self) -> String {
        self.repo
            .as_ref()
            .map(current_branch)
            .unwrap_or_else(|| UNKNOWN_BRANCH.to_string())
    }

    pub fn repo_info(&self) -> RepoInfo {
        let Some(repo) = &self.repo else {
            return RepoInfo {
                branch: UNKNOWN_BRANCH.to_string(),
                is_repo: false,
                has_uncommitted_changes: false,
                remotes: Vec::new(),
                root_path: None,
            };
        };
        let remotes = repo
            .remotes()
            .map(|names| names.iter().flatten().map(String::from).collect())
            .unwrap_or_default();
        RepoInfo {
            branch: current_branch(repo),
            is_repo: true,
            has_uncommitted_changes: is_dirty(repo),
            remotes,
            root_path: repo.workdir().map(Path::to_path_buf),
        }
    }
}

fn current_branch(repo: &Repository) -> String {
    if repo.head_detached().unwrap_or(false) {
        return DETACHED_HEAD.to_string();
    }
    match repo.head() {
        Ok(head) => head
            .shorthand()
            .map(String::from)
            .unwrap_or_else(|| UNKNOWN_BRANCH.to_string()),
        // A fresh repository has a symbolic HEAD to a branch with no commits.
        Err(e) if e.code() == ErrorCode::UnbornBranch => repo
            .find_reference("HEAD")
            .ok()
            .and_then(|r| r.symbolic_target().map(String::from))
            .map(|target| target.trim_start_matches("refs/heads/").to_string())
            .unwrap_or_else(|| UNKNOWN_BRANCH.to_string()),
        Err(e) => {
            log::warn!("Failed to get current branch: {}", e);
            UNKNOWN_BRANCH.to_string()
        }
    }
}

/// Tracked changes only; untracked files do not make a checkout dirty.
fn is_dirty(repo: &Repository) -> bool {
    let mut options = StatusOptions::new();
    options.include_untracked(false).include_ignored(false);
    match repo.statuses(Some(&mut options)) {
        Ok(statuses) => !statuses.is_empty(),
        Err(e) => {
            log::warn!("Could not read repository status: {}", e);
            false
        }
    }
}

fn is_empty_dir(path: &Path) -> Result<bool> {
    let mut entries = fs::read_dir(path).map_err(|e| AppError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(entries.next().is_none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::NullReporter;
    use git2::{RepositoryInitOptions, Signature};
    use tempfile::tempdir;

    fn init_repo(path: &Path) -> Repository {
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        Repository::init_opts(path, &opts).unwrap()
    }

    fn commit_file(repo: &Repository, name: &str, content: &str) {
        let workdir = repo.workdir().unwrap().to_path_buf();
        fs::write(workdir.join(name), content).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, "commit", &tree, &parents)
            .unwrap();
    }

    fn prepare(handler: &mut RepoHandler, force: bool) -> Result<PathBuf> {
        handler.prepare_repository(force, &NullReporter, &CancelToken::new())
    }

    #[test]
    fn plain_directory_requires_force() {
        let dir = tempdir().unwrap();
        let mut handler = RepoHandler::new(None, dir.path().to_path_buf(), None);
        let err = prepare(&mut handler, false).unwrap_err();
        assert!(matches!(err, AppError::Acquisition(ref msg) if msg.contains("--force")));

        let root = prepare(&mut handler, true).unwrap();
        assert_eq!(root, dir.path().canonicalize().unwrap());
        let info = handler.repo_info();
        assert!(!info.is_repo);
        assert_eq!(info.branch, UNKNOWN_BRANCH);
    }

    #[test]
    fn missing_directory_is_an_acquisition_error() {
        let dir = tempdir().unwrap();
        let mut handler = RepoHandler::new(None, dir.path().join("nope"), None);
        assert!(matches!(
            prepare(&mut handler, true),
            Err(AppError::Acquisition(_))
        ));
    }

    #[test]
    fn local_repository_reports_branch_and_dirty_state() {
        let dir = tempdir().unwrap();
        let repo = init_repo(dir.path());
        commit_file(&repo, "a.txt", "one");

        let mut handler = RepoHandler::new(None, dir.path().to_path_buf(), None);
        prepare(&mut handler, false).unwrap();
        let info = handler.repo_info();
        assert!(info.is_repo);
        assert_eq!(info.branch, "main");
        assert!(!info.has_uncommitted_changes);

        fs::write(dir.path().join("a.txt"), "two").unwrap();
        assert!(handler.repo_info().has_uncommitted_changes);
    }

    #[test]
    fn unborn_branch_name_is_reported() {
        let dir = tempdir().unwrap();
        init_repo(dir.path());
        let mut handler = RepoHandler::new(None, dir.path().to_path_buf(), None);
        prepare(&mut handler, false).unwrap();
        assert_eq!(handler.current_branch(), "main");
    }

    #[test]
    fn bare_repository_is_rejected() {
        let dir = tempdir().unwrap();
        Repository::init_bare(dir.path()).unwrap();
        let mut handler = RepoHandler::new(None, dir.path().to_path_buf(), None);
        let err = prepare(&mut handler, false).unwrap_err();
        assert!(err.to_string().contains("bare"));
    }

    #[test]
    fn clone_refuses_non_empty_target() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("existing.txt"), "x").unwrap();
        let mut handler = RepoHandler::new(
            Some("https://example.invalid/repo.git".to_string()),
            dir.path().to_path_buf(),
            None,
        );
        let err = prepare(&mut handler, false).unwrap_err();
        assert!(matches!(err, AppError::Acquisition(ref msg) if msg.contains("not empty")));
    }

    #[test]
    fn clones_local_repository() {
        let source = tempdir().unwrap();
        let repo = init_repo(source.path());
        commit_file(&repo, "hello.txt", "hi");

        let dest = tempdir().unwrap();
        let target = dest.path().join("nested/clone");
        let url = source.path().to_string_lossy().into_owned();
        let mut handler = RepoHandler::new(Some(url), target.clone(), None);
        let root = prepare(&mut handler, false).unwrap();
        assert_eq!(root, target);
        assert_eq!(fs::read_to_string(target.join("hello.txt")).unwrap(), "hi");
        let info = handler.repo_info();
        assert_eq!(info.branch, "main");
        assert_eq!(info.remotes, vec!["origin".to_string()]);
    }
}
