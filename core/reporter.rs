//! Progress and warning reporting, plus cooperative cancellation.
//!
//! The pipeline never prints. Callers pass a [`Reporter`] that decides how
//! progress and recovered failures are surfaced.

use crate::error::{AppError, Result};
use log;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Acquire,
    Walk,
    Read,
    Stats,
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Acquire => "Preparing repository",
            Stage::Walk => "Analyzing files",
            Stage::Read => "Reading files",
            Stage::Stats => "Collecting statistics",
            Stage::Render => "Generating documentation",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    Unreadable,
    PermissionDenied,
    Oversized,
    Binary,
    SymlinkOutsideRoot,
    BrokenSymlink,
    WalkError,
}

/// A recovered, non-fatal problem with a single path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionWarning {
    pub path: PathBuf,
    pub kind: WarningKind,
    pub message: String,
}

impl SelectionWarning {
    pub fn new(path: impl Into<PathBuf>, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for SelectionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Implementations must be shareable across the reader threads.
pub trait Reporter: Send + Sync {
    fn on_progress(&self, stage: Stage, done: usize, total: Option<usize>);
    fn on_warning(&self, warning: &SelectionWarning);
}

/// Forwards everything to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn on_progress(&self, stage: Stage, done: usize, total: Option<usize>) {
        match total {
            Some(total) => log::debug!("{}: {}/{}", stage, done, total),
            None => log::debug!("{}: {}", stage, done),
        }
    }

    fn on_warning(&self, warning: &SelectionWarning) {
        log::warn!("{}", warning);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn on_progress(&self, _stage: Stage, _done: usize, _total: Option<usize>) {}
    fn on_warning(&self, _warning: &SelectionWarning) {}
}

/// Shared cancellation flag with an optional deadline. Clones observe the
/// same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn check(&self) -> Result<()> {
        if self.flag.load(Ordering::SeqCst) {
            return Err(AppError::Cancelled("cancelled by caller".to_string()));
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(AppError::Cancelled("timeout exceeded".to_string()));
        }
        Ok(())
    }
}
