pub mod config;
pub mod error;
pub mod patterns;
pub mod pipeline;
pub mod reader;
pub mod render;
pub mod repo;
pub mod reporter;
pub mod stats;
pub mod tree;
pub mod walker;

pub use config::{
    CliOverrides, ConfigFile, Defaults, EffectiveConfig, OutputFormat, init_config,
    read_ignore_file,
};
pub use error::{AppError, Result};
pub use patterns::PatternSet;
pub use pipeline::{RunOutput, run};
pub use reader::{ContentReader, FileContent, FileRecord, SkipReason};
pub use render::{RenderInput, Renderer, render_to_file, renderer_for, write_atomic};
pub use repo::{RepoHandler, RepoInfo};
pub use reporter::{CancelToken, LogReporter, NullReporter, Reporter, SelectionWarning, Stage, WarningKind};
pub use stats::{StatsAggregator, StatsSnapshot};
pub use tree::TreeNode;
pub use walker::{FileEntry, FileSelector, Selection};
