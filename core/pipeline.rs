//! One run: select, read, aggregate, build the tree.

use crate::config::EffectiveConfig;
use crate::error::Result;
use crate::reader::{ContentReader, FileRecord};
use crate::reporter::{CancelToken, Reporter, Stage};
use crate::stats::{StatsAggregator, StatsSnapshot};
use crate::tree::{TreeNode, build_tree};
use crate::walker::{FileSelector, Selection};
use log;
use rayon::prelude::*;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub root: PathBuf,
    pub selection: Selection,
    pub records: Vec<FileRecord>,
    pub stats: StatsSnapshot,
    pub tree: Vec<TreeNode>,
}

/// Reads run in parallel; the aggregator sees records one at a time in
/// walk order.
pub fn run(
    config: &EffectiveConfig,
    branch: &str,
    reporter: &dyn Reporter,
    cancel: &CancelToken,
) -> Result<RunOutput> {
    let root = config.target_root().to_path_buf();
    let selection = FileSelector::new(config).collect(&root, reporter, cancel)?;
    cancel.check()?;

    let reader = ContentReader::new(config.max_file_size_bytes());
    let total = selection.files.len();
    log::debug!("Reading {} files", total);
    let records: Vec<FileRecord> = selection
        .files
        .par_iter()
        .map(|entry| FileRecord {
            entry: entry.clone(),
            content: reader.read(entry, reporter),
        })
        .collect();
    reporter.on_progress(Stage::Read, records.len(), Some(total));

    let mut aggregator = StatsAggregator::new();
    for record in &records {
        aggregator.process(&record.entry, &record.content);
    }
    let stats = aggregator.finalize(branch);
    reporter.on_progress(Stage::Stats, stats.total_files, Some(total));

    let tree = build_tree(&selection, config.collapse_empty_dirs())?;
    log::info!(
        "Processed {} files ({} embedded)",
        stats.total_files,
        stats.text_files
    );
    Ok(RunOutput {
        root,
        selection,
        records,
        stats,
        tree,
    })
}
