use crate::reader::FileContent;
use crate::walker::FileEntry;
use byte_unit::{Byte, UnitType};
use indexmap::IndexMap;
use log;
use serde::Serialize;

/// Running counters over every selected file. Consumed by [`finalize`],
/// so a snapshot can be produced exactly once.
///
/// [`finalize`]: StatsAggregator::finalize
#[derive(Debug, Default)]
pub struct StatsAggregator {
    total_files: usize,
    text_files: usize,
    total_size_bytes: u64,
    file_types: IndexMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub total_files: usize,
    pub text_files: usize,
    pub binary_files: usize,
    pub total_size_bytes: u64,
    pub text_files_percentage: f64,
    pub file_types: IndexMap<String, usize>,
    pub branch: String,
    pub repo_size_human: String,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, entry: &FileEntry, content: &FileContent) {
        self.total_files += 1;
        if content.is_embedded() {
            self.text_files += 1;
        }
        self.total_size_bytes = self.total_size_bytes.saturating_add(entry.size_bytes);
        *self.file_types.entry(entry.extension.clone()).or_insert(0) += 1;
    }

    pub fn finalize(self, branch: impl Into<String>) -> StatsSnapshot {
        let text_files_percentage = if self.total_files == 0 {
            0.0
        } else {
            let ratio = self.text_files as f64 / self.total_files as f64;
            (ratio * 1000.0).round() / 10.0
        };
        let repo_size_human = human_size(self.total_size_bytes);
        log::debug!(
            "Statistics: {} files ({} text), {}",
            self.total_files,
            self.text_files,
            repo_size_human
        );
        StatsSnapshot {
            total_files: self.total_files,
            text_files: self.text_files,
            binary_files: self.total_files - self.text_files,
            total_size_bytes: self.total_size_bytes,
            text_files_percentage,
            file_types: self.file_types,
            branch: branch.into(),
            repo_size_human,
        }
    }
}

impl StatsSnapshot {
    /// The `n` most frequent extensions; ties keep first-seen order.
    pub fn top_file_types(&self, n: usize) -> Vec<(&str, usize)> {
        let mut types: Vec<(&str, usize)> = self
            .file_types
            .iter()
            .map(|(ext, count)| (ext.as_str(), *count))
            .collect();
        types.sort_by(|a, b| b.1.cmp(&a.1));
        types.truncate(n);
        types
    }
}

pub fn human_size(bytes: u64) -> String {
    Byte::from_u64(bytes)
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::SkipReason;
    use std::path::PathBuf;

    fn entry(path: &str, size: u64) -> FileEntry {
        FileEntry::new(PathBuf::from(path), PathBuf::from("/tmp").join(path), size)
    }

    fn text() -> FileContent {
        FileContent::Embedded("x".to_string())
    }

    #[test]
    fn counts_every_entry_and_splits_text_from_binary() {
        let mut agg = StatsAggregator::new();
        agg.process(&entry("a.rs", 100), &text());
        agg.process(&entry("logo.PNG", 2048), &FileContent::NotEmbedded(SkipReason::Binary));
        agg.process(&entry("big.rs", 5000), &FileContent::NotEmbedded(SkipReason::Oversized));
        agg.process(&entry("Makefile", 10), &text());

        let snap = agg.finalize("main");
        assert_eq!(snap.total_files, 4);
        assert_eq!(snap.text_files, 2);
        assert_eq!(snap.binary_files, 2);
        assert_eq!(snap.total_files, snap.text_files + snap.binary_files);
        assert_eq!(snap.total_size_bytes, 7158);
        assert_eq!(snap.text_files_percentage, 50.0);
        assert_eq!(snap.branch, "main");
    }

    #[test]
    fn extension_counts_keep_first_seen_order() {
        let mut agg = StatsAggregator::new();
        for path in ["z.toml", "a.rs", "b.rs", "README", "c.toml"] {
            agg.process(&entry(path, 1), &text());
        }
        let snap = agg.finalize("main");
        let keys: Vec<&str> = snap.file_types.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["toml", "rs", "unknown"]);
        assert_eq!(snap.file_types["rs"], 2);
        assert_eq!(snap.top_file_types(2), vec![("toml", 2), ("rs", 2)]);
    }

    #[test]
    fn percentage_is_rounded_to_one_decimal() {
        let mut agg = StatsAggregator::new();
        agg.process(&entry("a.rs", 1), &text());
        agg.process(&entry("b.bin", 1), &FileContent::NotEmbedded(SkipReason::Binary));
        agg.process(&entry("c.bin", 1), &FileContent::NotEmbedded(SkipReason::Binary));
        assert_eq!(agg.finalize("dev").text_files_percentage, 33.3);
    }

    #[test]
    fn empty_run_has_zero_everything() {
        let snap = StatsAggregator::new().finalize("unknown");
        assert_eq!(snap.total_files, 0);
        assert_eq!(snap.binary_files, 0);
        assert_eq!(snap.text_files_percentage, 0.0);
        assert!(snap.file_types.is_empty());
    }

    #[test]
    fn human_size_uses_binary_units() {
        assert!(human_size(2048).contains("KiB"));
        assert!(human_size(10).ends_with('B'));
    }
}
