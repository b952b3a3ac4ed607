//! Markdown and JSON documents built from a finished pipeline run.

use crate::config::OutputFormat;
use crate::error::{AppError, Result};
use crate::reader::{FileContent, FileRecord, SkipReason};
use crate::reporter::{Reporter, Stage};
use crate::stats::StatsSnapshot;
use crate::tree::{TreeNode, render_ascii};
use chrono::{DateTime, Local};
use log;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub const GENERATOR_NAME: &str = "reposcribe";

/// Everything a renderer needs, borrowed from the run.
#[derive(Debug, Clone)]
pub struct RenderInput<'a> {
    pub root_path: &'a Path,
    pub project_name: String,
    pub records: &'a [FileRecord],
    pub tree: &'a [TreeNode],
    pub stats: Option<&'a StatsSnapshot>,
    pub generated_at: DateTime<Local>,
}

impl<'a> RenderInput<'a> {
    pub fn new(
        root_path: &'a Path,
        records: &'a [FileRecord],
        tree: &'a [TreeNode],
        stats: Option<&'a StatsSnapshot>,
    ) -> Self {
        Self {
            root_path,
            project_name: project_name_of(root_path),
            records,
            tree,
            stats,
            generated_at: Local::now(),
        }
    }
}

fn project_name_of(root: &Path) -> String {
    root.canonicalize()
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .or_else(|| root.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string())
}

pub trait Renderer {
    fn render(&self, input: &RenderInput<'_>) -> Result<String>;
}

pub fn renderer_for(format: OutputFormat) -> Box<dyn Renderer> {
    match format {
        OutputFormat::Markdown => Box::new(MarkdownRenderer),
        OutputFormat::Json => Box::new(JsonRenderer),
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownRenderer;

impl Renderer for MarkdownRenderer {
    fn render(&self, input: &RenderInput<'_>) -> Result<String> {
        log::debug!("Rendering Markdown for {} files", input.records.len());
        let mut out = String::new();
        self.write_document(input, &mut out)
            .map_err(|e| AppError::Render(format!("Failed to assemble Markdown: {}", e)))?;
        Ok(out)
    }
}

impl MarkdownRenderer {
    fn write_document(&self, input: &RenderInput<'_>, out: &mut String) -> std::fmt::Result {
        writeln!(out, "# Project Summary: {}", input.project_name)?;
        writeln!(out)?;
        writeln!(
            out,
            "_Generated by {} on {}_",
            GENERATOR_NAME,
            input.generated_at.format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(out)?;

        if let Some(stats) = input.stats {
            write_stats(stats, out)?;
        }

        writeln!(out, "## Directory Structure")?;
        writeln!(out)?;
        writeln!(out, "```text")?;
        out.push_str(&render_ascii(&input.project_name, input.tree));
        writeln!(out, "```")?;
        writeln!(out)?;

        writeln!(out, "## Files")?;
        for record in input.records {
            writeln!(out)?;
            writeln!(out, "### {}", record.entry.display_path())?;
            writeln!(out)?;
            match &record.content {
                FileContent::Embedded(text) => {
                    let fence = fence_for(text);
                    writeln!(out, "{}{}", fence, language_hint(&record.entry.extension))?;
                    out.push_str(text);
                    if !text.is_empty() && !text.ends_with('\n') {
                        out.push('\n');
                    }
                    writeln!(out, "{}", fence)?;
                }
                FileContent::NotEmbedded(reason) => {
                    writeln!(
                        out,
                        "_Content not embedded: {} ({} bytes)._",
                        reason, record.entry.size_bytes
                    )?;
                }
            }
        }
        Ok(())
    }
}

fn write_stats(stats: &StatsSnapshot, out: &mut String) -> std::fmt::Result {
    writeln!(out, "## Statistics")?;
    writeln!(out)?;
    writeln!(out, "| Metric | Value |")?;
    writeln!(out, "|--------|-------|")?;
    writeln!(out, "| Total files | {} |", stats.total_files)?;
    writeln!(
        out,
        "| Text files | {} ({:.1}%) |",
        stats.text_files, stats.text_files_percentage
    )?;
    writeln!(out, "| Binary or skipped files | {} |", stats.binary_files)?;
    writeln!(out, "| Total size | {} |", stats.repo_size_human)?;
    writeln!(out, "| Branch | {} |", stats.branch)?;
    writeln!(out)?;
    if !stats.file_types.is_empty() {
        writeln!(out, "### File Types")?;
        writeln!(out)?;
        writeln!(out, "| Extension | Count |")?;
        writeln!(out, "|-----------|-------|")?;
        for (ext, count) in &stats.file_types {
            writeln!(out, "| {} | {} |", ext, count)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// A backtick fence longer than any backtick run inside `text`.
fn fence_for(text: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

fn language_hint(extension: &str) -> &str {
    match extension {
        "rs" => "rust",
        "py" => "python",
        "js" | "mjs" | "cjs" => "javascript",
        "ts" => "typescript",
        "tsx" => "tsx",
        "jsx" => "jsx",
        "md" => "markdown",
        "yml" | "yaml" => "yaml",
        "sh" | "bash" => "bash",
        "h" | "c" => "c",
        "hpp" | "cc" | "cpp" | "cxx" => "cpp",
        "rb" => "ruby",
        "kt" => "kotlin",
        "cs" => "csharp",
        "unknown" => "",
        other => other,
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRenderer;

#[derive(Serialize)]
struct JsonDocument<'a> {
    metadata: JsonMetadata,
    project: JsonProject<'a>,
    files: Vec<JsonFile<'a>>,
}

#[derive(Serialize)]
struct JsonMetadata {
    generated_at: String,
    generator: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct JsonProject<'a> {
    name: &'a str,
    readme: Option<&'a str>,
    structure: &'a [TreeNode],
    statistics: Option<&'a StatsSnapshot>,
}

#[derive(Serialize)]
struct JsonFile<'a> {
    path: String,
    #[serde(rename = "type")]
    file_type: &'a str,
    size_bytes: u64,
    embedded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    skipped_reason: Option<SkipReason>,
}

impl Renderer for JsonRenderer {
    fn render(&self, input: &RenderInput<'_>) -> Result<String> {
        log::debug!("Rendering JSON for {} files", input.records.len());
        let document = JsonDocument {
            metadata: JsonMetadata {
                generated_at: input.generated_at.to_rfc3339(),
                generator: GENERATOR_NAME,
                version: env!("CARGO_PKG_VERSION"),
            },
            project: JsonProject {
                name: &input.project_name,
                readme: find_readme(input.records),
                structure: input.tree,
                statistics: input.stats,
            },
            files: input
                .records
                .iter()
                .map(|record| JsonFile {
                    path: record.entry.display_path(),
                    file_type: &record.entry.extension,
                    size_bytes: record.entry.size_bytes,
                    embedded: record.content.is_embedded(),
                    content: record.content.text(),
                    skipped_reason: record.content.skip_reason(),
                })
                .collect(),
        };
        serde_json::to_string_pretty(&document)
            .map_err(|e| AppError::Render(format!("Failed to serialize JSON output: {}", e)))
    }
}

/// Content of the first embedded, non-empty `README.md` (any case).
fn find_readme(records: &[FileRecord]) -> Option<&str> {
    records
        .iter()
        .filter(|r| {
            r.entry
                .relative_path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().eq_ignore_ascii_case("readme.md"))
        })
        .find_map(|r| r.content.text().filter(|t| !t.is_empty()))
}

/// Renders `input` and writes it to `path` atomically. Nothing is written
/// when rendering fails.
pub fn render_to_file(
    renderer: &dyn Renderer,
    input: &RenderInput<'_>,
    path: &Path,
    reporter: &dyn Reporter,
) -> Result<()> {
    reporter.on_progress(Stage::Render, 0, Some(1));
    let document = renderer.render(input)?;
    write_atomic(path, &document)?;
    reporter.on_progress(Stage::Render, 1, Some(1));
    Ok(())
}

/// Replaces `path` in one step: the content goes to a temporary file in the
/// same directory, which is then renamed over the destination.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| AppError::DirCreation {
        path: parent.to_path_buf(),
        source: e,
    })?;

    let write_err = |e: std::io::Error| AppError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    };
    let mut temp = NamedTempFile::new_in(parent).map_err(write_err)?;
    temp.write_all(content.as_bytes()).map_err(write_err)?;
    temp.as_file().sync_all().map_err(write_err)?;
    temp.persist(path).map_err(|e| write_err(e.error))?;
    log::info!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::testing::RecordingReporter;
    use crate::stats::StatsAggregator;
    use crate::walker::FileEntry;
    use serde_json::Value;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn record(path: &str, content: FileContent) -> FileRecord {
        let size = content.text().map_or(4096, |t| t.len() as u64);
        FileRecord {
            entry: FileEntry::new(PathBuf::from(path), PathBuf::from("/demo").join(path), size),
            content,
        }
    }

    fn embedded(text: &str) -> FileContent {
        FileContent::Embedded(text.to_string())
    }

    fn sample_records() -> Vec<FileRecord> {
        vec![
            record("README.md", embedded("# Demo\n")),
            record("src/main.rs", embedded("fn main() {}")),
            record("logo.png", FileContent::NotEmbedded(SkipReason::Binary)),
        ]
    }

    fn input<'a>(
        records: &'a [FileRecord],
        tree: &'a [TreeNode],
        stats: Option<&'a StatsSnapshot>,
    ) -> RenderInput<'a> {
        RenderInput {
            root_path: Path::new("/demo"),
            project_name: "demo".to_string(),
            records,
            tree,
            stats,
            generated_at: Local::now(),
        }
    }

    fn stats_for(records: &[FileRecord]) -> StatsSnapshot {
        let mut agg = StatsAggregator::new();
        for r in records {
            agg.process(&r.entry, &r.content);
        }
        agg.finalize("main")
    }

    #[test]
    fn markdown_lists_embedded_and_skipped_files() {
        let records = sample_records();
        let stats = stats_for(&records);
        let md = MarkdownRenderer
            .render(&input(&records, &[], Some(&stats)))
            .unwrap();
        assert!(md.starts_with("# Project Summary: demo"));
        assert!(md.contains("## Statistics"));
        assert!(md.contains("| Total files | 3 |"));
        assert!(md.contains("### src/main.rs\n\n```rust\nfn main() {}\n```\n"));
        assert!(md.contains("### logo.png\n\n_Content not embedded: binary"));
    }

    #[test]
    fn markdown_without_stats_omits_table() {
        let records = sample_records();
        let md = MarkdownRenderer.render(&input(&records, &[], None)).unwrap();
        assert!(!md.contains("## Statistics"));
        assert!(md.contains("## Directory Structure"));
    }

    #[test]
    fn fence_outgrows_backticks_in_content() {
        assert_eq!(fence_for("plain"), "```");
        assert_eq!(fence_for("use ``` here"), "````");
        assert_eq!(fence_for("`````"), "``````");

        let records = vec![record("doc.md", embedded("```rust\nx\n```\n"))];
        let md = MarkdownRenderer.render(&input(&records, &[], None)).unwrap();
        assert!(md.contains("````markdown\n```rust\nx\n```\n````"));
    }

    #[test]
    fn json_has_expected_shape() {
        let records = sample_records();
        let stats = stats_for(&records);
        let text = JsonRenderer
            .render(&input(&records, &[], Some(&stats)))
            .unwrap();
        let doc: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(doc["metadata"]["generator"], "reposcribe");
        assert_eq!(doc["project"]["readme"], "# Demo\n");
        assert_eq!(doc["project"]["statistics"]["total_files"], 3);
        let files = doc["files"].as_array().unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(files[1]["path"], "src/main.rs");
        assert_eq!(files[1]["type"], "rs");
        assert_eq!(files[1]["embedded"], true);
        assert_eq!(files[2]["embedded"], false);
        assert_eq!(files[2]["skipped_reason"], "binary");
        assert!(files[2].get("content").is_none());
    }

    #[test]
    fn json_readme_lookup_is_case_insensitive_and_keeps_unicode() {
        let records = vec![
            record("docs/readme.MD", embedded("Café ✓")),
            record("README.md", embedded("second")),
        ];
        let text = JsonRenderer.render(&input(&records, &[], None)).unwrap();
        assert!(text.contains("Café ✓"));
        let doc: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["project"]["readme"], "Café ✓");
        assert!(doc["project"]["statistics"].is_null());
    }

    #[test]
    fn renderer_for_picks_format() {
        let records = sample_records();
        let json = renderer_for(OutputFormat::Json)
            .render(&input(&records, &[], None))
            .unwrap();
        assert!(json.trim_start().starts_with('{'));
    }

    #[test]
    fn atomic_write_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/out.md");
        write_atomic(&path, "first").unwrap();
        write_atomic(&path, "second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        let leftovers = fs::read_dir(dir.path().join("nested")).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn render_to_file_reports_render_stage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let records = sample_records();
        let reporter = RecordingReporter::default();
        render_to_file(
            renderer_for(OutputFormat::Json).as_ref(),
            &input(&records, &[], None),
            &path,
            &reporter,
        )
        .unwrap();
        let doc: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["files"].as_array().unwrap().len(), 3);
        assert_eq!(
            *reporter.progress.lock().unwrap(),
            vec![(Stage::Render, 0), (Stage::Render, 1)]
        );
    }

    #[test]
    fn failed_write_leaves_no_artifact() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a dir").unwrap();
        let path = blocker.join("out.md");
        assert!(write_atomic(&path, "content").is_err());
        assert!(!path.exists());
        assert_eq!(fs::read_to_string(&blocker).unwrap(), "not a dir");
    }
}
