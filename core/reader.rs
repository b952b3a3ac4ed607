//! Per-file content loading: size cap, binary detection and text decoding.

use crate::reporter::{Reporter, SelectionWarning, WarningKind};
use crate::walker::FileEntry;
use chardetng::EncodingDetector;
use encoding_rs::UTF_8;
use log;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io;

const SNIFF_LEN: usize = 8 * 1024;
const MAX_CONTROL_RATIO: f64 = 0.30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Oversized,
    Binary,
    Unreadable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SkipReason::Oversized => "file exceeds the size limit",
            SkipReason::Binary => "binary or undecodable content",
            SkipReason::Unreadable => "file could not be read",
        };
        f.write_str(label)
    }
}

/// A selected file is either embedded as text or listed without its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Embedded(String),
    NotEmbedded(SkipReason),
}

impl FileContent {
    pub fn text(&self) -> Option<&str> {
        match self {
            FileContent::Embedded(text) => Some(text),
            FileContent::NotEmbedded(_) => None,
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, FileContent::Embedded(_))
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            FileContent::Embedded(_) => None,
            FileContent::NotEmbedded(reason) => Some(*reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub entry: FileEntry,
    pub content: FileContent,
}

/// Holds no per-call state, so one reader can serve many threads.
#[derive(Debug, Clone, Copy)]
pub struct ContentReader {
    max_file_size_bytes: u64,
}

impl ContentReader {
    pub fn new(max_file_size_bytes: u64) -> Self {
        Self {
            max_file_size_bytes,
        }
    }

    pub fn read(&self, entry: &FileEntry, reporter: &dyn Reporter) -> FileContent {
        if entry.size_bytes > self.max_file_size_bytes {
            reporter.on_warning(&SelectionWarning::new(
                &entry.relative_path,
                WarningKind::Oversized,
                format!(
                    "{} bytes exceeds limit of {} bytes, not embedded",
                    entry.size_bytes, self.max_file_size_bytes
                ),
            ));
            return FileContent::NotEmbedded(SkipReason::Oversized);
        }

        let bytes = match fs::read(&entry.absolute_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                let kind = if e.kind() == io::ErrorKind::PermissionDenied {
                    WarningKind::PermissionDenied
                } else {
                    WarningKind::Unreadable
                };
                reporter.on_warning(&SelectionWarning::new(
                    &entry.relative_path,
                    kind,
                    format!("could not read file: {}", e),
                ));
                return FileContent::NotEmbedded(SkipReason::Unreadable);
            }
        };

        match decode_text(&bytes) {
            Some(text) => {
                log::trace!(
                    "Read {} ({} bytes)",
                    entry.relative_path.display(),
                    bytes.len()
                );
                FileContent::Embedded(text)
            }
            None => {
                reporter.on_warning(&SelectionWarning::new(
                    &entry.relative_path,
                    WarningKind::Binary,
                    "binary content, not embedded",
                ));
                FileContent::NotEmbedded(SkipReason::Binary)
            }
        }
    }
}

/// Returns the decoded text, or `None` when the bytes look binary.
fn decode_text(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return Some(String::new());
    }
    let sniff = &bytes[..bytes.len().min(SNIFF_LEN)];
    if sniff.contains(&0) {
        return None;
    }

    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let mut detector = EncodingDetector::new();
            detector.feed(bytes, true);
            let (encoding, confident) = detector.guess_assess(None, true);
            if !confident || encoding == UTF_8 {
                log::trace!("Encoding guess {} rejected", encoding.name());
                return None;
            }
            log::trace!("Decoding with detected encoding {}", encoding.name());
            encoding
                .decode_without_bom_handling_and_without_replacement(bytes)?
                .into_owned()
        }
    };

    if looks_binary(&text) { None } else { Some(text) }
}

fn looks_binary(text: &str) -> bool {
    let mut total = 0usize;
    let mut control = 0usize;
    for c in text.chars() {
        total += 1;
        if c.is_control() && !matches!(c, '\n' | '\r' | '\t' | '\x0c') {
            control += 1;
        }
    }
    total > 0 && (control as f64 / total as f64) > MAX_CONTROL_RATIO
}
