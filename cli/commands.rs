pub mod init;
pub mod process;

use std::path::PathBuf;

/// Expands `~` and environment variables in a user-supplied path.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            log::warn!("Could not expand path '{}': {}", raw, e);
            PathBuf::from(raw)
        }
    }
}
