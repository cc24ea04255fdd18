//! Reading plain domain list files from disk.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info};

/// Parse one domain per line, skipping blanks and `#` comments.
pub fn parse_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            Some(line.to_ascii_lowercase())
        })
        .collect()
}

/// Load every regular file in `dir` as a domain list.
///
/// Subdirectories are ignored. Duplicates across files are kept; the
/// store collapses them.
pub fn load_list_dir(dir: &Path) -> io::Result<Vec<String>> {
    info!(dir = %dir.display(), "Loading block lists");

    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .map(|entry| entry.path())
        .collect();
    paths.sort();

    let mut domains = Vec::new();
    for path in paths {
        let contents = fs::read_to_string(&path)?;
        let parsed = parse_list(&contents);
        debug!(file = %path.display(), domains = parsed.len(), "Loaded list file");
        domains.extend(parsed);
    }

    Ok(domains)
}
