//! File discovery: the glob walk that seeds the file phase.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::{debug, info, instrument};

use crate::config::DiscoverySection;
use crate::contracts::properties;
use crate::error::DiscoveryError;
use crate::types::{GraphNode, NodeKind};

/// Every file under `root` matching an include pattern and no exclude
/// pattern, as `File` nodes sorted by id.
#[instrument(skip_all, name = "discovery", fields(root = %root.display()))]
pub fn discover(root: &Path, section: &DiscoverySection) -> Result<Vec<GraphNode>, DiscoveryError> {
    if !root.is_dir() {
        return Err(DiscoveryError::RootNotFound(root.display().to_string()));
    }
    let excludes = compile(&section.exclude_patterns)?;

    let mut matched: Vec<PathBuf> = Vec::new();
    for pattern in &section.include_patterns {
        let full_pattern = root.join(pattern).to_string_lossy().to_string();
        let paths = glob::glob(&full_pattern).map_err(|e| DiscoveryError::Pattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        for entry in paths.flatten() {
            if entry.is_file() && !is_excluded(&entry, root, &excludes) {
                matched.push(entry);
            }
        }
    }
    matched.sort();
    matched.dedup();

    let mut nodes = Vec::with_capacity(matched.len());
    for path in matched {
        nodes.push(file_node(root, &path)?);
    }
    nodes.sort_by(|a, b| a.id.cmp(&b.id));
    info!(files = nodes.len(), "Discovery complete");
    Ok(nodes)
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>, DiscoveryError> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|e| DiscoveryError::Pattern {
                pattern: p.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

fn is_excluded(path: &Path, root: &Path, excludes: &[Pattern]) -> bool {
    let id = relative_id(root, path);
    let options = MatchOptions {
        require_literal_separator: false,
        ..MatchOptions::default()
    };
    let excluded = excludes.iter().any(|p| p.matches_with(&id, options));
    if excluded {
        debug!(file = %id, "Excluded");
    }
    excluded
}

/// Root-relative path with `/` separators.
pub fn relative_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn file_node(root: &Path, path: &Path) -> Result<GraphNode, DiscoveryError> {
    let id = relative_id(root, path);
    let size = std::fs::metadata(path)?.len();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(GraphNode::new(&id, NodeKind::File)
        .with_property(properties::FILE_PATH, serde_json::json!(id))
        .with_property(properties::FILE_EXTENSION, serde_json::json!(extension))
        .with_property(properties::FILE_SIZE, serde_json::json!(size)))
}
