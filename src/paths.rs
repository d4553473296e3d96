//! Output filename prediction.

use std::path::{Path, PathBuf};

/// Insert `prefix` and `suffix` around the base filename, keeping the
/// directory and (optionally) the extension.
pub fn presuffix(path: &Path, prefix: &str, suffix: &str, keep_ext: bool) -> PathBuf {
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if keep_ext => format!("{prefix}{stem}{suffix}.{ext}"),
        _ => format!("{prefix}{stem}{suffix}"),
    };
    dir.join(name)
}

/// Prefix every filename, extensions preserved.
pub fn prefixed<P: AsRef<Path>>(paths: &[P], prefix: &str) -> Vec<PathBuf> {
    paths
        .iter()
        .map(|p| presuffix(p.as_ref(), prefix, "", true))
        .collect()
}
