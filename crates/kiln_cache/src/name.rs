//! Cache-name derivation from kernel source paths.

use std::path::Path;

/// Derives the cache name for a kernel source file.
///
/// Strips the directory and the last extension: `kernels/blur.cl` becomes
/// `blur`, `shader.tar.cl` becomes `shader.tar`. Returns `None` if the path
/// has no file name.
pub fn cache_name_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.to_string())
}

/// Returns `true` if `name` can be used as a file stem inside the cache
/// directory without escaping it.
pub fn is_valid_cache_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}
