//! Read-only access to the project files the detectors and parsers inspect.

use std::path::{Path, PathBuf};

use crate::error::{SchemaError, SchemaResult};

/// Directories never descended into when listing files.
pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    ".git",
    ".hg",
    "node_modules",
    "__pycache__",
    ".venv",
    "venv",
    "env",
    ".tox",
    "target",
    "dist",
    "build",
];

/// Default directory depth for recursive listings.
pub const DEFAULT_MAX_DEPTH: usize = 6;

/// Source of workspace files.
///
/// Implementations must report a missing path as [`SchemaError::NotFound`]
/// and every other failure as [`SchemaError::IoError`], so detection can
/// treat absence as "not present" instead of as a failure.
pub trait WorkspaceReader: Send + Sync {
    /// Recursively list files under `root` whose file name matches `pattern`.
    ///
    /// Results are sorted by path.
    fn list_files(&self, root: &Path, pattern: &str) -> SchemaResult<Vec<PathBuf>>;

    /// Read a file as UTF-8 text.
    fn read_file(&self, path: &Path) -> SchemaResult<String>;

    /// Whether a path exists.
    fn exists(&self, path: &Path) -> bool;
}

/// [`WorkspaceReader`] over the local filesystem.
#[derive(Debug, Clone)]
pub struct FsWorkspace {
    ignore_dirs: Vec<String>,
    max_depth: usize,
}

impl Default for FsWorkspace {
    fn default() -> Self {
        Self {
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(|s| s.to_string()).collect(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl FsWorkspace {
    /// Create a reader with the default ignore list and depth.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add directories to skip.
    pub fn ignore_dirs(mut self, dirs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.ignore_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Set the maximum depth of recursive listings.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    fn is_ignored(&self, name: &str) -> bool {
        self.ignore_dirs.iter().any(|d| d == name)
    }

    fn walk(&self, dir: &Path, depth: usize, pattern: &str, out: &mut Vec<PathBuf>) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(path = %dir.display(), error = %e, "skipping unreadable directory");
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();

            let Ok(file_type) = entry.file_type() else {
                continue;
            };

            if file_type.is_dir() {
                if depth < self.max_depth && !self.is_ignored(&name) {
                    self.walk(&path, depth + 1, pattern, out);
                }
            } else if matches_pattern(&name, pattern) {
                out.push(path);
            }
        }
    }
}

impl WorkspaceReader for FsWorkspace {
    fn list_files(&self, root: &Path, pattern: &str) -> SchemaResult<Vec<PathBuf>> {
        let metadata = std::fs::metadata(root).map_err(|e| map_io(root, e))?;
        if !metadata.is_dir() {
            return Err(SchemaError::io(
                root,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
            ));
        }

        let mut files = Vec::new();
        self.walk(root, 0, pattern, &mut files);
        files.sort();
        Ok(files)
    }

    fn read_file(&self, path: &Path) -> SchemaResult<String> {
        std::fs::read_to_string(path).map_err(|e| map_io(path, e))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

fn map_io(path: &Path, e: std::io::Error) -> SchemaError {
    if e.kind() == std::io::ErrorKind::NotFound {
        SchemaError::not_found(path)
    } else {
        SchemaError::io(path, e)
    }
}

/// Match a file name against a pattern with an optional leading and/or
/// trailing `*`.
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    if pattern.len() > 1 && pattern.starts_with('*') && pattern.ends_with('*') {
        let middle = &pattern[1..pattern.len() - 1];
        return name.contains(middle);
    }

    if let Some(suffix) = pattern.strip_prefix('*') {
        return name.ends_with(suffix);
    }

    if let Some(prefix) = pattern.strip_suffix('*') {
        return name.starts_with(prefix);
    }

    name == pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_matches_pattern() {
        assert!(matches_pattern("models.py", "models.py"));
        assert!(matches_pattern("0001_initial.py", "*.py"));
        assert!(matches_pattern("schema.prisma", "schema*"));
        assert!(matches_pattern("my_settings_prod.py", "*settings*"));
        assert!(matches_pattern("anything", "*"));
        assert!(!matches_pattern("models.pyc", "*.py"));
    }

    #[test]
    fn test_list_files_sorted_and_ignores() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("shop")).unwrap();
        fs::create_dir_all(dir.path().join("blog")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join("shop/models.py"), "").unwrap();
        fs::write(dir.path().join("blog/models.py"), "").unwrap();
        fs::write(dir.path().join("node_modules/pkg/models.py"), "").unwrap();

        let files = FsWorkspace::new()
            .list_files(dir.path(), "models.py")
            .unwrap();

        assert_eq!(
            files,
            vec![
                dir.path().join("blog/models.py"),
                dir.path().join("shop/models.py"),
            ]
        );
    }

    #[test]
    fn test_max_depth() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a/b/c")).unwrap();
        fs::write(dir.path().join("a/b/c/manage.py"), "").unwrap();

        let shallow = FsWorkspace::new().max_depth(1);
        assert!(shallow.list_files(dir.path(), "manage.py").unwrap().is_empty());

        let deep = FsWorkspace::new();
        assert_eq!(deep.list_files(dir.path(), "manage.py").unwrap().len(), 1);
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = FsWorkspace::new()
            .list_files(&dir.path().join("nope"), "*")
            .unwrap_err();
        assert!(err.is_not_found());

        let err = FsWorkspace::new()
            .read_file(&dir.path().join("missing.py"))
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
