//! ORM detection.
//!
//! Detection is a marker-file check per ecosystem: `manage.py` for Django,
//! `schema.prisma` for Prisma. Each call looks afresh.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::SchemaResult;
use crate::model::{OrmConfig, OrmKind};
use crate::workspace::WorkspaceReader;

/// Looks for supported ORMs under a workspace root.
#[derive(Debug, Clone)]
pub struct Detector {
    root: PathBuf,
    prisma_schema: Option<PathBuf>,
}

impl Detector {
    /// Create a detector for a workspace root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            prisma_schema: None,
        }
    }

    /// Use an explicit Prisma schema path instead of searching for one.
    pub fn prisma_schema(mut self, path: impl Into<PathBuf>) -> Self {
        self.prisma_schema = Some(path.into());
        self
    }

    /// Detect every supported ORM present in the workspace.
    ///
    /// Never fails: an ecosystem whose check errors is left out.
    pub fn detect(&self, reader: &dyn WorkspaceReader) -> Vec<OrmConfig> {
        let mut found = Vec::new();

        for kind in OrmKind::ALL {
            let detected = match kind {
                OrmKind::Django => self.detect_django(reader),
                OrmKind::Prisma => self.detect_prisma(reader),
            };

            match detected {
                Ok(Some(config)) => {
                    debug!(kind = %kind, root = ?config.project_root, "detected ORM");
                    found.push(config);
                }
                Ok(None) => debug!(kind = %kind, "ORM not present"),
                Err(e) if e.is_not_found() => debug!(kind = %kind, "ORM not present"),
                Err(e) => debug!(kind = %kind, error = %e, "ORM detection failed, omitting"),
            }
        }

        found
    }

    fn detect_django(&self, reader: &dyn WorkspaceReader) -> SchemaResult<Option<OrmConfig>> {
        let Some(manage) = shallowest(reader.list_files(&self.root, "manage.py")?) else {
            return Ok(None);
        };
        let project_root = manage.parent().unwrap_or(&self.root).to_path_buf();

        let settings = shallowest(reader.list_files(&project_root, "settings.py")?);

        let mut config = OrmConfig::new(OrmKind::Django).with_project_root(project_root);
        config.config_path = settings;
        Ok(Some(config))
    }

    fn detect_prisma(&self, reader: &dyn WorkspaceReader) -> SchemaResult<Option<OrmConfig>> {
        let schema_path = match &self.prisma_schema {
            Some(path) => {
                let path = if path.is_absolute() {
                    path.clone()
                } else {
                    self.root.join(path)
                };
                if !reader.exists(&path) {
                    return Ok(None);
                }
                path
            }
            None => {
                let candidates = reader.list_files(&self.root, "schema.prisma")?;
                let preferred = candidates
                    .iter()
                    .find(|p| parent_name(p) == Some("prisma"))
                    .cloned();
                match preferred.or_else(|| shallowest(candidates)) {
                    Some(path) => path,
                    None => return Ok(None),
                }
            }
        };

        Ok(Some(
            OrmConfig::new(OrmKind::Prisma)
                .with_project_root(prisma_project_root(&schema_path))
                .with_config_path(schema_path),
        ))
    }
}

/// Detect ORMs under `root` with default options.
pub fn detect_orms(reader: &dyn WorkspaceReader, root: &Path) -> Vec<OrmConfig> {
    Detector::new(root).detect(reader)
}

/// The directory a Prisma project is rooted at: the parent of a `prisma/`
/// folder, otherwise the directory holding the schema.
pub fn prisma_project_root(schema_path: &Path) -> PathBuf {
    let schema_dir = schema_path.parent().unwrap_or(Path::new("."));
    if parent_name(schema_path) == Some("prisma") {
        schema_dir.parent().unwrap_or(schema_dir).to_path_buf()
    } else {
        schema_dir.to_path_buf()
    }
}

fn parent_name(path: &Path) -> Option<&str> {
    path.parent()?.file_name()?.to_str()
}

fn shallowest(paths: Vec<PathBuf>) -> Option<PathBuf> {
    paths.into_iter().min_by(|a, b| {
        a.components()
            .count()
            .cmp(&b.components().count())
            .then_with(|| a.cmp(b))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::workspace::FsWorkspace;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_detect_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(detect_orms(&FsWorkspace::new(), dir.path()).is_empty());
    }

    #[test]
    fn test_detect_django() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("backend/shop")).unwrap();
        fs::write(dir.path().join("backend/manage.py"), "").unwrap();
        fs::write(dir.path().join("backend/shop/settings.py"), "").unwrap();

        let found = detect_orms(&FsWorkspace::new(), dir.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, OrmKind::Django);
        assert_eq!(found[0].project_root, Some(dir.path().join("backend")));
        assert_eq!(
            found[0].config_path,
            Some(dir.path().join("backend/shop/settings.py"))
        );
    }

    #[test]
    fn test_detect_both() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("web/prisma")).unwrap();
        fs::write(dir.path().join("manage.py"), "").unwrap();
        fs::write(dir.path().join("web/prisma/schema.prisma"), "").unwrap();

        let found = detect_orms(&FsWorkspace::new(), dir.path());
        let kinds: Vec<_> = found.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![OrmKind::Django, OrmKind::Prisma]);

        let prisma = &found[1];
        assert_eq!(prisma.project_root, Some(dir.path().join("web")));
        assert_eq!(
            prisma.config_path,
            Some(dir.path().join("web/prisma/schema.prisma"))
        );
    }

    #[test]
    fn test_explicit_prisma_schema() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("db")).unwrap();
        fs::write(dir.path().join("db/app.prisma"), "").unwrap();

        let found = Detector::new(dir.path())
            .prisma_schema("db/app.prisma")
            .detect(&FsWorkspace::new());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].project_root, Some(dir.path().join("db")));
    }

    struct BrokenReader;

    impl WorkspaceReader for BrokenReader {
        fn list_files(&self, root: &Path, _pattern: &str) -> SchemaResult<Vec<PathBuf>> {
            Err(SchemaError::io(
                root,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            ))
        }

        fn read_file(&self, path: &Path) -> SchemaResult<String> {
            Err(SchemaError::not_found(path))
        }

        fn exists(&self, _path: &Path) -> bool {
            false
        }
    }

    #[test]
    fn test_detection_errors_are_swallowed() {
        assert!(detect_orms(&BrokenReader, Path::new("/srv")).is_empty());
    }
}
