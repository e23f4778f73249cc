//! Local policy discovery
//!
//! [`WorkspaceLocator`] walks the workspace and returns every file carrying the
//! policy extension, relative to the workspace root. Hidden directories are skipped
//! along with anything matching the configured exclude patterns.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::{CoreError, Result};
use crate::policy::FileRef;

/// Source of local policy file references
pub trait PolicyLocator: Send + Sync {
    fn list_policy_files(&self) -> Result<Vec<FileRef>>;
}

/// Locator returning a fixed list, for tests and explicit file arguments
#[derive(Debug, Clone, Default)]
pub struct StaticLocator {
    files: Vec<FileRef>,
}

impl StaticLocator {
    pub fn new(files: Vec<FileRef>) -> Self {
        Self { files }
    }
}

impl PolicyLocator for StaticLocator {
    fn list_policy_files(&self) -> Result<Vec<FileRef>> {
        Ok(self.files.clone())
    }
}

/// Filesystem locator rooted at a workspace directory
#[derive(Debug)]
pub struct WorkspaceLocator {
    root: PathBuf,
    extension: String,
    exclude: Vec<glob::Pattern>,
}

impl WorkspaceLocator {
    /// Create a locator for `root`
    ///
    /// # Errors
    ///
    /// Returns an error if the root is not a directory or an exclude pattern is invalid.
    pub fn new(root: impl AsRef<Path>, extension: &str, exclude: &[String]) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(CoreError::FileAccess {
                path: root.display().to_string(),
                message: "workspace root is not a directory".to_string(),
            });
        }

        let exclude = exclude
            .iter()
            .map(|p| {
                glob::Pattern::new(p).map_err(|e| CoreError::InvalidPattern {
                    pattern: p.clone(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            root,
            extension: extension.trim_start_matches('.').to_string(),
            exclude,
        })
    }

    fn is_excluded(&self, relative: &Path) -> bool {
        self.exclude.iter().any(|p| p.matches_path(relative))
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy() == self.extension.as_str())
            .unwrap_or(false)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}

impl PolicyLocator for WorkspaceLocator {
    fn list_policy_files(&self) -> Result<Vec<FileRef>> {
        let mut files = Vec::new();

        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if is_hidden(e) {
                    return false;
                }
                match e.path().strip_prefix(&self.root) {
                    Ok(rel) if e.depth() > 0 => !self.is_excluded(rel),
                    _ => true,
                }
            });

        for entry in walker {
            let entry = entry.map_err(|e| CoreError::FileAccess {
                path: e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| self.root.display().to_string()),
                message: e.to_string(),
            })?;

            if !entry.file_type().is_file() || !self.has_extension(entry.path()) {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| entry.path().to_path_buf());
            tracing::debug!("found policy file {}", relative.display());
            files.push(FileRef::file(relative));
        }

        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "package test\n").unwrap();
    }

    fn paths(files: &[FileRef]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.path.to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_finds_rego_files_sorted() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "z.rego");
        touch(temp.path(), "a.rego");
        touch(temp.path(), "policies/b.rego");
        touch(temp.path(), "README.md");
        touch(temp.path(), "policies/b_test.json");

        let locator = WorkspaceLocator::new(temp.path(), "rego", &[]).unwrap();
        let files = locator.list_policy_files().unwrap();

        assert_eq!(paths(&files), vec!["a.rego", "policies/b.rego", "z.rego"]);
        assert!(files.iter().all(FileRef::is_local));
    }

    #[test]
    fn test_skips_hidden_and_excluded_dirs() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), ".git/hooks/x.rego");
        touch(temp.path(), "target/debug/y.rego");
        touch(temp.path(), "vendor/lib.rego");
        touch(temp.path(), "keep.rego");

        let locator = WorkspaceLocator::new(
            temp.path(),
            "rego",
            &["target".to_string(), "vendor/**".to_string()],
        )
        .unwrap();
        let files = locator.list_policy_files().unwrap();

        assert_eq!(paths(&files), vec!["keep.rego"]);
    }

    #[test]
    fn test_extension_with_leading_dot() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a.rego");

        let locator = WorkspaceLocator::new(temp.path(), ".rego", &[]).unwrap();
        assert_eq!(locator.list_policy_files().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_root() {
        let temp = TempDir::new().unwrap();
        let err = WorkspaceLocator::new(temp.path().join("nope"), "rego", &[]).unwrap_err();
        assert!(matches!(err, CoreError::FileAccess { .. }));
    }

    #[test]
    fn test_invalid_exclude_pattern() {
        let temp = TempDir::new().unwrap();
        let err = WorkspaceLocator::new(temp.path(), "rego", &["[".to_string()]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPattern { .. }));
    }

    #[test]
    fn test_static_locator() {
        let locator = StaticLocator::new(vec![FileRef::file("a.rego")]);
        assert_eq!(locator.list_policy_files().unwrap(), vec![FileRef::file("a.rego")]);
    }
}
