//! Directory traversal for snapshot selection.

use crate::filters::SelectionRules;
use std::path::{Path, PathBuf};
use stowage_core::{Error, Result};
use tracing::debug;
use walkdir::WalkDir;

/// A file chosen for a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// Absolute path on disk
    pub path: PathBuf,

    /// Path relative to the target root
    pub relative: PathBuf,
}

impl SelectedFile {
    /// Root-relative path with `/` separators, for display. Names that are
    /// not valid UTF-8 are shown lossily.
    pub fn archive_name(&self) -> String {
        self.relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Raw bytes of the root-relative path with `/` separators, as fed to the
    /// fingerprint.
    pub fn name_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for (i, component) in self.relative.components().enumerate() {
            if i > 0 {
                bytes.push(b'/');
            }
            bytes.extend_from_slice(component.as_os_str().as_encoded_bytes());
        }
        bytes
    }
}

/// Walks `root` and returns the selected regular files sorted by relative path.
///
/// Symbolic links are neither followed nor returned. A missing root or any
/// unreadable entry aborts the walk.
pub fn walk(root: &Path, rules: &SelectionRules) -> Result<Vec<SelectedFile>> {
    let metadata = std::fs::metadata(root).map_err(|e| Error::traversal(root.display(), e))?;
    if !metadata.is_dir() {
        return Err(Error::traversal(root.display(), "not a directory"));
    }

    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            match e.path().strip_prefix(root) {
                Ok(rel) => !rules.is_pruned(rel),
                Err(_) => true,
            }
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| root.display().to_string());
            Error::traversal(path, e)
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| Error::traversal(entry.path().display(), e))?
            .to_path_buf();

        if rules.is_selected(&relative) {
            files.push(SelectedFile {
                path: entry.path().to_path_buf(),
                relative,
            });
        }
    }

    // Component-wise order; the fingerprint depends on it.
    files.sort_by(|a, b| a.relative.cmp(&b.relative));

    debug!("Selected {} files under {}", files.len(), root.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let base = temp.path();
        fs::create_dir_all(base.join("src/nested")).unwrap();
        fs::create_dir_all(base.join("node_modules/pkg")).unwrap();
        fs::write(base.join("README.md"), "readme").unwrap();
        fs::write(base.join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(base.join("src/nested/lib.rs"), "").unwrap();
        fs::write(base.join("src/a-b.rs"), "dash").unwrap();
        fs::write(base.join("node_modules/pkg/index.js"), "js").unwrap();
        temp
    }

    fn names(files: &[SelectedFile]) -> Vec<String> {
        files.iter().map(|f| f.archive_name()).collect()
    }

    #[test]
    fn test_walk_is_sorted_and_files_only() {
        let temp = create_tree();
        let files = walk(temp.path(), &SelectionRules::all()).unwrap();

        assert_eq!(
            names(&files),
            vec![
                "README.md",
                "node_modules/pkg/index.js",
                "src/a-b.rs",
                "src/main.rs",
                "src/nested/lib.rs",
            ]
        );
        assert!(files.iter().all(|f| f.path.starts_with(temp.path())));
    }

    #[test]
    fn test_walk_applies_rules() {
        let temp = create_tree();
        let rules = SelectionRules::new(
            &["src/".to_string(), "*.md".to_string()],
            &["node_modules/".to_string(), "src/nested/".to_string()],
        )
        .unwrap();

        let files = walk(temp.path(), &rules).unwrap();
        assert_eq!(names(&files), vec!["README.md", "src/a-b.rs", "src/main.rs"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_skipped() {
        let temp = create_tree();
        std::os::unix::fs::symlink(temp.path().join("README.md"), temp.path().join("link.md"))
            .unwrap();
        std::os::unix::fs::symlink(temp.path().join("src"), temp.path().join("src-link"))
            .unwrap();

        let files = walk(temp.path(), &SelectionRules::all()).unwrap();
        let names = names(&files);
        assert!(!names.contains(&"link.md".to_string()));
        assert!(!names.iter().any(|n| n.starts_with("src-link")));
    }

    #[test]
    fn test_name_bytes_use_forward_slashes() {
        let file = SelectedFile {
            path: PathBuf::from("/root/src/nested/lib.rs"),
            relative: Path::new("src").join("nested").join("lib.rs"),
        };
        assert_eq!(file.name_bytes(), b"src/nested/lib.rs");
    }

    #[test]
    fn test_missing_root_is_traversal_error() {
        let temp = TempDir::new().unwrap();
        let err = walk(&temp.path().join("absent"), &SelectionRules::all()).unwrap_err();
        assert!(matches!(err, Error::Traversal { .. }));
    }
}
