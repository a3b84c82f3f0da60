use crate::config::AppConfig;
use glob::Pattern;
use std::fs::{self, FileType};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, trace};

#[derive(Debug, Clone, Default)]
pub struct TraverseOptions {
    /// Directory names (filesystem artifacts) never entered.
    pub skip_dir_names: Vec<String>,
    pub ignore_patterns: Vec<Pattern>,
    /// Absolute paths never entered, e.g. a destination nested in the source.
    pub exclude: Vec<PathBuf>,
}

impl TraverseOptions {
    pub fn new(skip_dir_names: &[String], ignore_globs: &[String]) -> Self {
        let ignore_patterns = ignore_globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();

        Self {
            skip_dir_names: skip_dir_names.to_vec(),
            ignore_patterns,
            exclude: Vec::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.skip_dir_names, &config.ignore_patterns)
    }

    pub fn with_exclude(mut self, path: PathBuf) -> Self {
        self.exclude.push(path);
        self
    }

    fn is_ignored(&self, path: &Path) -> bool {
        self.ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(path))
    }

    fn should_descend(&self, dir: &Path) -> bool {
        let skipped_name = dir
            .file_name()
            .map(|name| {
                let name = name.to_string_lossy();
                self.skip_dir_names.iter().any(|skip| *skip == name)
            })
            .unwrap_or(false);

        !skipped_name && !self.exclude.iter().any(|ex| ex == dir) && !self.is_ignored(dir)
    }
}

/// A subtree or entry that could not be read. Its siblings are unaffected.
#[derive(Debug, Clone)]
pub struct TraverseFailure {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct Traversal {
    pub files: Vec<PathBuf>,
    pub failures: Vec<TraverseFailure>,
}

/// Depth-first walk using an explicit stack of pending directories.
/// Entries are visited in name order so repeated runs list files
/// identically. Symlinks are never followed.
pub fn traverse(root: &Path, options: &TraverseOptions) -> Traversal {
    let mut traversal = Traversal::default();
    let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let children = match read_children(&dir, &mut traversal.failures) {
            Ok(children) => children,
            Err(err) => {
                error!("Error reading directory {}: {}", dir.display(), err);
                traversal.failures.push(TraverseFailure {
                    path: dir,
                    message: err.to_string(),
                });
                continue;
            }
        };

        let mut subdirs: Vec<PathBuf> = Vec::new();
        for (path, file_type) in children {
            if file_type.is_symlink() {
                trace!("Skipping symlink {}", path.display());
            } else if file_type.is_dir() {
                if options.should_descend(&path) {
                    subdirs.push(path);
                } else {
                    trace!("Skipping directory {}", path.display());
                }
            } else if file_type.is_file() && !options.is_ignored(&path) {
                traversal.files.push(path);
            }
        }

        // Reversed so the first subdirectory by name is popped next.
        pending.extend(subdirs.into_iter().rev());
    }

    traversal
}

fn read_children(
    dir: &Path,
    failures: &mut Vec<TraverseFailure>,
) -> io::Result<Vec<(PathBuf, FileType)>> {
    let mut children = Vec::new();

    for entry_result in fs::read_dir(dir)? {
        let child = entry_result.and_then(|entry| {
            let file_type = entry.file_type()?;
            Ok((entry.path(), file_type))
        });
        match child {
            Ok(child) => children.push(child),
            Err(err) => {
                error!("Error reading entry in directory {}: {}", dir.display(), err);
                failures.push(TraverseFailure {
                    path: dir.to_path_buf(),
                    message: err.to_string(),
                });
            }
        }
    }

    children.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().into_owned())
            .collect()
    }

    fn make_tree(root: &Path) {
        fs::create_dir_all(root.join("b/deep/deeper")).unwrap();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::create_dir_all(root.join("lost+found")).unwrap();
        fs::write(root.join("top.jpg"), "t").unwrap();
        fs::write(root.join("a/one.jpg"), "1").unwrap();
        fs::write(root.join("a/two.png"), "2").unwrap();
        fs::write(root.join("b/three.mov"), "3").unwrap();
        fs::write(root.join("b/deep/deeper/four.jpg"), "4").unwrap();
        fs::write(root.join("lost+found/orphan.jpg"), "x").unwrap();
    }

    #[test]
    fn test_traverse_is_recursive_and_ordered() {
        let tmp = tempdir().unwrap();
        make_tree(tmp.path());
        let options = TraverseOptions::new(&["lost+found".to_string()], &[]);

        let traversal = traverse(tmp.path(), &options);
        assert!(traversal.failures.is_empty());
        assert_eq!(
            names(tmp.path(), &traversal.files),
            vec!["top.jpg", "a/one.jpg", "a/two.png", "b/three.mov", "b/deep/deeper/four.jpg"]
        );

        // Same tree, same order.
        let again = traverse(tmp.path(), &options);
        assert_eq!(traversal.files, again.files);
    }

    #[test]
    fn test_artifact_directories_not_entered_by_default_options_only() {
        let tmp = tempdir().unwrap();
        make_tree(tmp.path());

        let all = traverse(tmp.path(), &TraverseOptions::default());
        assert_eq!(all.files.len(), 6);

        let config = AppConfig::default();
        let filtered = traverse(tmp.path(), &TraverseOptions::from_config(&config));
        assert_eq!(filtered.files.len(), 5);
        assert!(!filtered
            .files
            .iter()
            .any(|p| p.to_string_lossy().contains("lost+found")));
    }

    #[test]
    fn test_ignore_patterns_and_exclude() {
        let tmp = tempdir().unwrap();
        make_tree(tmp.path());
        let options = TraverseOptions::new(&[], &["**/*.png".to_string(), "[".to_string()])
            .with_exclude(tmp.path().join("b"));

        let traversal = traverse(tmp.path(), &options);
        assert_eq!(
            names(tmp.path(), &traversal.files),
            vec!["top.jpg", "a/one.jpg", "lost+found/orphan.jpg"]
        );
    }

    #[test]
    fn test_missing_root_is_partial_failure() {
        let tmp = tempdir().unwrap();
        let traversal = traverse(&tmp.path().join("gone"), &TraverseOptions::default());
        assert!(traversal.files.is_empty());
        assert_eq!(traversal.failures.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_not_followed() {
        let tmp = tempdir().unwrap();
        make_tree(tmp.path());
        // Cycle back to the root and a link to a file.
        std::os::unix::fs::symlink(tmp.path(), tmp.path().join("a/loop")).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("top.jpg"), tmp.path().join("a/link.jpg"))
            .unwrap();

        let traversal = traverse(tmp.path(), &TraverseOptions::default());
        assert_eq!(traversal.files.len(), 6);
        assert!(traversal.failures.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_does_not_abort() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempdir().unwrap();
        make_tree(tmp.path());
        let locked = tmp.path().join("b/deep");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        // Privileged users can still list the directory.
        let enforced = fs::read_dir(&locked).is_err();

        let traversal = traverse(tmp.path(), &TraverseOptions::default());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let found = names(tmp.path(), &traversal.files);
        for expected in ["top.jpg", "a/one.jpg", "a/two.png", "b/three.mov", "lost+found/orphan.jpg"] {
            assert!(found.contains(&expected.to_string()), "missing {}", expected);
        }
        if enforced {
            assert_eq!(traversal.failures.len(), 1);
            assert_eq!(traversal.failures[0].path, locked);
            assert!(!found.contains(&"b/deep/deeper/four.jpg".to_string()));
        }
    }
}
