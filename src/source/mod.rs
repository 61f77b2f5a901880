//! Work item sources: lazy path enumeration with include/exclude filters
//!
//! The runner consumes a source as an opaque iterator of paths and snapshots
//! it on the first step, so path identity stays stable across steps while
//! content is re-read fresh per step.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;

/// A file's path plus its content, as observed at the start of a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub path: PathBuf,
    pub content: String,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid glob pattern '{pattern}'")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// Lazily walks a target root, yielding files that pass the include/exclude
/// globs, stopping after `max_count` matches when one is set.
pub struct FileWalker {
    root: PathBuf,
    inner: walkdir::IntoIter,
    include: Vec<glob::Pattern>,
    exclude: Vec<glob::Pattern>,
    remaining: Option<usize>,
}

impl FileWalker {
    /// Build a walker over `root`. An empty include list matches everything.
    pub fn new(
        root: impl Into<PathBuf>,
        include: &[String],
        exclude: &[String],
        max_count: Option<usize>,
    ) -> Result<Self, SourceError> {
        let root = root.into();
        Ok(Self {
            inner: WalkDir::new(&root).into_iter(),
            include: compile_patterns(include)?,
            exclude: compile_patterns(exclude)?,
            remaining: max_count,
            root,
        })
    }

    fn matches(&self, path: &Path) -> bool {
        // Patterns match the path relative to the walk root
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        if !self.include.is_empty() && !self.include.iter().any(|p| p.matches_path(rel)) {
            return false;
        }
        !self.exclude.iter().any(|p| p.matches_path(rel))
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<glob::Pattern>, SourceError> {
    patterns
        .iter()
        .map(|pattern| {
            glob::Pattern::new(pattern).map_err(|source| SourceError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

impl Iterator for FileWalker {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        if self.remaining == Some(0) {
            return None;
        }
        loop {
            let entry = match self.inner.next() {
                Some(Ok(entry)) => entry,
                Some(Err(err)) => {
                    warn!("skipping unreadable entry: {err}");
                    continue;
                }
                None => return None,
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            if self.matches(&path) {
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                return Some(path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tree(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "x").unwrap();
        }
        dir
    }

    fn walk(dir: &tempfile::TempDir, walker: FileWalker) -> Vec<String> {
        let mut names: Vec<String> = walker
            .map(|p| {
                p.strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        names
    }

    #[test]
    fn include_and_exclude_filters_apply() {
        let dir = tree(&["src/a.rs", "src/b.txt", "vendor/c.rs"]);
        let walker = FileWalker::new(
            dir.path(),
            &["**/*.rs".to_string()],
            &["vendor/**".to_string()],
            None,
        )
        .unwrap();
        assert_eq!(walk(&dir, walker), vec!["src/a.rs"]);
    }

    #[test]
    fn max_count_caps_the_sequence() {
        let dir = tree(&["a", "b", "c", "d"]);
        let walker = FileWalker::new(dir.path(), &[], &[], Some(2)).unwrap();
        assert_eq!(walk(&dir, walker).len(), 2);
    }

    #[test]
    fn bad_pattern_is_rejected() {
        let dir = tree(&["a"]);
        let result = FileWalker::new(dir.path(), &["[".to_string()], &[], None);
        assert!(matches!(result, Err(SourceError::InvalidPattern { .. })));
    }
}
