//! Timestamp-based staleness checks. Filesystem errors count as "does not
//! exist", which biases toward rebuilding.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use crate::rule::Rule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Missing,
    Directory,
    File(SystemTime),
}

impl FileState {
    pub fn of(path: impl AsRef<Path>) -> Self {
        match fs::metadata(path.as_ref()) {
            Err(_) => FileState::Missing,
            Ok(meta) if meta.is_dir() => FileState::Directory,
            Ok(meta) => meta
                .modified()
                .map(FileState::File)
                .unwrap_or(FileState::Missing),
        }
    }

    pub fn exists(&self) -> bool {
        !matches!(self, FileState::Missing)
    }
}

/// Whether `target` must be rebuilt from `deps`.
///
/// A missing target is always stale. An existing directory never is. A file
/// target is stale when any non-directory dependency is missing or strictly
/// newer.
pub fn needs_rebuild<P, D>(target: P, deps: &[D]) -> bool
where
    P: AsRef<Path>,
    D: AsRef<Path>,
{
    let built = match FileState::of(target) {
        FileState::Missing => return true,
        FileState::Directory => return false,
        FileState::File(mtime) => mtime,
    };

    deps.iter().any(|dep| match FileState::of(dep) {
        FileState::Missing => true,
        FileState::Directory => false,
        FileState::File(mtime) => mtime > built,
    })
}

pub fn rule_is_stale<D: AsRef<Path>>(rule: &Rule, deps: &[D]) -> bool {
    rule.phony || needs_rebuild(&rule.target, deps)
}


#[cfg(test)]
mod tests {
    use super::test_support::touch_at;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_target_is_stale_regardless_of_deps() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("app");
        let deps: [&Path; 0] = [];
        assert!(needs_rebuild(&target, &deps));

        let src = dir.path().join("main.c");
        touch_at(&src, 0);
        assert!(needs_rebuild(&target, &[&src]));
    }

    #[test]
    fn test_target_newer_than_deps_is_up_to_date() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("main.c");
        let hdr = dir.path().join("main.h");
        let obj = dir.path().join("main.o");
        touch_at(&src, 10);
        touch_at(&hdr, 20);
        touch_at(&obj, 30);

        assert!(!needs_rebuild(&obj, &[&src, &hdr]));
    }

    #[test]
    fn test_newer_dependency_makes_target_stale() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("main.c");
        let obj = dir.path().join("main.o");
        touch_at(&obj, 10);
        touch_at(&src, 11);

        assert!(needs_rebuild(&obj, &[&src]));
    }

    #[test]
    fn test_equal_timestamps_are_up_to_date() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("main.c");
        let obj = dir.path().join("main.o");
        touch_at(&src, 10);
        touch_at(&obj, 10);

        assert!(!needs_rebuild(&obj, &[&src]));
    }

    #[test]
    fn test_missing_dependency_makes_target_stale() {
        let dir = TempDir::new().unwrap();
        let obj = dir.path().join("main.o");
        touch_at(&obj, 10);

        assert!(needs_rebuild(&obj, &[dir.path().join("gone.h")]));
    }

    #[test]
    fn test_existing_directory_target_is_never_stale() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("build");
        fs::create_dir(&out).unwrap();

        assert!(!needs_rebuild(&out, &[dir.path().join("gone.h")]));
    }

    #[test]
    fn test_directory_dependencies_are_ignored() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("build");
        fs::create_dir(&out).unwrap();
        let obj = dir.path().join("main.o");
        touch_at(&obj, 0);

        assert!(!needs_rebuild(&obj, &[&out]));
    }

    #[test]
    fn test_phony_rule_is_always_stale() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("all");
        touch_at(&target, 100);
        let target = target.display().to_string();

        let deps: [&str; 0] = [];
        assert!(!rule_is_stale(&Rule::new(target.as_str()), &deps));
        assert!(rule_is_stale(&Rule::phony(target.as_str()), &deps));
    }
}
