//! Golden-text helpers for markup verification.
//!
//! Compares rendered output against files committed under the crate's
//! `golden/` directory. Run with `UPDATE_GOLDEN=1` to rewrite the files
//! from actual output.

use std::fs;
use std::path::{Path, PathBuf};

/// A golden test that compares text output against expected files.
pub struct GoldenText {
    name: String,
    golden_dir: PathBuf,
    update_mode: bool,
}

impl GoldenText {
    /// Creates a golden test with an explicit directory.
    pub fn new(name: impl Into<String>, golden_dir: impl AsRef<Path>) -> Self {
        Self {
            name: name.into(),
            golden_dir: golden_dir.as_ref().to_path_buf(),
            update_mode: std::env::var("UPDATE_GOLDEN").is_ok(),
        }
    }

    /// Creates a golden test using this crate's `golden/` directory.
    pub fn with_default_dir(name: impl Into<String>) -> Self {
        let golden_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("golden");
        Self::new(name, golden_dir)
    }

    /// Asserts that `actual` matches the golden file `<name>.<suffix>.txt`.
    ///
    /// Comparison ignores a trailing newline on either side, so the files
    /// can be edited with ordinary tools.
    ///
    /// # Panics
    ///
    /// Panics with both texts when they differ, or when the golden file is
    /// missing (run with `UPDATE_GOLDEN=1` to create it).
    pub fn assert_text(&self, suffix: &str, actual: &str) {
        let path = self.file_path(suffix);

        if self.update_mode {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("create golden directory");
            }
            fs::write(&path, actual).expect("write golden file");
            return;
        }

        let expected = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => panic!(
                "Golden file not found: {path:?}\n\
                 Run with UPDATE_GOLDEN=1 to create it.\n\
                 Actual:\n{actual}"
            ),
        };

        let expected_trimmed = expected.trim_end_matches('\n');
        let actual_trimmed = actual.trim_end_matches('\n');
        assert_eq!(
            expected_trimmed, actual_trimmed,
            "Golden test '{}' failed for '{suffix}'.\n\
             Run with UPDATE_GOLDEN=1 to update.",
            self.name
        );
    }

    fn file_path(&self, suffix: &str) -> PathBuf {
        self.golden_dir.join(format!("{}.{suffix}.txt", self.name))
    }
}
