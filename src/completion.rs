//! Completion candidates for the line editor.
//!
//! A prefix matches builtin names and executable files from the search
//! path directories. Candidates are de-duplicated by name and kept in
//! lexicographic order, so the editor can print them directly and compute
//! a stable longest common prefix.

use crate::builtin;
use crate::external::is_executable;
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

/// Resolves command-name prefixes against the builtin table and the
/// executable search path captured at startup.
pub struct CompletionEngine {
    search_dirs: Vec<PathBuf>,
}

impl CompletionEngine {
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }

    /// All command names starting with `prefix`: builtins plus executable
    /// files found in the search directories, sorted and de-duplicated.
    pub fn candidates(&self, prefix: &str) -> Vec<String> {
        let mut names = BTreeSet::new();

        for name in builtin::NAMES {
            if name.starts_with(prefix) {
                names.insert(name.to_string());
            }
        }

        for dir in &self.search_dirs {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let file_name = entry.file_name();
                let Some(name) = file_name.to_str() else {
                    continue;
                };
                if name.starts_with(prefix) && is_executable(&entry.path()) {
                    names.insert(name.to_string());
                }
            }
        }

        names.into_iter().collect()
    }
}

/// The longest string that prefixes every candidate. Empty input yields the
/// empty string.
pub fn longest_common_prefix(candidates: &[String]) -> String {
    let Some(first) = candidates.first() else {
        return String::new();
    };

    let mut len = first.len();
    for other in &candidates[1..] {
        let common = first
            .as_bytes()
            .iter()
            .zip(other.as_bytes())
            .take_while(|(a, b)| a == b)
            .count();
        len = len.min(common);
    }
    while !first.is_char_boundary(len) {
        len -= 1;
    }
    first[..len].to_string()
}
