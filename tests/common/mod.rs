#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// Absolute path helper for mock filesystem layouts.
pub fn p(path: &str) -> PathBuf {
    Path::new(path).to_path_buf()
}

pub fn modes(m: &[&str]) -> Vec<String> {
    m.iter().map(|s| s.to_string()).collect()
}
