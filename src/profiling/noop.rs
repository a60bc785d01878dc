//! Profiling compiled out: lifecycle calls do nothing.

use std::path::{Path, PathBuf};

pub fn init() {}

pub fn init_in(_dir: &Path) {}

pub fn shutdown() {}

pub fn current_path() -> Option<PathBuf> {
    None
}
