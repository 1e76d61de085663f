use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const ROOTS_FILE: &str = ".tagview_roots.json";

// Repository roots the user has registered, persisted in the home directory.
// Load and save failures are non-fatal; the browser works without them.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SavedRoots {
    roots: Vec<PathBuf>,
}

fn default_file_path() -> Option<PathBuf> {
    #[cfg(windows)]
    let base = std::env::var_os("USERPROFILE");
    #[cfg(not(windows))]
    let base = std::env::var_os("HOME");
    base.map(|base| PathBuf::from(base).join(ROOTS_FILE))
}

impl SavedRoots {
    pub fn load() -> Self {
        match default_file_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(text) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&text) {
            Ok(saved) => saved,
            Err(err) => {
                warn!(path = %path.display(), %err, "ignoring malformed saved-roots file");
                Self::default()
            }
        }
    }

    pub fn save(&self) {
        if let Some(path) = default_file_path() {
            self.save_to(&path);
        }
    }

    pub fn save_to(&self, path: &Path) {
        let Ok(text) = serde_json::to_string_pretty(self) else {
            return;
        };
        if let Err(err) = fs::write(path, text) {
            warn!(path = %path.display(), %err, "failed to write saved roots");
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn contains(&self, root: &Path) -> bool {
        self.roots.iter().any(|p| p == root)
    }

    // Deduplicated, kept sorted for a stable dropdown.
    pub fn add(&mut self, root: PathBuf) -> bool {
        if self.contains(&root) {
            return false;
        }
        self.roots.push(root);
        self.roots.sort();
        true
    }

    pub fn remove(&mut self, root: &Path) -> bool {
        let before = self.roots.len();
        self.roots.retain(|p| p != root);
        self.roots.len() != before
    }
}
