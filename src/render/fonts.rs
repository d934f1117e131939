use std::path::{Path, PathBuf};

/// Resolves the font file used for key-concept overlays from a candidate
/// list, lazily on first use, and memoizes the outcome (including a miss).
/// Owned by the compile step rather than living in process-global state so
/// repeated runs in one process stay independent.
pub struct FontCache {
    candidates: Vec<PathBuf>,
    resolved: Option<Option<PathBuf>>,
}

impl FontCache {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self {
            candidates,
            resolved: None,
        }
    }

    pub fn resolve(&mut self) -> Option<&Path> {
        if self.resolved.is_none() {
            let found = self
                .candidates
                .iter()
                .find(|candidate| candidate.is_file())
                .cloned();
            self.resolved = Some(found);
        }
        self.resolved
            .as_ref()
            .and_then(|found| found.as_deref())
    }
}
