/*
 * Tracks per-document state that used to be scattered globals: whether the
 * tree has unsaved changes and which file it was loaded from or saved to.
 * The dirty flag is a shared handle (`DirtyFlag`) so that tree observers can
 * raise it on structural changes without holding a reference to the whole
 * session.
 */
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Shared handle to the document's "unsaved changes" flag.
#[derive(Clone, Default)]
pub struct DirtyFlag(Rc<Cell<bool>>);

impl DirtyFlag {
    pub fn new() -> Self {
        DirtyFlag(Rc::new(Cell::new(false)))
    }

    pub fn mark(&self) {
        self.0.set(true);
    }

    pub fn clear(&self) {
        self.0.set(false);
    }

    pub fn is_dirty(&self) -> bool {
        self.0.get()
    }
}

pub struct DocumentSession {
    dirty: DirtyFlag,
    current_path: Option<PathBuf>,
}

impl DocumentSession {
    pub fn new() -> Self {
        DocumentSession {
            dirty: DirtyFlag::new(),
            current_path: None,
        }
    }

    /// Handle for tree observers to raise the flag on structural edits.
    pub fn dirty_flag(&self) -> DirtyFlag {
        self.dirty.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty()
    }

    pub fn mark_dirty(&self) {
        self.dirty.mark();
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    /*
     * Records a successful save or load: the document now matches `path` on
     * disk, so the dirty flag is lowered. Failed I/O must not call this.
     */
    pub fn set_saved(&mut self, path: PathBuf) {
        self.current_path = Some(path);
        self.dirty.clear();
    }

    /// Resets to a brand-new, unnamed, unmodified document.
    pub fn reset(&mut self) {
        self.current_path = None;
        self.dirty.clear();
    }
}

impl Default for DocumentSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_dirty_flag_shared_between_handles() {
        let session = DocumentSession::new();
        let handle = session.dirty_flag();
        assert!(!session.is_dirty());
        handle.mark();
        assert!(session.is_dirty());
    }

    #[test]
    fn test_set_saved_records_path_and_clears_dirty() {
        let mut session = DocumentSession::new();
        session.mark_dirty();
        session.set_saved(PathBuf::from("/tmp/snips.json"));
        assert!(!session.is_dirty());
        assert_eq!(session.current_path(), Some(Path::new("/tmp/snips.json")));
    }

    #[test]
    fn test_reset_clears_path_and_dirty() {
        let mut session = DocumentSession::new();
        session.set_saved(PathBuf::from("/tmp/snips.json"));
        session.mark_dirty();
        session.reset();
        assert!(!session.is_dirty());
        assert!(session.current_path().is_none());
    }
}
