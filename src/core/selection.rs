/*
 * Selection tracking and edit-flush logic. When the selection moves from one
 * node to another, the text currently in the edit buffer belongs to the
 * previously selected node and must be committed into it before the buffer
 * is reloaded, otherwise edits are silently lost on every click. The
 * comparison is made against a backup of the script taken at selection time,
 * not against the live node, so a commit happens exactly when the user
 * actually typed something since selecting.
 *
 * This transition runs identically for user clicks, keyboard navigation and
 * programmatic reselection (e.g. after a delete); it is the correctness core
 * of the editor.
 */
use super::document_session::DocumentSession;
use super::snippet_tree::{NodeId, SnippetTree};

/*
 * Decides whether the buffer text differs from the backed-up script.
 * An absent script and an empty buffer are considered equal; any other
 * empty/non-empty mismatch is a change; two non-empty strings are compared
 * literally.
 */
fn script_changed(backup: Option<&str>, current: &str) -> bool {
    match backup {
        None => !current.is_empty(),
        Some(b) if b.is_empty() => !current.is_empty(),
        Some(b) if current.is_empty() => !b.is_empty(),
        Some(b) => b != current,
    }
}

pub struct SelectionTracker {
    selected: Option<NodeId>,
    // Script content as it was loaded into the buffer at selection time.
    backup: Option<String>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        SelectionTracker {
            selected: None,
            backup: None,
        }
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    /*
     * Commits the buffer into the currently selected node if it changed
     * relative to the backup, marking the document dirty. Used on its own
     * before save/new/open so a pending edit is never dropped, and as step
     * one of every selection transition. Returns whether a commit happened.
     *
     * If the selected node no longer exists (it was just deleted along with
     * its pending edit), there is nothing to commit.
     */
    pub fn flush_edit(
        &mut self,
        tree: &mut SnippetTree,
        session: &DocumentSession,
        buffer: &str,
    ) -> bool {
        let Some(prev) = self.selected else {
            return false;
        };
        if !tree.contains(prev) {
            return false;
        }
        if !script_changed(self.backup.as_deref(), buffer) {
            return false;
        }

        if let Err(e) = tree.set_script(prev, Some(buffer.to_string())) {
            log::error!("SelectionTracker: Failed to commit edit into node {prev}: {e}");
            return false;
        }
        session.mark_dirty();
        self.backup = Some(buffer.to_string());
        log::debug!("SelectionTracker: Committed edited script into node {prev}.");
        true
    }

    /*
     * Full selection transition: flush the previous node's edit, then load
     * the new node's script. Returns the text the UI should place in the
     * buffer (with the caret at the start), or `None` when the selection was
     * cleared and the buffer should be emptied.
     */
    pub fn select_node(
        &mut self,
        tree: &mut SnippetTree,
        session: &DocumentSession,
        new: Option<NodeId>,
        buffer: &str,
    ) -> Option<String> {
        self.flush_edit(tree, session, buffer);

        match new {
            Some(node) => {
                let script = tree.script(node).map(|s| s.to_string());
                self.selected = Some(node);
                self.backup = script.clone();
                Some(script.unwrap_or_default())
            }
            None => {
                self.selected = None;
                self.backup = None;
                None
            }
        }
    }

    /// Forgets the selection entirely (used when the whole tree is replaced).
    pub fn clear(&mut self) {
        self.selected = None;
        self.backup = None;
    }
}

impl Default for SelectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (SnippetTree, DocumentSession, SelectionTracker, NodeId) {
        let mut tree = SnippetTree::new("Home");
        let root = tree.root();
        let node = tree
            .insert_child(root, 0, "snippet", Some("print(1)".to_string()))
            .unwrap();
        (tree, DocumentSession::new(), SelectionTracker::new(), node)
    }

    #[test]
    fn test_script_changed_cases() {
        assert!(!script_changed(None, ""));
        assert!(!script_changed(Some(""), ""));
        assert!(script_changed(None, "x"));
        assert!(script_changed(Some(""), "x"));
        assert!(script_changed(Some("x"), ""));
        assert!(!script_changed(Some("x"), "x"));
        assert!(script_changed(Some("x"), "y"));
    }

    #[test]
    fn test_switch_without_edit_leaves_script_and_dirty_untouched() {
        let (mut tree, session, mut tracker, node) = setup();
        let loaded = tracker.select_node(&mut tree, &session, Some(node), "");
        assert_eq!(loaded.as_deref(), Some("print(1)"));

        // Switch away with the buffer still matching the backup.
        let root = tree.root();
        tracker.select_node(&mut tree, &session, Some(root), "print(1)");
        assert_eq!(tree.script(node), Some("print(1)"));
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_switch_after_edit_commits_and_marks_dirty() {
        let (mut tree, session, mut tracker, node) = setup();
        tracker.select_node(&mut tree, &session, Some(node), "");

        let root = tree.root();
        tracker.select_node(&mut tree, &session, Some(root), "print(2)");
        assert_eq!(tree.script(node), Some("print(2)"));
        assert!(session.is_dirty());
    }

    #[test]
    fn test_selecting_node_without_script_loads_empty_buffer() {
        let (mut tree, session, mut tracker, _) = setup();
        let root = tree.root();
        let bare = tree.insert_child(root, 1, "bare", None).unwrap();
        let loaded = tracker.select_node(&mut tree, &session, Some(bare), "");
        assert_eq!(loaded.as_deref(), Some(""));

        // Leaving a scriptless node with an untouched (empty) buffer is not
        // an edit.
        tracker.select_node(&mut tree, &session, Some(root), "");
        assert_eq!(tree.script(bare), None);
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_clearing_selection_clears_buffer_and_backup() {
        let (mut tree, session, mut tracker, node) = setup();
        tracker.select_node(&mut tree, &session, Some(node), "");
        let loaded = tracker.select_node(&mut tree, &session, None, "print(1)");
        assert!(loaded.is_none());
        assert_eq!(tracker.selected(), None);
    }

    #[test]
    fn test_flush_edit_standalone_commits_once() {
        let (mut tree, session, mut tracker, node) = setup();
        tracker.select_node(&mut tree, &session, Some(node), "");

        assert!(tracker.flush_edit(&mut tree, &session, "edited"));
        assert_eq!(tree.script(node), Some("edited"));
        assert!(session.is_dirty());
        // Second flush with the same buffer is a no-op (backup was updated).
        assert!(!tracker.flush_edit(&mut tree, &session, "edited"));
    }

    #[test]
    fn test_flush_edit_skips_deleted_node() {
        let (mut tree, session, mut tracker, node) = setup();
        tracker.select_node(&mut tree, &session, Some(node), "");
        tree.remove_node(node).unwrap();
        session.dirty_flag().clear();

        assert!(!tracker.flush_edit(&mut tree, &session, "orphan edit"));
        assert!(!session.is_dirty());
    }
}
