/*
 * Manages the application state and UI logic in a platform-agnostic manner:
 * the snippet tree, the selection/dirty tracking around the edit buffer,
 * script execution, and persistence of both the tree and the settings. It
 * processes `AppEvent`s received from the platform layer and returns
 * `PlatformCommand`s to update the UI.
 *
 * All persistence and evaluation goes through injected trait objects
 * (`TreeStoreOperations`, `SettingsStoreOperations`, `ScriptEvaluator`) so
 * the tests in `handler_tests.rs` can substitute mocks.
 */
use crate::core::{
    AppSettings, DocumentSession, ExecutionController, ExecutionFinished, NodeId, OutputSink,
    ScriptEvaluator, SelectionTracker, SettingsStoreOperations, SnippetTree, TreeStoreOperations,
};
use crate::platform_layer::{
    AppEvent, PlatformCommand, PlatformEventHandler, RenameKind, TreeItemDescriptor, TreeItemId,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use time::OffsetDateTime;
use time::macros::format_description;

pub(crate) const APP_NAME_FOR_SETTINGS: &str = "SnipRunner";
const APP_TITLE: &str = "Snip Runner";
const DEFAULT_ROOT_NAME: &str = "Home";
const NEW_NODE_NAME: &str = "New Node";

pub struct SnippetAppLogic {
    pub(crate) tree: SnippetTree,
    pub(crate) session: DocumentSession,
    pub(crate) tracker: SelectionTracker,
    pub(crate) executor: ExecutionController,
    pub(crate) settings: AppSettings,
    pub(crate) tree_store: Arc<dyn TreeStoreOperations>,
    pub(crate) settings_store: Arc<dyn SettingsStoreOperations>,
}

/// Wires the session's dirty flag to structural tree changes.
fn attach_dirty_observer(tree: &mut SnippetTree, session: &DocumentSession) {
    let dirty = session.dirty_flag();
    tree.subscribe(Box::new(move |_change| dirty.mark()));
}

fn item_for(node: NodeId) -> TreeItemId {
    TreeItemId(node.0)
}

fn node_for(item: TreeItemId) -> NodeId {
    NodeId(item.0)
}

impl SnippetAppLogic {
    pub fn new(
        tree_store: Arc<dyn TreeStoreOperations>,
        settings_store: Arc<dyn SettingsStoreOperations>,
        evaluator: Arc<dyn ScriptEvaluator>,
        sink: Arc<dyn OutputSink>,
        completions: Sender<ExecutionFinished>,
    ) -> Self {
        let session = DocumentSession::new();
        let mut tree = SnippetTree::new(DEFAULT_ROOT_NAME);
        attach_dirty_observer(&mut tree, &session);

        SnippetAppLogic {
            tree,
            session,
            tracker: SelectionTracker::new(),
            executor: ExecutionController::new(evaluator, sink, completions),
            settings: AppSettings::default(),
            tree_store,
            settings_store,
        }
    }

    /*
     * Replaces the whole document: installs `tree` as the new model, wires
     * its change notifications to the dirty flag, and forgets the previous
     * selection. Callers adjust the session (saved path, dirty flag)
     * themselves.
     */
    fn install_tree(&mut self, mut tree: SnippetTree) {
        attach_dirty_observer(&mut tree, &self.session);
        self.tree = tree;
        self.tracker.clear();
    }

    fn build_descriptor(&self, node: NodeId) -> TreeItemDescriptor {
        TreeItemDescriptor {
            id: item_for(node),
            text: self.tree.name(node).unwrap_or_default().to_string(),
            children: self
                .tree
                .children(node)
                .iter()
                .map(|child| self.build_descriptor(*child))
                .collect(),
        }
    }

    fn populate_command(&self) -> PlatformCommand {
        PlatformCommand::PopulateTree {
            items: vec![self.build_descriptor(self.tree.root())],
        }
    }

    fn title_command(&self) -> PlatformCommand {
        let title = match self.session.current_path() {
            Some(path) => format!("{APP_TITLE} - {}", path.display()),
            None => format!("{APP_TITLE} - untitled"),
        };
        PlatformCommand::SetWindowTitle { title }
    }

    /*
     * Selects `node` through the tracker (flushing any pending edit against
     * `buffer`) and emits the selection and buffer commands for it.
     */
    fn select_and_load(
        &mut self,
        node: Option<NodeId>,
        buffer: &str,
        commands: &mut Vec<PlatformCommand>,
    ) {
        let loaded = self
            .tracker
            .select_node(&mut self.tree, &self.session, node, buffer);
        if let Some(node) = node {
            commands.push(PlatformCommand::SelectTreeItem {
                item: item_for(node),
            });
        }
        commands.push(PlatformCommand::SetBufferText {
            text: loaded.unwrap_or_default(),
        });
    }

    fn persist_last_opened_path(&mut self, path: Option<PathBuf>) {
        if !self.settings.remember_last_path {
            return;
        }
        self.settings.last_opened_path = path;
        if let Err(e) = self
            .settings_store
            .save_settings(APP_NAME_FOR_SETTINGS, &self.settings)
        {
            log::error!("SnippetAppLogic: Failed to save settings: {e}");
        }
    }

    /*
     * Handles startup: loads the settings and, when a remembered tree file
     * is available and loads cleanly, reopens it. Otherwise the app starts
     * with a fresh single-root tree.
     */
    pub fn on_main_window_ready(&mut self) -> Vec<PlatformCommand> {
        match self.settings_store.load_settings(APP_NAME_FOR_SETTINGS) {
            Ok(settings) => self.settings = settings,
            Err(e) => {
                log::error!("SnippetAppLogic: Failed to load settings, using defaults: {e}");
                self.settings = AppSettings::default();
            }
        }

        if self.settings.remember_last_path {
            if let Some(path) = self.settings.last_opened_path.clone() {
                match self.tree_store.load_tree(&path) {
                    Ok(tree) => {
                        log::debug!("SnippetAppLogic: Reopened last tree file {path:?}");
                        self.install_tree(tree);
                        self.session.set_saved(path);
                    }
                    Err(e) => {
                        log::warn!(
                            "SnippetAppLogic: Could not reopen last tree file {path:?}: {e}"
                        );
                    }
                }
            }
        }

        let mut commands = vec![self.populate_command()];
        self.select_and_load(Some(self.tree.root()), "", &mut commands);
        commands.push(self.title_command());
        commands.push(PlatformCommand::SetExecuteEnabled { enabled: true });
        commands.push(PlatformCommand::SetStopEnabled { enabled: false });
        commands
    }

    pub fn on_tree_selection_changed(
        &mut self,
        item: Option<TreeItemId>,
        buffer: &str,
    ) -> Vec<PlatformCommand> {
        let mut commands = Vec::new();
        let node = item.map(node_for);
        if let Some(node) = node {
            if !self.tree.contains(node) {
                log::warn!("SnippetAppLogic: Selection of unknown tree item {item:?} ignored.");
                return commands;
            }
        }
        self.select_and_load(node, buffer, &mut commands);
        commands
    }

    /// Appends a "New Node" child with an empty script under the selection.
    pub fn on_new_node_requested(&mut self) -> Vec<PlatformCommand> {
        let parent = self.tracker.selected().unwrap_or(self.tree.root());
        let index = self.tree.children(parent).len();
        match self
            .tree
            .insert_child(parent, index, NEW_NODE_NAME, Some(String::new()))
        {
            Ok(node) => {
                log::debug!("SnippetAppLogic: Added node {node} under {parent}.");
                let mut commands = vec![self.populate_command()];
                if let Some(selected) = self.tracker.selected() {
                    commands.push(PlatformCommand::SelectTreeItem {
                        item: item_for(selected),
                    });
                }
                commands
            }
            Err(e) => {
                log::error!("SnippetAppLogic: Failed to add node under {parent}: {e}");
                vec![PlatformCommand::ShowWarning {
                    message: format!("Could not add node: {e}"),
                }]
            }
        }
    }

    /*
     * Removes the selected node and its subtree, then moves the selection to
     * the node the tree model designates: the next sibling in the vacated
     * slot, the previous sibling when the last child was removed, or the
     * parent when it was the only child.
     */
    pub fn on_delete_node_requested(&mut self) -> Vec<PlatformCommand> {
        let Some(selected) = self.tracker.selected() else {
            return vec![PlatformCommand::ShowWarning {
                message: "No node selected.".to_string(),
            }];
        };
        if selected == self.tree.root() {
            return vec![PlatformCommand::ShowWarning {
                message: "The root node cannot be deleted.".to_string(),
            }];
        }

        match self.tree.remove_node(selected) {
            Ok(reselect) => {
                let mut commands = vec![self.populate_command()];
                self.select_and_load(Some(reselect), "", &mut commands);
                commands
            }
            Err(e) => {
                log::error!("SnippetAppLogic: Failed to delete node {selected}: {e}");
                vec![PlatformCommand::ShowWarning {
                    message: format!("Could not delete node: {e}"),
                }]
            }
        }
    }

    fn timestamp_name(kind: &RenameKind) -> Option<String> {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let result = match kind {
            RenameKind::CurrentDate => now.format(format_description!("[month][day][year]")),
            RenameKind::CurrentTime => now.format(format_description!("[hour][minute][second]")),
            RenameKind::CurrentDateTime => {
                now.format(format_description!("[month][day][year][hour][minute][second]"))
            }
            RenameKind::Custom(_) => return None,
        };
        match result {
            Ok(name) => Some(name),
            Err(e) => {
                log::error!("SnippetAppLogic: Failed to format timestamp name: {e}");
                None
            }
        }
    }

    pub fn on_rename_node_requested(&mut self, kind: RenameKind) -> Vec<PlatformCommand> {
        let Some(selected) = self.tracker.selected() else {
            return vec![PlatformCommand::ShowWarning {
                message: "No node selected.".to_string(),
            }];
        };

        let new_name = match &kind {
            RenameKind::Custom(name) => name.clone(),
            _ => match Self::timestamp_name(&kind) {
                Some(name) => name,
                None => {
                    return vec![PlatformCommand::ShowWarning {
                        message: "Could not determine the current date/time.".to_string(),
                    }];
                }
            },
        };

        match self.tree.rename(selected, &new_name) {
            Ok(true) => {
                vec![self.populate_command(), PlatformCommand::SelectTreeItem {
                    item: item_for(selected),
                }]
            }
            // Empty name: deliberate no-op.
            Ok(false) => Vec::new(),
            Err(e) => {
                log::error!("SnippetAppLogic: Failed to rename node {selected}: {e}");
                vec![PlatformCommand::ShowWarning {
                    message: format!("Could not rename node: {e}"),
                }]
            }
        }
    }

    pub fn on_move_node_requested(
        &mut self,
        item: TreeItemId,
        new_parent: TreeItemId,
        index: usize,
    ) -> Vec<PlatformCommand> {
        let node = node_for(item);
        match self.tree.move_node(node, node_for(new_parent), index) {
            Ok(()) => {
                /* The moved node is not necessarily the selected one; the UI
                 * selection must stay on the node the tracker will flush
                 * edits into. */
                let mut commands = vec![self.populate_command()];
                if let Some(selected) = self.tracker.selected() {
                    commands.push(PlatformCommand::SelectTreeItem {
                        item: item_for(selected),
                    });
                }
                commands
            }
            Err(e) => {
                log::warn!("SnippetAppLogic: Rejected move of node {node}: {e}");
                vec![PlatformCommand::ShowWarning {
                    message: format!("Could not move node: {e}"),
                }]
            }
        }
    }

    /*
     * Starts executing the buffer content. The output pane is cleared before
     * every attempt; an empty script clears it and does nothing else. While
     * a run is active further requests are ignored.
     */
    pub fn on_execute_requested(&mut self, buffer: &str) -> Vec<PlatformCommand> {
        if self.executor.is_running() {
            log::debug!("SnippetAppLogic: Execute requested while already running.");
            return Vec::new();
        }
        let mut commands = vec![PlatformCommand::ClearOutput];
        if self.executor.execute(buffer) {
            commands.push(PlatformCommand::SetExecuteEnabled { enabled: false });
            commands.push(PlatformCommand::SetStopEnabled { enabled: true });
        }
        commands
    }

    pub fn on_stop_requested(&mut self) -> Vec<PlatformCommand> {
        if self.executor.stop() {
            vec![
                PlatformCommand::SetExecuteEnabled { enabled: true },
                PlatformCommand::SetStopEnabled { enabled: false },
            ]
        } else {
            Vec::new()
        }
    }

    pub fn on_execution_completed(&mut self, run_id: u64) -> Vec<PlatformCommand> {
        if self.executor.on_completed(run_id) {
            vec![
                PlatformCommand::SetExecuteEnabled { enabled: true },
                PlatformCommand::SetStopEnabled { enabled: false },
            ]
        } else {
            Vec::new()
        }
    }

    /// Discards the current document and starts over with a fresh root.
    pub fn on_new_file_requested(&mut self, buffer: &str) -> Vec<PlatformCommand> {
        self.tracker
            .flush_edit(&mut self.tree, &self.session, buffer);

        let mut tree = SnippetTree::new(DEFAULT_ROOT_NAME);
        attach_dirty_observer(&mut tree, &self.session);
        self.tree = tree;
        self.tracker.clear();
        self.session.reset();

        let mut commands = vec![self.populate_command()];
        self.select_and_load(Some(self.tree.root()), "", &mut commands);
        commands.push(self.title_command());
        commands
    }

    /*
     * Opens a tree file. The pending buffer edit is flushed first; a load
     * failure leaves the current document (tree, selection, dirty flag)
     * untouched.
     */
    pub fn on_open_file_requested(&mut self, path: PathBuf, buffer: &str) -> Vec<PlatformCommand> {
        self.tracker
            .flush_edit(&mut self.tree, &self.session, buffer);

        match self.tree_store.load_tree(&path) {
            Ok(tree) => {
                self.install_tree(tree);
                self.session.set_saved(path.clone());
                self.persist_last_opened_path(Some(path));

                let mut commands = vec![self.populate_command()];
                self.select_and_load(Some(self.tree.root()), "", &mut commands);
                commands.push(self.title_command());
                commands
            }
            Err(e) => {
                log::error!("SnippetAppLogic: Failed to open tree file {path:?}: {e}");
                vec![PlatformCommand::ShowWarning {
                    message: format!("Could not open {}: {e}", path.display()),
                }]
            }
        }
    }

    fn save_to(&mut self, path: PathBuf) -> Vec<PlatformCommand> {
        match self.tree_store.save_tree(&self.tree, &path) {
            Ok(()) => {
                log::debug!("SnippetAppLogic: Saved tree to {path:?}");
                self.session.set_saved(path.clone());
                self.persist_last_opened_path(Some(path));
                vec![self.title_command()]
            }
            Err(e) => {
                log::error!("SnippetAppLogic: Failed to save tree to {path:?}: {e}");
                vec![PlatformCommand::ShowWarning {
                    message: format!("Could not save {}: {e}", path.display()),
                }]
            }
        }
    }

    pub fn on_save_requested(&mut self, buffer: &str) -> Vec<PlatformCommand> {
        self.tracker
            .flush_edit(&mut self.tree, &self.session, buffer);
        match self.session.current_path().map(Path::to_path_buf) {
            Some(path) => self.save_to(path),
            None => vec![PlatformCommand::ShowWarning {
                message: "No file name chosen yet. Use Save As.".to_string(),
            }],
        }
    }

    pub fn on_save_as_requested(&mut self, path: PathBuf, buffer: &str) -> Vec<PlatformCommand> {
        self.tracker
            .flush_edit(&mut self.tree, &self.session, buffer);
        self.save_to(path)
    }

    pub fn on_window_close_requested(&mut self, buffer: &str) -> Vec<PlatformCommand> {
        self.tracker
            .flush_edit(&mut self.tree, &self.session, buffer);
        if self.session.is_dirty() {
            log::warn!("SnippetAppLogic: Exiting with unsaved changes.");
        }
        self.executor.stop();
        vec![PlatformCommand::QuitApplication]
    }
}

impl PlatformEventHandler for SnippetAppLogic {
    fn handle_event(&mut self, event: AppEvent) -> Vec<PlatformCommand> {
        log::trace!("SnippetAppLogic: Handling event {event:?}");
        match event {
            AppEvent::MainWindowReady => self.on_main_window_ready(),
            AppEvent::TreeSelectionChanged { item, buffer } => {
                self.on_tree_selection_changed(item, &buffer)
            }
            AppEvent::NewNodeRequested => self.on_new_node_requested(),
            AppEvent::DeleteNodeRequested => self.on_delete_node_requested(),
            AppEvent::RenameNodeRequested { kind } => self.on_rename_node_requested(kind),
            AppEvent::MoveNodeRequested {
                item,
                new_parent,
                index,
            } => self.on_move_node_requested(item, new_parent, index),
            AppEvent::ExecuteRequested { buffer } => self.on_execute_requested(&buffer),
            AppEvent::StopRequested => self.on_stop_requested(),
            AppEvent::ExecutionCompleted { run_id } => self.on_execution_completed(run_id),
            AppEvent::NewFileRequested { buffer } => self.on_new_file_requested(&buffer),
            AppEvent::OpenFileRequested { path, buffer } => {
                self.on_open_file_requested(path, &buffer)
            }
            AppEvent::SaveRequested { buffer } => self.on_save_requested(&buffer),
            AppEvent::SaveAsRequested { path, buffer } => {
                self.on_save_as_requested(path, &buffer)
            }
            AppEvent::WindowCloseRequested { buffer } => self.on_window_close_requested(&buffer),
        }
    }

    fn on_quit(&mut self) {
        log::debug!("SnippetAppLogic: Event loop exiting.");
        self.executor.stop();
    }
}
