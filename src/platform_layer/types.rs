/*
 * This module defines the data types used for communication between the
 * application logic and the platform layer: identifiers for tree items,
 * platform-agnostic event types (`AppEvent`), commands for the platform
 * layer (`PlatformCommand`), and the `PlatformEventHandler` trait that the
 * application logic must implement. The types are UI-toolkit neutral; the
 * same boundary serves the console front-end and any richer GUI.
 */

use std::path::PathBuf;

// An opaque identifier for an item within the snippet tree control.
//
// This ID is generated and managed by the application logic layer and used
// to uniquely identify tree items in commands and events. The platform layer
// never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeItemId(pub u64);

// Describes a single item to be displayed in the tree control.
//
// The application logic defines the content and hierarchy of the tree view
// with these; the platform layer renders them.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeItemDescriptor {
    pub id: TreeItemId,
    pub text: String,
    pub children: Vec<TreeItemDescriptor>,
}

/// How a rename request determines the new node name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameKind {
    /// User-entered name. Empty text is ignored by the handler.
    Custom(String),
    CurrentDate,
    CurrentTime,
    CurrentDateTime,
}

// --- Events from Platform to App Logic ---

/*
 * Represents platform-agnostic UI events. The platform layer translates
 * native interactions into these and hands them to the application logic.
 * Events that may need to flush a pending script edit carry the current
 * content of the edit buffer.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    // The main window exists and the initial UI is in place.
    MainWindowReady,
    TreeSelectionChanged {
        item: Option<TreeItemId>,
        buffer: String,
    },
    NewNodeRequested,
    DeleteNodeRequested,
    RenameNodeRequested {
        kind: RenameKind,
    },
    MoveNodeRequested {
        item: TreeItemId,
        new_parent: TreeItemId,
        index: usize,
    },
    ExecuteRequested {
        buffer: String,
    },
    StopRequested,
    // A worker finished the identified run (possibly after a stop).
    ExecutionCompleted {
        run_id: u64,
    },
    NewFileRequested {
        buffer: String,
    },
    OpenFileRequested {
        path: PathBuf,
        buffer: String,
    },
    SaveRequested {
        buffer: String,
    },
    SaveAsRequested {
        path: PathBuf,
        buffer: String,
    },
    WindowCloseRequested {
        buffer: String,
    },
}

// Represents platform-agnostic commands sent from the application logic to
// the platform layer.
//
// These instruct the platform layer to update the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCommand {
    PopulateTree {
        items: Vec<TreeItemDescriptor>,
    },
    SelectTreeItem {
        item: TreeItemId,
    },
    // Replaces the edit buffer content, caret at the start.
    SetBufferText {
        text: String,
    },
    ClearOutput,
    SetExecuteEnabled {
        enabled: bool,
    },
    SetStopEnabled {
        enabled: bool,
    },
    SetWindowTitle {
        title: String,
    },
    ShowWarning {
        message: String,
    },
    QuitApplication,
}

// --- Trait for App Logic to Handle Events ---

// A trait to be implemented by the application logic layer to handle UI
// events.
//
// The platform layer calls `handle_event` for every event and then executes
// the returned commands in order. No `Send` bound: the handler lives on the
// UI thread and may hold thread-local state.
pub trait PlatformEventHandler: 'static {
    fn handle_event(&mut self, event: AppEvent) -> Vec<PlatformCommand>;

    // Called when the event loop is about to exit, for final cleanup.
    fn on_quit(&mut self) {}
}
