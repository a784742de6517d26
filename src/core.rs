/*
 * This module consolidates the core, platform-agnostic logic of the
 * application: the snippet tree model, selection and dirty tracking, script
 * execution, and the persistence of trees and settings. It re-exports the
 * key data structures and the service abstractions (`TreeStoreOperations`,
 * `SettingsStoreOperations`, `ScriptEvaluator`, `OutputSink`) used by the
 * application logic layer.
 */
pub mod config;
pub mod document_session;
pub mod evaluator;
pub mod executor;
pub mod path_utils;
pub mod selection;
pub mod snippet_tree;
pub mod storage;

// Re-export key structures and enums
pub use snippet_tree::{NodeId, SnippetTree};

pub use document_session::DocumentSession;

pub use selection::SelectionTracker;

// Re-export execution related items
pub use evaluator::{OutputSink, OutputStyle, ProcessEvaluator, ScriptEvaluator};
pub use executor::{ExecutionController, ExecutionFinished};

// Re-export persistence related items
pub use storage::{CoreTreeStore, SnippetRecord, StorageError, TreeStoreOperations};

pub use config::{AppSettings, CoreSettingsStore, SettingsStoreOperations};
