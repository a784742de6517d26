/*
 * Persists snippet trees to disk as JSON documents. The on-disk shape is a
 * single nested record per node (name, optional script, children), which
 * keeps files human-readable and diff-friendly. Saves are atomic: the
 * document is written to a sibling temp file first and renamed over the
 * target, so a crash mid-write never truncates an existing tree file.
 *
 * A trait (`TreeStoreOperations`) fronts the concrete `CoreTreeStore` so
 * application logic tests can substitute an in-memory store.
 */
use super::snippet_tree::{NodeId, SnippetTree, TreeError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const TEMP_FILE_SUFFIX: &str = "tmp";

#[derive(Debug)]
pub enum StorageError {
    Io(io::Error),
    Serde(serde_json::Error),
    NotFound(PathBuf),
    Tree(TreeError),
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        StorageError::Io(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serde(err)
    }
}

impl From<TreeError> for StorageError {
    fn from(err: TreeError) -> Self {
        StorageError::Tree(err)
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "I/O error: {e}"),
            StorageError::Serde(e) => write!(f, "Serialization/Deserialization error: {e}"),
            StorageError::NotFound(path) => write!(f, "Tree file not found: {path:?}"),
            StorageError::Tree(e) => write!(f, "Tree reconstruction error: {e}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::Serde(e) => Some(e),
            StorageError::Tree(e) => Some(e),
            StorageError::NotFound(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// On-disk representation of one node and its subtree.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SnippetRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SnippetRecord>,
}

fn node_to_record(tree: &SnippetTree, node: NodeId) -> SnippetRecord {
    SnippetRecord {
        name: tree.name(node).unwrap_or_default().to_string(),
        script: tree.script(node).map(|s| s.to_string()),
        children: tree
            .children(node)
            .iter()
            .map(|child| node_to_record(tree, *child))
            .collect(),
    }
}

fn insert_record_children(
    tree: &mut SnippetTree,
    parent: NodeId,
    children: &[SnippetRecord],
) -> Result<()> {
    for (index, child) in children.iter().enumerate() {
        let id = tree.insert_child(parent, index, &child.name, child.script.clone())?;
        insert_record_children(tree, id, &child.children)?;
    }
    Ok(())
}

/// Flattens a live tree into its serializable record form.
pub fn tree_to_record(tree: &SnippetTree) -> SnippetRecord {
    node_to_record(tree, tree.root())
}

/*
 * Rebuilds a live tree from a deserialized record. The returned tree has no
 * observers; callers wire up change subscriptions afterwards.
 */
pub fn record_to_tree(record: &SnippetRecord) -> Result<SnippetTree> {
    let mut tree = SnippetTree::new(&record.name);
    let root = tree.root();
    tree.set_script(root, record.script.clone())?;
    insert_record_children(&mut tree, root, &record.children)?;
    Ok(tree)
}

pub trait TreeStoreOperations: Send + Sync {
    fn load_tree(&self, path: &Path) -> Result<SnippetTree>;
    fn save_tree(&self, tree: &SnippetTree, path: &Path) -> Result<()>;
}

pub struct CoreTreeStore {}

impl CoreTreeStore {
    pub fn new() -> Self {
        CoreTreeStore {}
    }
}

impl Default for CoreTreeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeStoreOperations for CoreTreeStore {
    fn load_tree(&self, path: &Path) -> Result<SnippetTree> {
        log::debug!("CoreTreeStore: Loading tree from {path:?}");
        if !path.is_file() {
            log::warn!("CoreTreeStore: Tree file {path:?} does not exist or is not a file.");
            return Err(StorageError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let record: SnippetRecord = serde_json::from_str(&content)?;
        record_to_tree(&record)
    }

    fn save_tree(&self, tree: &SnippetTree, path: &Path) -> Result<()> {
        log::debug!("CoreTreeStore: Saving tree to {path:?}");
        let record = tree_to_record(tree);
        let json = serde_json::to_string_pretty(&record)?;

        /* Write-then-rename keeps the previous file intact if anything goes
         * wrong before the rename. */
        let temp_path = path.with_extension(TEMP_FILE_SUFFIX);
        fs::write(&temp_path, json)?;
        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        Ok(())
    }
}
