/*
 * The in-memory snippet tree: an ordered tree of named nodes, each carrying
 * an optional script. Nodes are stored in an arena keyed by `NodeId` so that
 * identity survives renames and moves; the UI layers refer to nodes only by
 * these ids. Structural mutations (insert/remove/move/rename) go through
 * checked operations that reject edits which would break the tree invariants
 * (exactly one root, no cycles), and notify registered observers so that the
 * document session can track unsaved changes without the tree knowing about
 * documents at all.
 */
use std::collections::HashMap;

/// Opaque identifier of a node in a `SnippetTree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
pub enum TreeError {
    // Deleting or moving the root, or moving a node into its own subtree.
    InvalidOperation(String),
    UnknownNode(NodeId),
    InvalidIndex { index: usize, child_count: usize },
}

impl std::fmt::Display for TreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeError::InvalidOperation(msg) => write!(f, "Invalid tree operation: {msg}"),
            TreeError::UnknownNode(id) => write!(f, "Unknown tree node: {id}"),
            TreeError::InvalidIndex { index, child_count } => {
                write!(f, "Insert index {index} out of range (0..={child_count})")
            }
        }
    }
}

impl std::error::Error for TreeError {}

pub type Result<T> = std::result::Result<T, TreeError>;

/*
 * Structural change notifications. Fired after the mutation has been applied,
 * so observers see the post-change tree. Script edits are not structural and
 * are committed through the selection tracker instead.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeChange {
    Inserted { node: NodeId, parent: NodeId },
    Removed { node: NodeId, parent: NodeId },
    Moved { node: NodeId, new_parent: NodeId },
    Renamed { node: NodeId },
}

struct NodeEntry {
    name: String,
    script: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

pub struct SnippetTree {
    nodes: HashMap<NodeId, NodeEntry>,
    root: NodeId,
    next_id: u64,
    observers: Vec<Box<dyn FnMut(&TreeChange)>>,
}

impl SnippetTree {
    /*
     * Creates a tree containing only a root node with the given display name
     * and no script. The root can be renamed and edited but never deleted or
     * reparented.
     */
    pub fn new(root_name: &str) -> Self {
        let root = NodeId(1);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            NodeEntry {
                name: root_name.to_string(),
                script: None,
                parent: None,
                children: Vec::new(),
            },
        );
        SnippetTree {
            nodes,
            root,
            next_id: 2,
            observers: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id).map(|n| n.name.as_str())
    }

    /// Returns the node's script, or `None` if the node has no script
    /// (or the id is stale).
    pub fn script(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id).and_then(|n| n.script.as_deref())
    }

    pub fn set_script(&mut self, id: NodeId, script: Option<String>) -> Result<()> {
        let entry = self.nodes.get_mut(&id).ok_or(TreeError::UnknownNode(id))?;
        entry.script = script;
        Ok(())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /*
     * Registers an observer for structural changes. Observers are called
     * after each successful insert/remove/move/rename, in registration order.
     */
    pub fn subscribe(&mut self, observer: Box<dyn FnMut(&TreeChange)>) {
        self.observers.push(observer);
    }

    fn notify(&mut self, change: TreeChange) {
        for observer in self.observers.iter_mut() {
            observer(&change);
        }
    }

    fn allocate_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// True if `id` is `ancestor` itself or lies in its subtree.
    fn in_subtree(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.parent(c);
        }
        false
    }

    /*
     * Inserts a new node as a child of `parent` at `index`
     * (0 <= index <= child count). Returns the id of the new node and fires
     * `TreeChange::Inserted`.
     */
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        name: &str,
        script: Option<String>,
    ) -> Result<NodeId> {
        let child_count = self
            .nodes
            .get(&parent)
            .ok_or(TreeError::UnknownNode(parent))?
            .children
            .len();
        if index > child_count {
            return Err(TreeError::InvalidIndex { index, child_count });
        }

        let id = self.allocate_id();
        self.nodes.insert(
            id,
            NodeEntry {
                name: name.to_string(),
                script,
                parent: Some(parent),
                children: Vec::new(),
            },
        );
        self.nodes
            .get_mut(&parent)
            .expect("parent checked above")
            .children
            .insert(index, id);

        log::debug!("SnippetTree: Inserted node {id} ('{name}') under {parent} at {index}.");
        self.notify(TreeChange::Inserted { node: id, parent });
        Ok(id)
    }

    /*
     * Removes `id` and its entire subtree. The root cannot be removed.
     * Returns the node that should be selected afterwards: the sibling now
     * occupying the removed node's slot, else the previous sibling, else the
     * parent when the removed node was the only child. This reselection
     * policy is observable UI behavior and must stay exactly as-is.
     */
    pub fn remove_node(&mut self, id: NodeId) -> Result<NodeId> {
        let entry = self.nodes.get(&id).ok_or(TreeError::UnknownNode(id))?;
        let parent = entry.parent.ok_or_else(|| {
            TreeError::InvalidOperation("the root node cannot be deleted".to_string())
        })?;

        let siblings = &mut self
            .nodes
            .get_mut(&parent)
            .expect("parent of a live node exists")
            .children;
        let index = siblings
            .iter()
            .position(|c| *c == id)
            .expect("node is listed among its parent's children");
        siblings.remove(index);

        let select = {
            let siblings = &self.nodes[&parent].children;
            if siblings.is_empty() {
                parent
            } else if index >= siblings.len() {
                siblings[siblings.len() - 1]
            } else {
                siblings[index]
            }
        };

        // Drop the whole subtree from the arena.
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(entry) = self.nodes.remove(&current) {
                pending.extend(entry.children);
            }
        }

        log::debug!("SnippetTree: Removed node {id}; reselect target is {select}.");
        self.notify(TreeChange::Removed { node: id, parent });
        Ok(select)
    }

    /*
     * Detaches `id` from its parent and inserts it under `new_parent` at
     * `index` (clamped to the target's child count). Rejected when `id` is
     * the root or when `new_parent` is `id` itself or any of its descendants,
     * which would create a cycle.
     */
    pub fn move_node(&mut self, id: NodeId, new_parent: NodeId, index: usize) -> Result<()> {
        if !self.nodes.contains_key(&new_parent) {
            return Err(TreeError::UnknownNode(new_parent));
        }
        let old_parent = self
            .nodes
            .get(&id)
            .ok_or(TreeError::UnknownNode(id))?
            .parent
            .ok_or_else(|| {
                TreeError::InvalidOperation("the root node cannot be moved".to_string())
            })?;
        if self.in_subtree(id, new_parent) {
            return Err(TreeError::InvalidOperation(
                "cannot move a node into its own subtree".to_string(),
            ));
        }

        let siblings = &mut self
            .nodes
            .get_mut(&old_parent)
            .expect("parent of a live node exists")
            .children;
        let old_index = siblings
            .iter()
            .position(|c| *c == id)
            .expect("node is listed among its parent's children");
        siblings.remove(old_index);

        let target = self
            .nodes
            .get_mut(&new_parent)
            .expect("target checked above");
        let index = index.min(target.children.len());
        target.children.insert(index, id);
        self.nodes
            .get_mut(&id)
            .expect("moved node checked above")
            .parent = Some(new_parent);

        log::debug!("SnippetTree: Moved node {id} under {new_parent} at {index}.");
        self.notify(TreeChange::Moved {
            node: id,
            new_parent,
        });
        Ok(())
    }

    /*
     * Replaces the node's display name. An empty name is silently ignored
     * (returns Ok(false)) rather than being an error, matching the behavior
     * users expect from cancelled in-place edits.
     */
    pub fn rename(&mut self, id: NodeId, new_name: &str) -> Result<bool> {
        if new_name.is_empty() {
            return Ok(false);
        }
        let entry = self.nodes.get_mut(&id).ok_or(TreeError::UnknownNode(id))?;
        entry.name = new_name.to_string();
        self.notify(TreeChange::Renamed { node: id });
        Ok(true)
    }
}
