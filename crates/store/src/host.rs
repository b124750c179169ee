// Host capabilities: document tree, legacy files, local storage, UI hooks

use std::rc::Rc;

/// A block of the host document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Node {
    pub id: String,
    /// Plain-text content. A child whose content starts with the snapshot
    /// marker is a data block.
    pub content: String,
    pub parent: Option<String>,
    /// Page the node lives on. Top-level blocks have `parent == page`.
    pub page: Option<String>,
    /// Only filled when the node was fetched with children.
    pub children: Vec<Node>,
}

impl Node {
    pub fn first_child(&self) -> Option<&Node> {
        self.children.first()
    }

    /// Parent block, if it is a block and not the page itself.
    pub fn parent_block(&self) -> Option<&str> {
        self.parent
            .as_deref()
            .filter(|parent| self.page.as_deref() != Some(*parent))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InsertOptions {
    /// Insert next to the target instead of as its first child.
    pub sibling: bool,
}

impl InsertOptions {
    pub fn child() -> Self {
        Self { sibling: false }
    }

    pub fn sibling() -> Self {
        Self { sibling: true }
    }
}

pub trait DocumentStore {
    /// `Ok(None)` when no node has this id.
    fn get_node(&self, id: &str, include_children: bool) -> Result<Option<Node>, String>;
    fn insert_child_node(&self, parent: &str, content: &str, options: InsertOptions) -> Result<Node, String>;
    fn update_node(&self, id: &str, content: &str) -> Result<(), String>;
    fn remove_node(&self, id: &str) -> Result<(), String>;
    fn set_collapsed(&self, id: &str, collapsed: bool) -> Result<(), String>;
}

/// Keyed file store used by older releases, read once for migration.
pub trait LegacyFileStore {
    fn has(&self, key: &str) -> Result<bool, String>;
    fn get(&self, key: &str) -> Result<Option<String>, String>;
}

/// Process-wide key-value storage that survives reloads.
pub trait EphemeralStorage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), String>;
    fn remove(&self, key: &str);
}

pub trait Clipboard {
    fn write_text(&self, text: &str) -> Result<(), String>;
}

/// Fire-and-forget transient message.
pub trait Notifier {
    fn show_message(&self, message: &str);
}

/// Blocking yes/no prompt.
pub trait Confirmer {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Everything the store and controllers need from the host, injected once
/// and shared by every controller in the process.
#[derive(Clone)]
pub struct Capabilities {
    pub documents: Rc<dyn DocumentStore>,
    pub legacy: Rc<dyn LegacyFileStore>,
    pub storage: Rc<dyn EphemeralStorage>,
    pub clipboard: Rc<dyn Clipboard>,
    pub notifier: Rc<dyn Notifier>,
    pub confirmer: Rc<dyn Confirmer>,
}
