//! In-memory host capabilities.
//!
//! Every implementation records what was written to it so embedders and
//! tests can inspect the effects of store and controller operations.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::host::{
    Capabilities, Clipboard, Confirmer, DocumentStore, EphemeralStorage, InsertOptions,
    LegacyFileStore, Node, Notifier,
};

#[derive(Debug, Clone)]
struct Record {
    content: String,
    parent: Option<String>,
    page: Option<String>,
    children: Vec<String>,
    collapsed: bool,
}

impl Record {
    fn new(content: &str, parent: Option<String>, page: Option<String>) -> Self {
        Self {
            content: content.to_string(),
            parent,
            page,
            children: Vec::new(),
            collapsed: false,
        }
    }
}

/// Document tree of pages and blocks.
#[derive(Debug, Default)]
pub struct MemoryDocuments {
    nodes: RefCell<HashMap<String, Record>>,
    next_id: Cell<u64>,
    fail_writes: Cell<bool>,
}

impl MemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&self, id: &str) {
        self.nodes
            .borrow_mut()
            .insert(id.to_string(), Record::new("", None, None));
    }

    /// Append a block as the last child of `parent`. Returns false if the
    /// parent does not exist.
    pub fn add_node(&self, id: &str, parent: &str, content: &str) -> bool {
        let mut nodes = self.nodes.borrow_mut();
        let Some(parent_record) = nodes.get_mut(parent) else {
            return false;
        };
        parent_record.children.push(id.to_string());
        let page = parent_record.page.clone().unwrap_or_else(|| parent.to_string());
        nodes.insert(
            id.to_string(),
            Record::new(content, Some(parent.to_string()), Some(page)),
        );
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.borrow().contains_key(id)
    }

    pub fn content(&self, id: &str) -> Option<String> {
        self.nodes.borrow().get(id).map(|r| r.content.clone())
    }

    pub fn child_ids(&self, id: &str) -> Vec<String> {
        self.nodes
            .borrow()
            .get(id)
            .map(|r| r.children.clone())
            .unwrap_or_default()
    }

    pub fn is_collapsed(&self, id: &str) -> bool {
        self.nodes.borrow().get(id).map_or(false, |r| r.collapsed)
    }

    /// Make every subsequent write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    fn check_writable(&self) -> Result<(), String> {
        if self.fail_writes.get() {
            Err("document store is read-only".to_string())
        } else {
            Ok(())
        }
    }

    fn allocate_id(&self) -> String {
        let n = self.next_id.get() + 1;
        self.next_id.set(n);
        format!("node-{n}")
    }

    fn build(nodes: &HashMap<String, Record>, id: &str, include_children: bool) -> Option<Node> {
        let record = nodes.get(id)?;
        let children = if include_children {
            record
                .children
                .iter()
                .filter_map(|child| Self::build(nodes, child, true))
                .collect()
        } else {
            Vec::new()
        };
        Some(Node {
            id: id.to_string(),
            content: record.content.clone(),
            parent: record.parent.clone(),
            page: record.page.clone(),
            children,
        })
    }

    fn remove_subtree(nodes: &mut HashMap<String, Record>, id: &str) {
        if let Some(record) = nodes.remove(id) {
            for child in record.children {
                Self::remove_subtree(nodes, &child);
            }
        }
    }
}

impl DocumentStore for MemoryDocuments {
    fn get_node(&self, id: &str, include_children: bool) -> Result<Option<Node>, String> {
        Ok(Self::build(&self.nodes.borrow(), id, include_children))
    }

    fn insert_child_node(&self, target: &str, content: &str, options: InsertOptions) -> Result<Node, String> {
        self.check_writable()?;
        let id = self.allocate_id();
        let mut nodes = self.nodes.borrow_mut();

        let target_record = nodes
            .get(target)
            .cloned()
            .ok_or_else(|| format!("no node {target}"))?;

        let (parent, position) = if options.sibling {
            let parent = target_record
                .parent
                .clone()
                .ok_or_else(|| format!("node {target} has no parent"))?;
            let position = nodes
                .get(&parent)
                .and_then(|p| p.children.iter().position(|c| c == target))
                .map_or(0, |i| i + 1);
            (parent, position)
        } else {
            (target.to_string(), 0)
        };

        let page = match nodes.get(&parent) {
            Some(p) => p.page.clone().unwrap_or_else(|| parent.clone()),
            None => return Err(format!("no node {parent}")),
        };
        if let Some(p) = nodes.get_mut(&parent) {
            p.children.insert(position, id.clone());
        }
        nodes.insert(id.clone(), Record::new(content, Some(parent), Some(page)));

        Self::build(&nodes, &id, false).ok_or_else(|| format!("no node {id}"))
    }

    fn update_node(&self, id: &str, content: &str) -> Result<(), String> {
        self.check_writable()?;
        let mut nodes = self.nodes.borrow_mut();
        let record = nodes.get_mut(id).ok_or_else(|| format!("no node {id}"))?;
        record.content = content.to_string();
        Ok(())
    }

    fn remove_node(&self, id: &str) -> Result<(), String> {
        self.check_writable()?;
        let mut nodes = self.nodes.borrow_mut();
        let parent = nodes
            .get(id)
            .ok_or_else(|| format!("no node {id}"))?
            .parent
            .clone();
        if let Some(parent) = parent {
            if let Some(record) = nodes.get_mut(&parent) {
                record.children.retain(|c| c != id);
            }
        }
        Self::remove_subtree(&mut nodes, id);
        Ok(())
    }

    fn set_collapsed(&self, id: &str, collapsed: bool) -> Result<(), String> {
        self.check_writable()?;
        let mut nodes = self.nodes.borrow_mut();
        let record = nodes.get_mut(id).ok_or_else(|| format!("no node {id}"))?;
        record.collapsed = collapsed;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryLegacyStore {
    files: RefCell<HashMap<String, String>>,
}

impl MemoryLegacyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, contents: &str) {
        self.files
            .borrow_mut()
            .insert(key.to_string(), contents.to_string());
    }
}

impl LegacyFileStore for MemoryLegacyStore {
    fn has(&self, key: &str) -> Result<bool, String> {
        Ok(self.files.borrow().contains_key(key))
    }

    fn get(&self, key: &str) -> Result<Option<String>, String> {
        Ok(self.files.borrow().get(key).cloned())
    }
}

/// Key-value storage that counts writes per key.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<BTreeMap<String, String>>,
    writes: RefCell<HashMap<String, usize>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    /// Number of `set` calls made for `key`.
    pub fn write_count(&self, key: &str) -> usize {
        self.writes.borrow().get(key).copied().unwrap_or(0)
    }
}

impl EphemeralStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        *self.writes.borrow_mut().entry(key.to_string()).or_insert(0) += 1;
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

#[derive(Debug, Default)]
pub struct MemoryClipboard {
    text: RefCell<Option<String>>,
}

impl MemoryClipboard {
    pub fn text(&self) -> Option<String> {
        self.text.borrow().clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<(), String> {
        *self.text.borrow_mut() = Some(text.to_string());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryNotifier {
    messages: RefCell<Vec<String>>,
}

impl MemoryNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.messages.borrow().last().cloned()
    }
}

impl Notifier for MemoryNotifier {
    fn show_message(&self, message: &str) {
        log::debug!("notify: {message}");
        self.messages.borrow_mut().push(message.to_string());
    }
}

/// Answers every prompt with a preset reply and remembers the prompts.
#[derive(Debug)]
pub struct ScriptedConfirmer {
    answer: Cell<bool>,
    prompts: RefCell<Vec<String>>,
}

impl Default for ScriptedConfirmer {
    fn default() -> Self {
        Self {
            answer: Cell::new(true),
            prompts: RefCell::new(Vec::new()),
        }
    }
}

impl ScriptedConfirmer {
    pub fn set_answer(&self, answer: bool) {
        self.answer.set(answer);
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl Confirmer for ScriptedConfirmer {
    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.answer.get()
    }
}

/// A complete in-memory host. Keeps typed handles for inspection and hands
/// out the trait-object bundle.
#[derive(Debug, Default)]
pub struct MemoryHost {
    pub documents: Rc<MemoryDocuments>,
    pub legacy: Rc<MemoryLegacyStore>,
    pub storage: Rc<MemoryStorage>,
    pub clipboard: Rc<MemoryClipboard>,
    pub notifier: Rc<MemoryNotifier>,
    pub confirmer: Rc<ScriptedConfirmer>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            documents: self.documents.clone(),
            legacy: self.legacy.clone(),
            storage: self.storage.clone(),
            clipboard: self.clipboard.clone(),
            notifier: self.notifier.clone(),
            confirmer: self.confirmer.clone(),
        }
    }
}
