//! Lifecycle of one spreadsheet block.
//!
//! A controller is bound to the owner node (the block holding the renderer
//! macro). The workbook lives in the owner's first child, a data block whose
//! content is the snapshot envelope. Edits go to the buffered store after
//! the save delay; `teardown` saves immediately.

use std::time::Instant;

use log::{debug, info};
use regex::{NoExpand, Regex};

use sheetblock_config::Settings;
use sheetblock_engine::workbook::Workbook;
use sheetblock_io::tsv::range_to_tsv;
use sheetblock_io::{encode, is_snapshot, project};

use crate::buffer::{BufferedStore, FlushReport, ReadSource};
use crate::error::SheetError;
use crate::host::{Capabilities, InsertOptions, Node};
use crate::scheduler::SaveScheduler;

/// The block a controller is opened on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetBlock {
    /// Owner node id.
    pub id: String,
    /// Workbook name as written in the renderer macro.
    pub name: String,
    /// Node that embeds the owner by reference, if the sheet is shown
    /// through one. Sync targets its parent instead of the owner's.
    pub reference: Option<String>,
    /// Key in the legacy file store, when it differs from the owner id.
    pub legacy_key: Option<String>,
}

impl SheetBlock {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            reference: None,
            legacy_key: None,
        }
    }

    pub fn referenced_from(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_legacy_key(mut self, key: impl Into<String>) -> Self {
        self.legacy_key = Some(key.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed,
    /// The owner no longer contains the renderer macro for this name.
    NoMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The user answered no.
    Declined,
    /// The owner had at most one child and was removed with it.
    RemovedNode,
    /// The owner was blanked and its data block removed.
    RemovedDataBlock,
    /// The owner has other children and no data block first; nothing removed.
    Unchanged,
}

pub struct SheetController {
    caps: Capabilities,
    store: BufferedStore,
    block: SheetBlock,
    workbook: Workbook,
    source: ReadSource,
    scheduler: SaveScheduler,
    ready: bool,
}

impl SheetController {
    /// Read the block's workbook. A new or migrated workbook gets a data
    /// block inserted as the owner's first child, and the owner is collapsed.
    pub fn open(caps: Capabilities, settings: &Settings, block: SheetBlock) -> Result<Self, SheetError> {
        let store = BufferedStore::new(caps.clone(), settings);
        let legacy_key = block.legacy_key.as_deref().unwrap_or(&block.id);
        let outcome = store.read_with_legacy_key(&block.id, legacy_key)?;

        if outcome.needs_data_block() {
            let text = encode(&outcome.workbook)?;
            caps.documents
                .insert_child_node(&block.id, &text, InsertOptions::child())
                .map_err(SheetError::Host)?;
            caps.documents
                .set_collapsed(&block.id, true)
                .map_err(SheetError::Host)?;
            info!("{}: inserted data block ({:?})", block.id, outcome.source);
        }

        Ok(Self {
            scheduler: SaveScheduler::new(settings.save_delay()),
            caps,
            store,
            block,
            workbook: outcome.workbook,
            source: outcome.source,
            ready: true,
        })
    }

    pub fn block(&self) -> &SheetBlock {
        &self.block
    }

    pub fn name(&self) -> &str {
        &self.block.name
    }

    pub fn source(&self) -> ReadSource {
        self.source
    }

    /// False once the controller is torn down or its block deleted.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn has_pending_save(&self) -> bool {
        self.scheduler.is_pending()
    }

    pub fn store(&self) -> &BufferedStore {
        &self.store
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    /// Mutable access for the editor. Call [`note_edit`](Self::note_edit)
    /// afterwards, or use [`edit`](Self::edit).
    pub fn workbook_mut(&mut self) -> &mut Workbook {
        &mut self.workbook
    }

    /// Apply an edit and schedule a save.
    pub fn edit<R>(&mut self, now: Instant, f: impl FnOnce(&mut Workbook) -> R) -> R {
        let result = f(&mut self.workbook);
        self.note_edit(now);
        result
    }

    /// Reschedule the pending save to `now + delay`.
    pub fn note_edit(&mut self, now: Instant) {
        if !self.ready {
            debug!("{}: edit ignored, controller not ready", self.block.id);
            return;
        }
        self.scheduler.schedule(now);
        debug!("{}: save scheduled in {:?}", self.block.id, self.scheduler.delay());
    }

    /// Run the pending save if it is due. Returns true if a save ran.
    pub fn poll(&mut self, now: Instant) -> Result<bool, SheetError> {
        if !self.scheduler.take_due(now) {
            return Ok(false);
        }
        debug!("{}: debounced save due", self.block.id);
        self.save()?;
        Ok(true)
    }

    /// Renumber sheet order and write the workbook to the buffer now.
    pub fn save(&mut self) -> Result<(), SheetError> {
        if !self.ready {
            return Ok(());
        }
        self.scheduler.cancel();
        self.workbook.normalize_order();
        self.store.buffer_write(&self.block.id, &self.workbook)
    }

    /// Save synchronously, bypassing the delay, and stop accepting edits.
    pub fn teardown(&mut self) -> Result<(), SheetError> {
        if self.ready {
            self.save()?;
            self.ready = false;
        }
        Ok(())
    }

    /// Save, then flush every buffered snapshot into the document.
    pub fn save_and_flush(&mut self) -> Result<FlushReport, SheetError> {
        self.save()?;
        let report = self.store.flush_all()?;
        self.caps
            .notifier
            .show_message(&format!("\"{}\" saved.", self.block.name));
        Ok(report)
    }

    /// Rewrite the renderer macro in the owner's content to use `new_name`.
    /// Only the first occurrence is replaced.
    pub fn rename(&mut self, new_name: &str) -> Result<RenameOutcome, SheetError> {
        let new_name = new_name.trim();
        let owner = self.fetch(&self.block.id, false)?;
        let renderer = &self.store.settings().renderer_macro;

        let pattern = format!(
            r"(?i)\{{\{{renderer :{},\s*{}\s*\}}\}}",
            regex::escape(renderer),
            regex::escape(&self.block.name)
        );
        let re = Regex::new(&pattern).map_err(|e| SheetError::Host(e.to_string()))?;

        if new_name.is_empty() || !re.is_match(&owner.content) {
            debug!("{}: no renderer macro for {:?}", self.block.id, self.block.name);
            return Ok(RenameOutcome::NoMatch);
        }

        let replacement = format!("{{{{renderer :{}, {}}}}}", renderer, new_name);
        let content = re.replace(&owner.content, NoExpand(&replacement));
        self.caps
            .documents
            .update_node(&self.block.id, &content)
            .map_err(SheetError::Host)?;

        info!("{}: renamed {:?} to {:?}", self.block.id, self.block.name, new_name);
        self.block.name = new_name.to_string();
        Ok(RenameOutcome::Renamed)
    }

    /// Delete the sheet after confirmation. Cancels any pending save and
    /// discards the buffer entry when something was removed.
    pub fn delete(&mut self) -> Result<DeleteOutcome, SheetError> {
        let prompt = format!("You sure to delete \"{}\"?", self.block.name);
        if !self.caps.confirmer.confirm(&prompt) {
            return Ok(DeleteOutcome::Declined);
        }

        self.scheduler.cancel();
        let owner = self.fetch(&self.block.id, true)?;
        let documents = &self.caps.documents;

        let outcome = if owner.children.len() <= 1 {
            documents.remove_node(&owner.id).map_err(SheetError::Host)?;
            DeleteOutcome::RemovedNode
        } else {
            match owner.first_child().filter(|child| is_snapshot(&child.content)) {
                Some(data_block) => {
                    documents.update_node(&owner.id, "").map_err(SheetError::Host)?;
                    documents
                        .remove_node(&data_block.id)
                        .map_err(SheetError::Host)?;
                    DeleteOutcome::RemovedDataBlock
                }
                None => DeleteOutcome::Unchanged,
            }
        };

        if outcome != DeleteOutcome::Unchanged {
            self.store.discard(&self.block.id)?;
        }
        self.ready = false;
        info!("{}: delete {:?}", self.block.id, outcome);
        Ok(outcome)
    }

    /// Overwrite the parent block with the active sheet as a Markdown table.
    /// Returns the written Markdown.
    pub fn sync_to_parent(&self) -> Result<String, SheetError> {
        let target = self.block.reference.as_deref().unwrap_or(&self.block.id);
        let node = self.fetch(target, false)?;

        let Some(parent) = node.parent_block() else {
            let err = SheetError::MissingParent;
            self.caps.notifier.show_message(&err.user_message());
            return Err(err);
        };
        let parent = self.fetch(parent, false)?;

        let markdown = project(self.workbook.active_sheet());
        self.caps
            .documents
            .update_node(&parent.id, &markdown)
            .map_err(SheetError::Host)?;
        info!("{}: synced table to parent {}", self.block.id, parent.id);
        Ok(markdown)
    }

    /// Copy the active sheet's last selection as tab-separated text.
    /// Returns `None` without touching the clipboard when nothing is selected.
    pub fn copy_selection_as_tsv(&self) -> Result<Option<String>, SheetError> {
        let sheet = self.workbook.active_sheet();
        let Some(range) = sheet.last_selection() else {
            debug!("{}: nothing selected", self.block.id);
            return Ok(None);
        };

        let text = range_to_tsv(sheet, range);
        self.caps
            .clipboard
            .write_text(&text)
            .map_err(SheetError::Host)?;
        self.caps.notifier.show_message("Selection copied");
        Ok(Some(text))
    }

    fn fetch(&self, id: &str, include_children: bool) -> Result<Node, SheetError> {
        self.caps
            .documents
            .get_node(id, include_children)
            .map_err(SheetError::Host)?
            .ok_or_else(|| SheetError::NodeNotFound(id.to_string()))
    }
}
