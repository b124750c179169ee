//! Buffered snapshot store.
//!
//! Edits are written to ephemeral storage first (the buffer entry) and only
//! later flushed into the host document. A buffer entry always wins over
//! the durable copy, so edits survive a reload that happens before a flush.

use log::{debug, info, warn};

use sheetblock_config::Settings;
use sheetblock_engine::workbook::Workbook;
use sheetblock_io::{decode, decode_payload, encode, is_snapshot};

use crate::error::SheetError;
use crate::host::{Capabilities, InsertOptions};
use crate::ledger::{self, RecoveryLedger};

/// Where a read found its workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    Buffer,
    /// The node's first child data block.
    Document,
    /// Migrated from the legacy file store.
    Legacy,
    /// Nothing stored; a fresh workbook.
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadOutcome {
    /// True only for a freshly created workbook.
    pub created: bool,
    pub source: ReadSource,
    pub workbook: Workbook,
}

impl ReadOutcome {
    /// The node has no data block yet and one must be inserted.
    pub fn needs_data_block(&self) -> bool {
        matches!(self.source, ReadSource::Legacy | ReadSource::Default)
    }
}

/// Result of writing every buffered snapshot into the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub flushed: Vec<String>,
    /// Ledger ids with nothing to flush or whose node is gone.
    pub orphaned: Vec<String>,
}

pub struct BufferedStore {
    caps: Capabilities,
    settings: Settings,
    ledger: RecoveryLedger,
}

impl BufferedStore {
    pub fn new(caps: Capabilities, settings: &Settings) -> Self {
        let ledger = RecoveryLedger::new(caps.storage.clone(), settings.ledger_key());
        Self {
            caps,
            settings: settings.clone(),
            ledger,
        }
    }

    pub fn buffer_key(&self, node: &str) -> String {
        self.settings.buffer_key(node)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn ledger(&self) -> &RecoveryLedger {
        &self.ledger
    }

    /// Encode `workbook` into the node's buffer entry and record the node
    /// in the recovery ledger.
    pub fn buffer_write(&self, node: &str, workbook: &Workbook) -> Result<(), SheetError> {
        if !ledger::is_recordable(node) {
            return Err(SheetError::InvalidNodeId(node.to_string()));
        }
        let text = encode(workbook)?;
        let key = self.buffer_key(node);
        self.caps.storage.set(&key, &text).map_err(SheetError::Host)?;
        self.ledger.record(node).map_err(SheetError::Host)?;
        debug!("buffered {} bytes for {}", text.len(), node);
        Ok(())
    }

    pub fn buffer_read(&self, node: &str) -> Option<String> {
        self.caps.storage.get(&self.buffer_key(node))
    }

    /// Drop the node's buffer entry and its ledger record.
    pub fn discard(&self, node: &str) -> Result<(), SheetError> {
        self.caps.storage.remove(&self.buffer_key(node));
        self.ledger.remove(node).map_err(SheetError::Host)
    }

    /// Resolve the workbook for `node`, using `node` as the legacy file key.
    pub fn read(&self, node: &str) -> Result<ReadOutcome, SheetError> {
        self.read_with_legacy_key(node, node)
    }

    /// Resolve the workbook for `node`: buffer entry, then the node's first
    /// child data block, then the legacy file `legacy_key`, then a fresh
    /// default workbook.
    pub fn read_with_legacy_key(&self, node: &str, legacy_key: &str) -> Result<ReadOutcome, SheetError> {
        if let Some(text) = self.buffer_read(node) {
            debug!("{node}: reading buffered snapshot");
            return Ok(ReadOutcome {
                created: false,
                source: ReadSource::Buffer,
                workbook: decode(&text)?,
            });
        }

        let owner = self
            .caps
            .documents
            .get_node(node, true)
            .map_err(SheetError::Host)?;
        if let Some(child) = owner.as_ref().and_then(|n| n.first_child()) {
            if is_snapshot(&child.content) {
                debug!("{node}: reading data block {}", child.id);
                return Ok(ReadOutcome {
                    created: false,
                    source: ReadSource::Document,
                    workbook: decode(&child.content)?,
                });
            }
        }

        if self.caps.legacy.has(legacy_key).map_err(SheetError::Host)? {
            if let Some(text) = self.caps.legacy.get(legacy_key).map_err(SheetError::Host)? {
                info!("{node}: migrating legacy file {legacy_key}");
                return Ok(ReadOutcome {
                    created: false,
                    source: ReadSource::Legacy,
                    workbook: decode_payload(&text)?,
                });
            }
        }

        debug!("{node}: no stored workbook, creating one");
        Ok(ReadOutcome {
            created: true,
            source: ReadSource::Default,
            workbook: Workbook::with_sheet_name(&self.settings.default_sheet_name),
        })
    }

    /// Write every buffered snapshot into its node's data block (updating
    /// the first child if it is one, inserting a new first child otherwise),
    /// drop the flushed entries and compact the ledger.
    pub fn flush_all(&self) -> Result<FlushReport, SheetError> {
        let mut report = FlushReport::default();

        for id in self.ledger.ids() {
            let Some(text) = self.buffer_read(&id) else {
                report.orphaned.push(id);
                continue;
            };

            let documents = &self.caps.documents;
            let Some(node) = documents.get_node(&id, true).map_err(SheetError::Host)? else {
                warn!("dropping buffered snapshot of deleted node {id}");
                self.caps.storage.remove(&self.buffer_key(&id));
                report.orphaned.push(id);
                continue;
            };

            let written = match node.first_child().filter(|child| is_snapshot(&child.content)) {
                Some(child) => documents.update_node(&child.id, &text),
                None => documents
                    .insert_child_node(&id, &text, InsertOptions::child())
                    .map(|_| ()),
            };
            written.map_err(SheetError::Host)?;

            self.caps.storage.remove(&self.buffer_key(&id));
            report.flushed.push(id);
        }

        let dropped = self
            .ledger
            .compact(|id| self.buffer_read(id).is_some())
            .map_err(SheetError::Host)?;
        if !dropped.is_empty() {
            warn!("compacted {} orphaned ledger entries", dropped.len());
        }
        info!("flushed {} buffered snapshots", report.flushed.len());

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::EphemeralStorage;
    use crate::memory::MemoryHost;

    fn store() -> (MemoryHost, BufferedStore) {
        let host = MemoryHost::new();
        host.documents.add_page("page");
        host.documents.add_node("owner", "page", "{{renderer :luckysheet, Budget}}");
        let store = BufferedStore::new(host.capabilities(), &Settings::default());
        (host, store)
    }

    fn sample() -> Workbook {
        let mut wb = Workbook::new();
        wb.active_sheet_mut().set_value(0, 0, "buffered");
        wb
    }

    #[test]
    fn test_buffer_write_records_ledger() {
        let (host, store) = store();
        store.buffer_write("owner", &sample()).unwrap();

        let text = host.storage.get("kef-sheet-buffer-owner").unwrap();
        assert!(text.starts_with("```json\n"));
        assert_eq!(host.storage.get("kef-sheet-uuids").as_deref(), Some("owner,"));
        assert_eq!(store.buffer_read("owner"), Some(text));
    }

    #[test]
    fn test_buffer_write_refuses_separator_in_id() {
        let (host, store) = store();
        let err = store.buffer_write("a,b", &sample()).unwrap_err();

        assert_eq!(err, SheetError::InvalidNodeId("a,b".to_string()));
        assert_eq!(host.storage.get("kef-sheet-buffer-a,b"), None);
        assert_eq!(host.storage.get("kef-sheet-uuids"), None);
    }

    #[test]
    fn test_default_read_is_created() {
        let (_, store) = store();
        let outcome = store.read("owner").unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.source, ReadSource::Default);
        assert!(outcome.needs_data_block());
        assert_eq!(outcome.workbook, Workbook::new());
    }

    #[test]
    fn test_default_sheet_name_from_settings() {
        let host = MemoryHost::new();
        let settings = Settings { default_sheet_name: "Data".into(), ..Settings::default() };
        let store = BufferedStore::new(host.capabilities(), &settings);
        let outcome = store.read("nowhere").unwrap();
        assert_eq!(outcome.workbook.sheet_names(), ["Data"]);
    }

    #[test]
    fn test_corrupt_buffer_is_malformed() {
        let (host, store) = store();
        host.storage.set("kef-sheet-buffer-owner", "```json\n[{oops]\n```").unwrap();
        assert!(matches!(store.read("owner"), Err(SheetError::MalformedSnapshot(_))));
    }

    #[test]
    fn test_discard() {
        let (host, store) = store();
        store.buffer_write("owner", &sample()).unwrap();
        store.discard("owner").unwrap();
        assert_eq!(store.buffer_read("owner"), None);
        assert!(host.storage.keys().is_empty());
    }

    #[test]
    fn test_custom_prefix() {
        let host = MemoryHost::new();
        let settings = Settings { key_prefix: "notes".into(), ..Settings::default() };
        let store = BufferedStore::new(host.capabilities(), &settings);
        store.buffer_write("n1", &Workbook::new()).unwrap();
        assert_eq!(host.storage.keys(), ["notes-buffer-n1", "notes-uuids"]);
    }
}
