//! Recovery ledger: the set of node ids that have buffered snapshots.
//!
//! Stored in ephemeral storage as a comma-joined list with a trailing comma
//! (`"a,b,"`), the format older releases appended to. Reads tolerate
//! duplicates and blanks; writes are deduplicated, so recording an id twice
//! is a no-op. Ids holding the separator or surrounding whitespace would
//! not read back as themselves and are refused.

use std::rc::Rc;

use crate::host::EphemeralStorage;

pub struct RecoveryLedger {
    storage: Rc<dyn EphemeralStorage>,
    key: String,
}

impl RecoveryLedger {
    pub fn new(storage: Rc<dyn EphemeralStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Recorded ids in first-recorded order.
    pub fn ids(&self) -> Vec<String> {
        self.storage
            .get(&self.key)
            .map(|raw| parse_ids(&raw))
            .unwrap_or_default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids().iter().any(|known| known == id)
    }

    pub fn record(&self, id: &str) -> Result<(), String> {
        if !is_recordable(id) {
            return Err(format!("node id {id:?} cannot be recorded"));
        }
        let mut ids = self.ids();
        if ids.iter().any(|known| known == id) {
            return Ok(());
        }
        ids.push(id.to_string());
        self.write(&ids)
    }

    pub fn remove(&self, id: &str) -> Result<(), String> {
        let mut ids = self.ids();
        let before = ids.len();
        ids.retain(|known| known != id);
        if ids.len() == before {
            return Ok(());
        }
        self.write(&ids)
    }

    /// Keep only ids for which `keep` holds. Returns the dropped ids.
    pub fn compact(&self, keep: impl Fn(&str) -> bool) -> Result<Vec<String>, String> {
        let (kept, dropped): (Vec<String>, Vec<String>) =
            self.ids().into_iter().partition(|id| keep(id.as_str()));
        if !dropped.is_empty() {
            self.write(&kept)?;
        }
        Ok(dropped)
    }

    fn write(&self, ids: &[String]) -> Result<(), String> {
        if ids.is_empty() {
            self.storage.remove(&self.key);
            Ok(())
        } else {
            self.storage.set(&self.key, &join_ids(ids))
        }
    }
}

/// True if `id` survives a write and read of the ledger unchanged.
pub fn is_recordable(id: &str) -> bool {
    !id.is_empty() && !id.contains(',') && id.trim() == id
}

/// Split a stored ledger into unique, non-blank ids.
pub fn parse_ids(raw: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for id in raw.split(',').map(str::trim).filter(|id| !id.is_empty()) {
        if !ids.iter().any(|known| known == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

pub fn join_ids(ids: &[String]) -> String {
    ids.iter().map(|id| format!("{id},")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStorage;

    fn ledger() -> (Rc<MemoryStorage>, RecoveryLedger) {
        let storage = Rc::new(MemoryStorage::new());
        let ledger = RecoveryLedger::new(storage.clone(), "kef-sheet-uuids");
        (storage, ledger)
    }

    #[test]
    fn test_parse_tolerates_duplicates_and_blanks() {
        assert_eq!(parse_ids("a,b,a,, c ,"), ["a", "b", "c"]);
        assert!(parse_ids("").is_empty());
    }

    #[test]
    fn test_record_is_idempotent() {
        let (storage, ledger) = ledger();
        ledger.record("a").unwrap();
        ledger.record("b").unwrap();
        ledger.record("a").unwrap();

        assert_eq!(storage.get("kef-sheet-uuids").as_deref(), Some("a,b,"));
        assert_eq!(storage.write_count("kef-sheet-uuids"), 2);
        assert!(ledger.contains("b"));
    }

    #[test]
    fn test_reads_appended_log() {
        let (storage, ledger) = ledger();
        storage.set("kef-sheet-uuids", "x,y,x,x,").unwrap();
        assert_eq!(ledger.ids(), ["x", "y"]);
    }

    #[test]
    fn test_compact_drops_and_clears() {
        let (storage, ledger) = ledger();
        storage.set("kef-sheet-uuids", "a,b,c,").unwrap();

        let dropped = ledger.compact(|id| id != "b").unwrap();
        assert_eq!(dropped, ["b"]);
        assert_eq!(storage.get("kef-sheet-uuids").as_deref(), Some("a,c,"));

        ledger.compact(|_| false).unwrap();
        assert_eq!(storage.get("kef-sheet-uuids"), None);
    }

    #[test]
    fn test_record_refuses_ids_that_would_split() {
        let (storage, ledger) = ledger();
        assert!(ledger.record("a,b").is_err());
        assert!(ledger.record(" a").is_err());
        assert!(ledger.record("").is_err());
        assert_eq!(storage.get("kef-sheet-uuids"), None);

        ledger.record("a-b_1").unwrap();
        assert_eq!(ledger.ids(), ["a-b_1"]);
    }

    #[test]
    fn test_remove() {
        let (_, ledger) = ledger();
        ledger.record("a").unwrap();
        ledger.record("b").unwrap();
        ledger.remove("a").unwrap();
        ledger.remove("zzz").unwrap();
        assert_eq!(ledger.ids(), ["b"]);
    }
}
