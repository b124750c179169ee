use std::fmt;

use sheetblock_io::SnapshotError;

/// Failures of store and controller operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetError {
    /// A snapshot (buffered, durable or legacy) could not be decoded or encoded.
    MalformedSnapshot(String),
    /// Sync requested for a block whose parent is the page itself.
    MissingParent,
    NodeNotFound(String),
    /// The node id cannot be stored in the recovery ledger.
    InvalidNodeId(String),
    /// A host capability reported a failure.
    Host(String),
}

impl SheetError {
    /// Text shown to the user, in place of the editor for read failures or
    /// as a transient message otherwise.
    pub fn user_message(&self) -> String {
        match self {
            SheetError::MalformedSnapshot(_) => "Data read error!".to_string(),
            SheetError::MissingParent => "Spreadsheet needs to have a parent block".to_string(),
            SheetError::NodeNotFound(id) => format!("Block {id} no longer exists"),
            SheetError::InvalidNodeId(id) => format!("Block {id} cannot be saved"),
            SheetError::Host(msg) => msg.clone(),
        }
    }
}

impl fmt::Display for SheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetError::MalformedSnapshot(msg) => write!(f, "malformed snapshot: {msg}"),
            SheetError::MissingParent => write!(f, "block has no parent block"),
            SheetError::NodeNotFound(id) => write!(f, "node not found: {id}"),
            SheetError::InvalidNodeId(id) => write!(f, "invalid node id {id:?}"),
            SheetError::Host(msg) => write!(f, "host error: {msg}"),
        }
    }
}

impl std::error::Error for SheetError {}

impl From<SnapshotError> for SheetError {
    fn from(err: SnapshotError) -> Self {
        SheetError::MalformedSnapshot(err.to_string())
    }
}
