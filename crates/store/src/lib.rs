//! Persistence and lifecycle of spreadsheet blocks embedded in a host
//! document.
//!
//! The host is reached only through the traits in [`host`]; everything here
//! is single-threaded and shares the host behind `Rc`.

pub mod buffer;
pub mod controller;
pub mod error;
pub mod host;
pub mod ledger;
pub mod memory;
pub mod scheduler;

pub use buffer::{BufferedStore, FlushReport, ReadOutcome, ReadSource};
pub use controller::{DeleteOutcome, RenameOutcome, SheetBlock, SheetController};
pub use error::SheetError;
pub use host::{Capabilities, InsertOptions, Node};
pub use scheduler::SaveScheduler;
