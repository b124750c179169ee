// Snapshot codec, projections and text exports

pub mod csv;
pub mod markdown;
pub mod snapshot;
pub mod tsv;

pub use markdown::project;
pub use snapshot::{decode, decode_payload, encode, is_snapshot, SnapshotError};
