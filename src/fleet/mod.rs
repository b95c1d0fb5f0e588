mod fetch;
mod parse;
mod snapshot;

pub use fetch::{HttpSnapshotSource, SnapshotSource};
pub use snapshot::{Entity, GeoPoint, Snapshot};
