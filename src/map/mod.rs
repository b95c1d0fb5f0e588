mod cluster;
mod markers;
mod projection;
mod refresh;

pub use cluster::CLUSTER_DISTANCE_PX;
pub use markers::{ClickTarget, MapGesture, MarkerHandle, MarkerKind, MarkerLayer};
pub use projection::{MAX_LATITUDE, MAX_ZOOM, MIN_ZOOM, MapView, Projection};
pub use refresh::{RefreshOutcome, Refresher, TickOutcome};
