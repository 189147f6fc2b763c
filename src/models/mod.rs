//! Data models shared across pipeline stages.

mod asset;
mod batch;
mod document;
mod route;
mod snapshot;

pub use asset::{AssetCandidate, AssetSource, BlobRecord};
pub use batch::{BatchFailure, BatchOutcome};
pub use document::{DocumentType, PageDocument};
pub use route::{AliasEntry, Resolution, RouteContract, RouteEntry, RouteKind, StatusOverride};
pub use snapshot::Snapshot;
