//! Data models for LOOP

mod failed_sync;
mod ordered_item;
mod organisation;

pub use failed_sync::{FailedSync, FailedSyncId};
pub use ordered_item::{ItemId, OrderedItem, PartitionKey};
pub use organisation::{Organisation, OrganisationDraft, OrganisationId, SyncState};
