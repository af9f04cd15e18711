pub mod collections;
pub mod common;
pub mod failed_syncs;
pub mod organisations;
