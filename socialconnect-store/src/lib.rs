//! Encrypted on-disk persistence for the whole social network state.
//!
//! The state is split into five records (users, posts, id counters, verification requests and
//! comment reports). Each one is serialized, sealed with [`cipher::RecordCipher`] and written to
//! its own file, so a damaged file only costs the collection it holds.

pub mod cipher;
pub mod client;
pub mod record;

pub use client::{Snapshot, SnapshotRef, StoreClient, StoreError};
