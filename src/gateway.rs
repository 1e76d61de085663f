use crate::item::{ItemDetails, ItemId};
use std::path::PathBuf;
use thiserror::Error;

// Unsolicited notifications from the repository backend. Structural events
// (added/removed/resynced) touch the ordered result list; content events
// (renamed/tag-changed) only touch detail records.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    ItemAdded(ItemId),
    ItemRemoved(ItemId),
    ItemRenamed(ItemId, ItemDetails),
    TagChanged(ItemId, ItemDetails),
    RepositoryPathChanged(PathBuf),
    RepositoryResynced,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("invalid search query")]
    InvalidQuery,
    #[error("repository unavailable, {0}")]
    Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("no item with id {0}")]
    ItemNotFound(ItemId),
    #[error("repository unavailable, {0}")]
    Unavailable(String),
}
