use crate::filter::parse_query;
use crate::gateway::{FetchError, PushEvent, QueryError};
use crate::item::{ItemDetails, ItemId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

// Tags are persisted next to the files they describe, keyed by relative
// path, so they survive reopening the repository.
const TAG_STORE_FILE: &str = ".tagview.json";

#[derive(Error, Debug)]
pub enum OpenError {
    #[error("repository path does not exist")]
    PathDoesNotExist,
    #[error("repository path is not a directory")]
    NotADirectory,
}

#[derive(Debug, Clone)]
struct Record {
    rel_path: String,
    tags: BTreeSet<String>,
}

#[derive(Serialize, Deserialize, Default)]
struct TagStore {
    tags: BTreeMap<String, BTreeSet<String>>,
}

// In-process repository backend: scans a directory tree, assigns stable
// incrementing ids, and answers queries and detail fetches. Ids survive
// renames and tag edits; only deletion retires an id. Mutations return the
// push events the gateway should broadcast.
#[derive(Debug)]
pub struct FileRepo {
    root: PathBuf,
    next_id: i64,
    records: BTreeMap<ItemId, Record>,
    by_path: HashMap<String, ItemId>,
}

fn rel_path_string(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let raw = rel.to_string_lossy().to_string();
    // Stable separator on every platform, for display and the tag store.
    Some(raw.replace('\\', "/"))
}

fn scan_root(root: &Path) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| {
            e.file_name()
                .to_str()
                .map(|name| !name.starts_with('.'))
                .unwrap_or(true)
        })
        .flatten()
    {
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(rel) = rel_path_string(entry.path(), root) {
            out.insert(rel);
        }
    }
    out
}

impl FileRepo {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, OpenError> {
        let root = root
            .as_ref()
            .canonicalize()
            .map_err(|_| OpenError::PathDoesNotExist)?;
        if !root.is_dir() {
            return Err(OpenError::NotADirectory);
        }

        let store = Self::load_tag_store(&root);
        let mut repo = Self {
            root,
            next_id: 1,
            records: BTreeMap::new(),
            by_path: HashMap::new(),
        };
        for rel_path in scan_root(&repo.root) {
            let tags = store.tags.get(&rel_path).cloned().unwrap_or_default();
            repo.insert_record(rel_path, tags);
        }
        info!(items = repo.records.len(), root = %repo.root.display(), "opened repository");
        Ok(repo)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn insert_record(&mut self, rel_path: String, tags: BTreeSet<String>) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        self.by_path.insert(rel_path.clone(), id);
        self.records.insert(id, Record { rel_path, tags });
        id
    }

    // Ordered list of ids matching the filter; iteration order is id order,
    // which is scan order for the initial population.
    pub fn query_ids(&self, text: &str) -> Result<Vec<ItemId>, QueryError> {
        let spec = parse_query(text)?;
        Ok(self
            .records
            .iter()
            .filter(|(_, rec)| spec.matches(&rec.rel_path, &rec.tags))
            .map(|(id, _)| *id)
            .collect())
    }

    pub fn item_details(&self, id: ItemId) -> Result<ItemDetails, FetchError> {
        let record = self.records.get(&id).ok_or(FetchError::ItemNotFound(id))?;
        Ok(ItemDetails::new(
            self.root.join(&record.rel_path),
            record.tags.clone(),
        ))
    }

    pub fn id_for_path(&self, rel_path: &str) -> Option<ItemId> {
        self.by_path.get(rel_path).copied()
    }

    pub fn insert_tags(
        &mut self,
        ids: &[ItemId],
        tags: &[String],
    ) -> Result<Vec<PushEvent>, FetchError> {
        self.mutate_tags(ids, tags, true)
    }

    pub fn remove_tags(
        &mut self,
        ids: &[ItemId],
        tags: &[String],
    ) -> Result<Vec<PushEvent>, FetchError> {
        self.mutate_tags(ids, tags, false)
    }

    fn mutate_tags(
        &mut self,
        ids: &[ItemId],
        tags: &[String],
        insert: bool,
    ) -> Result<Vec<PushEvent>, FetchError> {
        let mut events = Vec::with_capacity(ids.len());
        for &id in ids {
            let record = self
                .records
                .get_mut(&id)
                .ok_or(FetchError::ItemNotFound(id))?;
            for tag in tags {
                let tag = tag.trim();
                if tag.is_empty() {
                    continue;
                }
                if insert {
                    record.tags.insert(tag.to_string());
                } else {
                    record.tags.remove(tag);
                }
            }
            events.push(PushEvent::TagChanged(id, self.item_details(id)?));
        }
        if !events.is_empty() {
            self.save_tag_store();
        }
        Ok(events)
    }

    // A file moved within the repository keeps its id; only details change.
    pub fn rename_path(&mut self, old_rel: &str, new_rel: &str) -> Result<PushEvent, FetchError> {
        let id = self
            .by_path
            .remove(old_rel)
            .ok_or(FetchError::Unavailable(format!("no item at {old_rel}")))?;
        self.by_path.insert(new_rel.to_string(), id);
        if let Some(record) = self.records.get_mut(&id) {
            record.rel_path = new_rel.to_string();
        }
        self.save_tag_store();
        Ok(PushEvent::ItemRenamed(id, self.item_details(id)?))
    }

    // Rescan and patch incrementally: removed paths retire their ids, new
    // paths get fresh ids. Tags of removed items are dropped.
    pub fn resync(&mut self) -> Vec<PushEvent> {
        let on_disk = scan_root(&self.root);
        let known: BTreeSet<String> = self.by_path.keys().cloned().collect();

        let mut events = Vec::new();
        for rel_path in known.difference(&on_disk) {
            let Some(id) = self.by_path.remove(rel_path) else {
                continue;
            };
            self.records.remove(&id);
            events.push(PushEvent::ItemRemoved(id));
        }
        for rel_path in on_disk.difference(&known) {
            let id = self.insert_record(rel_path.clone(), BTreeSet::new());
            events.push(PushEvent::ItemAdded(id));
        }
        if !events.is_empty() {
            info!(changes = events.len(), "resync patched repository");
            self.save_tag_store();
        } else {
            debug!("resync found no changes");
        }
        events
    }

    // Full rebuild: every id is reassigned, so the client must invalidate
    // wholesale rather than patch.
    pub fn reload(&mut self) -> Result<PushEvent, OpenError> {
        let root = self.root.clone();
        *self = Self::open(root)?;
        Ok(PushEvent::RepositoryResynced)
    }

    fn load_tag_store(root: &Path) -> TagStore {
        let path = root.join(TAG_STORE_FILE);
        let Ok(text) = fs::read_to_string(&path) else {
            return TagStore::default();
        };
        match serde_json::from_str(&text) {
            Ok(store) => store,
            Err(err) => {
                warn!(path = %path.display(), %err, "ignoring malformed tag store");
                TagStore::default()
            }
        }
    }

    fn save_tag_store(&self) {
        let mut store = TagStore::default();
        for record in self.records.values() {
            if !record.tags.is_empty() {
                store
                    .tags
                    .insert(record.rel_path.clone(), record.tags.clone());
            }
        }
        let path = self.root.join(TAG_STORE_FILE);
        let text = match serde_json::to_string_pretty(&store) {
            Ok(text) => text,
            Err(err) => {
                warn!(%err, "failed to serialize tag store");
                return;
            }
        };
        if let Err(err) = fs::write(&path, text) {
            warn!(path = %path.display(), %err, "failed to write tag store");
        }
    }
}
