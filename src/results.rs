use crate::cache::DetailCache;
use crate::gateway::{PushEvent, QueryError};
use crate::item::ItemId;
use crate::selection::Selection;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub request_id: u64,
    pub text: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    pub request_id: u64,
    pub result: Result<Vec<ItemId>, QueryError>,
}

// What happens to coupled state when the pending query resolves. Replace is
// a structural cycle (query/path change, resync): the detail cache and the
// selection go with the old list. Refresh re-runs the current query after an
// item-added event: existing cache entries stay valid, only the selection
// (positional, about to shift) is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleKind {
    Replace,
    Refresh,
}

// Owns the ordered id list matching the active query, plus the two pieces of
// coupled state: the position-based selection and the detail cache. All
// cross-component invalidation flows through here; nothing mutates the
// selection or the cache behind the controller's back on structural changes.
//
// Stale results are discarded by generation token: every issued request
// carries a fresh id, and a response is applied only if its id is still the
// pending one.
#[derive(Debug, Default)]
pub struct ResultListController {
    items: Vec<ItemId>,
    query: String,
    path: Option<PathBuf>,
    next_request_id: u64,
    pending: Option<(u64, CycleKind)>,
    invalid_query: bool,
    pub selection: Selection,
    pub cache: DetailCache,
}

impl ResultListController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub fn item_at(&self, position: usize) -> Option<ItemId> {
        self.items.get(position).copied()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub fn invalid_query(&self) -> bool {
        self.invalid_query
    }

    pub fn query_in_flight(&self) -> bool {
        self.pending.is_some()
    }

    // Begin a new query cycle for already-debounced text. Returns the
    // request to issue, or None when no repository path is set (the list is
    // emptied instead of querying).
    pub fn set_query(&mut self, text: impl Into<String>) -> Option<QueryRequest> {
        self.query = text.into();
        self.begin_cycle(CycleKind::Replace)
    }

    pub fn set_repository_path(&mut self, path: Option<PathBuf>) -> Option<QueryRequest> {
        self.path = path;
        self.begin_cycle(CycleKind::Replace)
    }

    fn begin_cycle(&mut self, kind: CycleKind) -> Option<QueryRequest> {
        let Some(path) = self.path.clone() else {
            // Supersede any in-flight query; its result must not land on the
            // emptied list.
            self.pending = None;
            self.items.clear();
            self.cache.clear();
            self.selection.clear();
            self.invalid_query = false;
            return None;
        };
        self.next_request_id += 1;
        let request_id = self.next_request_id;
        // A Refresh superseding a pending Replace must not downgrade it: the
        // resolving list still replaces the old query's list wholesale, so
        // the cache clear is still owed.
        let kind = match self.pending {
            Some((_, CycleKind::Replace)) => CycleKind::Replace,
            _ => kind,
        };
        self.pending = Some((request_id, kind));
        debug!(request_id, query = %self.query, "issuing query");
        Some(QueryRequest {
            request_id,
            text: self.query.clone(),
            path,
        })
    }

    pub fn apply_query_response(&mut self, response: QueryResponse) {
        let Some((pending_id, kind)) = self.pending else {
            debug!(request_id = response.request_id, "dropping response with no query in flight");
            return;
        };
        if response.request_id != pending_id {
            // Superseded by a newer query or path change; expected, not an
            // error.
            debug!(
                request_id = response.request_id,
                pending_id, "dropping superseded query result"
            );
            return;
        }
        self.pending = None;

        match response.result {
            Ok(items) => {
                info!(count = items.len(), "result list updated");
                self.items = items;
                self.invalid_query = false;
                self.selection.clear();
                if kind == CycleKind::Replace {
                    self.cache.clear();
                }
            }
            Err(QueryError::InvalidQuery) => {
                // Recovered locally: last-known-good list and selection stay.
                self.invalid_query = true;
            }
            Err(err) => {
                warn!(%err, "query failed; keeping last-known-good results");
            }
        }
    }

    // Incremental, non-discarding updates from the backend. May return a
    // follow-up query request (item-added has no cheap client-side
    // membership test; resync and path changes restart the cycle).
    pub fn apply_push_event(&mut self, event: PushEvent) -> Option<QueryRequest> {
        match event {
            PushEvent::ItemAdded(id) => {
                debug!(%id, "item added; re-running current query");
                self.begin_cycle(CycleKind::Refresh)
            }
            PushEvent::ItemRemoved(id) => {
                if let Some(position) = self.items.iter().position(|&it| it == id) {
                    self.items.remove(position);
                    // Positions after the removal shifted; the positional
                    // selection is dropped rather than remapped.
                    self.selection.clear();
                }
                None
            }
            PushEvent::ItemRenamed(id, details) | PushEvent::TagChanged(id, details) => {
                // Content-only: list membership and order are unaffected.
                self.cache.insert(id, details);
                None
            }
            PushEvent::RepositoryPathChanged(path) => self.set_repository_path(Some(path)),
            PushEvent::RepositoryResynced => {
                self.cache.clear();
                self.selection.clear();
                self.begin_cycle(CycleKind::Replace)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemDetails;
    use std::collections::BTreeSet;

    fn ids(raw: &[i64]) -> Vec<ItemId> {
        raw.iter().map(|&n| ItemId(n)).collect()
    }

    fn details(name: &str, tags: &[&str]) -> ItemDetails {
        ItemDetails::new(
            PathBuf::from(name),
            tags.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
        )
    }

    fn controller_with(items: &[i64]) -> ResultListController {
        let mut ctl = ResultListController::new();
        let req = ctl
            .set_repository_path(Some(PathBuf::from("/repo")))
            .expect("request");
        ctl.apply_query_response(QueryResponse {
            request_id: req.request_id,
            result: Ok(ids(items)),
        });
        ctl
    }

    #[test]
    fn no_path_means_empty_list_and_no_request() {
        let mut ctl = ResultListController::new();
        assert!(ctl.set_query("docs").is_none());
        assert!(ctl.items().is_empty());
        assert!(!ctl.query_in_flight());
    }

    #[test]
    fn stale_result_from_superseded_query_is_dropped() {
        let mut ctl = ResultListController::new();
        ctl.set_repository_path(Some(PathBuf::from("/repo")));
        let first = ctl.set_query("first").expect("request");
        let second = ctl.set_query("second").expect("request");

        // Second query resolves before the first.
        ctl.apply_query_response(QueryResponse {
            request_id: second.request_id,
            result: Ok(ids(&[20, 21])),
        });
        ctl.apply_query_response(QueryResponse {
            request_id: first.request_id,
            result: Ok(ids(&[10])),
        });

        assert_eq!(ctl.items(), ids(&[20, 21]).as_slice());
    }

    #[test]
    fn clearing_path_supersedes_in_flight_query() {
        let mut ctl = ResultListController::new();
        ctl.set_repository_path(Some(PathBuf::from("/repo")));
        let req = ctl.set_query("docs").expect("request");
        assert!(ctl.set_repository_path(None).is_none());
        ctl.apply_query_response(QueryResponse {
            request_id: req.request_id,
            result: Ok(ids(&[1, 2, 3])),
        });
        assert!(ctl.items().is_empty());
    }

    #[test]
    fn successful_query_clears_cache_and_selection() {
        let mut ctl = controller_with(&[10, 11, 12]);
        ctl.cache.insert(ItemId(10), details("a.txt", &[]));
        ctl.selection.isolate(1);

        let req = ctl.set_query("other").expect("request");
        ctl.apply_query_response(QueryResponse {
            request_id: req.request_id,
            result: Ok(ids(&[30])),
        });

        assert_eq!(ctl.items(), ids(&[30]).as_slice());
        assert!(ctl.cache.is_empty());
        assert!(ctl.selection.is_empty());
    }

    #[test]
    fn item_added_during_query_change_still_clears_cache() {
        let mut ctl = controller_with(&[10, 11]);
        ctl.cache.insert(ItemId(10), details("a.txt", &[]));

        // An item-added refresh lands while the query change is in flight
        // and supersedes it. The resolving list still belongs to the new
        // query text, so the cache goes with the old list.
        let _superseded = ctl.set_query("newtext").expect("request");
        let refresh = ctl
            .apply_push_event(PushEvent::ItemAdded(ItemId(3)))
            .expect("request");
        ctl.apply_query_response(QueryResponse {
            request_id: refresh.request_id,
            result: Ok(ids(&[3])),
        });

        assert_eq!(ctl.items(), ids(&[3]).as_slice());
        assert!(ctl.cache.is_empty());
    }

    #[test]
    fn invalid_query_keeps_list_and_selection_and_sets_flag() {
        let mut ctl = controller_with(&[10, 11]);
        ctl.selection.isolate(0);

        let req = ctl.set_query("path:\"oops").expect("request");
        ctl.apply_query_response(QueryResponse {
            request_id: req.request_id,
            result: Err(QueryError::InvalidQuery),
        });

        assert!(ctl.invalid_query());
        assert_eq!(ctl.items(), ids(&[10, 11]).as_slice());
        assert_eq!(ctl.selection.positions(), vec![0]);

        // The next successful cycle clears the flag.
        let req = ctl.set_query("ok").expect("request");
        ctl.apply_query_response(QueryResponse {
            request_id: req.request_id,
            result: Ok(ids(&[10])),
        });
        assert!(!ctl.invalid_query());
    }

    #[test]
    fn backend_failure_keeps_last_known_good_without_invalid_flag() {
        let mut ctl = controller_with(&[10, 11]);
        let req = ctl.set_query("docs").expect("request");
        ctl.apply_query_response(QueryResponse {
            request_id: req.request_id,
            result: Err(QueryError::Unavailable("io".to_string())),
        });
        assert_eq!(ctl.items(), ids(&[10, 11]).as_slice());
        assert!(!ctl.invalid_query());
    }

    #[test]
    fn item_added_rerequeries_but_preserves_cache() {
        let mut ctl = controller_with(&[10, 11]);
        ctl.cache.insert(ItemId(10), details("a.txt", &[]));

        let req = ctl
            .apply_push_event(PushEvent::ItemAdded(ItemId(12)))
            .expect("refresh request");
        ctl.apply_query_response(QueryResponse {
            request_id: req.request_id,
            result: Ok(ids(&[10, 11, 12])),
        });

        assert_eq!(ctl.items(), ids(&[10, 11, 12]).as_slice());
        assert_eq!(ctl.cache.lookup(ItemId(10)), Some(&details("a.txt", &[])));
        assert!(ctl.selection.is_empty());
    }

    #[test]
    fn item_removed_patches_list_in_place_and_clears_selection() {
        let mut ctl = controller_with(&[10, 11, 12, 13]);
        ctl.selection.isolate(2);

        assert!(ctl.apply_push_event(PushEvent::ItemRemoved(ItemId(11))).is_none());
        // Stable removal: relative order of the rest is preserved.
        assert_eq!(ctl.items(), ids(&[10, 12, 13]).as_slice());
        // Positional selection is cleared, not remapped.
        assert!(ctl.selection.is_empty());
    }

    #[test]
    fn item_removed_for_unknown_id_is_a_no_op() {
        let mut ctl = controller_with(&[10, 11]);
        ctl.selection.isolate(0);
        ctl.apply_push_event(PushEvent::ItemRemoved(ItemId(99)));
        assert_eq!(ctl.items(), ids(&[10, 11]).as_slice());
        assert_eq!(ctl.selection.positions(), vec![0]);
    }

    #[test]
    fn tag_change_overwrites_cache_without_touching_list_or_selection() {
        let mut ctl = controller_with(&[10, 11]);
        ctl.cache.insert(ItemId(11), details("b.txt", &[]));
        ctl.selection.isolate(1);

        ctl.apply_push_event(PushEvent::TagChanged(ItemId(11), details("b.txt", &["new"])));

        assert_eq!(ctl.items(), ids(&[10, 11]).as_slice());
        assert_eq!(ctl.selection.positions(), vec![1]);
        assert_eq!(ctl.cache.lookup(ItemId(11)), Some(&details("b.txt", &["new"])));
    }

    #[test]
    fn resync_invalidates_everything_and_requeries() {
        let mut ctl = controller_with(&[10, 11]);
        ctl.cache.insert(ItemId(10), details("a.txt", &[]));
        ctl.selection.select_all(2);

        let req = ctl
            .apply_push_event(PushEvent::RepositoryResynced)
            .expect("requery");
        assert!(ctl.cache.is_empty());
        assert!(ctl.selection.is_empty());
        ctl.apply_query_response(QueryResponse {
            request_id: req.request_id,
            result: Ok(ids(&[40])),
        });
        assert_eq!(ctl.items(), ids(&[40]).as_slice());
    }

    #[test]
    fn path_changed_event_restarts_cycle_for_new_path() {
        let mut ctl = controller_with(&[10]);
        let req = ctl
            .apply_push_event(PushEvent::RepositoryPathChanged(PathBuf::from("/other")))
            .expect("request");
        assert_eq!(req.path, PathBuf::from("/other"));
        assert_eq!(ctl.path(), Some(&PathBuf::from("/other")));
    }
}
