use crate::ids::CallId;
use crate::listener::{ListenerEntry, LoginListener, PageListener, SearchListener};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::trace;

/// Maps a call identifier to the listener that originated the call.
///
/// An id is inserted exactly once, immediately after its call is issued, and
/// removed exactly once, when the call's terminal outcome is dispatched. The
/// typed `take_*` operations remove an entry only when its kind matches, so a
/// mismatched dispatch can never consume somebody else's entry. All
/// operations are safe under concurrent access from caller and worker
/// contexts.
pub struct ListenerRegistry {
    entries: DashMap<CallId, ListenerEntry>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        ListenerRegistry {
            entries: DashMap::new(),
        }
    }

    /// Stores the listener for a freshly issued call. The id is minted per
    /// call by the client, so it can never already be present.
    pub fn register(&self, id: CallId, entry: ListenerEntry) {
        trace!(%id, kind = entry.kind(), "registering listener");
        let previous = self.entries.insert(id, entry);
        debug_assert!(previous.is_none(), "listener already registered for {id}");
    }

    pub fn lookup_login(&self, id: CallId) -> Option<Arc<dyn LoginListener>> {
        self.entries.get(&id).and_then(|entry| match &*entry {
            ListenerEntry::Login(l) => Some(Arc::clone(l)),
            _ => None,
        })
    }

    pub fn lookup_search(&self, id: CallId) -> Option<Arc<dyn SearchListener>> {
        self.entries.get(&id).and_then(|entry| match &*entry {
            ListenerEntry::Search(l) => Some(Arc::clone(l)),
            _ => None,
        })
    }

    pub fn lookup_page(&self, id: CallId) -> Option<Arc<dyn PageListener>> {
        self.entries.get(&id).and_then(|entry| match &*entry {
            ListenerEntry::Page(l) => Some(Arc::clone(l)),
            _ => None,
        })
    }

    /// Removes and returns the login listener for `id`, only if the entry is
    /// of login kind. Atomic with respect to concurrent takes: at most one
    /// caller wins the entry.
    pub fn take_login(&self, id: CallId) -> Option<Arc<dyn LoginListener>> {
        self.entries
            .remove_if(&id, |_, entry| matches!(entry, ListenerEntry::Login(_)))
            .and_then(|(_, entry)| match entry {
                ListenerEntry::Login(l) => Some(l),
                _ => None,
            })
    }

    pub fn take_search(&self, id: CallId) -> Option<Arc<dyn SearchListener>> {
        self.entries
            .remove_if(&id, |_, entry| matches!(entry, ListenerEntry::Search(_)))
            .and_then(|(_, entry)| match entry {
                ListenerEntry::Search(l) => Some(l),
                _ => None,
            })
    }

    pub fn take_page(&self, id: CallId) -> Option<Arc<dyn PageListener>> {
        self.entries
            .remove_if(&id, |_, entry| matches!(entry, ListenerEntry::Page(_)))
            .and_then(|(_, entry)| match entry {
                ListenerEntry::Page(l) => Some(l),
                _ => None,
            })
    }

    /// Removes and returns whatever entry is registered under `id`. Used for
    /// the error path, which terminates a call of any kind.
    pub fn take_any(&self, id: CallId) -> Option<ListenerEntry> {
        self.entries.remove(&id).map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canceler::Canceler;
    use crate::error::WikiError;
    use crate::model::{Page, SearchResult};
    use crate::LoadingListener;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[derive(Default)]
    struct NullListener {
        errors: AtomicUsize,
        ends: AtomicUsize,
    }

    impl LoadingListener for NullListener {
        fn on_start_loading(&self, _canceler: Canceler, _id: CallId) {}
        fn on_end_loading(&self, _id: CallId) {
            self.ends.fetch_add(1, Ordering::SeqCst);
        }
        fn on_error(&self, _error: WikiError, _id: CallId) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl LoginListener for NullListener {
        fn on_login(&self, _succeeded: bool, _id: CallId) {}
    }

    impl SearchListener for NullListener {
        fn on_search_results(&self, _results: Vec<SearchResult>, _id: CallId) {}
    }

    impl PageListener for NullListener {
        fn on_page_loaded(&self, _page: Page) {}
    }

    fn page_entry() -> ListenerEntry {
        ListenerEntry::Page(Arc::new(NullListener::default()))
    }

    #[test]
    fn test_lookup_matches_kind() {
        let registry = ListenerRegistry::new();
        let id = CallId::new(7);
        registry.register(id, page_entry());

        assert!(registry.lookup_page(id).is_some());
        assert!(registry.lookup_search(id).is_none());
        assert!(registry.lookup_login(id).is_none());
        // Lookup is non-destructive.
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_take_removes_only_on_matching_kind() {
        let registry = ListenerRegistry::new();
        let id = CallId::new(7);
        registry.register(id, page_entry());

        // A search outcome for a page entry must not consume it.
        assert!(registry.take_search(id).is_none());
        assert_eq!(registry.len(), 1);

        assert!(registry.take_page(id).is_some());
        assert!(registry.is_empty());

        // Second take finds nothing.
        assert!(registry.take_page(id).is_none());
    }

    #[test]
    fn test_take_unknown_id_is_none() {
        let registry = ListenerRegistry::new();
        assert!(registry.take_any(CallId::new(99)).is_none());
        assert!(registry.take_login(CallId::new(99)).is_none());
    }

    #[test]
    fn test_take_any_returns_entry_of_any_kind() {
        let registry = ListenerRegistry::new();
        let id = CallId::new(3);
        registry.register(id, ListenerEntry::Search(Arc::new(NullListener::default())));

        let entry = registry.take_any(id).unwrap();
        assert_eq!(entry.kind(), "search");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_takes_deliver_exactly_once() {
        let registry = Arc::new(ListenerRegistry::new());
        let id = CallId::new(1);
        registry.register(id, page_entry());

        let winners = Arc::new(AtomicUsize::new(0));
        let mut handles = vec![];
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            let winners = Arc::clone(&winners);
            handles.push(thread::spawn(move || {
                if registry.take_page(id).is_some() {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    proptest! {
        // Each registered id yields exactly one successful take, no matter
        // how often or in what order terminal dispatches are attempted.
        #[test]
        fn prop_at_most_one_delivery(kinds in proptest::collection::vec(0u8..3, 1..32)) {
            let registry = ListenerRegistry::new();
            let ids: Vec<CallId> = (0..kinds.len() as u64).map(|n| CallId::new(n + 1)).collect();

            for (id, kind) in ids.iter().zip(&kinds) {
                let entry = match kind {
                    0 => ListenerEntry::Login(Arc::new(NullListener::default())),
                    1 => ListenerEntry::Search(Arc::new(NullListener::default())),
                    _ => ListenerEntry::Page(Arc::new(NullListener::default())),
                };
                registry.register(*id, entry);
            }

            let mut successes = 0usize;
            // Two full dispatch passes, the second in reverse order.
            for id in ids.iter().chain(ids.iter().rev()) {
                if registry.take_any(*id).is_some() {
                    successes += 1;
                }
            }

            prop_assert_eq!(successes, kinds.len());
            prop_assert!(registry.is_empty());
        }
    }
}
