use crate::credentials::CredentialStore;
use std::sync::Arc;
use tracing::debug;
use wikirpc_client::WikiClient;
use wikirpc_core::{CallId, CallOutcome, CallSink, ListenerRegistry, Page};

/// Internal recipient of raw call outcomes. Resolves the listener registered
/// under the outcome's id, invokes the matching result callback and then
/// `on_end_loading`, always in that order and exactly once per call. An
/// outcome for an id that is unknown or of a different kind is dropped
/// silently: the cancellation path can legitimately produce that race.
pub(crate) struct Dispatcher {
    registry: Arc<ListenerRegistry>,
    store: Arc<CredentialStore>,
    client: Arc<WikiClient>,
}

impl Dispatcher {
    pub(crate) fn new(
        registry: Arc<ListenerRegistry>,
        store: Arc<CredentialStore>,
        client: Arc<WikiClient>,
    ) -> Self {
        Self {
            registry,
            store,
            client,
        }
    }

    /// Both credential copies must be gone before the caller's callback runs,
    /// so calls issued from inside the callback already observe cleared state.
    fn invalidate_credentials(&self) {
        self.store.clear();
        self.client.clear_credentials();
    }
}

impl CallSink for Dispatcher {
    fn deliver(&self, id: CallId, outcome: CallOutcome) {
        match outcome {
            CallOutcome::PageHtml(html) => {
                let Some(listener) = self.registry.take_page(id) else {
                    debug!(%id, "dropping page outcome for unknown call");
                    return;
                };
                listener.on_page_loaded(Page::new(html));
                listener.on_end_loading(id);
            }
            CallOutcome::SearchResults(results) => {
                let Some(listener) = self.registry.take_search(id) else {
                    debug!(%id, "dropping search outcome for unknown call");
                    return;
                };
                listener.on_search_results(results, id);
                listener.on_end_loading(id);
            }
            CallOutcome::Login(succeeded) => {
                if !succeeded {
                    debug!(%id, "login rejected, invalidating credentials");
                    self.invalidate_credentials();
                }
                let Some(listener) = self.registry.take_login(id) else {
                    debug!(%id, "dropping login outcome for unknown call");
                    return;
                };
                listener.on_login(succeeded, id);
                listener.on_end_loading(id);
            }
            CallOutcome::Failed(error) => {
                if error.is_auth() {
                    debug!(%id, "authentication failure, invalidating credentials");
                    self.invalidate_credentials();
                }
                let Some(entry) = self.registry.take_any(id) else {
                    debug!(%id, "dropping error outcome for unknown call: {error}");
                    return;
                };
                let listener = entry.as_loading();
                listener.on_error(error, id);
                listener.on_end_loading(id);
            }
        }
    }
}
