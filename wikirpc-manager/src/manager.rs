use crate::cache::Cache;
use crate::credentials::CredentialStore;
use crate::dispatcher::Dispatcher;
use crate::wiki::Wiki;
use std::sync::Arc;
use tracing::{debug, warn};
use wikirpc_client::{PendingCall, WikiClient};
use wikirpc_core::{
    CallSink, Canceler, Credentials, ListenerEntry, ListenerRegistry, LoadingListener,
    LoginListener, PageListener, SearchListener,
};

/// Facade over one complete remote wiki: its call client, saved credentials,
/// cache and the routing of call outcomes back to callers. One instance
/// exists per wiki; the [`crate::WikiCatalog`] hands them out.
///
/// Every asynchronous operation follows the same shape: the call is prepared,
/// the caller's listener is registered under the call's id, the caller is
/// told `on_start_loading` with the cancellation handle, and only then does
/// the call start running. The listener later receives exactly one terminal
/// callback (result or `on_error`) followed by `on_end_loading`. Operations
/// must be invoked within a Tokio runtime.
pub struct WikiManager {
    wiki: Wiki,
    store: Arc<CredentialStore>,
    client: Arc<WikiClient>,
    cache: Cache,
    registry: Arc<ListenerRegistry>,
    dispatcher: Arc<Dispatcher>,
}

impl WikiManager {
    /// Wires a facade from its collaborators. Credentials persisted in the
    /// store are mirrored into the client, so the first call after a restart
    /// is already authenticated.
    pub fn new(wiki: Wiki, client: WikiClient, store: CredentialStore, cache: Cache) -> Arc<Self> {
        let client = Arc::new(client);
        let store = Arc::new(store);

        if let Some(credentials) = store.credentials() {
            client.set_credentials(credentials);
        }

        let registry = Arc::new(ListenerRegistry::new());
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&store),
            Arc::clone(&client),
        ));

        Arc::new(Self {
            wiki,
            store,
            client,
            cache,
            registry,
            dispatcher,
        })
    }

    pub fn wiki(&self) -> &Wiki {
        &self.wiki
    }

    /// Fetch the rendered HTML of `page`. The listener's `on_start_loading`
    /// fires before this returns; `on_page_loaded` or `on_error` follows
    /// later, then `on_end_loading`.
    pub fn get_page(&self, listener: Arc<dyn PageListener>, page: &str) -> Canceler {
        debug!(wiki = %self.wiki, page, "fetching page");
        let call = self.client.begin_get_page(page);
        self.dispatch(call, ListenerEntry::Page(listener))
    }

    /// Full-text search for pages containing `query`. The raw term is
    /// wrapped in the server's wildcard syntax, so partial matches hit too.
    pub fn search(&self, listener: Arc<dyn SearchListener>, query: &str) -> Canceler {
        debug!(wiki = %self.wiki, query, "searching");
        let call = self.client.begin_search(&format!("*{}*", query));
        self.dispatch(call, ListenerEntry::Search(listener))
    }

    /// Attempt a login with `credentials`. When `save` is set they are also
    /// persisted for this wiki; a rejected login clears both the persisted
    /// and the in-memory copy before the listener hears about it.
    pub fn login(
        &self,
        listener: Arc<dyn LoginListener>,
        credentials: Credentials,
        save: bool,
    ) -> Canceler {
        debug!(wiki = %self.wiki, user = %credentials.username, save, "logging in");

        if save {
            if let Err(err) = self.store.save(&credentials) {
                warn!(wiki = %self.wiki, "failed to persist credentials: {err}");
            }
        }
        self.client.set_credentials(credentials.clone());

        let call = self.client.begin_login(credentials);
        self.dispatch(call, ListenerEntry::Login(listener))
    }

    /// Logs out locally: drops saved and in-memory credentials. No remote
    /// call is made and no listener is involved.
    pub fn logout(&self) {
        debug!(wiki = %self.wiki, "logging out");
        self.store.clear();
        self.client.clear_credentials();
    }

    /// Whether a credential is currently set for outgoing calls.
    pub fn has_credentials(&self) -> bool {
        self.client.has_credentials()
    }

    /// Number of calls issued but not yet resolved.
    pub fn pending_calls(&self) -> usize {
        self.registry.len()
    }

    pub fn cache_size(&self) -> u64 {
        self.cache.size_in_bytes()
    }

    /// Deletes all cached pages and media for this wiki. Saved credentials
    /// are not touched.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    // Registration and start-loading happen before the call runs, so the
    // listener always learns the canceler before any terminal event, and the
    // registry can never miss the outcome.
    fn dispatch(&self, call: PendingCall, entry: ListenerEntry) -> Canceler {
        let canceler = call.canceler();
        let id = call.id();
        let listener = entry.clone();

        self.registry.register(id, entry);
        listener.as_loading().on_start_loading(canceler.clone(), id);
        call.spawn(Arc::clone(&self.dispatcher) as Arc<dyn CallSink>);

        canceler
    }
}
