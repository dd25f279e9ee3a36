use crate::canceler::Canceler;
use crate::error::WikiError;
use crate::ids::CallId;
use crate::model::{Page, SearchResult};
use std::sync::Arc;

/// Common capability of every caller-supplied listener.
///
/// `on_start_loading` fires synchronously when the call is issued, before any
/// terminal event for the same id can be observed. Exactly one terminal
/// callback (`on_error` or the result callback of the concrete listener kind)
/// follows, and `on_end_loading` immediately follows that terminal callback.
pub trait LoadingListener: Send + Sync {
    fn on_start_loading(&self, canceler: Canceler, id: CallId);
    fn on_end_loading(&self, id: CallId);
    fn on_error(&self, error: WikiError, id: CallId);
}

/// Listener for the outcome of a login call.
pub trait LoginListener: LoadingListener {
    fn on_login(&self, succeeded: bool, id: CallId);
}

/// Listener for the results of a search call.
pub trait SearchListener: LoadingListener {
    fn on_search_results(&self, results: Vec<SearchResult>, id: CallId);
}

/// Listener for a fetched page.
pub trait PageListener: LoadingListener {
    fn on_page_loaded(&self, page: Page);
}

/// The registry's storage form of a caller's listener, closed over the fixed
/// set of call kinds so dispatch is an exhaustive match rather than a runtime
/// type check.
#[derive(Clone)]
pub enum ListenerEntry {
    Login(Arc<dyn LoginListener>),
    Search(Arc<dyn SearchListener>),
    Page(Arc<dyn PageListener>),
}

impl ListenerEntry {
    /// The common capability, regardless of call kind.
    pub fn as_loading(&self) -> &dyn LoadingListener {
        match self {
            ListenerEntry::Login(l) => l.as_ref(),
            ListenerEntry::Search(l) => l.as_ref(),
            ListenerEntry::Page(l) => l.as_ref(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ListenerEntry::Login(_) => "login",
            ListenerEntry::Search(_) => "search",
            ListenerEntry::Page(_) => "page",
        }
    }
}

impl std::fmt::Debug for ListenerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ListenerEntry").field(&self.kind()).finish()
    }
}
