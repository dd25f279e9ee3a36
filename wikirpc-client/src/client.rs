use crate::http::HttpTransport;
use crate::transport::WikiTransport;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use wikirpc_core::{CallId, CallIdAllocator, CallOutcome, CallSink, Canceler, Credentials, WikiError};

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            user_agent: concat!("wikirpc/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Issues calls against one remote wiki.
///
/// The client mints a unique [`CallId`] per call and owns the in-memory
/// credential mirror that outgoing requests read from. Calls are issued in
/// two phases: [`WikiClient::begin_get_page`] (and friends) allocates the id
/// and cancellation token without running anything, and
/// [`PendingCall::spawn`] starts the worker that eventually hands exactly one
/// [`CallOutcome`] to the sink. The gap between the phases lets the facade
/// register the caller's listener before any outcome can possibly arrive.
pub struct WikiClient {
    transport: Arc<dyn WikiTransport>,
    credentials: Arc<Mutex<Option<Credentials>>>,
    call_ids: CallIdAllocator,
}

impl WikiClient {
    pub fn new(transport: Arc<dyn WikiTransport>) -> Self {
        Self {
            transport,
            credentials: Arc::new(Mutex::new(None)),
            call_ids: CallIdAllocator::new(),
        }
    }

    /// Client over [`HttpTransport`] for the wiki at `base_url`.
    pub fn http(base_url: &str, config: &ClientConfig) -> anyhow::Result<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(base_url, config)?)))
    }

    pub fn set_credentials(&self, credentials: Credentials) {
        *self.lock_credentials() = Some(credentials);
    }

    pub fn clear_credentials(&self) {
        *self.lock_credentials() = None;
    }

    pub fn has_credentials(&self) -> bool {
        self.lock_credentials().is_some()
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.lock_credentials().clone()
    }

    pub fn begin_get_page(&self, page: &str) -> PendingCall {
        self.begin(CallRequest::Page(page.to_string()))
    }

    pub fn begin_search(&self, query: &str) -> PendingCall {
        self.begin(CallRequest::Search(query.to_string()))
    }

    pub fn begin_login(&self, credentials: Credentials) -> PendingCall {
        self.begin(CallRequest::Login(credentials))
    }

    fn begin(&self, request: CallRequest) -> PendingCall {
        let id = self.call_ids.allocate();
        debug!(%id, kind = request.kind(), "preparing call");
        PendingCall {
            id,
            token: CancellationToken::new(),
            request,
            transport: Arc::clone(&self.transport),
            credentials: Arc::clone(&self.credentials),
        }
    }

    fn lock_credentials(&self) -> MutexGuard<'_, Option<Credentials>> {
        self.credentials
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Clone)]
enum CallRequest {
    Page(String),
    Search(String),
    Login(Credentials),
}

impl CallRequest {
    fn kind(&self) -> &'static str {
        match self {
            CallRequest::Page(_) => "page",
            CallRequest::Search(_) => "search",
            CallRequest::Login(_) => "login",
        }
    }
}

/// A prepared call that has an id and a cancellation token but is not running
/// yet. Dropping it without [`PendingCall::spawn`] issues nothing.
pub struct PendingCall {
    id: CallId,
    token: CancellationToken,
    request: CallRequest,
    transport: Arc<dyn WikiTransport>,
    credentials: Arc<Mutex<Option<Credentials>>>,
}

impl PendingCall {
    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn canceler(&self) -> Canceler {
        Canceler::new(self.id, self.token.clone())
    }

    /// Starts the call on the runtime. The sink receives exactly one outcome
    /// for this call's id: the transport result, or `Failed(Canceled)` when
    /// the token wins the race. Must be called within a Tokio runtime.
    pub fn spawn(self, sink: Arc<dyn CallSink>) {
        let PendingCall {
            id,
            token,
            request,
            transport,
            credentials,
        } = self;

        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => CallOutcome::Failed(WikiError::Canceled),
                result = execute(transport, credentials, request) => {
                    result.unwrap_or_else(CallOutcome::Failed)
                }
            };
            trace!(%id, "delivering outcome");
            sink.deliver(id, outcome);
        });
    }
}

impl std::fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCall")
            .field("id", &self.id)
            .field("kind", &self.request.kind())
            .finish()
    }
}

async fn execute(
    transport: Arc<dyn WikiTransport>,
    credentials: Arc<Mutex<Option<Credentials>>>,
    request: CallRequest,
) -> Result<CallOutcome, WikiError> {
    // Snapshot the mirror at execution time, so a clear that happened before
    // this call observes cleared state.
    let creds = credentials
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone();

    match request {
        CallRequest::Page(page) => transport
            .page_html(creds.as_ref(), &page)
            .await
            .map(CallOutcome::PageHtml),
        CallRequest::Search(query) => transport
            .search(creds.as_ref(), &query)
            .await
            .map(CallOutcome::SearchResults),
        CallRequest::Login(login) => transport.login(&login).await.map(CallOutcome::Login),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use wikirpc_core::SearchResult;

    struct StaticTransport {
        html: String,
        seen_credentials: Mutex<Vec<Option<Credentials>>>,
    }

    impl StaticTransport {
        fn new(html: &str) -> Self {
            Self {
                html: html.to_string(),
                seen_credentials: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl WikiTransport for StaticTransport {
        async fn page_html(
            &self,
            credentials: Option<&Credentials>,
            _page: &str,
        ) -> Result<String, WikiError> {
            self.seen_credentials
                .lock()
                .unwrap()
                .push(credentials.cloned());
            Ok(self.html.clone())
        }

        async fn search(
            &self,
            _credentials: Option<&Credentials>,
            _query: &str,
        ) -> Result<Vec<SearchResult>, WikiError> {
            Ok(vec![])
        }

        async fn login(&self, _credentials: &Credentials) -> Result<bool, WikiError> {
            Ok(true)
        }
    }

    /// Transport whose calls never complete; cancellation is the only way out.
    struct StalledTransport;

    #[async_trait]
    impl WikiTransport for StalledTransport {
        async fn page_html(
            &self,
            _credentials: Option<&Credentials>,
            _page: &str,
        ) -> Result<String, WikiError> {
            std::future::pending().await
        }

        async fn search(
            &self,
            _credentials: Option<&Credentials>,
            _query: &str,
        ) -> Result<Vec<SearchResult>, WikiError> {
            std::future::pending().await
        }

        async fn login(&self, _credentials: &Credentials) -> Result<bool, WikiError> {
            std::future::pending().await
        }
    }

    struct ChannelSink(mpsc::UnboundedSender<(CallId, CallOutcome)>);

    impl CallSink for ChannelSink {
        fn deliver(&self, id: CallId, outcome: CallOutcome) {
            let _ = self.0.send((id, outcome));
        }
    }

    fn channel_sink() -> (Arc<ChannelSink>, mpsc::UnboundedReceiver<(CallId, CallOutcome)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(ChannelSink(tx)), rx)
    }

    #[test]
    fn test_http_client_creation() {
        let client = WikiClient::http("http://wiki.example.org", &ClientConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_call_ids_are_monotonic_per_client() {
        let client = WikiClient::new(Arc::new(StalledTransport));
        let first = client.begin_get_page("start");
        let second = client.begin_search("foo");
        let third = client.begin_login(Credentials::new("u", "p"));

        assert_eq!(first.id().as_u64(), 1);
        assert_eq!(second.id().as_u64(), 2);
        assert_eq!(third.id().as_u64(), 3);
    }

    #[tokio::test]
    async fn test_spawn_delivers_exactly_one_outcome() {
        let client = WikiClient::new(Arc::new(StaticTransport::new("<html/>")));
        let (sink, mut rx) = channel_sink();

        let call = client.begin_get_page("start");
        let id = call.id();
        call.spawn(sink);

        let (got_id, outcome) = rx.recv().await.unwrap();
        assert_eq!(got_id, id);
        assert_eq!(outcome, CallOutcome::PageHtml("<html/>".to_string()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancel_resolves_with_canceled_error() {
        let client = WikiClient::new(Arc::new(StalledTransport));
        let (sink, mut rx) = channel_sink();

        let call = client.begin_search("foo");
        let canceler = call.canceler();
        call.spawn(sink);

        canceler.cancel();

        let (id, outcome) = rx.recv().await.unwrap();
        assert_eq!(id, canceler.id());
        assert_eq!(outcome, CallOutcome::Failed(WikiError::Canceled));
    }

    #[tokio::test]
    async fn test_worker_reads_the_credential_mirror() {
        let transport = Arc::new(StaticTransport::new("<html/>"));
        let client = WikiClient::new(Arc::clone(&transport) as Arc<dyn WikiTransport>);
        let (sink, mut rx) = channel_sink();

        client.set_credentials(Credentials::new("alice", "secret"));
        assert_eq!(
            client.credentials().map(|c| c.username),
            Some("alice".to_string())
        );
        client.begin_get_page("start").spawn(Arc::clone(&sink) as Arc<dyn CallSink>);
        rx.recv().await.unwrap();

        client.clear_credentials();
        client.begin_get_page("start").spawn(sink);
        rx.recv().await.unwrap();

        let seen = transport.seen_credentials.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[0].as_ref().map(|c| c.username.as_str()),
            Some("alice")
        );
        assert!(seen[1].is_none());
    }
}
