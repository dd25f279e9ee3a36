use crate::ids::CallId;
use tokio_util::sync::CancellationToken;

/// Handle for one in-flight call, allowing the issuer to request early
/// termination. Cancelling is fire-and-forget and idempotent; cancelling
/// after the call has already terminated is a no-op. The cancelled call still
/// resolves through the normal error channel, so callers must wait for the
/// terminal `on_error` to know the call is fully settled.
#[derive(Debug, Clone)]
pub struct Canceler {
    id: CallId,
    token: CancellationToken,
}

impl Canceler {
    pub fn new(id: CallId, token: CancellationToken) -> Self {
        Canceler { id, token }
    }

    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_idempotent() {
        let token = CancellationToken::new();
        let canceler = Canceler::new(CallId::new(1), token.clone());

        assert!(!canceler.is_cancelled());
        canceler.cancel();
        assert!(canceler.is_cancelled());

        // A second cancel must not panic or change anything.
        canceler.cancel();
        assert!(canceler.is_cancelled());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_clones_share_the_token() {
        let canceler = Canceler::new(CallId::new(2), CancellationToken::new());
        let clone = canceler.clone();

        clone.cancel();
        assert!(canceler.is_cancelled());
        assert_eq!(clone.id(), canceler.id());
    }
}
