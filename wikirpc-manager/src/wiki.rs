use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

/// Identity of one remote wiki: its URL plus a stable, filesystem-safe key
/// derived from it. The key scopes everything persisted for the wiki
/// (credential file, cache directory), so two wikis can never share state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Wiki {
    url: String,
    key: String,
}

impl Wiki {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into().trim_end_matches('/').to_string();
        let digest = Sha256::digest(url.as_bytes());
        let key = URL_SAFE_NO_PAD.encode(digest);
        Wiki { url, key }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Content-hash key, stable across runs.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Display for Wiki {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}
