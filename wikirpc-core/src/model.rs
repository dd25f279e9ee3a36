use serde::{Deserialize, Serialize};
use std::fmt;

/// A fetched wiki page, wrapping the rendered HTML returned by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    html: String,
}

impl Page {
    pub fn new(html: impl Into<String>) -> Self {
        Page { html: html.into() }
    }

    pub fn html(&self) -> &str {
        &self.html
    }
}

/// One hit of a full-text search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Page identifier the hit points at.
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub snippet: String,
}

/// Login data for one remote wiki.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keeps the password out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
