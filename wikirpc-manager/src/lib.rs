pub mod cache;
pub mod catalog;
pub mod credentials;
mod dispatcher;
pub mod logging;
pub mod manager;
pub mod wiki;

pub use cache::Cache;
pub use catalog::{CatalogConfig, WikiCatalog};
pub use credentials::{CredentialStore, StoreError};
pub use logging::{init_logging, init_test_logging};
pub use manager::WikiManager;
pub use wiki::Wiki;
