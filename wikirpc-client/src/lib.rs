pub mod client;
pub mod http;
pub mod transport;

pub use client::{ClientConfig, PendingCall, WikiClient};
pub use http::HttpTransport;
pub use transport::WikiTransport;
