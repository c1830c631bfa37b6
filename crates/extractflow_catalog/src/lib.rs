//! Catalog publishing for committed extracts.
//!
//! A [`CatalogPublisher`] signs in through a [`CatalogTransport`], ships one
//! extract file to a named entry in one of three [`PublishMode`]s, and signs
//! out again on every path. Two transports exist:
//!
//! - [`HttpCatalog`] speaks the REST sign-in / multipart publish protocol
//! - [`LocalCatalog`] treats a directory tree as the catalog, which is what
//!   the tests and offline runs use
//!
//! [`open_transport`] picks one from the server address scheme.
//!
//! [`PublishMode`]: extractflow_protocol::PublishMode

pub mod config;
pub mod error;
pub mod http;
pub mod local;
pub mod publisher;
pub mod session;
pub mod transport;

pub use config::{Credentials, PublishRequest, ServerConfig};
pub use error::{PublishError, Result};
pub use http::HttpCatalog;
pub use local::LocalCatalog;
pub use publisher::{CatalogPublisher, PublishPhase, Published};
pub use session::{CatalogSession, SessionGuard};
pub use transport::{CatalogTransport, PublishReceipt};

/// Build the transport for a server address.
///
/// `file://` addresses open a [`LocalCatalog`]; `http://` and `https://`
/// open an [`HttpCatalog`].
pub fn open_transport(server: &ServerConfig) -> Result<Box<dyn CatalogTransport>> {
    let address = server.address.trim();
    if address.starts_with("file://") {
        Ok(Box::new(LocalCatalog::from_address(address)?))
    } else if address.starts_with("http://") || address.starts_with("https://") {
        Ok(Box::new(HttpCatalog::new(server)?))
    } else {
        Err(PublishError::transport(format!(
            "unsupported catalog address '{}' (expected file://, http:// or https://)",
            server.address
        )))
    }
}
