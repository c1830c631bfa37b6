//! The seam between the publisher and a concrete catalog.

use std::sync::Arc;

use crate::config::{Credentials, PublishRequest, ServerConfig};
use crate::error::Result;
use crate::session::CatalogSession;

/// What the catalog reports back after a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub datasource_id: String,
    pub row_count: Option<u64>,
}

/// A remote (or local) catalog.
///
/// Each call is one blocking round trip. Implementations must leave the
/// target entry unchanged whenever `publish` returns an error.
pub trait CatalogTransport {
    /// Short name for logs ("http", "local").
    fn name(&self) -> &'static str;

    fn authenticate(&self, server: &ServerConfig, credentials: &Credentials)
        -> Result<CatalogSession>;

    fn publish(&self, session: &CatalogSession, request: &PublishRequest)
        -> Result<PublishReceipt>;

    fn sign_out(&self, session: &CatalogSession) -> Result<()>;
}

/// Shared transports, so a caller can keep a handle on a catalog the
/// publisher owns.
impl<T: CatalogTransport + ?Sized> CatalogTransport for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn authenticate(&self, server: &ServerConfig, credentials: &Credentials)
        -> Result<CatalogSession> {
        (**self).authenticate(server, credentials)
    }

    fn publish(&self, session: &CatalogSession, request: &PublishRequest)
        -> Result<PublishReceipt> {
        (**self).publish(session, request)
    }

    fn sign_out(&self, session: &CatalogSession) -> Result<()> {
        (**self).sign_out(session)
    }
}
