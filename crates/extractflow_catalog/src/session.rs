//! Catalog sessions and their scoped release.

use std::fmt;

use tracing::{debug, warn};

use crate::config::{Credentials, ServerConfig};
use crate::error::Result;
use crate::transport::CatalogTransport;

/// An authenticated session handed out by a transport.
#[derive(Clone, PartialEq, Eq)]
pub struct CatalogSession {
    pub token: String,
    pub site_id: String,
    pub user_id: Option<String>,
}

impl fmt::Debug for CatalogSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogSession")
            .field("token", &"<redacted>")
            .field("site_id", &self.site_id)
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Signs the session out when dropped, on every exit path.
pub struct SessionGuard<'a> {
    transport: &'a dyn CatalogTransport,
    session: Option<CatalogSession>,
}

impl<'a> SessionGuard<'a> {
    /// Authenticate and take ownership of the resulting session.
    pub fn open(
        transport: &'a dyn CatalogTransport,
        server: &ServerConfig,
        credentials: &Credentials,
    ) -> Result<Self> {
        let session = transport.authenticate(server, credentials)?;
        debug!(site_id = %session.site_id, "Session opened");
        Ok(Self {
            transport,
            session: Some(session),
        })
    }

    pub fn session(&self) -> Option<&CatalogSession> {
        self.session.as_ref()
    }

    /// Sign out now and report the outcome.
    pub fn close(mut self) -> Result<()> {
        match self.session.take() {
            Some(session) => self.transport.sign_out(&session),
            None => Ok(()),
        }
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            match self.transport.sign_out(&session) {
                Ok(()) => debug!(site_id = %session.site_id, "Session released"),
                Err(err) => warn!("Failed to sign out of catalog session: {}", err),
            }
        }
    }
}
