//! Authenticate → publish → release, once per call.

use std::fmt;

use chrono::{DateTime, Local, Utc};
use extractflow_protocol::{CatalogTarget, PublishMode};
use extractflow_sinks::inspect_extract;
use tracing::{debug, info, warn};

use crate::config::{Credentials, PublishRequest, ServerConfig};
use crate::error::{PublishError, Result};
use crate::session::SessionGuard;
use crate::transport::CatalogTransport;

/// Where a publish call is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishPhase {
    Idle,
    Authenticating,
    Publishing,
    Published,
    Failed,
}

impl PublishPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishPhase::Idle => "idle",
            PublishPhase::Authenticating => "authenticating",
            PublishPhase::Publishing => "publishing",
            PublishPhase::Published => "published",
            PublishPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PublishPhase::Published | PublishPhase::Failed)
    }
}

impl fmt::Display for PublishPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal success of a publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub target: CatalogTarget,
    pub mode: PublishMode,
    pub datasource_id: String,
    pub row_count: Option<u64>,
    pub published_at: DateTime<Utc>,
}

impl Published {
    /// Publish time in local wall-clock form, `YYYY-MM-DD HH:MM:SS`.
    pub fn local_time(&self) -> String {
        self.published_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}

/// Ships committed extracts to one catalog with one set of credentials.
pub struct CatalogPublisher {
    transport: Box<dyn CatalogTransport>,
    server: ServerConfig,
    credentials: Credentials,
    phase: PublishPhase,
}

impl CatalogPublisher {
    pub fn new(
        transport: Box<dyn CatalogTransport>,
        server: ServerConfig,
        credentials: Credentials,
    ) -> Self {
        Self {
            transport,
            server,
            credentials,
            phase: PublishPhase::Idle,
        }
    }

    pub fn phase(&self) -> PublishPhase {
        self.phase
    }

    pub fn transport(&self) -> &dyn CatalogTransport {
        self.transport.as_ref()
    }

    fn enter(&mut self, next: PublishPhase) {
        debug!("Publish phase: {} -> {}", self.phase, next);
        self.phase = next;
    }

    /// Publish one committed extract.
    ///
    /// The extract is checked before any network traffic. The session is
    /// released before this returns, whatever the outcome.
    pub fn publish(&mut self, request: &PublishRequest) -> Result<Published> {
        self.phase = PublishPhase::Idle;
        let summary = match inspect_extract(&request.extract) {
            Ok(summary) => summary,
            Err(err) => {
                self.enter(PublishPhase::Failed);
                return Err(PublishError::Extract(err));
            }
        };
        info!(
            target_entry = %request.target,
            mode = %request.mode,
            rows = summary.num_rows,
            transport = self.transport.name(),
            "Publishing extract {}",
            request.extract.display()
        );

        let outcome = self.run(request);
        match &outcome {
            Ok(published) => {
                self.enter(PublishPhase::Published);
                info!(
                    "Published {} ({}) at {}",
                    published.target, published.datasource_id, published.published_at
                );
            }
            Err(err) => {
                self.enter(PublishPhase::Failed);
                warn!(kind = err.kind(), "Publish of {} failed: {}", request.target, err);
            }
        }
        outcome
    }

    fn run(&mut self, request: &PublishRequest) -> Result<Published> {
        self.enter(PublishPhase::Authenticating);
        let guard = SessionGuard::open(self.transport.as_ref(), &self.server, &self.credentials)?;

        // `guard` borrows the transport, so set the phase field directly.
        debug!("Publish phase: {} -> {}", self.phase, PublishPhase::Publishing);
        self.phase = PublishPhase::Publishing;
        let session = guard
            .session()
            .ok_or_else(|| PublishError::auth("session released before publish"))?;
        let receipt = self.transport.publish(session, request)?;
        drop(guard);

        Ok(Published {
            target: request.target.clone(),
            mode: request.mode,
            datasource_id: receipt.datasource_id,
            row_count: receipt.row_count,
            published_at: Utc::now(),
        })
    }
}
