use extractflow_protocol::CatalogTarget;
use extractflow_sinks::ExtractError;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by catalog publishing.
///
/// None of these are retried. The catalog entry keeps its previous
/// content whenever one of them is returned.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Publish precondition failed for {target}: {message}")]
    Precondition {
        target: CatalogTarget,
        message: String,
    },

    #[error("Catalog transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Extract cannot be published: {0}")]
    Extract(#[from] ExtractError),
}

impl PublishError {
    pub fn auth(message: impl Into<String>) -> Self {
        PublishError::Auth {
            message: message.into(),
        }
    }

    pub fn precondition(target: &CatalogTarget, message: impl Into<String>) -> Self {
        PublishError::Precondition {
            target: target.clone(),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        PublishError::Transport {
            message: message.into(),
            source: None,
        }
    }

    pub fn transport_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        PublishError::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Short category name, stable for logs and exit messages.
    pub fn kind(&self) -> &'static str {
        match self {
            PublishError::Auth { .. } => "auth",
            PublishError::Precondition { .. } => "precondition",
            PublishError::Transport { .. } => "transport",
            PublishError::Extract(_) => "extract",
        }
    }
}

pub type Result<T> = std::result::Result<T, PublishError>;
