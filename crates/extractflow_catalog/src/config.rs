//! Connection settings and publish requests.

use std::fmt;
use std::path::PathBuf;

use extractflow_protocol::defaults::DEFAULT_API_VERSION;
use extractflow_protocol::{CatalogTarget, PublishMode};
use serde::{Deserialize, Serialize};

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

/// Where the catalog lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// `https://host`, `http://host:port` or `file:///path/to/catalog`.
    pub address: String,
    /// Site identity; empty for the default site.
    #[serde(default)]
    pub site: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Request timeout for HTTP catalogs; `None` keeps the client default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ServerConfig {
    pub fn new(address: impl Into<String>, site: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            site: site.into(),
            api_version: default_api_version(),
            timeout_secs: None,
        }
    }

    /// Address without trailing slashes.
    pub fn base_url(&self) -> &str {
        self.address.trim_end_matches('/')
    }
}

/// Sign-in credentials. Secrets never appear in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Credentials {
    UsernamePassword {
        username: String,
        /// May be left out of config files and supplied from the environment.
        #[serde(default)]
        password: String,
    },
    AccessToken {
        name: String,
        #[serde(default)]
        secret: String,
    },
}

impl Credentials {
    /// The non-secret half, for logs.
    pub fn principal(&self) -> &str {
        match self {
            Credentials::UsernamePassword { username, .. } => username,
            Credentials::AccessToken { name, .. } => name,
        }
    }

    pub fn secret(&self) -> &str {
        match self {
            Credentials::UsernamePassword { password, .. } => password,
            Credentials::AccessToken { secret, .. } => secret,
        }
    }

    /// Replace the secret, keeping the kind and principal.
    pub fn with_secret(self, secret: impl Into<String>) -> Self {
        match self {
            Credentials::UsernamePassword { username, .. } => Credentials::UsernamePassword {
                username,
                password: secret.into(),
            },
            Credentials::AccessToken { name, .. } => Credentials::AccessToken {
                name,
                secret: secret.into(),
            },
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::UsernamePassword { username, .. } => f
                .debug_struct("UsernamePassword")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::AccessToken { name, .. } => f
                .debug_struct("AccessToken")
                .field("name", name)
                .field("secret", &"<redacted>")
                .finish(),
        }
    }
}

/// One committed extract to ship to one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub extract: PathBuf,
    pub target: CatalogTarget,
    pub mode: PublishMode,
}

impl PublishRequest {
    pub fn new(extract: impl Into<PathBuf>, target: CatalogTarget, mode: PublishMode) -> Self {
        Self {
            extract: extract.into(),
            target,
            mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::UsernamePassword {
            username: "analyst".into(),
            password: "hunter2".into(),
        };
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("analyst"));
        assert!(!rendered.contains("hunter2"));

        let token = Credentials::AccessToken {
            name: "ci".into(),
            secret: "s3cr3t".into(),
        };
        assert!(!format!("{:?}", token).contains("s3cr3t"));
    }

    #[test]
    fn test_with_secret_keeps_kind() {
        let creds = Credentials::AccessToken {
            name: "ci".into(),
            secret: String::new(),
        }
        .with_secret("from-env");
        assert_eq!(creds.principal(), "ci");
        assert_eq!(creds.secret(), "from-env");
        assert!(matches!(creds, Credentials::AccessToken { .. }));
    }

    #[test]
    fn test_server_config_defaults_from_toml() {
        let server: ServerConfig = toml::from_str(r#"address = "https://catalog.example.com/""#)
            .unwrap();
        assert_eq!(server.site, "");
        assert_eq!(server.api_version, DEFAULT_API_VERSION);
        assert_eq!(server.base_url(), "https://catalog.example.com");
    }

    #[test]
    fn test_credentials_toml_shape() {
        let creds: Credentials = toml::from_str(
            r#"
            kind = "username_password"
            username = "analyst"
            password = "pw"
            "#,
        )
        .unwrap();
        assert_eq!(creds.principal(), "analyst");
    }
}
