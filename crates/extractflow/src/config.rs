//! Refresh configuration
//!
//! One TOML file describes a whole refresh:
//!
//! ```toml
//! [extract]
//! path = "orders.extract"
//! create_mode = "create_and_replace"
//! snapshot = "orders.csv"
//!
//! [schema]
//! fill_text_nulls = true
//!
//! [schema.overrides]
//! orderDate = "date"
//!
//! [publish]
//! mode = "overwrite"
//! target = { project = "Reports", name = "Orders" }
//!
//! [publish.server]
//! address = "https://catalog.example.com"
//! site = "finance"
//!
//! [publish.credentials]
//! kind = "username_password"
//! username = "analyst"
//! ```
//!
//! Secrets may be left out of the file and supplied from the environment.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use extractflow_catalog::{Credentials, ServerConfig};
use extractflow_protocol::defaults::DEFAULT_EXTRACT_PATH;
use extractflow_protocol::{CatalogTarget, CreateMode, PublishMode, TableName};
use extractflow_schema::SchemaOptions;
use serde::{Deserialize, Serialize};

fn default_extract_path() -> PathBuf {
    PathBuf::from(DEFAULT_EXTRACT_PATH)
}

/// Where and how the local extract is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractSettings {
    #[serde(default = "default_extract_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub create_mode: CreateMode,
    /// Overrides `schema.table` when set.
    #[serde(default)]
    pub table: Option<TableName>,
    /// Also write the normalised input as CSV here.
    #[serde(default)]
    pub snapshot: Option<PathBuf>,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            path: default_extract_path(),
            create_mode: CreateMode::default(),
            table: None,
            snapshot: None,
        }
    }
}

/// Which catalog entry receives the extract, and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishSettings {
    pub server: ServerConfig,
    pub credentials: Credentials,
    pub target: CatalogTarget,
    #[serde(default)]
    pub mode: PublishMode,
}

impl PublishSettings {
    pub fn validate(&self) -> Result<()> {
        if self.server.address.trim().is_empty() {
            bail!("publish.server.address is empty");
        }
        if self.target.project.trim().is_empty() || self.target.name.trim().is_empty() {
            bail!("publish.target needs both a project and a name");
        }
        if self.credentials.secret().is_empty() {
            let var = match self.credentials {
                Credentials::UsernamePassword { .. } => "EXTRACTFLOW_PASSWORD",
                Credentials::AccessToken { .. } => "EXTRACTFLOW_TOKEN_SECRET",
            };
            bail!(
                "no secret for catalog principal '{}' (set it in the config or in {})",
                self.credentials.principal(),
                var
            );
        }
        Ok(())
    }
}

/// Everything one refresh needs, read once and passed down explicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default)]
    pub extract: ExtractSettings,
    #[serde(default)]
    pub schema: SchemaOptions,
    #[serde(default)]
    pub publish: Option<PublishSettings>,
}

impl RefreshConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid refresh configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("In {}", path.display()))
    }

    /// Schema options with the extract's table identity applied.
    pub fn schema_options(&self) -> SchemaOptions {
        let mut options = self.schema.clone();
        if let Some(table) = &self.extract.table {
            options.table = table.clone();
        }
        options
    }

    /// Publish settings, required for `refresh` and `publish`.
    pub fn publish_settings(&self) -> Result<&PublishSettings> {
        let settings = self
            .publish
            .as_ref()
            .context("No [publish] section in the configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply secrets from the environment to credentials of matching kind.
    pub fn with_secrets(mut self, password: Option<String>, token_secret: Option<String>) -> Self {
        if let Some(publish) = self.publish.as_mut() {
            let secret = match publish.credentials {
                Credentials::UsernamePassword { .. } => password,
                Credentials::AccessToken { .. } => token_secret,
            };
            if let Some(secret) = secret.filter(|s| !s.is_empty()) {
                publish.credentials = publish.credentials.clone().with_secret(secret);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extractflow_protocol::ColumnType;

    const FULL: &str = r#"
        [extract]
        path = "out/orders.extract"
        create_mode = "CREATE_AND_REPLACE"
        table = { namespace = "Sales", name = "Orders" }

        [schema]
        fill_text_nulls = true

        [schema.overrides]
        orderDate = "date"

        [publish]
        mode = "overwrite"
        target = { project = "Reports", name = "Orders" }

        [publish.server]
        address = "https://catalog.example.com"
        site = "finance"

        [publish.credentials]
        kind = "username_password"
        username = "analyst"
    "#;

    #[test]
    fn test_full_config() {
        let config = RefreshConfig::from_toml_str(FULL).unwrap();
        assert_eq!(config.extract.path, PathBuf::from("out/orders.extract"));
        assert_eq!(config.extract.create_mode, CreateMode::AndReplace);

        let options = config.schema_options();
        assert_eq!(options.table, TableName::new("Sales", "Orders"));
        assert!(options.fill_text_nulls);
        assert_eq!(options.overrides.get("orderDate"), Some(&ColumnType::Date));

        let publish = config.publish.as_ref().unwrap();
        assert_eq!(publish.mode, PublishMode::Overwrite);
        assert_eq!(publish.server.site, "finance");
    }

    #[test]
    fn test_defaults_without_file_content() {
        let config = RefreshConfig::from_toml_str("").unwrap();
        assert_eq!(config.extract.path, PathBuf::from(DEFAULT_EXTRACT_PATH));
        assert_eq!(config.extract.create_mode, CreateMode::OrReplace);
        assert_eq!(config.schema_options().table, TableName::default());
        assert!(config.publish_settings().is_err());
    }

    #[test]
    fn test_missing_secret_names_env_var() {
        let config = RefreshConfig::from_toml_str(FULL).unwrap();
        let err = config.publish_settings().unwrap_err().to_string();
        assert!(err.contains("EXTRACTFLOW_PASSWORD"), "{}", err);

        let config = config.with_secrets(Some("pw".into()), Some("ignored".into()));
        let publish = config.publish_settings().unwrap();
        assert_eq!(publish.credentials.secret(), "pw");
    }

    #[test]
    fn test_token_secret_only_applies_to_tokens() {
        let toml = FULL.replace(
            "kind = \"username_password\"\n        username = \"analyst\"",
            "kind = \"access_token\"\n        name = \"ci\"",
        );
        let config = RefreshConfig::from_toml_str(&toml)
            .unwrap()
            .with_secrets(Some("pw".into()), None);
        assert!(config.publish_settings().is_err());

        let config = config.with_secrets(None, Some("tok".into()));
        assert_eq!(config.publish_settings().unwrap().credentials.secret(), "tok");
    }

    #[test]
    fn test_mode_spellings_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let cases = [
            ("create-and-replace", "createnew", CreateMode::AndReplace, PublishMode::CreateNew),
            ("CreateOrAppend", "OVERWRITE", CreateMode::OrAppend, PublishMode::Overwrite),
            ("create only", "Append", CreateMode::Only, PublishMode::Append),
        ];
        for (create, publish, create_mode, publish_mode) in cases {
            let toml = FULL
                .replace("\"CREATE_AND_REPLACE\"", &format!("\"{}\"", create))
                .replace("mode = \"overwrite\"", &format!("mode = \"{}\"", publish));
            let path = dir.path().join("refresh.toml");
            std::fs::write(&path, toml).unwrap();

            let config = RefreshConfig::load(&path).unwrap();
            assert_eq!(config.extract.create_mode, create_mode, "{}", create);
            assert_eq!(config.publish.unwrap().mode, publish_mode, "{}", publish);
        }
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let err = RefreshConfig::from_toml_str("[extract]\ncreate_mode = \"sometimes\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_load_reports_path() {
        let err = RefreshConfig::load(Path::new("/nonexistent/extractflow.toml")).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/extractflow.toml"));
    }
}
