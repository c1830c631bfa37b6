//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use std::fmt;
use std::path::Path;

use extractflow::RefreshError;
use extractflow_catalog::PublishError;
use extractflow_schema::SchemaError;
use extractflow_sinks::ExtractError;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(
        mut self,
        suggestions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.suggestions
            .extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// File does not exist
    pub fn file_not_found(path: &Path) -> Self {
        Self::new(format!("File not found: {}", path.display()))
            .with_context("The specified file does not exist")
            .with_suggestions([
                format!("TRY: Check if the file exists: ls -la {}", path.display()),
                format!(
                    "TRY: Look for similar files: ls {}",
                    path.parent()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| ".".to_string())
                ),
            ])
    }

    /// No config given and none at the default location
    pub fn no_config(default_path: &Path) -> Self {
        Self::new("No refresh configuration found")
            .with_context(format!(
                "Neither --config was given nor does {} exist",
                default_path.display()
            ))
            .with_suggestions([
                "TRY: Pass a config file: extractflow refresh --config refresh.toml INPUT".to_string(),
                format!("TRY: Create {}", default_path.display()),
                "TRY: Show resolved paths: extractflow config".to_string(),
            ])
    }

    /// Map a pipeline failure to a message with next steps.
    pub fn from_refresh(err: &RefreshError) -> Self {
        match err {
            RefreshError::Input { path, source } => Self::new(format!(
                "Cannot read input: {}",
                path.display()
            ))
            .with_context(source.to_string())
            .with_suggestion(format!("TRY: Check the file exists: ls -la {}", path.display())),
            RefreshError::Config(message) => Self::new(message.clone())
                .with_suggestion("TRY: Add a [publish] section with server, credentials and target"),
            RefreshError::Schema(err) => Self::from_schema(err),
            RefreshError::Extract(err) => Self::from_extract(err),
            RefreshError::Publish(err) => Self::from_publish(err),
            RefreshError::Progress(source) => {
                Self::new("Failed to write progress output").with_context(source.to_string())
            }
        }
    }

    fn from_schema(err: &SchemaError) -> Self {
        let base = Self::new(err.to_string()).with_context("While building the extract schema");
        match err {
            SchemaError::DuplicateColumn { .. } => base.with_suggestion(
                "TRY: Rename one of the columns upstream; flattened keys join with '.'",
            ),
            SchemaError::EmptySchema => base.with_suggestion(
                "TRY: Check that the input holds at least one record with at least one field",
            ),
            SchemaError::UnknownOverrideColumn { .. } => base.with_suggestion(
                "TRY: Remove the entry from [schema.overrides] or fix its column name",
            ),
            SchemaError::ValueCoercion { .. } => base.with_suggestion(
                "TRY: Set schema.strict = false to store unconvertible values as null",
            ),
            _ => base,
        }
    }

    fn from_extract(err: &ExtractError) -> Self {
        let base = Self::new(err.to_string())
            .with_context("The previously committed extract, if any, is unchanged");
        match err {
            ExtractError::AlreadyExists { .. } => base.with_suggestions([
                "TRY: Use --mode create_or_replace to rebuild it",
                "TRY: Use --mode create_or_append to add rows to it",
            ]),
            ExtractError::MissingExtract { .. } => {
                base.with_suggestion("TRY: Use --mode create_or_append to create it when absent")
            }
            ExtractError::SchemaMismatch { .. } => base.with_suggestions([
                "TRY: Inspect the existing extract: extractflow inspect PATH",
                "TRY: Use --mode create_and_replace to discard it",
            ]),
            ExtractError::RowEncode { .. } => base.with_suggestion(
                "TRY: Set schema.strict = false or add a [schema.overrides] entry",
            ),
            ExtractError::Format { .. } => base.with_suggestion(
                "TRY: The file is not an extract; use a replace mode or another path",
            ),
            ExtractError::Io { .. } => {
                base.with_suggestion("TRY: Check permissions and free space in the target directory")
            }
        }
    }

    fn from_publish(err: &PublishError) -> Self {
        let base = Self::new(err.to_string())
            .with_context("The catalog entry keeps its previous content");
        match err {
            PublishError::Auth { .. } => base.with_suggestions([
                "TRY: Check publish.server.site and the credentials principal",
                "TRY: Supply the secret via EXTRACTFLOW_PASSWORD or EXTRACTFLOW_TOKEN_SECRET",
            ]),
            PublishError::Precondition { .. } => base.with_suggestions([
                "TRY: Use --publish-mode overwrite to replace the entry",
                "TRY: Check that the project exists in the catalog",
            ]),
            PublishError::Transport { .. } => base.with_suggestion(
                "TRY: Check publish.server.address and re-run; nothing is retried automatically",
            ),
            PublishError::Extract(_) => base.with_suggestion(
                "TRY: Rebuild the extract: extractflow build INPUT",
            ),
        }
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

impl From<RefreshError> for HelpfulError {
    fn from(err: RefreshError) -> Self {
        Self::from_refresh(&err)
    }
}
