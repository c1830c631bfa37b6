//! Canonical default values shared across crates.

pub const DEFAULT_NAMESPACE: &str = "Extract";
pub const DEFAULT_TABLE: &str = "Extract";
pub const DEFAULT_API_VERSION: &str = "3.0";
pub const DEFAULT_EXTRACT_PATH: &str = "data.extract";
pub const EXTRACT_EXTENSION: &str = "extract";
