use std::path::PathBuf;

/// Resolve the extractflow home directory.
///
/// Priority:
/// 1) EXTRACTFLOW_HOME
/// 2) ~/.extractflow
/// 3) ./.extractflow
pub fn extractflow_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("EXTRACTFLOW_HOME") {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".extractflow")
}

/// Default logs directory: ~/.extractflow/logs
pub fn default_logs_dir() -> PathBuf {
    extractflow_home().join("logs")
}

/// Default config file: ~/.extractflow/config.toml
pub fn default_config_path() -> PathBuf {
    extractflow_home().join("config.toml")
}
