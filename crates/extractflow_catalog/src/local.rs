//! Directory-backed catalog
//!
//! Layout: `<root>/<site>/<project>/<name>.extract`. A site is a directory
//! that must already exist; so must a project. An optional
//! `<root>/<site>/access.json` restricts who may sign in:
//!
//! ```json
//! { "users": { "analyst": "password" }, "tokens": { "ci": "secret" } }
//! ```
//!
//! Entries are replaced with the same staged rename the extract writer
//! uses, so a failed publish leaves the entry as it was.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use extractflow_protocol::defaults::EXTRACT_EXTENSION;
use extractflow_protocol::{CatalogTarget, CreateMode, PublishMode};
use extractflow_sinks::{
    inspect_extract, read_extract, Extract, ExtractError, ExtractWriter, StagedFile,
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{Credentials, PublishRequest, ServerConfig};
use crate::error::{PublishError, Result};
use crate::session::CatalogSession;
use crate::transport::{CatalogTransport, PublishReceipt};

const ACCESS_FILE: &str = "access.json";
const SITE_DEFAULT_DIR: &str = "default";

#[derive(Debug, Default, Deserialize)]
struct AccessList {
    #[serde(default)]
    users: HashMap<String, String>,
    #[serde(default)]
    tokens: HashMap<String, String>,
}

/// A catalog stored in a local directory tree.
#[derive(Debug)]
pub struct LocalCatalog {
    root: PathBuf,
    open_sessions: Mutex<HashSet<String>>,
}

impl LocalCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            open_sessions: Mutex::new(HashSet::new()),
        }
    }

    /// Catalog for a `file://` address.
    pub fn from_address(address: &str) -> Result<Self> {
        let path = address
            .strip_prefix("file://")
            .ok_or_else(|| PublishError::transport(format!("not a file:// address: {}", address)))?;
        if path.is_empty() {
            return Err(PublishError::transport("file:// address has no path"));
        }
        Ok(Self::new(path))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for a site; the empty site maps to `default`.
    pub fn site_dir(&self, site: &str) -> PathBuf {
        if site.is_empty() {
            self.root.join(SITE_DEFAULT_DIR)
        } else {
            self.root.join(site)
        }
    }

    pub fn entry_path(&self, site: &str, target: &CatalogTarget) -> PathBuf {
        self.site_dir(site)
            .join(&target.project)
            .join(format!("{}.{}", target.name, EXTRACT_EXTENSION))
    }

    /// Read an entry's current content.
    pub fn read_entry(&self, site: &str, target: &CatalogTarget) -> Result<Extract> {
        Ok(read_extract(&self.entry_path(site, target))?)
    }

    /// Sessions signed in and not yet signed out.
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    fn sessions(&self) -> Result<std::sync::MutexGuard<'_, HashSet<String>>> {
        self.open_sessions
            .lock()
            .map_err(|_| PublishError::transport("local catalog session table poisoned"))
    }

    fn check_credentials(&self, site_dir: &Path, credentials: &Credentials) -> Result<()> {
        let access_path = site_dir.join(ACCESS_FILE);
        let content = match fs::read_to_string(&access_path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => {
                return Err(PublishError::transport_with(
                    format!("cannot read {}", access_path.display()),
                    err,
                ))
            }
        };
        let access: AccessList = serde_json::from_str(&content).map_err(|err| {
            PublishError::transport_with(format!("invalid {}", access_path.display()), err)
        })?;

        let known = match credentials {
            Credentials::UsernamePassword { username, password } => {
                access.users.get(username) == Some(password)
            }
            Credentials::AccessToken { name, secret } => access.tokens.get(name) == Some(secret),
        };
        if known {
            Ok(())
        } else {
            Err(PublishError::auth(format!(
                "invalid credentials for {}",
                credentials.principal()
            )))
        }
    }

    fn copy_into(&self, source: &Path, entry: &Path) -> Result<()> {
        let staged = StagedFile::new(entry).map_err(|err| storage_error(entry, err))?;
        let mut out = staged.create().map_err(|err| storage_error(entry, err))?;
        let mut input = File::open(source).map_err(|err| {
            PublishError::transport_with(format!("cannot open {}", source.display()), err)
        })?;
        io::copy(&mut input, &mut out).map_err(|err| {
            PublishError::transport_with(format!("cannot copy into {}", entry.display()), err)
        })?;
        drop(out);
        staged.commit().map_err(|err| storage_error(entry, err))
    }

    fn append_into(&self, source: &Path, entry: &Path, target: &CatalogTarget) -> Result<()> {
        let incoming = read_extract(source)?;
        let dataset = incoming
            .to_dataset()
            .map_err(|err| PublishError::transport(format!("cannot reshape extract: {}", err)))?;

        let mut writer = ExtractWriter::open(entry).map_err(|err| storage_error(entry, err))?;
        writer
            .write(CreateMode::AndAppend, &incoming.schema, &dataset)
            .map(|_| ())
            .map_err(|err| match err {
                ExtractError::MissingExtract { .. } => {
                    PublishError::precondition(target, "entry does not exist")
                }
                ExtractError::SchemaMismatch { detail, .. } => {
                    PublishError::precondition(target, format!("schema mismatch: {}", detail))
                }
                ExtractError::Format { message, .. } => PublishError::precondition(
                    target,
                    format!("entry is unreadable: {}", message),
                ),
                other => storage_error(entry, other),
            })
    }
}

fn storage_error(entry: &Path, err: ExtractError) -> PublishError {
    PublishError::transport_with(format!("catalog storage failure at {}", entry.display()), err)
}

impl CatalogTransport for LocalCatalog {
    fn name(&self) -> &'static str {
        "local"
    }

    fn authenticate(
        &self,
        server: &ServerConfig,
        credentials: &Credentials,
    ) -> Result<CatalogSession> {
        let site_dir = self.site_dir(&server.site);
        if !site_dir.is_dir() {
            return Err(PublishError::auth(format!("unknown site '{}'", server.site)));
        }
        self.check_credentials(&site_dir, credentials)?;

        let token = uuid::Uuid::new_v4().to_string();
        self.sessions()?.insert(token.clone());
        debug!(principal = credentials.principal(), "Local catalog sign-in");

        Ok(CatalogSession {
            token,
            site_id: server.site.clone(),
            user_id: Some(credentials.principal().to_string()),
        })
    }

    fn publish(
        &self,
        session: &CatalogSession,
        request: &PublishRequest,
    ) -> Result<PublishReceipt> {
        if !self.sessions()?.contains(&session.token) {
            return Err(PublishError::auth("session is not signed in"));
        }

        let target = &request.target;
        let project_dir = self.site_dir(&session.site_id).join(&target.project);
        if !project_dir.is_dir() {
            return Err(PublishError::precondition(
                target,
                format!("project '{}' does not exist", target.project),
            ));
        }

        let entry = self.entry_path(&session.site_id, target);
        let exists = entry.exists();
        match request.mode {
            PublishMode::Overwrite => self.copy_into(&request.extract, &entry)?,
            PublishMode::CreateNew if exists => {
                return Err(PublishError::precondition(target, "entry already exists"))
            }
            PublishMode::CreateNew => self.copy_into(&request.extract, &entry)?,
            PublishMode::Append if !exists => {
                return Err(PublishError::precondition(target, "entry does not exist"))
            }
            PublishMode::Append => self.append_into(&request.extract, &entry, target)?,
        }

        let summary = inspect_extract(&entry).map_err(|err| storage_error(&entry, err))?;
        info!(
            "Local catalog entry {} now holds {} rows",
            entry.display(),
            summary.num_rows
        );
        Ok(PublishReceipt {
            datasource_id: target.to_string(),
            row_count: Some(summary.num_rows as u64),
        })
    }

    fn sign_out(&self, session: &CatalogSession) -> Result<()> {
        if self.sessions()?.remove(&session.token) {
            Ok(())
        } else {
            Err(PublishError::auth("session is not signed in"))
        }
    }
}
