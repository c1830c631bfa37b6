//! REST catalog over HTTP(S)
//!
//! - `POST {base}/api/{ver}/auth/signin` with a JSON credentials document
//! - `POST {base}/api/{ver}/sites/{site_id}/datasources[?overwrite=true|?append=true]`
//!   as multipart: `request_payload` (JSON) and `extract_file`
//! - `POST {base}/api/{ver}/auth/signout`
//!
//! The session token travels in the `X-Tableau-Auth` header.

use std::time::Duration;

use extractflow_protocol::{CatalogTarget, PublishMode};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::{Credentials, PublishRequest, ServerConfig};
use crate::error::{PublishError, Result};
use crate::session::CatalogSession;
use crate::transport::{CatalogTransport, PublishReceipt};

const AUTH_HEADER: &str = "X-Tableau-Auth";
const JSON: &str = "application/json";

/// Which round trip a response belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Call {
    SignIn,
    Publish,
    SignOut,
}

#[derive(Debug, Deserialize)]
struct SignInEnvelope {
    credentials: SignInCredentials,
}

#[derive(Debug, Deserialize)]
struct SignInCredentials {
    token: String,
    site: IdRef,
    #[serde(default)]
    user: Option<IdRef>,
}

#[derive(Debug, Deserialize)]
struct IdRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PublishEnvelope {
    datasource: IdRef,
}

/// Catalog reached over its REST API.
pub struct HttpCatalog {
    client: Client,
    base_url: String,
    api_version: String,
}

impl HttpCatalog {
    pub fn new(server: &ServerConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = server.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|err| PublishError::transport_with("Failed to build HTTP client", err))?;
        Ok(Self {
            client,
            base_url: server.base_url().to_string(),
            api_version: server.api_version.clone(),
        })
    }

    fn api_url(&self, path: &str) -> String {
        api_url(&self.base_url, &self.api_version, path)
    }

    fn send(&self, call: Call, request: reqwest::blocking::RequestBuilder) -> Result<Response> {
        request.send().map_err(|err| {
            let what = if err.is_timeout() {
                "timed out"
            } else if err.is_connect() {
                "could not connect"
            } else {
                "request failed"
            };
            PublishError::transport_with(format!("{:?} {}", call, what), err)
        })
    }
}

pub(crate) fn api_url(base_url: &str, api_version: &str, path: &str) -> String {
    format!("{}/api/{}/{}", base_url, api_version, path)
}

pub(crate) fn publish_path(site_id: &str, mode: PublishMode) -> String {
    let query = match mode {
        PublishMode::Overwrite => "?overwrite=true",
        PublishMode::Append => "?append=true",
        PublishMode::CreateNew => "",
    };
    format!("sites/{}/datasources{}", site_id, query)
}

pub(crate) fn signin_payload(
    server: &ServerConfig,
    credentials: &Credentials,
) -> serde_json::Value {
    let site = json!({ "contentUrl": server.site });
    match credentials {
        Credentials::UsernamePassword { username, password } => json!({
            "credentials": { "name": username, "password": password, "site": site }
        }),
        Credentials::AccessToken { name, secret } => json!({
            "credentials": {
                "personalAccessTokenName": name,
                "personalAccessTokenSecret": secret,
                "site": site
            }
        }),
    }
}

pub(crate) fn publish_payload(target: &CatalogTarget) -> serde_json::Value {
    json!({
        "datasource": {
            "name": target.name,
            "project": { "name": target.project }
        }
    })
}

/// Map a non-success status to the error taxonomy.
pub(crate) fn classify_status(
    call: Call,
    status: u16,
    body: &str,
    target: &CatalogTarget,
) -> PublishError {
    let detail = if body.trim().is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, body.trim())
    };
    match (call, status) {
        (_, 401 | 403) => PublishError::auth(detail),
        (Call::SignIn, 400 | 404) => PublishError::auth(detail),
        (Call::Publish, 400 | 404 | 409 | 422) => PublishError::precondition(target, detail),
        _ => PublishError::transport(detail),
    }
}

fn failure(call: Call, response: Response, target: &CatalogTarget) -> PublishError {
    let status = response.status().as_u16();
    let body = response.text().unwrap_or_default();
    classify_status(call, status, &body, target)
}

impl CatalogTransport for HttpCatalog {
    fn name(&self) -> &'static str {
        "http"
    }

    fn authenticate(
        &self,
        server: &ServerConfig,
        credentials: &Credentials,
    ) -> Result<CatalogSession> {
        let url = self.api_url("auth/signin");
        info!("Signing in to {} as {}", url, credentials.principal());

        let response = self.send(
            Call::SignIn,
            self.client
                .post(&url)
                .header(ACCEPT, JSON)
                .json(&signin_payload(server, credentials)),
        )?;
        if !response.status().is_success() {
            let nowhere = CatalogTarget::new("", "");
            return Err(failure(Call::SignIn, response, &nowhere));
        }

        let envelope: SignInEnvelope = response
            .json()
            .map_err(|err| PublishError::transport_with("Failed to parse sign-in response", err))?;
        Ok(CatalogSession {
            token: envelope.credentials.token,
            site_id: envelope.credentials.site.id,
            user_id: envelope.credentials.user.map(|u| u.id),
        })
    }

    fn publish(
        &self,
        session: &CatalogSession,
        request: &PublishRequest,
    ) -> Result<PublishReceipt> {
        let url = self.api_url(&publish_path(&session.site_id, request.mode));
        debug!("Publishing {} to {}", request.extract.display(), url);

        let payload = Part::text(publish_payload(&request.target).to_string())
            .mime_str(JSON)
            .map_err(|err| PublishError::transport_with("Failed to build publish payload", err))?;
        let form = Form::new()
            .part("request_payload", payload)
            .file("extract_file", &request.extract)
            .map_err(|err| {
                PublishError::transport_with(
                    format!("Failed to attach {}", request.extract.display()),
                    err,
                )
            })?;

        let response = self.send(
            Call::Publish,
            self.client
                .post(&url)
                .header(AUTH_HEADER, &session.token)
                .header(ACCEPT, JSON)
                .multipart(form),
        )?;
        if !response.status().is_success() {
            return Err(failure(Call::Publish, response, &request.target));
        }

        let envelope: PublishEnvelope = response
            .json()
            .map_err(|err| PublishError::transport_with("Failed to parse publish response", err))?;
        Ok(PublishReceipt {
            datasource_id: envelope.datasource.id,
            row_count: None,
        })
    }

    fn sign_out(&self, session: &CatalogSession) -> Result<()> {
        let response = self.send(
            Call::SignOut,
            self.client
                .post(self.api_url("auth/signout"))
                .header(AUTH_HEADER, &session.token),
        )?;
        if response.status().is_success() {
            Ok(())
        } else {
            let nowhere = CatalogTarget::new("", "");
            Err(failure(Call::SignOut, response, &nowhere))
        }
    }
}
