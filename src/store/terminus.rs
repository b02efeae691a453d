//! # TerminusDB Client
//!
//! Blocking HTTP client for a TerminusDB server. Only the handful of
//! endpoints Jukebox needs are covered:
//!
//! | Call                         | Endpoint                                      |
//! |------------------------------|-----------------------------------------------|
//! | server/credential check      | `GET  /api/info`                              |
//! | database check               | `GET  /api/db/<account>/<db>`                 |
//! | database creation            | `POST /api/db/<account>/<db>`                 |
//! | queries and mutations        | `POST /api/woql/<account>/<db>`               |
//! | schema installation          | `PUT  /api/document/<account>/<db>?graph_type=schema&create=true` |
//!
//! All requests use basic auth with the configured user and key.

use super::{RecordStore, SchemaClass};
use crate::config::ConnectionSettings;
use crate::error::{CatalogError, Result};
use crate::woql::{Query, QueryResponse};
use log::{debug, info};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct TerminusClient {
    http: Client,
    server: String,
    account: String,
    database: String,
    user: String,
    key: String,
}

impl TerminusClient {
    /// Build a client without touching the network.
    pub fn new(settings: &ConnectionSettings) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("jukebox/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()?;

        Ok(Self {
            http,
            server: settings.server_url.trim_end_matches('/').to_string(),
            account: settings.account.clone(),
            database: settings.database.clone(),
            user: settings.user.clone(),
            key: settings.key.clone(),
        })
    }

    /// Open a session: check the server accepts our credentials and that the
    /// database exists, creating it when `create_database` is set.
    ///
    /// # Errors
    ///
    /// - transport failures (server down, TLS problems)
    /// - [`CatalogError::Store`] for rejected credentials
    /// - [`CatalogError::NotFound`] when the database is missing and may not
    ///   be created
    pub fn connect(settings: &ConnectionSettings) -> Result<Self> {
        let client = Self::new(settings)?;

        let info: Value = Self::check(client.authed(client.http.get(client.url("info"))).send()?)?.json()?;
        debug!("Server info: {info}");

        if !client.database_exists()? {
            if settings.create_database {
                client.create_database()?;
            } else {
                return Err(CatalogError::NotFound(format!(
                    "database {}/{} on {}",
                    client.account, client.database, client.server
                )));
            }
        }
        Ok(client)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{path}", self.server)
    }

    fn db_path(&self, endpoint: &str) -> String {
        self.url(&format!("{endpoint}/{}/{}", self.account, self.database))
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.user, Some(&self.key))
    }

    fn database_exists(&self) -> Result<bool> {
        let response = self.authed(self.http.get(self.db_path("db"))).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::check(response)?;
        Ok(true)
    }

    fn create_database(&self) -> Result<()> {
        info!("Creating database {}/{}", self.account, self.database);
        let body = json!({
            "label": self.database,
            "comment": "Song catalog",
            "schema": true,
        });
        Self::check(self.authed(self.http.post(self.db_path("db"))).json(&body).send()?)?;
        Ok(())
    }

    /// Turn an error status into [`CatalogError::Store`], keeping the
    /// server's `api:message` when it sent one.
    fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|value| value.get("api:message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(body);
        Err(CatalogError::Store { status: status.as_u16(), message })
    }
}

impl RecordStore for TerminusClient {
    fn install_schema(&self, class: &SchemaClass, message: &str) -> Result<()> {
        debug!("Installing schema class {} on {}", class.id, self.describe());
        let request = self
            .authed(self.http.put(self.db_path("document")))
            .query(&[
                ("graph_type", "schema"),
                ("create", "true"),
                ("author", self.user.as_str()),
                ("message", message),
            ])
            .json(&class.to_document());
        Self::check(request.send()?)?;
        Ok(())
    }

    fn execute(&self, query: &Query, message: &str) -> Result<QueryResponse> {
        let body = json!({
            "query": query.to_woql(),
            "commit_info": {"author": self.user, "message": message},
        });
        let response = self.authed(self.http.post(self.db_path("woql"))).json(&body).send()?;
        Ok(Self::check(response)?.json()?)
    }

    fn describe(&self) -> String {
        format!("{}/{}/{}", self.server, self.account, self.database)
    }
}
