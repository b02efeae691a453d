//! # Record Stores
//!
//! The narrow interface between Jukebox and wherever songs live. Everything
//! above this module speaks [`Query`] trees; a store only has to run them and
//! accept a schema declaration.
//!
//! - [`terminus::TerminusClient`] - remote TerminusDB over HTTPS (default)
//! - [`local::LocalStore`] - SQLite triple table for offline catalogs and tests

pub mod local;
pub mod terminus;

use crate::config::Settings;
use crate::error::Result;
use crate::woql::{Query, QueryResponse, SCHEMA_PREFIX};
use log::info;
use serde_json::{json, Map, Value};

/// A scalar property of a schema class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaProperty {
    pub name: String,
    pub label: String,
    /// XSD range, e.g. `xsd:string`.
    pub range: String,
}

/// A document class declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaClass {
    pub id: String,
    pub label: String,
    pub comment: String,
    pub properties: Vec<SchemaProperty>,
}

impl SchemaClass {
    /// TerminusDB schema document for this class.
    pub fn to_document(&self) -> Value {
        let mut document = Map::new();
        document.insert("@type".into(), json!("Class"));
        document.insert("@id".into(), json!(self.id));

        let labels: Map<String, Value> = self
            .properties
            .iter()
            .map(|p| (p.name.clone(), json!(p.label)))
            .collect();
        document.insert(
            "@documentation".into(),
            json!({"@comment": self.comment, "@label": self.label, "@properties": labels}),
        );

        for property in &self.properties {
            document.insert(property.name.clone(), json!(property.range));
        }
        Value::Object(document)
    }

    /// Whether `predicate` (bare name or schema IRI) is declared on this class.
    pub fn has_property(&self, predicate: &str) -> bool {
        let name = predicate.strip_prefix(SCHEMA_PREFIX).unwrap_or(predicate);
        self.properties.iter().any(|p| p.name == name)
    }
}

/// Anything that can hold the catalog.
pub trait RecordStore {
    /// Declare `class`, replacing an earlier declaration with the same id.
    /// Must be safe to call on every start.
    fn install_schema(&self, class: &SchemaClass, message: &str) -> Result<()>;

    /// Run `query`, committing any writes with `message`.
    fn execute(&self, query: &Query, message: &str) -> Result<QueryResponse>;

    /// Short human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Open the store selected by `settings`: the local SQLite file when
/// `connection.local_path` is set, the remote server otherwise.
///
/// # Errors
///
/// Fails when the local file cannot be opened or when the remote server is
/// unreachable, rejects the credentials, or lacks the database.
pub fn open(settings: &Settings) -> Result<Box<dyn RecordStore>> {
    let store: Box<dyn RecordStore> = match &settings.connection.local_path {
        Some(path) => Box::new(local::LocalStore::open(path)?),
        None => Box::new(terminus::TerminusClient::connect(&settings.connection)?),
    };
    info!("Connected to record store at {}", store.describe());
    Ok(store)
}
