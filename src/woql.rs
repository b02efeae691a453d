//! # Query Expression Tree
//!
//! Every read and write Jukebox sends to a record store is built as a small
//! [`Query`] tree and run through [`Query::execute`]. Stores either evaluate
//! the tree themselves ([`crate::store::local`]) or ship its WOQL JSON-LD
//! encoding over HTTP ([`crate::store::terminus`]).
//!
//! ## Encoding
//!
//! | Variant         | WOQL                                                        |
//! |-----------------|-------------------------------------------------------------|
//! | `Insert`        | `And[Not(Triple(id, rdf:type, _)), AddTriple…]`             |
//! | `Delete`        | `Optional(And[Triple(id, _p, _o), DeleteTriple(id, _p, _o)])` |
//! | `AssertTriple`  | `AddTriple`                                                 |
//! | `RetractTriple` | `Optional(And[Triple, DeleteTriple])`                       |
//! | `Matches`       | `Triple`                                                    |
//! | `And`           | `And`                                                       |
//! | `WildcardQuery` | `Limit(n, Triple(song, attribute, value))`                  |
//!
//! The `Not` guard makes an insert of an existing id produce no solutions, so
//! the store reports zero inserts instead of silently merging two songs.

use crate::error::Result;
use crate::store::RecordStore;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Class every catalog document belongs to.
pub const SONG_CLASS: &str = "Song";
/// Predicate linking a document to its class.
pub const RDF_TYPE: &str = "rdf:type";
/// Prefix for schema-level IRIs (classes and properties).
pub const SCHEMA_PREFIX: &str = "@schema:";
/// XSD type used for every scalar song attribute.
pub const XSD_STRING: &str = "xsd:string";

/// Variable bound to the subject by [`Query::WildcardQuery`].
pub const SUBJECT_VAR: &str = "song";
/// Variable bound to the predicate by [`Query::WildcardQuery`].
pub const PREDICATE_VAR: &str = "attribute";
/// Variable bound to the object by [`Query::WildcardQuery`].
pub const OBJECT_VAR: &str = "value";

/// One row of a query result: variable name → bound value.
pub type Binding = serde_json::Map<String, Value>;

/// Document id for a song title. Titles are percent-encoded so that `/` in a
/// title can never be confused with the class separator.
pub fn document_id(title: &str) -> String {
    format!("{SONG_CLASS}/{}", urlencoding::encode(title))
}

/// Schema IRI for a class or property name.
pub fn schema_iri(name: &str) -> String {
    format!("{SCHEMA_PREFIX}{name}")
}

/// A position in a triple pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// A document or schema IRI.
    Node(String),
    /// A query variable, bound by matching.
    Var(String),
    /// An `xsd:string` literal.
    Literal(String),
}

impl Term {
    pub fn node(iri: impl Into<String>) -> Self {
        Self::Node(iri.into())
    }

    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// Subject/predicate encoding. A literal in this position is sent as a
    /// node id holding its text.
    fn to_node_value(&self) -> Value {
        match self {
            Term::Node(iri) => json!({"@type": "NodeValue", "node": iri}),
            Term::Var(name) => json!({"@type": "NodeValue", "variable": name}),
            Term::Literal(value) => json!({"@type": "NodeValue", "node": value}),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Term::Node(iri) => json!({"@type": "Value", "node": iri}),
            Term::Var(name) => json!({"@type": "Value", "variable": name}),
            Term::Literal(value) => json!({
                "@type": "Value",
                "data": {"@type": XSD_STRING, "@value": value}
            }),
        }
    }
}

/// A (subject, predicate, object) pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self { subject, predicate, object }
    }

    /// Matches every triple in the store.
    pub fn wildcard() -> Self {
        Self::new(Term::var(SUBJECT_VAR), Term::var(PREDICATE_VAR), Term::var(OBJECT_VAR))
    }

    fn to_woql(&self, kind: &str) -> Value {
        json!({
            "@type": kind,
            "subject": self.subject.to_node_value(),
            "predicate": self.predicate.to_node_value(),
            "object": self.object.to_value(),
        })
    }
}

/// Query and mutation expressions understood by every [`RecordStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Create document `id` of `class` with literal `properties`; matches
    /// nothing (and writes nothing) when `id` already exists.
    Insert {
        id: String,
        class: String,
        properties: Vec<(String, String)>,
    },
    /// Remove every triple whose subject is `id`. Always succeeds.
    Delete { id: String },
    /// Add one triple.
    AssertTriple(Triple),
    /// Remove the triples matching the pattern, if any. Always succeeds.
    RetractTriple(Triple),
    /// Succeeds only if some triple matches the pattern. Used as a guard at
    /// the head of an `And`.
    Matches(Triple),
    /// Run each query in order; stops producing solutions at the first one
    /// that fails to match.
    And(Vec<Query>),
    /// Every triple in the store, at most `limit` of them.
    WildcardQuery { limit: usize },
}

impl Query {
    /// Insert a `Song` document.
    pub fn insert_song(id: impl Into<String>, properties: Vec<(String, String)>) -> Self {
        Query::Insert {
            id: id.into(),
            class: SONG_CLASS.to_string(),
            properties,
        }
    }

    /// Run this query against `store`, recording `message` as the commit
    /// message for writes.
    ///
    /// # Errors
    ///
    /// Propagates whatever the store reports: transport failures, error
    /// statuses or SQLite errors for the local store.
    pub fn execute(&self, store: &dyn RecordStore, message: &str) -> Result<QueryResponse> {
        debug!("Executing query ({message}): {self:?}");
        let response = store.execute(self, message)?;
        debug!(
            "Query returned {} bindings, {} inserts, {} deletes",
            response.bindings.len(),
            response.inserts,
            response.deletes
        );
        Ok(response)
    }

    /// WOQL JSON-LD encoding of this query.
    pub fn to_woql(&self) -> Value {
        let mut fresh = 0;
        self.encode(&mut fresh)
    }

    fn encode(&self, fresh: &mut usize) -> Value {
        match self {
            Query::Insert { id, class, properties } => {
                let subject = Term::node(id.clone());
                let existing = Triple::new(
                    subject.clone(),
                    Term::node(RDF_TYPE),
                    Term::var(fresh_var(fresh)),
                );
                let mut steps = vec![
                    json!({"@type": "Not", "query": existing.to_woql("Triple")}),
                    Triple::new(subject.clone(), Term::node(RDF_TYPE), Term::node(schema_iri(class)))
                        .to_woql("AddTriple"),
                ];
                for (name, value) in properties {
                    steps.push(
                        Triple::new(subject.clone(), Term::node(schema_iri(name)), Term::literal(value.clone()))
                            .to_woql("AddTriple"),
                    );
                }
                and(steps)
            }
            Query::Delete { id } => {
                let pattern = Triple::new(
                    Term::node(id.clone()),
                    Term::var(fresh_var(fresh)),
                    Term::var(fresh_var(fresh)),
                );
                optional(and(vec![pattern.to_woql("Triple"), pattern.to_woql("DeleteTriple")]))
            }
            Query::AssertTriple(triple) => triple.to_woql("AddTriple"),
            Query::RetractTriple(triple) => {
                optional(and(vec![triple.to_woql("Triple"), triple.to_woql("DeleteTriple")]))
            }
            Query::Matches(triple) => triple.to_woql("Triple"),
            Query::And(queries) => and(queries.iter().map(|q| q.encode(fresh)).collect()),
            Query::WildcardQuery { limit } => json!({
                "@type": "Limit",
                "limit": limit,
                "query": Triple::wildcard().to_woql("Triple"),
            }),
        }
    }
}

fn fresh_var(counter: &mut usize) -> String {
    let name = format!("_v{counter}");
    *counter += 1;
    name
}

fn and(steps: Vec<Value>) -> Value {
    json!({"@type": "And", "and": steps})
}

fn optional(query: Value) -> Value {
    json!({"@type": "Optional", "query": query})
}

/// What a store hands back for a query.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub bindings: Vec<Binding>,
    #[serde(default)]
    pub inserts: u64,
    #[serde(default)]
    pub deletes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_encodes_title() {
        assert_eq!(document_id("Hey Jude"), "Song/Hey%20Jude");
        assert_eq!(document_id("AC/DC Live"), "Song/AC%2FDC%20Live");
    }

    #[test]
    fn test_wildcard_encoding() {
        let woql = Query::WildcardQuery { limit: 100 }.to_woql();
        assert_eq!(woql["@type"], "Limit");
        assert_eq!(woql["limit"], 100);
        assert_eq!(woql["query"]["@type"], "Triple");
        assert_eq!(woql["query"]["subject"]["variable"], SUBJECT_VAR);
        assert_eq!(woql["query"]["predicate"]["variable"], PREDICATE_VAR);
        assert_eq!(woql["query"]["object"]["variable"], OBJECT_VAR);
    }

    #[test]
    fn test_literal_subject_is_sent_as_node() {
        let woql = Query::Matches(Triple::new(
            Term::literal("Song/A"),
            Term::node(RDF_TYPE),
            Term::var("class"),
        ))
        .to_woql();
        assert_eq!(woql["subject"]["node"], "Song/A");
        assert!(woql["subject"].get("data").is_none());
    }

    #[test]
    fn test_insert_encoding_guards_existing_id() {
        let query = Query::insert_song(
            "Song/A",
            vec![("artist".to_string(), "X".to_string())],
        );
        let woql = query.to_woql();
        let steps = woql["and"].as_array().expect("And has a step list");

        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0]["@type"], "Not");
        assert_eq!(steps[0]["query"]["subject"]["node"], "Song/A");
        assert_eq!(steps[1]["@type"], "AddTriple");
        assert_eq!(steps[1]["object"]["node"], "@schema:Song");
        assert_eq!(steps[2]["predicate"]["node"], "@schema:artist");
        assert_eq!(steps[2]["object"]["data"]["@value"], "X");
        assert_eq!(steps[2]["object"]["data"]["@type"], XSD_STRING);
    }

    #[test]
    fn test_delete_encoding_is_optional() {
        let woql = Query::Delete { id: "Song/A".to_string() }.to_woql();
        assert_eq!(woql["@type"], "Optional");
        let steps = woql["query"]["and"].as_array().unwrap();
        assert_eq!(steps[0]["@type"], "Triple");
        assert_eq!(steps[1]["@type"], "DeleteTriple");
        // Same fresh variables in both steps.
        assert_eq!(steps[0]["predicate"], steps[1]["predicate"]);
        assert_eq!(steps[0]["object"], steps[1]["object"]);
    }

    #[test]
    fn test_edit_encoding_retracts_then_asserts() {
        let id = Term::node("Song/A");
        let predicate = Term::node(schema_iri("album"));
        let query = Query::And(vec![
            Query::RetractTriple(Triple::new(id.clone(), predicate.clone(), Term::var("old"))),
            Query::AssertTriple(Triple::new(id, predicate, Term::literal("New Album"))),
        ]);

        let woql = query.to_woql();
        let steps = woql["and"].as_array().unwrap();
        assert_eq!(steps[0]["@type"], "Optional");
        assert_eq!(steps[0]["query"]["and"][1]["@type"], "DeleteTriple");
        assert_eq!(steps[1]["@type"], "AddTriple");
        assert_eq!(steps[1]["object"]["data"]["@value"], "New Album");
    }

    #[test]
    fn test_fresh_variables_are_unique_across_steps() {
        let query = Query::And(vec![
            Query::Delete { id: "Song/A".to_string() },
            Query::Delete { id: "Song/B".to_string() },
        ]);
        let woql = query.to_woql();
        let first = &woql["and"][0]["query"]["and"][0]["predicate"]["variable"];
        let second = &woql["and"][1]["query"]["and"][0]["predicate"]["variable"];
        assert_ne!(first, second);
    }

    #[test]
    fn test_response_defaults_missing_fields() {
        let response: QueryResponse =
            serde_json::from_str(r#"{"api:status": "api:success", "bindings": [{}]}"#).unwrap();
        assert_eq!(response.bindings.len(), 1);
        assert_eq!(response.inserts, 0);
        assert_eq!(response.deletes, 0);
    }
}
