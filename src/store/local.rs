//! # Local SQLite Store
//!
//! Evaluates [`Query`] trees against a single SQLite triple table. Used for
//! offline catalogs (`jukebox --local songs.db`) and by the test suite, so it
//! mirrors the remote store where the rest of the crate can observe it:
//!
//! - An `And` runs inside one transaction. If any step fails to match (an
//!   insert of an existing id) nothing is written and nothing is returned.
//! - Inserts are schema-checked: the class must be installed and every
//!   property declared on it.
//! - Wildcard results come back grouped by subject (in first-insertion order),
//!   `rdf:type` first, then predicates alphabetically. For a `Song` that is
//!   type, album, artist, length, the default slot layout.
//! - Bindings use the remote shape: node objects are plain strings, literals
//!   are `{"@type": "xsd:string", "@value": …}`.

use super::{RecordStore, SchemaClass};
use crate::error::{CatalogError, Result};
use crate::woql::{
    schema_iri, Binding, Query, QueryResponse, Term, Triple, OBJECT_VAR, PREDICATE_VAR, RDF_TYPE,
    SUBJECT_VAR, XSD_STRING,
};
use log::{debug, trace};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::{json, Value};
use std::path::Path;

pub struct LocalStore {
    conn: Connection,
    location: String,
}

/// Counters and rows accumulated while evaluating one query.
#[derive(Default)]
struct Evaluation {
    bindings: Vec<Binding>,
    inserts: u64,
    deletes: u64,
}

impl LocalStore {
    /// Open (creating if needed) the catalog file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn, path.display().to_string())
    }

    /// Throwaway catalog, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, ":memory:".to_string())
    }

    fn init(conn: Connection, location: String) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_class (
                id       TEXT PRIMARY KEY,
                document TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS triple (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                subject   TEXT    NOT NULL,
                predicate TEXT    NOT NULL,
                object    TEXT    NOT NULL,
                is_node   INTEGER NOT NULL CHECK (is_node IN (0, 1)),
                UNIQUE(subject, predicate, object, is_node)
            );
            CREATE INDEX IF NOT EXISTS idx_triple_subject ON triple(subject);",
        )?;
        debug!("Opened local record store at {location}");
        Ok(Self { conn, location })
    }

    /// Number of stored triples. Handy for asserting that failed writes
    /// left nothing behind.
    pub fn triple_count(&self) -> Result<u64> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM triple", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl RecordStore for LocalStore {
    fn install_schema(&self, class: &SchemaClass, message: &str) -> Result<()> {
        debug!("Installing schema class {} ({message})", class.id);
        self.conn.execute(
            "INSERT OR REPLACE INTO schema_class (id, document) VALUES (?1, ?2)",
            params![class.id, class.to_document().to_string()],
        )?;
        Ok(())
    }

    fn execute(&self, query: &Query, message: &str) -> Result<QueryResponse> {
        trace!("Local commit message: {message}");
        let tx = self.conn.unchecked_transaction()?;
        let mut evaluation = Evaluation::default();

        if evaluate(&tx, query, &mut evaluation)? {
            tx.commit()?;
            Ok(QueryResponse {
                bindings: evaluation.bindings,
                inserts: evaluation.inserts,
                deletes: evaluation.deletes,
            })
        } else {
            // Dropping the transaction rolls back whatever earlier steps wrote.
            debug!("Query matched nothing, rolling back");
            Ok(QueryResponse::default())
        }
    }

    fn describe(&self) -> String {
        format!("local catalog {}", self.location)
    }
}

/// Returns whether `query` produced a solution.
fn evaluate(conn: &Connection, query: &Query, evaluation: &mut Evaluation) -> Result<bool> {
    match query {
        Query::Insert { id, class, properties } => insert_document(conn, id, class, properties, evaluation),
        Query::Delete { id } => {
            let removed = conn.execute("DELETE FROM triple WHERE subject = ?1", [id])?;
            evaluation.deletes += removed as u64;
            Ok(true)
        }
        Query::AssertTriple(triple) => {
            let (subject, predicate) = (bound_node(&triple.subject)?, bound_node(&triple.predicate)?);
            let (object, is_node) = bound_object(&triple.object)?;
            let added = conn.execute(
                "INSERT OR IGNORE INTO triple (subject, predicate, object, is_node) VALUES (?1, ?2, ?3, ?4)",
                params![subject, predicate, object, is_node],
            )?;
            evaluation.inserts += added as u64;
            Ok(true)
        }
        Query::RetractTriple(triple) => {
            evaluation.deletes += retract(conn, triple)?;
            Ok(true)
        }
        Query::Matches(triple) => matches(conn, triple),
        Query::And(queries) => {
            for step in queries {
                if !evaluate(conn, step, evaluation)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Query::WildcardQuery { limit } => {
            evaluation.bindings.extend(wildcard(conn, *limit)?);
            Ok(true)
        }
    }
}

fn insert_document(
    conn: &Connection,
    id: &str,
    class: &str,
    properties: &[(String, String)],
    evaluation: &mut Evaluation,
) -> Result<bool> {
    let document: Option<String> = conn
        .query_row("SELECT document FROM schema_class WHERE id = ?1", [class], |row| row.get(0))
        .optional()?;
    let Some(document) = document else {
        return Err(schema_failure(format!("class {class} is not in the schema")));
    };
    let document: Value = serde_json::from_str(&document)?;
    for (name, _) in properties {
        if name.starts_with('@') || document.get(name).is_none() {
            return Err(schema_failure(format!("property {name} is not declared on {class}")));
        }
    }

    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM triple WHERE subject = ?1 AND predicate = ?2)",
        params![id, RDF_TYPE],
        |row| row.get(0),
    )?;
    if exists {
        debug!("Document {id} already exists");
        return Ok(false);
    }

    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO triple (subject, predicate, object, is_node) VALUES (?1, ?2, ?3, ?4)",
    )?;
    let mut added = stmt.execute(params![id, RDF_TYPE, schema_iri(class), true])?;
    for (name, value) in properties {
        added += stmt.execute(params![id, schema_iri(name), value, false])?;
    }
    evaluation.inserts += added as u64;
    Ok(true)
}

/// `WHERE` clause and parameters selecting the rows a pattern matches.
/// Variables match anything.
fn pattern_filter(triple: &Triple) -> (String, Vec<String>) {
    let mut conditions = Vec::new();
    let mut values: Vec<String> = Vec::new();

    for (column, term) in [("subject", &triple.subject), ("predicate", &triple.predicate)] {
        if let Term::Node(iri) | Term::Literal(iri) = term {
            values.push(iri.clone());
            conditions.push(format!("{column} = ?{}", values.len()));
        }
    }
    match &triple.object {
        Term::Var(_) => {}
        Term::Node(value) | Term::Literal(value) => {
            values.push(value.clone());
            conditions.push(format!("object = ?{}", values.len()));
            let is_node = matches!(triple.object, Term::Node(_));
            conditions.push(format!("is_node = {}", i32::from(is_node)));
        }
    }

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }
}

fn matches(conn: &Connection, triple: &Triple) -> Result<bool> {
    let (filter, values) = pattern_filter(triple);
    let sql = format!("SELECT EXISTS(SELECT 1 FROM triple{filter})");
    let found: bool = conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
    Ok(found)
}

fn retract(conn: &Connection, triple: &Triple) -> Result<u64> {
    let (filter, values) = pattern_filter(triple);
    let removed = conn.execute(&format!("DELETE FROM triple{filter}"), params_from_iter(values.iter()))?;
    Ok(removed as u64)
}

fn wildcard(conn: &Connection, limit: usize) -> Result<Vec<Binding>> {
    let mut stmt = conn.prepare(
        "SELECT t.subject, t.predicate, t.object, t.is_node
         FROM triple t
         JOIN (SELECT subject, MIN(id) AS first_seen FROM triple GROUP BY subject) s
           ON s.subject = t.subject
         ORDER BY s.first_seen,
                  CASE WHEN t.predicate = ?1 THEN 0 ELSE 1 END,
                  t.predicate,
                  t.id
         LIMIT ?2",
    )?;

    let rows = stmt.query_map(params![RDF_TYPE, limit as i64], |row| {
        let subject: String = row.get(0)?;
        let predicate: String = row.get(1)?;
        let object: String = row.get(2)?;
        let is_node: bool = row.get(3)?;

        let value = if is_node {
            json!(object)
        } else {
            json!({"@type": XSD_STRING, "@value": object})
        };
        let mut binding = Binding::new();
        binding.insert(SUBJECT_VAR.to_string(), json!(subject));
        binding.insert(PREDICATE_VAR.to_string(), json!(predicate));
        binding.insert(OBJECT_VAR.to_string(), value);
        Ok(binding)
    })?;

    let mut bindings = Vec::new();
    for binding in rows {
        bindings.push(binding?);
    }
    Ok(bindings)
}

fn bound_node(term: &Term) -> Result<&str> {
    match term {
        Term::Node(iri) => Ok(iri),
        other => Err(CatalogError::Store {
            status: 400,
            message: format!("expected a node, found {other:?}"),
        }),
    }
}

fn bound_object(term: &Term) -> Result<(&str, bool)> {
    match term {
        Term::Node(iri) => Ok((iri, true)),
        Term::Literal(value) => Ok((value, false)),
        Term::Var(name) => Err(CatalogError::Store {
            status: 400,
            message: format!("variable {name} is unbound in AddTriple"),
        }),
    }
}

fn schema_failure(message: String) -> CatalogError {
    CatalogError::Store { status: 400, message: format!("Schema check failure: {message}") }
}
