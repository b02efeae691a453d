//! # Record Operations
//!
//! The catalog mutations and the full listing, each issued as one
//! [`Query`] against a [`RecordStore`].
//!
//! | Operation          | Query                                                   |
//! |--------------------|---------------------------------------------------------|
//! | [`install_schema`] | schema document for `Song`                              |
//! | [`add_song`]       | `Insert` (guarded against existing titles)              |
//! | [`remove_song`]    | `Delete` of every triple of the document                |
//! | [`edit_attribute`] | `And[Matches(type), RetractTriple(old), AssertTriple]`  |
//! | [`fetch_songs`]    | `WildcardQuery` bounded by the configured limit         |
//!
//! Edits run as a single query, so the old value is never removed without
//! the new one being written.

use crate::catalog::{flatten_bindings, Song};
use crate::config::Settings;
use crate::error::{CatalogError, Result};
use crate::store::{RecordStore, SchemaClass, SchemaProperty};
use crate::woql::{document_id, schema_iri, Query, Term, Triple, RDF_TYPE, SONG_CLASS, XSD_STRING};
use log::{info, warn};
use std::fmt;

/// The `Song` class: artist, length and album, all `xsd:string`.
pub fn song_schema() -> SchemaClass {
    let property = |name: &str, label: &str| SchemaProperty {
        name: name.to_string(),
        label: label.to_string(),
        range: XSD_STRING.to_string(),
    };
    SchemaClass {
        id: SONG_CLASS.to_string(),
        label: SONG_CLASS.to_string(),
        comment: "A song title.".to_string(),
        properties: vec![
            property("artist", "song artist"),
            property("length", "song length"),
            property("album", "song album"),
        ],
    }
}

/// Declare the `Song` class. Safe to run on every start.
pub fn install_schema(store: &dyn RecordStore) -> Result<()> {
    store.install_schema(&song_schema(), "Installing song schema")
}

/// Insert `song` keyed by its title.
///
/// # Errors
///
/// - [`CatalogError::InvalidUserInput`] for an empty title
/// - [`CatalogError::DuplicateKey`] if the title is already in the catalog;
///   nothing is written in that case
pub fn add_song(store: &dyn RecordStore, song: &Song) -> Result<()> {
    if song.title.is_empty() {
        return Err(CatalogError::InvalidUserInput("a song needs a title".to_string()));
    }

    let query = Query::insert_song(
        document_id(&song.title),
        vec![
            ("artist".to_string(), song.artist.clone()),
            ("length".to_string(), song.length.to_string()),
            ("album".to_string(), song.album.clone()),
        ],
    );
    let response = query.execute(store, &format!("Adding song {}", song.title))?;
    if response.inserts == 0 {
        return Err(CatalogError::DuplicateKey(song.title.clone()));
    }

    info!("Added song {}", song.title);
    Ok(())
}

/// Delete the song titled `title`. Removing an absent title succeeds and
/// deletes nothing. Returns the number of triples removed.
pub fn remove_song(store: &dyn RecordStore, title: &str) -> Result<u64> {
    let query = Query::Delete { id: document_id(title) };
    let response = query.execute(store, &format!("Removing song {title}"))?;
    if response.deletes > 0 {
        info!("Removed song {title} ({} triples)", response.deletes);
    }
    Ok(response.deletes)
}

/// Attributes that can be edited after insertion. The title cannot: it is
/// the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Artist,
    Album,
    Length,
}

impl Attribute {
    /// Edit submenu numbering.
    pub fn from_menu_choice(choice: u32) -> Option<Self> {
        match choice {
            1 => Some(Self::Artist),
            2 => Some(Self::Album),
            3 => Some(Self::Length),
            _ => None,
        }
    }

    /// Schema property name.
    pub fn property(self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Album => "album",
            Self::Length => "length",
        }
    }

    /// Check a new value for this attribute and return its stored form.
    ///
    /// # Errors
    ///
    /// [`CatalogError::InvalidUserInput`] when a length is not a positive
    /// whole number.
    pub fn normalize(self, raw: &str) -> Result<String> {
        match self {
            Self::Artist | Self::Album => Ok(raw.to_string()),
            Self::Length => match raw.trim().parse::<u32>() {
                Ok(length) if length > 0 => Ok(length.to_string()),
                _ => Err(CatalogError::InvalidUserInput(format!(
                    "'{raw}' is not a positive whole number of seconds"
                ))),
            },
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.property())
    }
}

/// Replace `attribute` of the song titled `title` with `value`.
///
/// A song that never had the attribute ends up with it set.
///
/// # Errors
///
/// - [`CatalogError::InvalidUserInput`] if `value` is not valid for the
///   attribute
/// - [`CatalogError::NotFound`] if no song has this title; nothing is written
pub fn edit_attribute(store: &dyn RecordStore, title: &str, attribute: Attribute, value: &str) -> Result<()> {
    let value = attribute.normalize(value)?;
    let id = Term::node(document_id(title));
    let predicate = Term::node(schema_iri(attribute.property()));

    let query = Query::And(vec![
        Query::Matches(Triple::new(id.clone(), Term::node(RDF_TYPE), Term::var("class"))),
        Query::RetractTriple(Triple::new(id.clone(), predicate.clone(), Term::var("old"))),
        Query::AssertTriple(Triple::new(id, predicate, Term::literal(value.clone()))),
    ]);
    let response = query.execute(store, &format!("Changing {attribute} of {title}"))?;
    if response.inserts == 0 {
        return Err(CatalogError::NotFound(format!("song '{title}'")));
    }

    info!("Set {attribute} of {title} to {value}");
    Ok(())
}

/// Every song in the catalog, up to `settings.query_limit / 4` of them, in
/// store order.
///
/// # Errors
///
/// Store failures, or [`CatalogError::MalformedResult`] when the bindings do
/// not regroup into songs.
pub fn fetch_songs(store: &dyn RecordStore, settings: &Settings) -> Result<Vec<Song>> {
    let query = Query::WildcardQuery { limit: settings.query_limit };
    let response = query.execute(store, "Listing songs")?;
    if response.bindings.len() >= settings.query_limit {
        warn!(
            "Listing hit the query limit of {} bindings, some songs may be missing",
            settings.query_limit
        );
    }
    flatten_bindings(&response.bindings, &settings.layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{search, SearchQuery};
    use crate::store::local::LocalStore;

    fn store() -> LocalStore {
        let store = LocalStore::open_in_memory().unwrap();
        install_schema(&store).unwrap();
        store
    }

    fn song(title: &str, artist: &str, album: &str, length: u32) -> Song {
        Song {
            title: title.to_string(),
            artist: artist.to_string(),
            album: album.to_string(),
            length,
        }
    }

    #[test]
    fn test_add_then_fetch() {
        let store = store();
        add_song(&store, &song("Yesterday", "The Beatles", "Help!", 125)).unwrap();
        add_song(&store, &song("Jolene", "Dolly Parton", "Jolene", 161)).unwrap();

        let songs = fetch_songs(&store, &Settings::default()).unwrap();
        assert_eq!(
            songs,
            vec![
                song("Yesterday", "The Beatles", "Help!", 125),
                song("Jolene", "Dolly Parton", "Jolene", 161),
            ]
        );
    }

    #[test]
    fn test_add_duplicate_title_fails_and_keeps_original() {
        let store = store();
        add_song(&store, &song("A", "X", "Y", 200)).unwrap();

        let err = add_song(&store, &song("A", "Other", "Other", 1)).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateKey(title) if title == "A"));

        let songs = fetch_songs(&store, &Settings::default()).unwrap();
        assert_eq!(songs, vec![song("A", "X", "Y", 200)]);
    }

    #[test]
    fn test_add_rejects_empty_title() {
        let store = store();
        assert!(matches!(
            add_song(&store, &song("", "X", "Y", 1)),
            Err(CatalogError::InvalidUserInput(_))
        ));
        assert_eq!(store.triple_count().unwrap(), 0);
    }

    #[test]
    fn test_titles_with_slashes_round_trip() {
        let store = store();
        add_song(&store, &song("Either/Or", "Elliott Smith", "Either/Or", 180)).unwrap();
        let songs = fetch_songs(&store, &Settings::default()).unwrap();
        assert_eq!(songs[0].title, "Either/Or");
    }

    #[test]
    fn test_remove_song() {
        let store = store();
        add_song(&store, &song("A", "X", "Y", 200)).unwrap();
        add_song(&store, &song("B", "Z", "Y", 180)).unwrap();

        assert_eq!(remove_song(&store, "A").unwrap(), 4);
        let songs = fetch_songs(&store, &Settings::default()).unwrap();
        assert_eq!(songs, vec![song("B", "Z", "Y", 180)]);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let store = store();
        add_song(&store, &song("A", "X", "Y", 200)).unwrap();
        assert_eq!(remove_song(&store, "Missing").unwrap(), 0);
        assert_eq!(fetch_songs(&store, &Settings::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_edit_each_attribute() {
        let store = store();
        add_song(&store, &song("A", "X", "Y", 200)).unwrap();

        edit_attribute(&store, "A", Attribute::Artist, "New Artist").unwrap();
        edit_attribute(&store, "A", Attribute::Album, "New Album").unwrap();
        edit_attribute(&store, "A", Attribute::Length, " 321 ").unwrap();

        let songs = fetch_songs(&store, &Settings::default()).unwrap();
        assert_eq!(songs, vec![song("A", "New Artist", "New Album", 321)]);
    }

    #[test]
    fn test_edit_to_same_value_keeps_song_whole() {
        let store = store();
        add_song(&store, &song("A", "X", "Y", 200)).unwrap();
        edit_attribute(&store, "A", Attribute::Artist, "X").unwrap();
        assert_eq!(store.triple_count().unwrap(), 4);
    }

    #[test]
    fn test_edit_sets_attribute_the_song_lacks() {
        let store = store();
        add_song(&store, &song("A", "X", "Y", 200)).unwrap();
        let drop_album = Query::RetractTriple(Triple::new(
            Term::node(document_id("A")),
            Term::node(schema_iri("album")),
            Term::var("old"),
        ));
        drop_album.execute(&store, "Dropping album of A").unwrap();
        assert_eq!(store.triple_count().unwrap(), 3);

        edit_attribute(&store, "A", Attribute::Album, "New").unwrap();
        assert_eq!(store.triple_count().unwrap(), 4);
        let songs = fetch_songs(&store, &Settings::default()).unwrap();
        assert_eq!(songs, vec![song("A", "X", "New", 200)]);
    }

    #[test]
    fn test_edit_missing_song_writes_nothing() {
        let store = store();
        let err = edit_attribute(&store, "Ghost", Attribute::Album, "Z").unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
        assert_eq!(store.triple_count().unwrap(), 0);
    }

    #[test]
    fn test_edit_length_must_be_positive_integer() {
        let store = store();
        add_song(&store, &song("A", "X", "Y", 200)).unwrap();

        for bad in ["0", "-5", "three", ""] {
            let err = edit_attribute(&store, "A", Attribute::Length, bad).unwrap_err();
            assert!(err.is_user_error(), "{bad} should be rejected");
        }
        let songs = fetch_songs(&store, &Settings::default()).unwrap();
        assert_eq!(songs[0].length, 200);
    }

    #[test]
    fn test_edited_song_is_searchable() {
        let store = store();
        add_song(&store, &song("A", "X", "Y", 200)).unwrap();
        add_song(&store, &song("B", "X", "W", 100)).unwrap();
        edit_attribute(&store, "B", Attribute::Artist, "Q").unwrap();

        let songs = fetch_songs(&store, &Settings::default()).unwrap();
        let hits = search(&songs, &SearchQuery::Artist("X".into()));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "A");
    }

    #[test]
    fn test_fetch_respects_query_limit() {
        let store = store();
        for title in ["A", "B", "C"] {
            add_song(&store, &song(title, "X", "Y", 1)).unwrap();
        }
        let settings = Settings { query_limit: 8, ..Settings::default() };
        let songs = fetch_songs(&store, &settings).unwrap();
        assert_eq!(songs.len(), 2);
    }

    #[test]
    fn test_fetch_empty_catalog() {
        let store = store();
        assert!(fetch_songs(&store, &Settings::default()).unwrap().is_empty());
    }

    #[test]
    fn test_attribute_menu_choices() {
        assert_eq!(Attribute::from_menu_choice(1), Some(Attribute::Artist));
        assert_eq!(Attribute::from_menu_choice(3), Some(Attribute::Length));
        assert_eq!(Attribute::from_menu_choice(4), None);
        assert_eq!(Attribute::Album.to_string(), "album");
    }

    #[test]
    fn test_schema_declares_three_strings() {
        let schema = song_schema();
        assert_eq!(schema.id, "Song");
        assert_eq!(schema.comment, "A song title.");
        for name in ["artist", "length", "album"] {
            assert!(schema.has_property(name));
        }
        assert!(schema.properties.iter().all(|p| p.range == XSD_STRING));
    }
}
