//! # Catalog Records
//!
//! Turns the flat binding list of a wildcard triple query back into songs,
//! and filters songs by exact match.
//!
//! A wildcard query over the store returns one binding per triple. Each song
//! is four triples (its type plus album, artist and length), and the store
//! returns them consecutively, so the bindings are cut into chunks of
//! [`CHUNK_SIZE`] and each chunk becomes one [`Song`]. Which position in a
//! chunk carries which attribute is described by a [`SlotLayout`]; the chunk
//! members are not cross-checked against each other.
//!
//! ```
//! use jukebox::catalog::{flatten_bindings, search, SearchQuery, SlotLayout};
//! use serde_json::json;
//!
//! let binding = |subject: &str, value: serde_json::Value| {
//!     json!({"song": subject, "attribute": "_", "value": value})
//!         .as_object()
//!         .cloned()
//!         .unwrap()
//! };
//! let bindings = vec![
//!     binding("Song/A", json!("@schema:Song")),
//!     binding("Song/A", json!({"@value": "Abbey Road"})),
//!     binding("Song/A", json!({"@value": "The Beatles"})),
//!     binding("Song/A", json!({"@value": "259"})),
//! ];
//!
//! let songs = flatten_bindings(&bindings, &SlotLayout::default())?;
//! assert_eq!(songs[0].title, "A");
//! assert_eq!(songs[0].length, 259);
//!
//! let hits = search(&songs, &SearchQuery::Artist("The Beatles".into()));
//! assert_eq!(hits.len(), 1);
//! # Ok::<(), jukebox::error::CatalogError>(())
//! ```

use crate::error::{CatalogError, Result};
use crate::woql::{Binding, OBJECT_VAR, SUBJECT_VAR};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Bindings per song.
pub const CHUNK_SIZE: usize = 4;

/// Which chunk position holds which attribute, and how to cut the title out
/// of a document id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotLayout {
    pub title: usize,
    pub album: usize,
    pub artist: usize,
    pub length: usize,
    /// The title is whatever follows the last occurrence of this marker in
    /// the subject IRI.
    pub title_marker: String,
}

impl Default for SlotLayout {
    fn default() -> Self {
        Self {
            title: 0,
            album: 1,
            artist: 2,
            length: 3,
            title_marker: "Song/".to_string(),
        }
    }
}

impl SlotLayout {
    /// The four slots must be a permutation of `0..CHUNK_SIZE` and the
    /// marker non-empty.
    pub fn validate(&self) -> Result<()> {
        let mut seen = [false; CHUNK_SIZE];
        for (name, slot) in [
            ("title", self.title),
            ("album", self.album),
            ("artist", self.artist),
            ("length", self.length),
        ] {
            if slot >= CHUNK_SIZE {
                return Err(CatalogError::Config(format!(
                    "layout slot for {name} is {slot}, must be below {CHUNK_SIZE}"
                )));
            }
            if seen[slot] {
                return Err(CatalogError::Config(format!(
                    "layout slot {slot} is assigned twice (again by {name})"
                )));
            }
            seen[slot] = true;
        }
        if self.title_marker.is_empty() {
            return Err(CatalogError::Config("layout title marker is empty".to_string()));
        }
        Ok(())
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Song {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Seconds.
    pub length: u32,
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Song Name: {}", self.title)?;
        writeln!(f, "Song Album: {}", self.album)?;
        writeln!(f, "Song Artist: {}", self.artist)?;
        write!(f, "Song Length: {}", self.length)
    }
}

/// Regroup wildcard-query bindings into songs, in result order.
///
/// # Errors
///
/// [`CatalogError::MalformedResult`] when the binding count is not a multiple
/// of [`CHUNK_SIZE`] or any chunk member lacks the field its slot needs.
pub fn flatten_bindings(bindings: &[Binding], layout: &SlotLayout) -> Result<Vec<Song>> {
    if bindings.len() % CHUNK_SIZE != 0 {
        return Err(CatalogError::malformed(format!(
            "{} bindings cannot be split into songs of {CHUNK_SIZE}",
            bindings.len()
        )));
    }

    bindings
        .chunks_exact(CHUNK_SIZE)
        .enumerate()
        .map(|(index, chunk)| song_from_chunk(index, chunk, layout))
        .collect()
}

fn song_from_chunk(index: usize, chunk: &[Binding], layout: &SlotLayout) -> Result<Song> {
    let slot = |position: usize| {
        chunk
            .get(position)
            .ok_or_else(|| CatalogError::malformed(format!("song {index}: no binding at slot {position}")))
    };

    let title = extract_title(slot(layout.title)?, &layout.title_marker)
        .map_err(|e| in_song(index, "title", e))?;
    let album = extract_value(slot(layout.album)?).map_err(|e| in_song(index, "album", e))?;
    let artist = extract_value(slot(layout.artist)?).map_err(|e| in_song(index, "artist", e))?;
    let raw_length = extract_value(slot(layout.length)?).map_err(|e| in_song(index, "length", e))?;
    let length = raw_length
        .trim()
        .parse::<u32>()
        .map_err(|_| CatalogError::malformed(format!("song {index}: length '{raw_length}' is not a whole number")))?;

    Ok(Song { title, artist, album, length })
}

fn in_song(index: usize, field: &str, reason: String) -> CatalogError {
    CatalogError::malformed(format!("song {index}: {field}: {reason}"))
}

/// Text after the last `marker` in the subject, percent-decoded.
fn extract_title(binding: &Binding, marker: &str) -> std::result::Result<String, String> {
    let subject = binding
        .get(SUBJECT_VAR)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("binding has no '{SUBJECT_VAR}' IRI"))?;
    let start = subject
        .rfind(marker)
        .map(|at| at + marker.len())
        .ok_or_else(|| format!("'{subject}' does not contain '{marker}'"))?;

    urlencoding::decode(&subject[start..])
        .map(|title| title.into_owned())
        .map_err(|e| format!("'{subject}' is not valid percent-encoding: {e}"))
}

/// The object's nested `@value`, as text.
fn extract_value(binding: &Binding) -> std::result::Result<String, String> {
    let value = binding
        .get(OBJECT_VAR)
        .and_then(|object| object.get("@value"))
        .ok_or_else(|| format!("binding has no '{OBJECT_VAR}.@value'"))?;

    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(format!("unexpected value {other}")),
    }
}

/// Field a search looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchCategory {
    Name,
    Album,
    Artist,
    Length,
}

impl SearchCategory {
    /// Find submenu numbering.
    pub fn from_menu_choice(choice: u32) -> Option<Self> {
        match choice {
            1 => Some(Self::Name),
            2 => Some(Self::Album),
            3 => Some(Self::Artist),
            4 => Some(Self::Length),
            _ => None,
        }
    }

    /// Word used in result messages ("Found 2 instance(s) of the artist …").
    pub fn label(self) -> &'static str {
        match self {
            Self::Name => "song",
            Self::Album => "album",
            Self::Artist => "artist",
            Self::Length => "length",
        }
    }
}

/// A category together with the value to match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    Name(String),
    Album(String),
    Artist(String),
    Length(u32),
}

impl SearchQuery {
    /// Build a query from user text. Text fields are taken verbatim.
    ///
    /// # Errors
    ///
    /// [`CatalogError::InvalidUserInput`] if a length is not a whole number.
    pub fn parse(category: SearchCategory, raw: &str) -> Result<Self> {
        Ok(match category {
            SearchCategory::Name => Self::Name(raw.to_string()),
            SearchCategory::Album => Self::Album(raw.to_string()),
            SearchCategory::Artist => Self::Artist(raw.to_string()),
            SearchCategory::Length => Self::Length(raw.trim().parse().map_err(|_| {
                CatalogError::InvalidUserInput(format!("'{raw}' is not a length in seconds"))
            })?),
        })
    }

    pub fn category(&self) -> SearchCategory {
        match self {
            Self::Name(_) => SearchCategory::Name,
            Self::Album(_) => SearchCategory::Album,
            Self::Artist(_) => SearchCategory::Artist,
            Self::Length(_) => SearchCategory::Length,
        }
    }

    pub fn matches(&self, song: &Song) -> bool {
        match self {
            Self::Name(title) => song.title == *title,
            Self::Album(album) => song.album == *album,
            Self::Artist(artist) => song.artist == *artist,
            Self::Length(length) => song.length == *length,
        }
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(value) | Self::Album(value) | Self::Artist(value) => f.write_str(value),
            Self::Length(length) => write!(f, "{length}"),
        }
    }
}

/// Songs equal to `query` on its field, in their original order.
#[must_use]
pub fn search<'a>(songs: &'a [Song], query: &SearchQuery) -> Vec<&'a Song> {
    songs.iter().filter(|song| query.matches(song)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn binding(value: Value) -> Binding {
        value.as_object().cloned().expect("test binding is an object")
    }

    /// Bindings for one song in the default layout.
    fn song_bindings(title: &str, album: &str, artist: &str, length: Value) -> Vec<Binding> {
        let subject = crate::woql::document_id(title);
        vec![
            binding(json!({"song": subject, "attribute": "rdf:type", "value": "@schema:Song"})),
            binding(json!({"song": subject, "attribute": "@schema:album", "value": {"@type": "xsd:string", "@value": album}})),
            binding(json!({"song": subject, "attribute": "@schema:artist", "value": {"@type": "xsd:string", "@value": artist}})),
            binding(json!({"song": subject, "attribute": "@schema:length", "value": {"@type": "xsd:string", "@value": length}})),
        ]
    }

    fn sample_songs() -> Vec<Song> {
        vec![
            Song { title: "A".into(), artist: "X".into(), album: "Y".into(), length: 200 },
            Song { title: "B".into(), artist: "Z".into(), album: "Y".into(), length: 180 },
        ]
    }

    #[test]
    fn test_flatten_yields_one_song_per_chunk_in_order() {
        let mut bindings = Vec::new();
        for (title, length) in [("C", 3), ("A", 1), ("B", 2)] {
            bindings.extend(song_bindings(title, "Album", "Artist", json!(length.to_string())));
        }

        let songs = flatten_bindings(&bindings, &SlotLayout::default()).unwrap();
        assert_eq!(songs.len(), 3);
        let titles: Vec<&str> = songs.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["C", "A", "B"]);
        assert_eq!(songs[0].length, 3);
    }

    #[test]
    fn test_flatten_reads_each_attribute_from_its_own_slot() {
        let bindings = song_bindings("Help!", "Help!", "The Beatles", json!("138"));
        let songs = flatten_bindings(&bindings, &SlotLayout::default()).unwrap();

        assert_eq!(
            songs[0],
            Song {
                title: "Help!".into(),
                artist: "The Beatles".into(),
                album: "Help!".into(),
                length: 138,
            }
        );
    }

    #[test]
    fn test_flatten_empty_is_empty() {
        let songs = flatten_bindings(&[], &SlotLayout::default()).unwrap();
        assert!(songs.is_empty());
    }

    #[test]
    fn test_flatten_rejects_partial_chunk() {
        let mut bindings = song_bindings("A", "Y", "X", json!("200"));
        bindings.pop();
        let err = flatten_bindings(&bindings, &SlotLayout::default()).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedResult(_)));

        for extra in 1..4 {
            let mut bindings = song_bindings("A", "Y", "X", json!("200"));
            bindings.extend(song_bindings("B", "Y", "X", json!("200")).into_iter().take(extra));
            assert!(flatten_bindings(&bindings, &SlotLayout::default()).is_err());
        }
    }

    #[test]
    fn test_flatten_rejects_missing_value_field() {
        let mut bindings = song_bindings("A", "Y", "X", json!("200"));
        bindings[2] = binding(json!({"song": "Song/A", "attribute": "@schema:artist", "value": "oops"}));
        let err = flatten_bindings(&bindings, &SlotLayout::default()).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedResult(msg) if msg.contains("artist")));
    }

    #[test]
    fn test_flatten_rejects_subject_without_marker() {
        let mut bindings = song_bindings("A", "Y", "X", json!("200"));
        bindings[0] = binding(json!({"song": "terminusdb:///data/A", "value": "@schema:Song"}));
        assert!(flatten_bindings(&bindings, &SlotLayout::default()).is_err());
    }

    #[test]
    fn test_flatten_rejects_non_numeric_length() {
        let bindings = song_bindings("A", "Y", "X", json!("three minutes"));
        assert!(matches!(
            flatten_bindings(&bindings, &SlotLayout::default()),
            Err(CatalogError::MalformedResult(_))
        ));
    }

    #[test]
    fn test_flatten_accepts_numeric_length() {
        let bindings = song_bindings("A", "Y", "X", json!(200));
        let songs = flatten_bindings(&bindings, &SlotLayout::default()).unwrap();
        assert_eq!(songs[0].length, 200);
    }

    #[test]
    fn test_flatten_uses_last_marker_occurrence() {
        let mut bindings = song_bindings("A", "Y", "X", json!("1"));
        bindings[0] = binding(json!({"song": "terminusdb:///data/Song/data/A"}));
        let layout = SlotLayout { title_marker: "data/".into(), ..SlotLayout::default() };
        let songs = flatten_bindings(&bindings, &layout).unwrap();
        assert_eq!(songs[0].title, "A");
    }

    #[test]
    fn test_flatten_decodes_titles() {
        let bindings = song_bindings("AC/DC: Back in Black", "Y", "X", json!("255"));
        let songs = flatten_bindings(&bindings, &SlotLayout::default()).unwrap();
        assert_eq!(songs[0].title, "AC/DC: Back in Black");
    }

    #[test]
    fn test_flatten_custom_layout() {
        let subject = "Song/A";
        let bindings = vec![
            binding(json!({"value": {"@value": "240"}})),
            binding(json!({"value": {"@value": "Artist"}})),
            binding(json!({"song": subject})),
            binding(json!({"value": {"@value": "Album"}})),
        ];
        let layout = SlotLayout { title: 2, album: 3, artist: 1, length: 0, ..SlotLayout::default() };
        let songs = flatten_bindings(&bindings, &layout).unwrap();
        assert_eq!(songs[0].artist, "Artist");
        assert_eq!(songs[0].album, "Album");
        assert_eq!(songs[0].length, 240);
    }

    #[test]
    fn test_layout_validation() {
        assert!(SlotLayout::default().validate().is_ok());

        let duplicate = SlotLayout { artist: 1, ..SlotLayout::default() };
        assert!(duplicate.validate().is_err());

        let out_of_range = SlotLayout { length: 4, ..SlotLayout::default() };
        assert!(out_of_range.validate().is_err());

        let no_marker = SlotLayout { title_marker: String::new(), ..SlotLayout::default() };
        assert!(no_marker.validate().is_err());
    }

    #[test]
    fn test_search_album_returns_all_matches_in_order() {
        let songs = sample_songs();
        let hits = search(&songs, &SearchQuery::Album("Y".into()));
        assert_eq!(hits, vec![&songs[0], &songs[1]]);
    }

    #[test]
    fn test_search_missing_length_is_empty() {
        let songs = sample_songs();
        assert!(search(&songs, &SearchQuery::Length(999)).is_empty());
    }

    #[test]
    fn test_search_artist_matches_artist_not_album() {
        let songs = vec![
            Song { title: "A".into(), artist: "Queen".into(), album: "Innuendo".into(), length: 1 },
            Song { title: "B".into(), artist: "Innuendo".into(), album: "Queen".into(), length: 2 },
        ];
        let hits = search(&songs, &SearchQuery::Artist("Queen".into()));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "A");

        let hits = search(&songs, &SearchQuery::Album("Queen".into()));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "B");
    }

    #[test]
    fn test_search_is_exact() {
        let songs = sample_songs();
        assert!(search(&songs, &SearchQuery::Name("a".into())).is_empty());
        assert!(search(&songs, &SearchQuery::Name("A ".into())).is_empty());
        assert_eq!(search(&songs, &SearchQuery::Name("A".into())).len(), 1);
    }

    #[test]
    fn test_search_keeps_duplicate_order() {
        let mut songs = sample_songs();
        songs.push(Song { title: "A".into(), artist: "W".into(), album: "V".into(), length: 10 });
        let hits = search(&songs, &SearchQuery::Name("A".into()));
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].artist, "X");
        assert_eq!(hits[1].artist, "W");
    }

    #[test]
    fn test_query_parse() {
        assert_eq!(
            SearchQuery::parse(SearchCategory::Length, " 200 ").unwrap(),
            SearchQuery::Length(200)
        );
        assert!(matches!(
            SearchQuery::parse(SearchCategory::Length, "long"),
            Err(CatalogError::InvalidUserInput(_))
        ));
        assert_eq!(
            SearchQuery::parse(SearchCategory::Artist, " X").unwrap(),
            SearchQuery::Artist(" X".into())
        );
        assert_eq!(SearchQuery::Length(3).category(), SearchCategory::Length);
    }

    #[test]
    fn test_menu_choice_mapping() {
        assert_eq!(SearchCategory::from_menu_choice(3), Some(SearchCategory::Artist));
        assert_eq!(SearchCategory::from_menu_choice(0), None);
        assert_eq!(SearchCategory::from_menu_choice(5), None);
    }

    #[test]
    fn test_song_display() {
        let text = sample_songs()[0].to_string();
        assert_eq!(text, "Song Name: A\nSong Album: Y\nSong Artist: X\nSong Length: 200");
    }
}
