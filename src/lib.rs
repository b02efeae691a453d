//! Song catalog manager backed by a TerminusDB graph.
//!
//! Core modules:
//! - [`catalog`] - Regrouping wildcard query bindings into songs, and search
//! - [`records`] - Add, remove, edit and list songs
//! - [`woql`] - Query expression trees and their WOQL encoding
//! - [`store`] - Record stores: remote TerminusDB and local SQLite
//! - [`playback`] - Download-and-play of hosted `.wav` files
//! - [`menu`] - Interactive numbered menu
//!
//! ### Supporting Modules
//!
//! - [`config`] - Layered settings (defaults, config file, flags)
//! - [`error`] - Typed catalog errors
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```
//! use jukebox::catalog::{search, SearchQuery, Song};
//! use jukebox::config::Settings;
//! use jukebox::records;
//! use jukebox::store::local::LocalStore;
//!
//! let store = LocalStore::open_in_memory()?;
//! records::install_schema(&store)?;
//! records::add_song(&store, &Song {
//!     title: "Yesterday".to_string(),
//!     artist: "The Beatles".to_string(),
//!     album: "Help!".to_string(),
//!     length: 125,
//! })?;
//!
//! let songs = records::fetch_songs(&store, &Settings::default())?;
//! let hits = search(&songs, &SearchQuery::Album("Help!".to_string()));
//! assert_eq!(hits[0].title, "Yesterday");
//! # Ok::<(), jukebox::error::CatalogError>(())
//! ```
//!
//! ## Error Handling
//!
//! Library functions return [`error::Result`]. The binary wraps errors in
//! `anyhow` for context. Only failing to reach the record store at startup
//! is fatal; the menu reports every other failure and carries on.

pub mod catalog;
pub mod cli;
pub mod completion;
pub mod config;
pub mod error;
pub mod menu;
pub mod playback;
pub mod records;
pub mod store;
pub mod woql;
