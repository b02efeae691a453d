//! # Command-Line Interface Module
//!
//! Clap definitions for Jukebox. With no subcommand the interactive menu
//! starts; the other subcommands run one catalog operation and exit.
//!
//! ## Commands
//!
//! - `menu`: Interactive numbered menu (default)
//! - `list`: Print every song in the catalog
//! - `find`: Exact-match search by name, album, artist or length
//! - `add` / `remove` / `edit`: Catalog mutations
//! - `play`: Download a song's `.wav` file and play it
//! - `schema`: (Re)install the `Song` schema
//!
//! Connection flags are global and each has a `JUKEBOX_*` environment
//! variable. They override the config file.
//!
//! ## Examples
//!
//! ```bash
//! jukebox --database songs
//! jukebox add "Yesterday" --artist "The Beatles" --album "Help!" --length 125
//! jukebox find artist "The Beatles"
//! jukebox --local ~/songs.db list
//! ```

use crate::catalog::SearchCategory;
use crate::config::Settings;
use crate::records::Attribute;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "jukebox")]
#[command(about = "Jukebox: a song catalog on TerminusDB with download-and-play")]
#[command(version)]
pub struct Args {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// The subcommand to execute; the interactive menu when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Where the catalog lives. Unset flags leave the config file's value alone.
#[derive(ClapArgs, Debug, Default, Clone)]
pub struct ConnectionArgs {
    /// Config file (default: the platform config dir's jukebox/config.json)
    #[arg(long, global = true, env = "JUKEBOX_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// TerminusDB server URL
    #[arg(long, global = true, env = "JUKEBOX_SERVER", value_name = "URL")]
    pub server: Option<String>,

    /// User to authenticate as
    #[arg(long, global = true, env = "JUKEBOX_USER")]
    pub user: Option<String>,

    /// Account (team) owning the database
    #[arg(long, global = true, env = "JUKEBOX_ACCOUNT")]
    pub account: Option<String>,

    /// API key or password
    #[arg(long, global = true, env = "JUKEBOX_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Database name
    #[arg(long, global = true, env = "JUKEBOX_DATABASE")]
    pub database: Option<String>,

    /// Use a local SQLite catalog file instead of a server
    #[arg(long, global = true, env = "JUKEBOX_LOCAL", value_name = "FILE")]
    pub local: Option<PathBuf>,

    /// Reject self-signed server certificates
    #[arg(long, global = true)]
    pub verify_tls: bool,

    /// Create the database if the server does not have it
    #[arg(long, global = true)]
    pub create_database: bool,
}

impl ConnectionArgs {
    /// Layer the given flags over `settings`.
    pub fn apply(&self, settings: &mut Settings) {
        let connection = &mut settings.connection;
        if let Some(server) = &self.server {
            connection.server_url = server.clone();
        }
        if let Some(user) = &self.user {
            connection.user = user.clone();
        }
        if let Some(account) = &self.account {
            connection.account = account.clone();
        }
        if let Some(key) = &self.key {
            connection.key = key.clone();
        }
        if let Some(database) = &self.database {
            connection.database = database.clone();
        }
        if let Some(local) = &self.local {
            connection.local_path = Some(local.clone());
        }
        if self.verify_tls {
            connection.accept_invalid_certs = false;
        }
        if self.create_database {
            connection.create_database = true;
        }
    }
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start the interactive menu
    Menu,

    /// List every song in the catalog
    List,

    /// Find songs whose field equals a value exactly
    ///
    /// Text fields are case-sensitive; length is compared as whole seconds.
    Find {
        /// Field to search
        by: SearchField,

        /// Value to match
        value: String,
    },

    /// Add a song
    Add {
        /// Song title, unique in the catalog
        title: String,

        #[arg(long)]
        artist: String,

        #[arg(long)]
        album: String,

        /// Length in seconds
        #[arg(long)]
        length: u32,
    },

    /// Remove a song (no-op if absent)
    Remove {
        #[arg(value_hint = clap::ValueHint::Other)]
        title: String,
    },

    /// Change one attribute of a song
    Edit {
        #[arg(value_hint = clap::ValueHint::Other)]
        title: String,

        /// Attribute to change
        #[arg(long, short)]
        attribute: EditField,

        /// New value; lengths must be positive whole seconds
        value: String,
    },

    /// Download a song's audio file and play it
    ///
    /// The file is fetched from `<audio.base_url><title>.wav`. Without the
    /// `audio` build feature the file is only saved.
    Play {
        #[arg(value_hint = clap::ValueHint::Other)]
        title: String,
    },

    /// Install (or reinstall) the Song schema
    Schema,

    /// Generate shell completions
    ///
    /// Usage: jukebox completion bash > ~/.local/share/bash-completion/completions/jukebox
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },

    /// List song titles for completion (hidden command)
    #[command(hide = true)]
    CompleteTitles,
}

/// Search fields as spelled on the command line.
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum SearchField {
    Name,
    Album,
    Artist,
    Length,
}

impl From<SearchField> for SearchCategory {
    fn from(field: SearchField) -> Self {
        match field {
            SearchField::Name => SearchCategory::Name,
            SearchField::Album => SearchCategory::Album,
            SearchField::Artist => SearchCategory::Artist,
            SearchField::Length => SearchCategory::Length,
        }
    }
}

/// Editable attributes as spelled on the command line.
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum EditField {
    Artist,
    Album,
    Length,
}

impl From<EditField> for Attribute {
    fn from(field: EditField) -> Self {
        match field {
            EditField::Artist => Attribute::Artist,
            EditField::Album => Attribute::Album,
            EditField::Length => Attribute::Length,
        }
    }
}
