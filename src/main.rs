//! # Jukebox - Song Catalog Manager
//!
//! Entry point: parses arguments, layers settings, connects to the record
//! store and dispatches to the menu or a one-shot subcommand.
//!
//! ## Usage
//!
//! ```bash
//! # Interactive menu against the default local TerminusDB
//! jukebox
//!
//! # One-shot commands
//! jukebox list
//! jukebox find album "Help!"
//! jukebox --local songs.db add "Jolene" --artist "Dolly Parton" --album "Jolene" --length 161
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use jukebox::catalog::{search, SearchQuery, Song};
use jukebox::cli::{self, Command};
use jukebox::config::Settings;
use jukebox::playback::{self, AudioSource, PlaybackOutcome};
use jukebox::records::Attribute;
use jukebox::store::{self, RecordStore};
use jukebox::{completion, menu, records};
use log::{debug, info};
use std::io::{self, Write};

/// Main entry point for the Jukebox application.
///
/// # Error Handling
///
/// Failing to load settings or to reach the record store ends the program
/// with a non-zero status. Inside the menu, failures are reported and the
/// session continues.
///
/// # Logging
///
/// Initializes environment logger which can be controlled via `RUST_LOG`:
/// - `RUST_LOG=debug jukebox list` - Show every query sent to the store
/// - `RUST_LOG=jukebox::store=trace jukebox` - Module-specific logging
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();
    let command = args.command.unwrap_or(Command::Menu);

    if let Command::Completion { shell } = &command {
        let mut cmd = cli::Args::command();
        completion::generate_completions(completion::shell_to_completion_shell(shell), &mut cmd);
        return Ok(());
    }

    let mut settings = Settings::load(args.connection.config.as_deref()).context("Failed to load settings")?;
    args.connection.apply(&mut settings);
    let location = match &settings.connection.local_path {
        Some(path) => path.display().to_string(),
        None => settings.connection.server_url.clone(),
    };
    debug!(
        "Using {location} as {} (database {}/{}), query limit {}",
        settings.connection.user,
        settings.connection.account,
        settings.connection.database,
        settings.query_limit
    );

    if command == Command::CompleteTitles {
        // Completion must stay quiet when the store is unreachable.
        if let Ok(songs) = store::open(&settings).and_then(|store| records::fetch_songs(store.as_ref(), &settings)) {
            completion::write_title_completions(&mut io::stdout().lock(), &songs)?;
        }
        return Ok(());
    }

    let store = store::open(&settings).with_context(|| {
        match &settings.connection.local_path {
            Some(path) => format!("Could not open local catalog {}", path.display()),
            None => format!(
                "Could not connect to {} (database {}/{})",
                settings.connection.server_url, settings.connection.account, settings.connection.database
            ),
        }
    })?;
    records::install_schema(store.as_ref()).context("Failed to install the song schema")?;

    run(command, store.as_ref(), &settings)
}

fn run(command: Command, store: &dyn RecordStore, settings: &Settings) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Command::Menu => {
            let source = audio_source(settings)?;
            let mut player = playback::default_player(&settings.audio);
            let stdin = io::stdin();
            menu::Shell::new(store, settings, &source, player.as_mut(), stdin.lock(), out).run()?;
        }
        Command::List => {
            let songs = records::fetch_songs(store, settings)?;
            writeln!(out, "Songs in Database:\n")?;
            menu::write_songs(&mut out, &songs)?;
        }
        Command::Find { by, value } => {
            let query = SearchQuery::parse(by.into(), &value)?;
            let songs = records::fetch_songs(store, settings)?;
            let hits = search(&songs, &query);
            writeln!(out, "{}", menu::found_message(hits.len(), &query))?;
            menu::write_songs(&mut out, hits)?;
        }
        Command::Add { title, artist, album, length } => {
            let song = Song { title, artist, album, length };
            records::add_song(store, &song)?;
            writeln!(out, "Added: {}", song.title)?;
        }
        Command::Remove { title } => {
            records::remove_song(store, &title)?;
            writeln!(out, "Removed {title}, if it was present.")?;
        }
        Command::Edit { title, attribute, value } => {
            let attribute: Attribute = attribute.into();
            records::edit_attribute(store, &title, attribute, &value)?;
            writeln!(out, "Changed the {attribute} of {title}.")?;
        }
        Command::Play { title } => {
            let source = audio_source(settings)?;
            let mut player = playback::default_player(&settings.audio);
            let outcome = playback::play_title(store, settings, &source, player.as_mut(), &title)
                .with_context(|| format!("Could not play {title}"))?;
            match outcome {
                PlaybackOutcome::Played(path) => writeln!(out, "Finished playing {}", path.display())?,
                PlaybackOutcome::Saved(path) => writeln!(out, "Saved to {}", path.display())?,
            }
        }
        Command::Schema => {
            info!("Schema installed on {}", store.describe());
            writeln!(out, "Song schema installed on {}", store.describe())?;
        }
        Command::Completion { .. } | Command::CompleteTitles => {}
    }
    Ok(())
}

fn audio_source(settings: &Settings) -> Result<AudioSource> {
    let download_dir = settings.download_dir()?;
    AudioSource::new(&settings.audio, download_dir).context("Failed to set up the audio downloader")
}
