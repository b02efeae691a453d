//! # Interactive Menu
//!
//! The numbered-menu front end run by `jukebox` (or `jukebox menu`). The
//! shell reads from any [`BufRead`] and writes to any [`Write`], so the whole
//! session can be scripted in tests.
//!
//! ```text
//! Please enter a decision.
//! [1] View Songs in Database.
//! [2] Add a song.
//! ...
//! [7] Exit.
//! ```
//!
//! Invalid choices re-prompt. Catalog errors (a duplicate title, a missing
//! audio file, a store rejecting a query) are printed and the session goes on.
//! Only terminal I/O failures end it early; end of input ends it cleanly.

use crate::catalog::{search, SearchCategory, SearchQuery, Song};
use crate::config::Settings;
use crate::error::{CatalogError, Result as CatalogResult};
use crate::playback::{play_title, AudioSource, PlaybackOutcome, Player};
use crate::records::{add_song, edit_attribute, fetch_songs, remove_song, Attribute};
use crate::store::RecordStore;
use anyhow::Result;
use log::{debug, warn};
use std::io::{BufRead, Write};

pub const MAIN_MENU: &str = "Please enter a decision.\n\
    [1] View Songs in Database.\n\
    [2] Add a song.\n\
    [3] Remove a song.\n\
    [4] Edit a song.\n\
    [5] Find a song.\n\
    [6] Download/Play a song\n\
    [7] Exit.\n";

pub const EDIT_MENU: &str = "Please enter a decision.\n\
    [1] Change a song's artist.\n\
    [2] Change a song's album.\n\
    [3] Change a song's length.\n";

pub const FIND_MENU: &str = "What category do you want to search by?\n\
    [1] Search by song name.\n\
    [2] Search by song album.\n\
    [3] Search by song artist.\n\
    [4] Search by song length.\n";

pub const INVALID_OPTION: &str = "The option that you have inputted is invalid. Try again.";

const EXIT_CHOICE: u32 = 7;

/// Whether the session continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    Running,
    Exited,
}

/// Parse a menu choice in `1..=max`.
///
/// # Errors
///
/// [`CatalogError::InvalidUserInput`] for anything else.
pub fn parse_choice(raw: &str, max: u32) -> CatalogResult<u32> {
    match raw.trim().parse::<u32>() {
        Ok(choice) if (1..=max).contains(&choice) => Ok(choice),
        _ => Err(CatalogError::InvalidUserInput(format!("'{}' is not an option", raw.trim()))),
    }
}

/// Print songs the way every listing does: one block per song, blank line
/// after each.
pub fn write_songs<'a, W: Write>(out: &mut W, songs: impl IntoIterator<Item = &'a Song>) -> std::io::Result<()> {
    for song in songs {
        writeln!(out, "{song}\n")?;
    }
    Ok(())
}

/// Header printed above search results.
pub fn found_message(count: usize, query: &SearchQuery) -> String {
    format!(
        "\nFound {count} instance(s) of the {} {query} in the Database\n",
        query.category().label()
    )
}

pub struct Shell<'a, R, W> {
    store: &'a dyn RecordStore,
    settings: &'a Settings,
    source: &'a AudioSource,
    player: &'a mut dyn Player,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Shell<'a, R, W> {
    pub fn new(
        store: &'a dyn RecordStore,
        settings: &'a Settings,
        source: &'a AudioSource,
        player: &'a mut dyn Player,
        input: R,
        output: W,
    ) -> Self {
        Self { store, settings, source, player, input, output }
    }

    /// Run until the user exits or input ends.
    ///
    /// # Errors
    ///
    /// Only when reading or writing the terminal fails.
    pub fn run(&mut self) -> Result<()> {
        while self.step()? == MenuState::Running {}
        debug!("Menu session ended");
        Ok(())
    }

    /// Show the main menu once and carry out the chosen action.
    pub fn step(&mut self) -> Result<MenuState> {
        let Some(choice) = self.choose(MAIN_MENU, EXIT_CHOICE)? else {
            return Ok(MenuState::Exited);
        };

        let outcome = match choice {
            1 => self.view(),
            2 => self.add(),
            3 => self.remove(),
            4 => self.edit(),
            5 => self.find(),
            6 => self.play(),
            _ => return Ok(MenuState::Exited),
        };

        match outcome {
            Ok(state) => Ok(state),
            Err(error) => match error.downcast::<CatalogError>() {
                Ok(catalog_error) => {
                    if catalog_error.is_user_error() {
                        debug!("Menu action {choice} rejected input: {catalog_error}");
                    } else {
                        warn!("Menu action {choice} failed: {catalog_error}");
                    }
                    writeln!(self.output, "{}", describe_failure(&catalog_error))?;
                    Ok(MenuState::Running)
                }
                Err(other) => Err(other),
            },
        }
    }

    /// Write `text` and read one line. `None` at end of input.
    fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        write!(self.output, "{text}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    /// Show `menu` until a choice in `1..=max` is entered.
    fn choose(&mut self, menu: &str, max: u32) -> Result<Option<u32>> {
        loop {
            let Some(raw) = self.prompt(menu)? else {
                return Ok(None);
            };
            match parse_choice(&raw, max) {
                Ok(choice) => return Ok(Some(choice)),
                Err(e) => {
                    debug!("{e}");
                    writeln!(self.output, "{INVALID_OPTION}")?;
                }
            }
        }
    }

    /// Prompt until `parse` accepts the answer.
    fn prompt_parsed<T>(
        &mut self,
        text: &str,
        parse: impl Fn(&str) -> CatalogResult<T>,
    ) -> Result<Option<T>> {
        loop {
            let Some(raw) = self.prompt(text)? else {
                return Ok(None);
            };
            match parse(&raw) {
                Ok(value) => return Ok(Some(value)),
                Err(e) => writeln!(self.output, "{e}")?,
            }
        }
    }

    fn view(&mut self) -> Result<MenuState> {
        let songs = fetch_songs(self.store, self.settings)?;
        writeln!(self.output, "Songs in Database:\n")?;
        write_songs(&mut self.output, &songs)?;
        Ok(MenuState::Running)
    }

    fn add(&mut self) -> Result<MenuState> {
        let Some(title) = self.prompt("Please enter the song's name. ")? else {
            return Ok(MenuState::Exited);
        };
        let Some(album) = self.prompt("Please enter the album. ")? else {
            return Ok(MenuState::Exited);
        };
        let Some(artist) = self.prompt("Please enter the artist. ")? else {
            return Ok(MenuState::Exited);
        };
        let Some(length) = self.prompt_parsed("Please enter the length. ", |raw| {
            raw.trim().parse::<u32>().map_err(|_| {
                CatalogError::InvalidUserInput(format!("'{raw}' is not a length in seconds"))
            })
        })?
        else {
            return Ok(MenuState::Exited);
        };

        let song = Song { title, artist, album, length };
        add_song(self.store, &song)?;
        writeln!(self.output, "Added: {}\n", song.title)?;
        Ok(MenuState::Running)
    }

    fn remove(&mut self) -> Result<MenuState> {
        let Some(title) = self.prompt("Please enter a song title to remove from the database: ")? else {
            return Ok(MenuState::Exited);
        };
        remove_song(self.store, &title)?;
        writeln!(self.output, "Removed {title}, if it was present.")?;
        Ok(MenuState::Running)
    }

    fn edit(&mut self) -> Result<MenuState> {
        let Some(choice) = self.choose(EDIT_MENU, 3)? else {
            return Ok(MenuState::Exited);
        };
        let Some(attribute) = Attribute::from_menu_choice(choice) else {
            return Ok(MenuState::Running);
        };
        let Some(title) = self.prompt("Please enter the song title. ")? else {
            return Ok(MenuState::Exited);
        };

        let question = match attribute {
            Attribute::Artist => "Please enter the new artist. ",
            Attribute::Album => "Please enter the new album. ",
            Attribute::Length => {
                "Please enter the new length, as a positive integer representing the length of the song in seconds. "
            }
        };
        let Some(value) = self.prompt_parsed(question, |raw| attribute.normalize(raw))? else {
            return Ok(MenuState::Exited);
        };

        edit_attribute(self.store, &title, attribute, &value)?;
        writeln!(self.output, "Changed the {attribute} of {title} to {value}.")?;
        Ok(MenuState::Running)
    }

    fn find(&mut self) -> Result<MenuState> {
        let songs = fetch_songs(self.store, self.settings)?;

        let Some(choice) = self.choose(FIND_MENU, 4)? else {
            return Ok(MenuState::Exited);
        };
        let Some(category) = SearchCategory::from_menu_choice(choice) else {
            return Ok(MenuState::Running);
        };
        let question = format!(
            "Enter the {} of the song that you are searching for: ",
            match category {
                SearchCategory::Name => "name",
                other => other.label(),
            }
        );
        let Some(query) = self.prompt_parsed(&question, |raw| SearchQuery::parse(category, raw))? else {
            return Ok(MenuState::Exited);
        };

        let hits = search(&songs, &query);
        writeln!(self.output, "{}", found_message(hits.len(), &query))?;
        write_songs(&mut self.output, hits)?;
        Ok(MenuState::Running)
    }

    fn play(&mut self) -> Result<MenuState> {
        let Some(title) = self.prompt(
            "Enter a song title to be played. It must be hosted on this project's github and in .wav format. ",
        )?
        else {
            return Ok(MenuState::Exited);
        };

        match play_title(self.store, self.settings, self.source, &mut *self.player, &title)? {
            PlaybackOutcome::Played(path) => {
                writeln!(self.output, "Finished playing {title} ({}).", path.display())?
            }
            PlaybackOutcome::Saved(path) => writeln!(
                self.output,
                "Downloaded {title} to {}. Audio output is not available in this build.",
                path.display()
            )?,
        }
        Ok(MenuState::Running)
    }
}

/// One-line report for a failed action.
pub fn describe_failure(error: &CatalogError) -> String {
    match error {
        CatalogError::AudioNotFound(_) => {
            "File could not be found! Are you sure the file is hosted on the github and the name is correct?"
                .to_string()
        }
        other => format!("Error: {other}"),
    }
}
