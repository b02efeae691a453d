//! # Playback Module
//!
//! Download-and-play for catalog songs. Audio files are not stored in the
//! record store; they live on a static host as `<base_url><title>.wav`.
//!
//! ## Flow
//!
//! 1. [`play_title`] checks the title is in the catalog
//! 2. [`AudioSource::download`] fetches the file into the download directory
//! 3. A [`Player`] plays it and blocks until it has finished
//!
//! Actual audio output needs the `audio` cargo feature (rodio). Without it
//! [`NullPlayer`] only reports where the file was saved.

use crate::catalog::{search, SearchQuery};
use crate::config::{AudioSettings, Settings};
use crate::error::{CatalogError, Result};
use crate::records::fetch_songs;
use crate::store::RecordStore;
use log::{debug, info};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

/// What happened to a downloaded song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Played to the end (or to the wait deadline).
    Played(PathBuf),
    /// Saved only; no audio output available.
    Saved(PathBuf),
}

/// Something that can play a local audio file.
pub trait Player {
    /// Play `path`, returning once playback is over.
    fn play(&mut self, path: &Path) -> Result<PlaybackOutcome>;
}

/// Player for builds without audio output.
#[derive(Debug, Default)]
pub struct NullPlayer;

impl Player for NullPlayer {
    fn play(&mut self, path: &Path) -> Result<PlaybackOutcome> {
        debug!("Audio output not compiled in, leaving {} on disk", path.display());
        Ok(PlaybackOutcome::Saved(path.to_path_buf()))
    }
}

/// Plays through the default output device with rodio.
#[cfg(feature = "audio")]
pub struct RodioPlayer {
    volume: f32,
    poll_interval: Duration,
}

#[cfg(feature = "audio")]
impl RodioPlayer {
    /// Grace period on top of the decoded duration before giving up waiting.
    const DEADLINE_SLACK: Duration = Duration::from_secs(5);

    pub fn new(settings: &AudioSettings) -> Self {
        Self {
            volume: settings.volume,
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
        }
    }
}

#[cfg(feature = "audio")]
impl Player for RodioPlayer {
    fn play(&mut self, path: &Path) -> Result<PlaybackOutcome> {
        use rodio::{Decoder, OutputStreamBuilder, Sink, Source};
        use std::fs::File;
        use std::io::BufReader;

        let stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| CatalogError::Audio(format!("Failed to open audio output: {e}")))?;
        let file = File::open(path)?;
        let source = Decoder::new(BufReader::new(file))
            .map_err(|e| CatalogError::Audio(format!("Failed to decode {}: {e}", path.display())))?;
        let deadline = source.total_duration().map(|length| length + Self::DEADLINE_SLACK);

        let sink = Sink::connect_new(stream.mixer());
        sink.set_volume(self.volume);
        sink.append(source);
        info!("Playing {}", path.display());

        let polls = wait_for_completion(|| !sink.empty(), self.poll_interval, deadline);
        debug!("Playback finished after {polls} polls");
        Ok(PlaybackOutcome::Played(path.to_path_buf()))
    }
}

/// The best player this build supports.
pub fn default_player(settings: &AudioSettings) -> Box<dyn Player> {
    #[cfg(feature = "audio")]
    {
        Box::new(RodioPlayer::new(settings))
    }
    #[cfg(not(feature = "audio"))]
    {
        let _ = settings;
        Box::new(NullPlayer)
    }
}

/// Sleep in `interval` steps while `is_busy` holds, giving up once
/// `deadline` has passed. Returns the number of checks made.
pub fn wait_for_completion(
    mut is_busy: impl FnMut() -> bool,
    interval: Duration,
    deadline: Option<Duration>,
) -> u64 {
    let started = Instant::now();
    let mut polls = 0;
    loop {
        polls += 1;
        if !is_busy() {
            return polls;
        }
        if deadline.is_some_and(|limit| started.elapsed() >= limit) {
            debug!("Gave up waiting for playback after {:?}", started.elapsed());
            return polls;
        }
        thread::sleep(interval);
    }
}

/// Where song files are downloaded from and saved to.
pub struct AudioSource {
    http: Client,
    base_url: String,
    download_dir: PathBuf,
}

impl AudioSource {
    pub fn new(settings: &AudioSettings, download_dir: PathBuf) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("jukebox/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(http, &settings.base_url, download_dir))
    }

    pub fn with_client(http: Client, base_url: &str, download_dir: PathBuf) -> Self {
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self { http, base_url, download_dir }
    }

    pub fn url_for(&self, title: &str) -> String {
        format!("{}{}", self.base_url, file_name(title))
    }

    /// Fetch the song file for `title` and save it in the download
    /// directory, replacing an earlier copy. Returns the saved path.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::AudioNotFound`] when the host has no file for this title
    /// - [`CatalogError::Http`] for transport failures and other error statuses
    /// - [`CatalogError::Io`] if the file cannot be written
    pub fn download(&self, title: &str) -> Result<PathBuf> {
        let url = self.url_for(title);
        debug!("Downloading {url}");

        let response = self.http.get(&url).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CatalogError::AudioNotFound(url));
        }
        let mut response = response.error_for_status()?;

        // Only complete downloads appear under the final name.
        let mut partial = NamedTempFile::new_in(&self.download_dir)?;
        let bytes = response.copy_to(&mut partial)?;
        let target = self.download_dir.join(file_name(title));
        partial.persist(&target).map_err(|e| e.error)?;

        info!("Saved {bytes} bytes to {}", target.display());
        Ok(target)
    }
}

/// File name of a song on the host and on disk.
pub fn file_name(title: &str) -> String {
    format!("{}.wav", urlencoding::encode(title))
}

/// Look `title` up in the catalog, download it and play it.
///
/// # Errors
///
/// [`CatalogError::NotFound`] if the title is not catalogued and
/// [`CatalogError::AudioNotFound`] if its file is not hosted, plus whatever
/// the store, download or player report.
pub fn play_title(
    store: &dyn RecordStore,
    settings: &Settings,
    source: &AudioSource,
    player: &mut dyn Player,
    title: &str,
) -> Result<PlaybackOutcome> {
    let songs = fetch_songs(store, settings)?;
    if search(&songs, &SearchQuery::Name(title.to_string())).is_empty() {
        return Err(CatalogError::NotFound(format!("'{title}' is not in the database")));
    }

    let path = source.download(title)?;
    player.play(&path)
}
