//! # Shell Completion Module
//!
//! Completion scripts come from `clap_complete`. Song titles for `play`,
//! `remove` and `edit` can be listed with the hidden `complete-titles`
//! command, which shell functions can call for dynamic completion.
//!
//! ```bash
//! jukebox completion bash > ~/.local/share/bash-completion/completions/jukebox
//! jukebox completion zsh > ~/.config/zsh/completions/_jukebox
//! ```

use crate::catalog::Song;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io::{self, Write};

/// Generate shell completions for the given shell
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

/// Convert our Shell enum to clap_complete's Shell enum
pub fn shell_to_completion_shell(shell: &crate::cli::Shell) -> CompletionShell {
    match shell {
        crate::cli::Shell::Bash => CompletionShell::Bash,
        crate::cli::Shell::Zsh => CompletionShell::Zsh,
        crate::cli::Shell::Fish => CompletionShell::Fish,
        crate::cli::Shell::PowerShell => CompletionShell::PowerShell,
        crate::cli::Shell::Elvish => CompletionShell::Elvish,
    }
}

/// Sorted, de-duplicated titles.
pub fn title_completions(songs: &[Song]) -> Vec<String> {
    let mut titles: Vec<String> = songs
        .iter()
        .filter(|song| !song.title.is_empty())
        .map(|song| song.title.clone())
        .collect();
    titles.sort();
    titles.dedup();
    titles
}

/// Print one title per line, quoting titles with whitespace so bash and zsh
/// keep them as one word.
pub fn write_title_completions<W: Write>(out: &mut W, songs: &[Song]) -> io::Result<()> {
    for title in title_completions(songs) {
        if title.contains(char::is_whitespace) {
            writeln!(out, "\"{}\"", title.replace('"', "\\\""))?;
        } else {
            writeln!(out, "{title}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(title: &str) -> Song {
        Song { title: title.to_string(), ..Song::default() }
    }

    #[test]
    fn test_shell_conversion() {
        assert_eq!(
            shell_to_completion_shell(&crate::cli::Shell::Bash),
            CompletionShell::Bash
        );
        assert_eq!(
            shell_to_completion_shell(&crate::cli::Shell::Zsh),
            CompletionShell::Zsh
        );
    }

    #[test]
    fn test_titles_sorted_and_unique() {
        let songs = vec![song("Jolene"), song("Help!"), song("Jolene"), song("")];
        assert_eq!(title_completions(&songs), vec!["Help!", "Jolene"]);
    }

    #[test]
    fn test_titles_with_spaces_are_quoted() {
        let mut out = Vec::new();
        write_title_completions(&mut out, &[song("Hey Jude"), song("Help!"), song("Say \"Hi\" now")]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Help!\n\"Hey Jude\"\n\"Say \\\"Hi\\\" now\"\n"
        );
    }
}
