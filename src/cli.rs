// CLI module for argument parsing and configuration

use crate::decode::DecodePolicy;
use crate::domain::keybinds::KeyBind;
use crate::domain::KeyBindMap;
use crate::organizer::OrganizerOptions;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;

/// Picsort - browse a folder of images and file each one with a keystroke
///
/// Bind keys to destination folders with --bind, then press a bound key to move the
/// current image into that folder.
#[derive(Parser, Debug, Clone)]
#[command(name = "picsort")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Folder of images to browse
    ///
    /// Defaults to the folder opened last time, or the current directory.
    pub directory: Option<PathBuf>,

    /// Decode every image of the folder in the background
    #[arg(short = 'c', long = "cache", action = ArgAction::SetTrue, conflicts_with = "no_cache")]
    pub cache: bool,

    /// Only decode images when they are shown
    #[arg(long = "no-cache", action = ArgAction::SetTrue)]
    pub no_cache: bool,

    /// Keep at most N images on each side of the current one decoded
    #[arg(short = 'w', long = "window", value_name = "N")]
    pub window: Option<usize>,

    /// Give up on decoding an image after this many milliseconds
    #[arg(long = "deadline-ms", value_name = "MS")]
    pub deadline_ms: Option<u64>,

    /// Extra attempts for decodes that fail with a transient I/O error
    #[arg(long = "retries", default_value_t = 1)]
    pub retries: u32,

    /// Bind a key to a destination folder and save it (e.g. --bind k=Keep)
    #[arg(short = 'b', long = "bind", value_name = "KEY=FOLDER")]
    pub binds: Vec<String>,

    /// Move a saved bind to another key, keeping its folder (e.g. --rebind k=j)
    #[arg(long = "rebind", value_name = "OLD=NEW")]
    pub rebinds: Vec<String>,

    /// Remove a saved key bind
    #[arg(long = "unbind", value_name = "KEY")]
    pub unbinds: Vec<char>,

    /// Print the saved key binds and exit
    #[arg(long = "list-binds", action = ArgAction::SetTrue)]
    pub list_binds: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Parsed `--bind` values
    pub fn parsed_binds(&self) -> Result<Vec<KeyBind>, String> {
        self.binds
            .iter()
            .map(|arg| KeyBindMap::parse_bind(arg).map_err(|e| e.to_string()))
            .collect()
    }

    /// Parsed `--rebind` values
    pub fn parsed_rebinds(&self) -> Result<Vec<(char, char)>, String> {
        self.rebinds
            .iter()
            .map(|arg| KeyBindMap::parse_rebind(arg).map_err(|e| e.to_string()))
            .collect()
    }

    /// Validate the arguments and return any errors
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref dir) = self.directory {
            if !dir.exists() {
                return Err(format!("Directory does not exist: {}", dir.display()));
            }

            if !dir.is_dir() {
                return Err(format!("Path is not a directory: {}", dir.display()));
            }
        }

        if self.window == Some(0) {
            return Err("window must be at least 1".to_string());
        }

        if self.cache && self.window.is_some() {
            return Err("--cache decodes the whole folder and cannot be combined with --window".to_string());
        }

        if self.deadline_ms == Some(0) {
            return Err("deadline-ms must be greater than 0".to_string());
        }

        self.parsed_binds()?;
        self.parsed_rebinds()?;

        Ok(())
    }

    /// Whether prefetch is on, given the saved preference
    pub fn caching(&self, saved: bool) -> bool {
        if self.cache {
            true
        } else if self.no_cache || self.window.is_some() {
            false
        } else {
            saved
        }
    }
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub directory: PathBuf,
    pub caching: bool,
    pub window: Option<usize>,
    pub policy: DecodePolicy,
}

impl AppConfig {
    /// Combines validated arguments with the saved preferences
    pub fn resolve(args: &Args, saved_caching: bool, last_folder: Option<PathBuf>) -> Self {
        let directory = args
            .directory
            .clone()
            .or(last_folder.filter(|dir| dir.is_dir()))
            .unwrap_or_else(|| PathBuf::from("."));

        AppConfig {
            directory,
            caching: args.caching(saved_caching),
            window: args.window,
            policy: DecodePolicy {
                deadline: args.deadline_ms.map(Duration::from_millis),
                retries: args.retries,
                ..DecodePolicy::default()
            },
        }
    }

    pub fn organizer_options(&self) -> OrganizerOptions {
        OrganizerOptions {
            caching: self.caching,
            window: self.window,
            policy: self.policy,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            directory: PathBuf::from("."),
            caching: false,
            window: None,
            policy: DecodePolicy::default(),
        }
    }
}
