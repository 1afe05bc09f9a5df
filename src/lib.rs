//! Picsort - a keystroke-driven image organizer
//!
//! This crate holds the image cache and navigation engine behind the `picsort` binary:
//! folder scanning, a per-folder slot cache filled on demand or by a background
//! prefetcher, cursor navigation and moving images into key-bound folders.

pub mod cache;
pub mod cli;
pub mod config;
pub mod decode;
pub mod domain;
pub mod error;
pub mod file_opener;
pub mod loader;
pub mod navigation;
pub mod organizer;
pub mod prefetch;
pub mod preview;
pub mod session;
pub mod tui;
pub mod viewer;

// Re-export primary types for convenience
pub use cache::{CacheStore, Claim, SlotState};
pub use config::UserConfig;
pub use decode::{DecodePolicy, DecodedImage, Decoder, ImageFileDecoder};
pub use domain::{list_images, move_file, ImageEntry, ImageSet, KeyBindMap};
pub use error::{ConfigError, DecodeError, MoveError, PicsortError, Result, ScanError};
pub use file_opener::open_file;
pub use loader::OnDemandLoader;
pub use navigation::{Direction, ImageChanged, Navigator};
pub use organizer::{Organizer, OrganizerOptions};
pub use prefetch::{PrefetchEvent, PrefetchState, Prefetcher};
pub use session::{Generation, Session, SessionId};
pub use viewer::SyncViewer;
