// Library management module
// Scans a directory tree into a playlist and resolves single-file imports

pub mod import;
pub mod models;
pub mod scanner;
pub mod source;

pub use import::{import_file, FileKind, ImportError, ImportOutcome, ImportedFile};
pub use models::{Locator, Playlist, Track, TrackId};
pub use scanner::DirectoryScanner;
pub use source::{DirectoryLibrary, LibraryError, MediaLibrarySource};
