use rayon::prelude::*;
use std::path::PathBuf;
use thiserror::Error;

use crate::library::models::Playlist;
use crate::library::scanner::DirectoryScanner;
use crate::metadata::extractor::MetadataExtractor;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("no library directory configured")]
    NotConfigured,
    #[error("failed to scan library: {0:#}")]
    Scan(#[from] anyhow::Error),
}

/// Anything that can list the playable tracks of a media store.
///
/// The result may be empty; callers must tolerate that.
pub trait MediaLibrarySource {
    fn fetch_tracks(&self) -> Result<Playlist, LibraryError>;
}

/// Media library backed by a directory tree of audio files
#[derive(Debug, Clone)]
pub struct DirectoryLibrary {
    root: Option<PathBuf>,
}

impl DirectoryLibrary {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }
}

impl MediaLibrarySource for DirectoryLibrary {
    fn fetch_tracks(&self) -> Result<Playlist, LibraryError> {
        let root = self.root.as_ref().ok_or(LibraryError::NotConfigured)?;
        let files = DirectoryScanner::scan_canonical(root)?;

        // Tag reading is I/O bound per file; collect() keeps scan order
        let tracks: Playlist = files
            .par_iter()
            .map(|path| MetadataExtractor::extract_from_file(path).into_track(path))
            .collect();

        tracing::info!(root = %root.display(), tracks = tracks.len(), "Fetched library");
        Ok(tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_unconfigured_library_errors() {
        let library = DirectoryLibrary::new(None);
        assert!(matches!(library.fetch_tracks(), Err(LibraryError::NotConfigured)));
    }

    #[test]
    fn test_missing_root_errors() {
        let dir = tempfile::tempdir().unwrap();
        let library = DirectoryLibrary::new(Some(dir.path().join("nope")));
        assert!(matches!(library.fetch_tracks(), Err(LibraryError::Scan(_))));
    }

    #[test]
    fn test_empty_root_gives_empty_playlist() {
        let dir = tempfile::tempdir().unwrap();
        let library = DirectoryLibrary::new(Some(dir.path().to_path_buf()));
        assert!(library.fetch_tracks().unwrap().is_empty());
    }

    #[test]
    fn test_fetch_keeps_scan_order_and_unique_ids() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.mp3", "a.mp3", "b.mp3"] {
            fs::write(dir.path().join(name), b"not audio").unwrap();
        }

        let library = DirectoryLibrary::new(Some(dir.path().to_path_buf()));
        let tracks = library.fetch_tracks().unwrap();

        let names: Vec<_> = tracks
            .iter()
            .map(|t| t.locator.as_path().file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.mp3", "b.mp3", "c.mp3"]);
        assert!(tracks.iter().all(|t| t.title.is_none()));
        assert_ne!(tracks[0].id, tracks[1].id);
    }
}
