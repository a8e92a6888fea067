// Library data models
use std::fmt;
use std::path::{Path, PathBuf};

/// Shown wherever a track has no title tag
pub const UNTITLED_PLACEHOLDER: &str = "Unknown Title";

/// Stable track identifier, derived from the locator path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackId(pub u64);

impl TrackId {
    /// Hash the path with BLAKE3 and keep the first 8 bytes
    pub fn from_path(path: &Path) -> Self {
        let hash = blake3::hash(path.to_string_lossy().as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        Self(u64::from_le_bytes(bytes))
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Opaque handle the playback engine resolves to playable bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator(PathBuf);

impl Locator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration_ms: Option<u64>,
    pub locator: Locator,
}

impl Track {
    /// Build a track with no tags for the given file
    pub fn untagged(path: impl Into<PathBuf>) -> Self {
        let locator = Locator::new(path);
        Self {
            id: TrackId::from_path(locator.as_path()),
            title: None,
            artist: None,
            album: None,
            duration_ms: None,
            locator,
        }
    }

    /// Title for display; the placeholder is chosen here, never stored
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(UNTITLED_PLACEHOLDER)
    }
}

/// Ordered list of tracks as returned by a library source
pub type Playlist = Vec<Track>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_id_is_stable_per_path() {
        let a = TrackId::from_path(Path::new("/music/a.flac"));
        let b = TrackId::from_path(Path::new("/music/a.flac"));
        let c = TrackId::from_path(Path::new("/music/b.flac"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_display_title_falls_back_only_for_display() {
        let mut track = Track::untagged("/music/a.flac");
        assert_eq!(track.title, None);
        assert_eq!(track.display_title(), UNTITLED_PLACEHOLDER);

        track.title = Some("Song A".to_string());
        assert_eq!(track.display_title(), "Song A");
    }
}
