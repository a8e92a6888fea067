// Metadata extractor using lofty with id3 fallback for problematic MP3 files
use anyhow::Result;
use id3::TagLike;
use lofty::prelude::{Accessor, AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use std::path::Path;

use crate::library::models::Track;

/// Tags read from a single file. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration_ms: Option<u64>,
}

impl TrackTags {
    /// Attach these tags to a file path, producing a library track
    pub fn into_track(self, file_path: &Path) -> Track {
        let mut track = Track::untagged(file_path);
        track.title = self.title;
        track.artist = self.artist;
        track.album = self.album;
        track.duration_ms = self.duration_ms;
        track
    }
}

pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Read tags from a file. Unreadable files yield empty tags rather than an error.
    pub fn extract_from_file(file_path: &Path) -> TrackTags {
        match Self::extract_with_lofty(file_path) {
            Ok(tags) => tags,
            Err(e) => {
                tracing::debug!(path = %file_path.display(), error = %e, "lofty could not read file");
                Self::extract_with_fallback(file_path)
            }
        }
    }

    fn extract_with_lofty(file_path: &Path) -> Result<TrackTags> {
        let tagged_file = Probe::open(file_path)?.guess_file_type()?.read()?;

        let tag = tagged_file.primary_tag().or(tagged_file.first_tag());
        let properties = tagged_file.properties();

        let duration_ms = properties.duration().as_millis() as u64;

        Ok(TrackTags {
            title: tag.and_then(|t| t.title().map(|s| s.trim().to_string())).filter(|s| !s.is_empty()),
            artist: tag.and_then(|t| t.artist().map(|s| s.to_string())),
            album: tag.and_then(|t| t.album().map(|s| s.to_string())),
            // Zero means the container did not report a length
            duration_ms: (duration_ms > 0).then_some(duration_ms),
        })
    }

    /// Fallback extraction method - uses id3 crate for MP3 files, empty tags for others
    fn extract_with_fallback(file_path: &Path) -> TrackTags {
        let extension = file_path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        if extension.as_deref() == Some("mp3") {
            match Self::extract_with_id3(file_path) {
                Ok(tags) => {
                    tracing::debug!(path = %file_path.display(), "Extracted metadata using id3 fallback");
                    return tags;
                }
                Err(e) => {
                    tracing::debug!(path = %file_path.display(), error = %e, "id3 fallback failed");
                }
            }
        }

        tracing::warn!(path = %file_path.display(), "No readable tags, keeping file untagged");
        TrackTags::default()
    }

    /// Extract metadata using the id3 crate (more lenient with malformed tags)
    fn extract_with_id3(file_path: &Path) -> Result<TrackTags> {
        let tag = id3::Tag::read_from_path(file_path)?;

        Ok(TrackTags {
            title: tag.title().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            artist: tag.artist().map(|s| s.to_string()),
            album: tag.album().map(|s| s.to_string()),
            // TLEN frame, in milliseconds
            duration_ms: tag.duration().map(u64::from),
        })
    }
}
