// Metadata module
// Reads tags from audio files using lofty, with id3 as a fallback

pub mod extractor;

pub use extractor::{MetadataExtractor, TrackTags};
