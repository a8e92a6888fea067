// Single-file import: classify a picked file for preview or playback
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::library::models::{Locator, Track};
use crate::library::scanner::is_supported_audio;
use crate::metadata::extractor::MetadataExtractor;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "heic", "webp", "bmp", "tiff"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Pdf,
    Audio,
    Unsupported,
}

impl FileKind {
    pub fn of(path: &Path) -> Self {
        if is_supported_audio(path) {
            return FileKind::Audio;
        }
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if ext == "pdf" {
            FileKind::Pdf
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            FileKind::Image
        } else {
            FileKind::Unsupported
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedFile {
    pub locator: Locator,
    pub kind: FileKind,
    pub size_bytes: u64,
}

impl ImportedFile {
    /// Build a playable track for an audio import
    pub fn to_track(&self) -> Option<Track> {
        match self.kind {
            FileKind::Audio => {
                let path = self.locator.as_path();
                Some(MetadataExtractor::extract_from_file(path).into_track(path))
            }
            _ => None,
        }
    }
}

/// What the picker handed back. Cancellation is "no selection", not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    Selected(ImportedFile),
    Cancelled,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error("unsupported file type: {0}")]
    Unsupported(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolve a picker result into an imported file
pub fn import_file(selection: Option<PathBuf>) -> Result<ImportOutcome, ImportError> {
    let Some(path) = selection else {
        tracing::debug!("Import cancelled");
        return Ok(ImportOutcome::Cancelled);
    };

    let metadata = match std::fs::metadata(&path) {
        Ok(m) if m.is_file() => m,
        Ok(_) => return Err(ImportError::NotFound(path)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ImportError::NotFound(path));
        }
        Err(source) => return Err(ImportError::Io { path, source }),
    };

    let kind = FileKind::of(&path);
    if kind == FileKind::Unsupported {
        return Err(ImportError::Unsupported(path));
    }

    tracing::info!(path = %path.display(), ?kind, "Imported file");
    Ok(ImportOutcome::Selected(ImportedFile {
        locator: Locator::new(path),
        kind,
        size_bytes: metadata.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_file_kind_by_extension() {
        assert_eq!(FileKind::of(Path::new("a.PNG")), FileKind::Image);
        assert_eq!(FileKind::of(Path::new("a.jpeg")), FileKind::Image);
        assert_eq!(FileKind::of(Path::new("doc.pdf")), FileKind::Pdf);
        assert_eq!(FileKind::of(Path::new("song.flac")), FileKind::Audio);
        assert_eq!(FileKind::of(Path::new("archive.zip")), FileKind::Unsupported);
        assert_eq!(FileKind::of(Path::new("README")), FileKind::Unsupported);
    }

    #[test]
    fn test_cancel_is_not_an_error() {
        assert_eq!(import_file(None).unwrap(), ImportOutcome::Cancelled);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = import_file(Some(dir.path().join("gone.pdf"))).unwrap_err();
        assert!(matches!(err, ImportError::NotFound(_)));
    }

    #[test]
    fn test_directory_is_not_importable() {
        let dir = tempfile::tempdir().unwrap();
        let err = import_file(Some(dir.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, ImportError::NotFound(_)));
    }

    #[test]
    fn test_selected_pdf_reports_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.pdf");
        fs::write(&path, b"%PDF-1.4 minimal").unwrap();

        match import_file(Some(path.clone())).unwrap() {
            ImportOutcome::Selected(file) => {
                assert_eq!(file.kind, FileKind::Pdf);
                assert_eq!(file.size_bytes, 16);
                assert_eq!(file.locator.as_path(), path.as_path());
                assert!(file.to_track().is_none());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_audio_import_becomes_track() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp3");
        fs::write(&path, b"not really audio").unwrap();

        let ImportOutcome::Selected(file) = import_file(Some(path.clone())).unwrap() else {
            panic!("expected a selection");
        };
        let track = file.to_track().unwrap();
        assert_eq!(track.locator.as_path(), path.as_path());
    }

    #[test]
    fn test_unsupported_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"hello").unwrap();
        assert!(matches!(
            import_file(Some(path)).unwrap_err(),
            ImportError::Unsupported(_)
        ));
    }
}
