use anyhow::Context;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// List of supported audio file extensions
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "ogg", "wav", "m4a", "aac", "opus", "wma",
];

/// Scanner for finding audio files in a directory tree
pub struct DirectoryScanner;

impl DirectoryScanner {
    /// Scan a directory recursively and return all audio file paths, sorted
    pub fn scan<P: AsRef<Path>>(directory: P) -> Result<Vec<PathBuf>, anyhow::Error> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            anyhow::bail!("Library root is not a directory: {}", directory.display());
        }

        let mut audio_files = Vec::new();

        for entry in WalkDir::new(directory).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // Unreadable subdirectories are skipped, not fatal
                    tracing::warn!(error = %e, "Skipping unreadable library entry");
                    continue;
                }
            };
            let path = entry.path();

            if !entry.file_type().is_file() {
                continue;
            }

            if is_supported_audio(path) {
                audio_files.push(path.to_path_buf());
            }
        }

        audio_files.sort();

        tracing::debug!(
            root = %directory.display(),
            count = audio_files.len(),
            "Library scan complete"
        );
        Ok(audio_files)
    }

    /// Canonicalize the root first so track ids do not depend on how it was spelled
    pub fn scan_canonical<P: AsRef<Path>>(directory: P) -> Result<Vec<PathBuf>, anyhow::Error> {
        let directory = directory.as_ref();
        let root = directory
            .canonicalize()
            .with_context(|| format!("Failed to resolve library root {}", directory.display()))?;
        Self::scan(root)
    }
}

/// Check if a file has a supported audio extension
pub fn is_supported_audio(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("b_album");
        fs::create_dir(&nested).unwrap();

        fs::write(dir.path().join("z.mp3"), b"").unwrap();
        fs::write(dir.path().join("a.FLAC"), b"").unwrap();
        fs::write(dir.path().join("cover.jpg"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        fs::write(nested.join("track.wav"), b"").unwrap();

        let files = DirectoryScanner::scan(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            names,
            vec![
                PathBuf::from("a.FLAC"),
                PathBuf::from("b_album").join("track.wav"),
                PathBuf::from("z.mp3"),
            ]
        );
    }

    #[test]
    fn test_scan_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DirectoryScanner::scan(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_scan_missing_directory_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DirectoryScanner::scan(dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_is_supported_audio() {
        assert!(is_supported_audio(Path::new("song.OGG")));
        assert!(is_supported_audio(Path::new("/x/y/song.m4a")));
        assert!(!is_supported_audio(Path::new("song")));
        assert!(!is_supported_audio(Path::new("scan.pdf")));
    }
}
