//! Media type detection by file extension

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Extensions stored as `video`
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm", "3gp"];

/// Extensions the capture UI produces as stills
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "webp"];

/// Kind of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    /// `video` for known video extensions, `image` for everything else.
    /// Accepts the extension with or without its leading dot.
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            MediaType::Video
        } else {
            MediaType::Image
        }
    }

    pub fn from_path(path: &Path) -> Self {
        Self::from_extension(&normalized_extension(path))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower-cased extension including the dot (`.jpg`), or empty
pub fn normalized_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Whether the extension is one the app knows how to display
pub fn is_known_media(ext: &str) -> bool {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    VIDEO_EXTENSIONS.contains(&ext.as_str()) || IMAGE_EXTENSIONS.contains(&ext.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_detection() {
        assert_eq!(MediaType::from_extension(".mp4"), MediaType::Video);
        assert_eq!(MediaType::from_extension("3GP"), MediaType::Video);
        assert_eq!(MediaType::from_extension(".jpg"), MediaType::Image);
        assert_eq!(MediaType::from_extension(".heic"), MediaType::Image);
        assert_eq!(MediaType::from_extension(""), MediaType::Image);
    }

    #[test]
    fn test_normalized_extension() {
        assert_eq!(normalized_extension(Path::new("/a/IMG.JPG")), ".jpg");
        assert_eq!(normalized_extension(Path::new("/a/clip.tar.MOV")), ".mov");
        assert_eq!(normalized_extension(Path::new("/a/noext")), "");
        assert_eq!(MediaType::from_path(Path::new("rec_1.webm")), MediaType::Video);
    }

    #[test]
    fn test_known_media() {
        assert!(is_known_media(".jpeg"));
        assert!(is_known_media("mkv"));
        assert!(!is_known_media(".txt"));
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&MediaType::Video).unwrap(), "\"video\"");
    }
}
