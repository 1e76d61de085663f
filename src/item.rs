use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

// Stable identifier assigned by the repository; survives renames and tag
// edits, invalidated only by deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub i64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub path: PathBuf,
    pub tags: BTreeSet<String>,
    pub file_type: FileType,
}

impl ItemDetails {
    pub fn new(path: PathBuf, tags: BTreeSet<String>) -> Self {
        let file_type = FileType::of_path(&path);
        Self {
            path,
            tags,
            file_type,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    Audio,
    Document,
    Image,
    Video,
    Unknown,
}

const EXT_AUDIO: &[&str] = &[
    "aac", "ac3", "aif", "aiff", "flac", "m4a", "mid", "midi", "mka", "mp2", "mp3", "ogg", "opus",
    "wav", "wma",
];

const EXT_DOCUMENT: &[&str] = &[
    "c", "cpp", "csv", "doc", "docx", "h", "htm", "html", "ini", "md", "odt", "pdf", "ppt", "pptx",
    "rtf", "txt", "xls", "xlsx", "xml",
];

const EXT_IMAGE: &[&str] = &[
    "bmp", "gif", "ico", "jpeg", "jpg", "pcx", "png", "psd", "tga", "tif", "tiff", "webp",
];

const EXT_VIDEO: &[&str] = &[
    "avi", "flv", "m2ts", "m4v", "mkv", "mov", "mp4", "mpeg", "mpg", "ogv", "ts", "webm", "wmv",
];

impl FileType {
    pub fn of_path(path: &Path) -> Self {
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            return FileType::Unknown;
        };
        let ext = ext.to_ascii_lowercase();
        let ext = ext.as_str();
        if EXT_AUDIO.contains(&ext) {
            FileType::Audio
        } else if EXT_DOCUMENT.contains(&ext) {
            FileType::Document
        } else if EXT_IMAGE.contains(&ext) {
            FileType::Image
        } else if EXT_VIDEO.contains(&ext) {
            FileType::Video
        } else {
            FileType::Unknown
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileType::Audio => "AUDIO",
            FileType::Document => "DOC",
            FileType::Image => "IMAGE",
            FileType::Video => "VIDEO",
            FileType::Unknown => "FILE",
        }
    }
}
