//! File metadata snapshot consumed by conditions, patterns and the resolver.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::category::CategoryLookup;
use crate::error::Result;
use crate::fs::FileSystem;

/// Metadata of one candidate file, captured at scan time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: PathBuf,
    /// File stem (name without the last extension).
    pub name: String,
    /// Extension without the dot. Empty when the file has none.
    pub extension: String,
    pub full_name: String,
    pub kind: String,
    pub category: Option<String>,
    pub size: u64,
    pub created: Option<DateTime<Local>>,
    pub modified: Option<DateTime<Local>>,
    pub accessed: Option<DateTime<Local>>,
    pub hidden: bool,
}

impl FileInfo {
    /// Build a metadata record for `path` without touching the filesystem.
    ///
    /// Sizes and dates are left empty; use the `with_*` builders or
    /// [`FileInfo::scan`] to fill them.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let full_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let (name, extension) = split_name(&full_name);
        let kind = kind_for_extension(&extension).to_string();
        let hidden = full_name.starts_with('.');

        Self {
            path,
            name,
            extension,
            full_name,
            kind,
            category: None,
            size: 0,
            created: None,
            modified: None,
            accessed: None,
            hidden,
        }
    }

    /// Read size and timestamps through the filesystem collaborator and
    /// resolve the category from `categories`.
    pub fn scan(fs: &dyn FileSystem, path: &Path, categories: &dyn CategoryLookup) -> Result<Self> {
        let meta = fs.metadata(path)?;
        let info = Self::new(path)
            .with_size(meta.len())
            .with_times(
                meta.created().ok().map(to_local),
                meta.modified().ok().map(to_local),
                meta.accessed().ok().map(to_local),
            )
            .with_category_from(categories);
        Ok(info)
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_modified(mut self, modified: DateTime<Local>) -> Self {
        self.modified = Some(modified);
        self
    }

    pub fn with_created(mut self, created: DateTime<Local>) -> Self {
        self.created = Some(created);
        self
    }

    pub fn with_times(
        mut self,
        created: Option<DateTime<Local>>,
        modified: Option<DateTime<Local>>,
        accessed: Option<DateTime<Local>>,
    ) -> Self {
        self.created = created;
        self.modified = modified;
        self.accessed = accessed;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Assign the category the lookup associates with this file's extension.
    pub fn with_category_from(mut self, categories: &dyn CategoryLookup) -> Self {
        self.category = categories
            .category_for_extension(&self.extension)
            .map(|c| c.id.clone());
        self
    }

    /// Directory that currently holds the file.
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

fn to_local(time: SystemTime) -> DateTime<Local> {
    DateTime::<Local>::from(time)
}

/// Split `report.final.pdf` into (`report.final`, `pdf`).
///
/// Dotfiles without a further dot (`.bashrc`) have no extension.
pub fn split_name(full_name: &str) -> (String, String) {
    match full_name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < full_name.len() => (
            full_name[..idx].to_string(),
            full_name[idx + 1..].to_string(),
        ),
        _ => (full_name.to_string(), String::new()),
    }
}

/// Human readable kind for an extension, independent of user categories.
pub fn kind_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "" => "File",
        "pdf" => "PDF Document",
        "doc" | "docx" | "odt" | "rtf" | "pages" => "Document",
        "txt" | "md" | "log" => "Text",
        "xls" | "xlsx" | "ods" | "csv" | "numbers" => "Spreadsheet",
        "ppt" | "pptx" | "odp" | "key" => "Presentation",
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "tif" | "tiff" | "webp" | "heic" | "svg"
        | "raw" | "psd" => "Image",
        "mp4" | "mov" | "avi" | "mkv" | "wmv" | "webm" | "m4v" | "mpg" | "mpeg" => "Video",
        "mp3" | "wav" | "flac" | "aac" | "ogg" | "m4a" | "aiff" | "opus" => "Audio",
        "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" | "xz" | "tgz" => "Archive",
        "iso" | "dmg" | "img" => "Disk Image",
        "exe" | "msi" | "pkg" | "deb" | "rpm" | "app" | "apk" | "appimage" => "Application",
        "rs" | "py" | "js" | "ts" | "go" | "java" | "c" | "cpp" | "h" | "rb" | "swift" | "sh" => {
            "Source Code"
        }
        _ => "File",
    }
}
