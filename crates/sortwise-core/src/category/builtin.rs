//! Builtin Category Definitions
//!
//! コード内で定義されるビルトインカテゴリ。
//! 設定ファイルが無くても拡張子ベースで分類できる。

use serde::{Deserialize, Serialize};

/// デフォルトの優先度
pub const DEFAULT_CATEGORY_PRIORITY: i32 = 100;

/// ビルトインカテゴリ定義
pub const BUILTIN_CATEGORIES: &[BuiltinCategory] = &[
    BuiltinCategory {
        id: "documents",
        name: "Documents",
        extensions: &[
            "pdf", "doc", "docx", "odt", "rtf", "txt", "md", "pages", "xls", "xlsx", "ods",
            "csv", "ppt", "pptx", "odp", "key", "epub",
        ],
        destination: "Documents",
        icon: "file-text",
        priority: DEFAULT_CATEGORY_PRIORITY,
    },
    BuiltinCategory {
        id: "images",
        name: "Images",
        extensions: &[
            "jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp", "heic", "svg", "raw",
            "cr2", "nef", "psd",
        ],
        destination: "Images",
        icon: "image",
        priority: DEFAULT_CATEGORY_PRIORITY,
    },
    BuiltinCategory {
        id: "videos",
        name: "Videos",
        extensions: &["mp4", "mov", "avi", "mkv", "wmv", "flv", "webm", "m4v", "mpg", "mpeg"],
        destination: "Videos",
        icon: "film",
        priority: DEFAULT_CATEGORY_PRIORITY,
    },
    BuiltinCategory {
        id: "audio",
        name: "Audio",
        extensions: &["mp3", "wav", "flac", "aac", "ogg", "m4a", "wma", "aiff", "opus"],
        destination: "Audio",
        icon: "music",
        priority: DEFAULT_CATEGORY_PRIORITY,
    },
    BuiltinCategory {
        id: "archives",
        name: "Archives",
        extensions: &["zip", "rar", "7z", "tar", "gz", "bz2", "xz", "tgz", "iso"],
        destination: "Archives",
        icon: "archive",
        priority: DEFAULT_CATEGORY_PRIORITY,
    },
    BuiltinCategory {
        id: "code",
        name: "Code",
        extensions: &[
            "rs", "py", "js", "ts", "tsx", "jsx", "go", "java", "kt", "c", "cpp", "h", "hpp",
            "cs", "rb", "swift", "sh", "json", "yaml", "yml", "toml", "xml", "html", "css",
            "sql",
        ],
        destination: "Code",
        icon: "code",
        priority: DEFAULT_CATEGORY_PRIORITY,
    },
    BuiltinCategory {
        id: "installers",
        name: "Installers",
        extensions: &["dmg", "pkg", "exe", "msi", "deb", "rpm", "appimage", "apk"],
        destination: "Installers",
        icon: "package",
        priority: DEFAULT_CATEGORY_PRIORITY,
    },
];

/// ビルトインカテゴリの静的定義
#[derive(Debug, Clone)]
pub struct BuiltinCategory {
    /// カテゴリID（一意識別子）
    pub id: &'static str,
    /// 表示名
    pub name: &'static str,
    /// 対象の拡張子（ドット無し、小文字）
    pub extensions: &'static [&'static str],
    /// 移動先フォルダ（相対パスは整理対象フォルダ基準）
    pub destination: &'static str,
    /// UI用アイコン名
    pub icon: &'static str,
    /// 優先度（同じ拡張子が複数カテゴリにある場合、高いほど優先）
    pub priority: i32,
}

/// ランタイムカテゴリ定義
///
/// ビルトインまたは設定ファイルから構築される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDef {
    pub id: String,
    pub name: String,
    pub extensions: Vec<String>,
    pub destination: String,
    pub icon: String,
    pub priority: i32,
}

impl CategoryDef {
    /// 拡張子がこのカテゴリに含まれるか（大文字小文字を区別しない）
    pub fn contains_extension(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.');
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

impl From<&BuiltinCategory> for CategoryDef {
    fn from(b: &BuiltinCategory) -> Self {
        Self {
            id: b.id.to_string(),
            name: b.name.to_string(),
            extensions: b.extensions.iter().map(|s| s.to_string()).collect(),
            destination: b.destination.to_string(),
            icon: b.icon.to_string(),
            priority: b.priority,
        }
    }
}
