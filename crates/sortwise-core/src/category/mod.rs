//! # Category Module
//!
//! 拡張子ベースのファイルカテゴリと、その移動先フォルダを提供する。
//!
//! ## 設計目的
//!
//! `MoveToCategory`アクションはカテゴリIDだけを持ち、実際の移動先は
//! カテゴリ側の設定で決まる。ルールを書き換えずに移動先を変えられる：
//!
//! - **documents**: pdf, docx, txt ...
//! - **images**: jpg, png, heic ...
//! - **videos** / **audio** / **archives** / **code** / **installers**
//!
//! ## モジュール構成
//!
//! - `builtin`: ビルトインカテゴリ定義
//! - `store`: カテゴリ定義のランタイムストアと`CategoryLookup`
//!
//! ## 使用例
//!
//! ```rust
//! use sortwise_core::category::{CategoryLookup, CategoryStore};
//!
//! let store = CategoryStore::builtin();
//! let images = store.category_for_extension("png").unwrap();
//! assert_eq!(images.id, "images");
//! assert_eq!(store.category_by_id("documents").unwrap().destination, "Documents");
//! ```

mod builtin;
mod store;

// Re-exports
pub use builtin::{BuiltinCategory, CategoryDef, BUILTIN_CATEGORIES, DEFAULT_CATEGORY_PRIORITY};
pub use store::{CategoriesConfig, CategoryConfigEntry, CategoryLookup, CategoryStore};
