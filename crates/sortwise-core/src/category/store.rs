//! Category Store
//!
//! カテゴリ定義のランタイムストア。
//! ビルトインと`config.toml`の設定をマージして保持。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::builtin::{CategoryDef, BUILTIN_CATEGORIES, DEFAULT_CATEGORY_PRIORITY};

/// `MoveToCategory`の解決に使うカテゴリ参照
///
/// ルールエンジンはこのトレイト越しにカテゴリを読むだけで、保存はしない。
pub trait CategoryLookup {
    /// 拡張子から所属カテゴリを取得
    fn category_for_extension(&self, ext: &str) -> Option<&CategoryDef>;
    /// IDからカテゴリを取得
    fn category_by_id(&self, id: &str) -> Option<&CategoryDef>;
}

/// カテゴリ定義のランタイムストア
#[derive(Debug, Clone)]
pub struct CategoryStore {
    categories: HashMap<String, CategoryDef>,
}

impl CategoryStore {
    /// ビルトインカテゴリのみで初期化
    pub fn builtin() -> Self {
        let categories = BUILTIN_CATEGORIES
            .iter()
            .map(|b| (b.id.to_string(), CategoryDef::from(b)))
            .collect();
        Self { categories }
    }

    /// 空のストア（テスト・ビルトイン無効化用）
    pub fn empty() -> Self {
        Self {
            categories: HashMap::new(),
        }
    }

    /// 設定でオーバーライド
    ///
    /// - 同IDカテゴリは上書き（未指定の項目はビルトイン値を維持）
    /// - 新規カテゴリは追加
    pub fn with_config(mut self, config: &CategoriesConfig) -> Self {
        for (id, entry) in &config.categories {
            let existing = self.categories.remove(id);
            let def = CategoryDef {
                id: id.clone(),
                name: entry
                    .name
                    .clone()
                    .or_else(|| existing.as_ref().map(|e| e.name.clone()))
                    .unwrap_or_else(|| id.clone()),
                extensions: entry
                    .extensions
                    .clone()
                    .or_else(|| existing.as_ref().map(|e| e.extensions.clone()))
                    .unwrap_or_default(),
                destination: entry
                    .destination
                    .clone()
                    .or_else(|| existing.as_ref().map(|e| e.destination.clone()))
                    .unwrap_or_else(|| id.clone()),
                icon: entry
                    .icon
                    .clone()
                    .or_else(|| existing.as_ref().map(|e| e.icon.clone()))
                    .unwrap_or_default(),
                priority: entry
                    .priority
                    .or_else(|| existing.as_ref().map(|e| e.priority))
                    .unwrap_or(DEFAULT_CATEGORY_PRIORITY),
            };
            self.categories.insert(id.clone(), def);
        }
        self
    }

    /// カテゴリ定義を取得
    pub fn get(&self, id: &str) -> Option<&CategoryDef> {
        self.categories.get(id)
    }

    /// 全カテゴリを取得（priority降順、同順位はID順）
    pub fn all(&self) -> Vec<&CategoryDef> {
        let mut categories: Vec<_> = self.categories.values().collect();
        categories.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
        categories
    }

    /// カテゴリID一覧
    pub fn ids(&self) -> Vec<&str> {
        self.categories.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for CategoryStore {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CategoryLookup for CategoryStore {
    fn category_for_extension(&self, ext: &str) -> Option<&CategoryDef> {
        if ext.is_empty() {
            return None;
        }
        self.all().into_iter().find(|c| c.contains_extension(ext))
    }

    fn category_by_id(&self, id: &str) -> Option<&CategoryDef> {
        self.get(id)
    }
}

/// `config.toml`のcategoriesセクション
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoriesConfig {
    #[serde(flatten)]
    pub categories: HashMap<String, CategoryConfigEntry>,
}

/// 個別カテゴリの設定エントリ
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryConfigEntry {
    /// 表示名
    #[serde(default)]
    pub name: Option<String>,
    /// 拡張子
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
    /// 移動先フォルダ
    #[serde(default)]
    pub destination: Option<String>,
    /// アイコン名
    #[serde(default)]
    pub icon: Option<String>,
    /// 優先度（オプション）
    #[serde(default)]
    pub priority: Option<i32>,
}
