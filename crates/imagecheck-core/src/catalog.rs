//! イメージカタログ
//!
//! `docker/images.json` に宣言された「Dockerfileディレクトリ → イメージ名と
//! 依存イメージ」の対応表を読み込みます。

use crate::error::{CatalogError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, instrument};

/// カタログの1エントリ
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogEntry {
    /// イメージのリポジトリ名
    pub name: String,
    /// このイメージを FROM している依存イメージのディレクトリ
    #[serde(default)]
    pub dependent: Vec<String>,
}

/// ディレクトリパス → [`CatalogEntry`] の対応表
///
/// 反復順序はファイル内の記述順です。
#[derive(Debug, Clone, Default)]
pub struct ImageCatalog {
    entries: Vec<(String, CatalogEntry)>,
}

impl ImageCatalog {
    /// カタログファイルを読み込む
    ///
    /// ファイルが存在しない場合はエラーではなく空のカタログを返します。
    #[instrument(skip(path), fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("Image file {} doesn't exist, no images to check", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let catalog = Self::from_json_str(&content).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(images = catalog.len(), "Image catalog loaded");

        Ok(catalog)
    }

    /// JSON文字列からカタログを構築
    pub fn from_json_str(content: &str) -> std::result::Result<Self, serde_json::Error> {
        // Map は preserve_order により記述順を保持する
        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(content)?;

        let entries = raw
            .into_iter()
            .map(|(path, value)| {
                let entry: CatalogEntry = serde_json::from_value(value)?;
                Ok((path, entry))
            })
            .collect::<std::result::Result<Vec<_>, serde_json::Error>>()?;

        Ok(Self { entries })
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, CatalogEntry)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, path: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, entry)| entry)
    }

    /// 指定パスの依存イメージ（カタログにない場合は空）
    pub fn dependents_of(&self, path: &str) -> &[String] {
        self.get(path)
            .map(|entry| entry.dependent.as_slice())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CatalogEntry)> {
        self.entries.iter().map(|(p, e)| (p.as_str(), e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
