//! ビルドタグとビルド結果

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// イメージタグ（リポジトリ + バージョン）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildTag {
    pub repository: String,
    pub version: String,
}

impl BuildTag {
    pub fn new(repository: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for BuildTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.version)
    }
}

/// 1タグ分のビルド結果ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuildStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "FAIL")]
    Fail,
    /// 親イメージのビルド失敗によりスキップされた
    #[serde(rename = "SKIPPED")]
    Skipped,
}

impl BuildStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, BuildStatus::Ok)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Ok => "OK",
            BuildStatus::Fail => "FAIL",
            BuildStatus::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// (タグ, ビルドログ, ステータス) の組
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildResult {
    pub tag: String,
    pub log: Option<PathBuf>,
    pub status: BuildStatus,
}

impl BuildResult {
    pub fn new(tag: &BuildTag, log: Option<PathBuf>, status: BuildStatus) -> Self {
        Self {
            tag: tag.to_string(),
            log,
            status,
        }
    }
}
