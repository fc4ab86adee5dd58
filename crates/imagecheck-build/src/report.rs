//! ビルド結果の集計
//!
//! タグごとの結果から全体ステータスとレポート用の行を作ります。
//! ビルドログは [`ArtifactStore`] にアップロードし、行にリンクを付けます。

use crate::error::{BuildError, Result};
use imagecheck_core::{BuildResult, BuildStatus};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// 実行全体のステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Success,
    Failure,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Success => "success",
            OverallStatus::Failure => "failure",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// レポートの1行（表示名とステータス）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    pub label: String,
    pub status: BuildStatus,
}

/// ビルドログのアップロード先
pub trait ArtifactStore {
    /// `local` を `key` としてアップロードし、閲覧用URLを返す
    fn upload(&self, local: &Path, key: &str) -> Result<String>;
}

/// ローカルディレクトリにログをコピーするストア
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactStore for LocalArtifactStore {
    fn upload(&self, local: &Path, key: &str) -> Result<String> {
        let target = self.root.join(key);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(local, &target).map_err(|e| BuildError::Upload {
            path: local.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(format!("file://{}", target.display()))
    }
}

/// 結果を全体ステータスと表示行に集計
///
/// OK 以外の結果が1つでもあれば全体は failure。
/// ストアが指定されていて、ログが存在する結果はログをアップロードして
/// `tag (<a href="...">build_log</a>)` の形式でリンクを付けます。
pub fn aggregate(
    results: &[BuildResult],
    store: Option<&dyn ArtifactStore>,
    prefix: &str,
) -> (OverallStatus, Vec<DisplayRow>) {
    let mut overall = OverallStatus::Success;
    let mut rows = Vec::with_capacity(results.len());

    for result in results {
        if !result.status.is_ok() {
            overall = OverallStatus::Failure;
        }

        let url = match (store, result.log.as_deref()) {
            (Some(store), Some(log)) if log.exists() => upload_log(store, log, prefix),
            _ => None,
        };

        let label = match url {
            Some(url) => format!("{} (<a href=\"{}\">build_log</a>)", result.tag, url),
            None => result.tag.clone(),
        };
        rows.push(DisplayRow {
            label,
            status: result.status,
        });
    }

    (overall, rows)
}

fn upload_log(store: &dyn ArtifactStore, log: &Path, prefix: &str) -> Option<String> {
    let file_name = log.file_name()?.to_string_lossy();
    let key = format!("{}/{}", prefix, file_name);

    match store.upload(log, &key) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!("Failed to upload build log {}: {}", log.display(), e);
            None
        }
    }
}
