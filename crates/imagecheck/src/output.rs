//! 実行結果の書き出し（変更イメージJSON、レポート）

use anyhow::Context;
use imagecheck_build::{DisplayRow, OverallStatus};
use imagecheck_core::ResultVersion;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// リポジトリ名 → バージョン（またはバージョン一覧）
pub type ChangedImages = BTreeMap<String, ResultVersion>;

/// 変更イメージの一覧を書き出す
pub fn write_changed_images(path: &Path, images: &ChangedImages) -> anyhow::Result<()> {
    let content = serde_json::to_string(images)?;
    std::fs::write(path, content)
        .with_context(|| format!("{} を書き込めません", path.display()))?;
    tracing::info!("Changed images written to {}", path.display());
    Ok(())
}

/// チェック結果のレポート
#[derive(Debug, Serialize)]
pub struct CheckReport<'a> {
    pub check_name: &'a str,
    pub description: &'a str,
    pub status: OverallStatus,
    pub pr_number: u64,
    pub sha: &'a str,
    pub repo_prefix: &'a str,
    pub start_time: String,
    pub duration_seconds: f64,
    pub results: &'a [DisplayRow],
}

/// レポートを `<dir>/<prefix>/report.json` に書き出し、そのURLを返す
pub fn write_report(dir: &Path, prefix: &str, report: &CheckReport<'_>) -> anyhow::Result<String> {
    let target: PathBuf = dir.join(prefix).join("report.json");
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(report)?;
    std::fs::write(&target, content)
        .with_context(|| format!("{} を書き込めません", target.display()))?;

    Ok(format!("file://{}", target.display()))
}
