//! PR情報（PR番号・コミット・変更ファイル）の取得

use anyhow::Context;
use std::path::Path;
use std::process::Command;

/// ビルド対象を決めるためのPR情報
#[derive(Debug, Clone, Default)]
pub struct PrInfo {
    /// PR番号（デフォルトブランチへのpushは 0）
    pub number: u64,
    pub sha: String,
    pub changed_files: Vec<String>,
}

/// git コマンドを実行して標準出力を返す
fn git(workspace: &Path, args: &[&str]) -> anyhow::Result<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(workspace)
        .args(args)
        .output()
        .with_context(|| format!("gitの実行に失敗しました: git {}", args.join(" ")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("git {} 失敗:\n{}", args.join(" "), stderr);
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// コミットハッシュを決定（未指定なら HEAD）
pub fn resolve_sha(sha: Option<String>, workspace: &Path) -> anyhow::Result<String> {
    match sha.filter(|s| !s.is_empty()) {
        Some(sha) => Ok(sha),
        None => Ok(git(workspace, &["rev-parse", "HEAD"])?.trim().to_string()),
    }
}

/// ベースブランチとの差分から変更ファイルを取得
pub fn changed_files_from_git(workspace: &Path, base_ref: &str) -> anyhow::Result<Vec<String>> {
    let range = format!("{}...HEAD", base_ref);
    let stdout = git(workspace, &["diff", "--name-only", range.as_str()])?;
    Ok(parse_file_list(&stdout))
}

/// 1行1ファイルのリストを読み込む
pub fn read_changed_files(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("変更ファイル一覧を読み込めません: {}", path.display()))?;
    Ok(parse_file_list(&content))
}

fn parse_file_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}
