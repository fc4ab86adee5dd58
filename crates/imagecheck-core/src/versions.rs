//! イメージバージョン（タグ）の生成

use serde::Serialize;

/// 結果JSONに書き出すバージョン
///
/// サフィックス指定時はアーキテクチャ別タグの一覧、それ以外は `P-<sha>` のみ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResultVersion {
    Single(String),
    Multiple(Vec<String>),
}

/// PR番号・コミットハッシュ・サフィックスからビルドするバージョン一覧を生成
///
/// 順序に意味があります。PR番号のタグが後続ビルドのキャッシュとして使われます。
/// PR番号が 0（デフォルトブランチへのpush）の場合は `latest` を先頭に追加します。
pub fn gen_versions(
    pr_number: u64,
    sha: &str,
    suffix: Option<&str>,
) -> (Vec<String>, ResultVersion) {
    let pr_commit_version = format!("{}-{}", pr_number, sha);
    let mut versions = vec![pr_number.to_string(), pr_commit_version.clone()];
    if pr_number == 0 {
        versions.insert(0, "latest".to_string());
    }

    match suffix.filter(|s| !s.is_empty()) {
        Some(suffix) => {
            // アーキテクチャ別イメージはマニフェストを後で別途マージする
            let versions: Vec<String> = versions
                .into_iter()
                .map(|v| format!("{}-{}", v, suffix))
                .collect();
            let result = ResultVersion::Multiple(versions.clone());
            (versions, result)
        }
        None => (versions, ResultVersion::Single(pr_commit_version)),
    }
}
