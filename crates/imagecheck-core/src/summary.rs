//! 実行結果のサマリー（コミットステータスの説明文、出力ファイル名）

/// コミットステータスの説明文の上限
pub const MAX_DESCRIPTION_LEN: usize = 140;

const TRUNCATED_LEN: usize = 136;

/// 変更イメージの説明文を生成
///
/// 140文字以上になる場合は先頭136文字 + `...` に切り詰めます。
pub fn changes_description<S: AsRef<str>>(repos: &[S]) -> String {
    let description = if repos.is_empty() {
        "Nothing to update".to_string()
    } else {
        let names: Vec<&str> = repos.iter().map(S::as_ref).collect();
        format!("Updated {}", names.join(","))
    };

    truncate_description(description)
}

fn truncate_description(description: String) -> String {
    if description.chars().count() < MAX_DESCRIPTION_LEN {
        return description;
    }

    let mut truncated: String = description.chars().take(TRUNCATED_LEN).collect();
    truncated.push_str("...");
    truncated
}

/// 変更イメージ一覧を書き出すファイル名
pub fn changed_images_file_name(suffix: Option<&str>) -> String {
    match suffix.filter(|s| !s.is_empty()) {
        Some(suffix) => format!("changed_images_{}.json", suffix),
        None => "changed_images.json".to_string(),
    }
}

/// ビルドログのアップロード先プレフィックス
pub fn report_path_prefix(pr_number: u64, sha: &str, check_name: &str) -> String {
    format!(
        "{}/{}/{}",
        pr_number,
        sha,
        check_name.to_lowercase().replace(' ', "_")
    )
}
