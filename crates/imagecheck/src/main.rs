mod check;
mod output;
mod pr_info;

use clap::Parser;
use imagecheck_config::{DEFAULT_MAX_ATTEMPTS, DEFAULT_REPO_PREFIX, ParentFailurePolicy, RunConfig};
use pr_info::PrInfo;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docker-images-check")]
#[command(
    about = "変更されたDockerイメージを依存イメージも含めてビルド・pushします",
    long_about = "変更されたDockerイメージを依存イメージも含めてビルド・pushします。\n\
                  ローカル実行の例: docker-images-check --no-push-images --no-reports \
                  --image-path docker/packager/binary"
)]
struct Cli {
    /// 全タグと結果JSONに付けるサフィックス（アーキテクチャ別ビルド用）
    /// 結果は changed_images_{suffix}.json に全タグの一覧として書き出されます
    #[arg(long)]
    suffix: Option<String>,
    /// レジストリのリポジトリプレフィックス
    #[arg(long, default_value = DEFAULT_REPO_PREFIX)]
    repo: String,
    /// 変更検出の代わりにビルドするイメージのパス（複数指定可）
    /// 例: docker/packager/binary
    #[arg(long = "image-path")]
    image_path: Vec<String>,
    /// レポート（ビルドログ・結果）を出力しない
    #[arg(long)]
    no_reports: bool,
    /// ビルドしたイメージをpushしない
    #[arg(long)]
    no_push_images: bool,
    /// PR番号（デフォルトブランチへのpushは 0）
    #[arg(long, env = "PR_NUMBER", default_value_t = 0)]
    pr_number: u64,
    /// コミットハッシュ（省略時は git rev-parse HEAD）
    #[arg(long, env = "GITHUB_SHA")]
    sha: Option<String>,
    /// 変更ファイルを求める比較元
    #[arg(long, env = "GITHUB_BASE_REF", default_value = "origin/master")]
    base_ref: String,
    /// 変更ファイルの一覧（1行1ファイル）。指定時は git diff を使わない
    #[arg(long, conflicts_with = "image_path")]
    changed_files: Option<PathBuf>,
    /// 親イメージのビルドが失敗したときの依存イメージの扱い
    #[arg(long, default_value_t = ParentFailurePolicy::BestEffort)]
    on_parent_failure: ParentFailurePolicy,
    /// 1タグあたりのビルド試行回数
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,
    /// ビルドに使う docker コマンド
    #[arg(long, env = "IMAGECHECK_DOCKER", default_value = "docker", hide = true)]
    docker: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログはstderrに出力（stdoutはGitHub Actionsのコマンド用）
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = RunConfig::from_env()?
        .with_suffix(cli.suffix)
        .with_max_attempts(cli.max_attempts)?;
    config.repo_prefix = cli.repo;
    config.push = !cli.no_push_images;
    config.reports = !cli.no_reports;
    config.on_parent_failure = cli.on_parent_failure;

    let sha = pr_info::resolve_sha(cli.sha, &config.workspace)?;
    let changed_files = if !cli.image_path.is_empty() {
        cli.image_path
    } else if let Some(list) = &cli.changed_files {
        pr_info::read_changed_files(list)?
    } else {
        pr_info::changed_files_from_git(&config.workspace, &cli.base_ref)?
    };
    let pr_info = PrInfo {
        number: cli.pr_number,
        sha,
        changed_files,
    };

    check::handle_check_command(&config, &pr_info, &cli.docker).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_ref_from_github_env() {
        temp_env::with_vars(
            [
                ("GITHUB_BASE_REF", Some("origin/release")),
                ("BASE_REF", Some("origin/ignored")),
                ("PR_NUMBER", None),
            ],
            || {
                let cli = Cli::try_parse_from(["docker-images-check"]).unwrap();
                assert_eq!(cli.base_ref, "origin/release");
            },
        );
    }

    #[test]
    fn test_base_ref_default() {
        temp_env::with_vars(
            [("GITHUB_BASE_REF", None::<&str>), ("PR_NUMBER", None)],
            || {
                let cli = Cli::try_parse_from(["docker-images-check"]).unwrap();
                assert_eq!(cli.base_ref, "origin/master");
                assert_eq!(cli.pr_number, 0);
            },
        );
    }
}
