pub mod error;

pub use error::*;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// チェック名（コミットステータス・レポートのタイトル）
pub const CHECK_NAME: &str = "Push to Dockerhub (actions)";

/// カタログファイルのリポジトリ内パス
pub const IMAGES_FILE: &str = "docker/images.json";

/// ビルドログなどを置く作業ディレクトリ名（RUNNER_TEMP 配下）
pub const TEMP_DIR_NAME: &str = "docker_images_check";

/// デフォルトのリポジトリプレフィックス
pub const DEFAULT_REPO_PREFIX: &str = "clickhouse";

/// 1バージョンあたりのデフォルトのビルド試行回数
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// 親イメージのビルドが失敗したときの依存イメージの扱い
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParentFailurePolicy {
    /// 親が失敗しても依存イメージのビルドを試みる
    #[default]
    BestEffort,
    /// 親が失敗した依存イメージはビルドせずスキップする
    SkipDependents,
}

impl ParentFailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BestEffort => "best-effort",
            Self::SkipDependents => "skip-dependents",
        }
    }
}

impl fmt::Display for ParentFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParentFailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "best-effort" => Ok(Self::BestEffort),
            "skip-dependents" => Ok(Self::SkipDependents),
            _ => Err(ConfigError::InvalidParentFailurePolicy(s.to_string())),
        }
    }
}

/// 1回の実行の設定
///
/// サフィックスによって変わる名前（チェック名など）はここで確定させ、
/// 以降は値として引き回します。
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// リポジトリのチェックアウト先（GITHUB_WORKSPACE）
    pub workspace: PathBuf,
    /// 作業ディレクトリ（RUNNER_TEMP/docker_images_check）
    pub temp_path: PathBuf,
    /// アーキテクチャ別ビルドのサフィックス
    pub suffix: Option<String>,
    /// チェック名（サフィックス付き）
    pub check_name: String,
    /// レジストリのリポジトリプレフィックス
    pub repo_prefix: String,
    /// ビルドしたイメージをpushするか
    pub push: bool,
    /// レポートを出力するか
    pub reports: bool,
    pub on_parent_failure: ParentFailurePolicy,
    /// 1バージョンあたりのビルド試行回数
    pub max_attempts: u32,
}

impl RunConfig {
    /// ワークスペースと一時ディレクトリのルートを指定して作成
    pub fn new(workspace: PathBuf, temp_root: &Path) -> Self {
        Self {
            workspace,
            temp_path: temp_root.join(TEMP_DIR_NAME),
            suffix: None,
            check_name: CHECK_NAME.to_string(),
            repo_prefix: DEFAULT_REPO_PREFIX.to_string(),
            push: true,
            reports: true,
            on_parent_failure: ParentFailurePolicy::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// 環境変数から作成
    ///
    /// - `GITHUB_WORKSPACE`: 未設定ならカレントディレクトリ
    /// - `RUNNER_TEMP`: 未設定ならシステムの一時ディレクトリ
    pub fn from_env() -> Result<Self> {
        let workspace = match std::env::var_os("GITHUB_WORKSPACE") {
            Some(path) => PathBuf::from(path),
            None => std::env::current_dir()?,
        };
        let temp_root = std::env::var_os("RUNNER_TEMP")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);

        Ok(Self::new(workspace, &temp_root))
    }

    /// サフィックスを設定（チェック名にも反映）
    pub fn with_suffix(mut self, suffix: Option<String>) -> Self {
        let suffix = suffix.filter(|s| !s.is_empty());
        self.check_name = match &suffix {
            Some(s) => format!("{} {}", CHECK_NAME, s),
            None => CHECK_NAME.to_string(),
        };
        self.suffix = suffix;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Result<Self> {
        if max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(max_attempts));
        }
        self.max_attempts = max_attempts;
        Ok(self)
    }

    /// カタログファイルの絶対パス
    pub fn images_path(&self) -> PathBuf {
        self.workspace.join(IMAGES_FILE)
    }

    /// 作業ディレクトリを空にして作り直す（実行開始時に1回だけ）
    pub fn reset_temp_dir(&self) -> Result<()> {
        if self.temp_path.exists() {
            tracing::debug!("Removing {}", self.temp_path.display());
            std::fs::remove_dir_all(&self.temp_path)?;
        }
        std::fs::create_dir_all(&self.temp_path)?;
        Ok(())
    }
}
