//! docker buildx の呼び出し
//!
//! 1回の `docker buildx build` 実行を [`BuildInvocation`] で表し、
//! [`BuildRunner`] 経由で実行します。

use crate::error::{BuildError, Result};
use imagecheck_core::BuildTag;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// 1回のイメージビルド（+ push）の内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInvocation {
    /// 出力タグ（キャッシュ元にも同じタグを使う）
    pub tag: BuildTag,
    /// ビルドコンテキスト（Dockerfileのディレクトリ）
    pub context: PathBuf,
    /// 子ビルドの場合、ベースイメージのタグ（FROM_TAG ビルド引数）
    pub from_tag: Option<String>,
    pub push: bool,
}

impl BuildInvocation {
    /// `docker` に渡す引数
    pub fn args(&self) -> Vec<String> {
        let tag = self.tag.to_string();
        let mut args: Vec<String> = vec![
            "buildx".into(),
            "build".into(),
            "--builder".into(),
            "default".into(),
        ];

        if let Some(from_tag) = &self.from_tag {
            args.push("--build-arg".into());
            args.push(format!("FROM_TAG={}", from_tag));
        }

        args.push("--build-arg".into());
        args.push("BUILDKIT_INLINE_CACHE=1".into());
        args.push("--tag".into());
        args.push(tag.clone());
        args.push("--cache-from".into());
        args.push(format!("type=registry,ref={}", tag));

        if self.push {
            args.push("--push".into());
        }

        args.push("--progress".into());
        args.push("plain".into());
        args.push(self.context.display().to_string());
        args
    }

    /// ビルドログのファイル名（リポジトリ名の `/` は `_` に置換）
    pub fn log_file_name(&self) -> String {
        format!(
            "build_and_push_log_{}_{}",
            self.tag.repository.replace('/', "_"),
            self.tag.version
        )
    }
}

/// 外部ビルドツールの実行
///
/// `Ok(true)` は終了コード 0、`Ok(false)` はそれ以外。
/// 出力は `log_path` に書き出します。
pub trait BuildRunner {
    fn run(
        &self,
        invocation: &BuildInvocation,
        log_path: &Path,
    ) -> impl Future<Output = Result<bool>>;
}

/// `docker buildx build` を実行するランナー
#[derive(Debug, Clone)]
pub struct BuildxRunner {
    program: String,
}

impl BuildxRunner {
    pub fn new() -> Self {
        Self::with_program("docker")
    }

    /// 実行するプログラムを指定して作成
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for BuildxRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildRunner for BuildxRunner {
    async fn run(&self, invocation: &BuildInvocation, log_path: &Path) -> Result<bool> {
        let args = invocation.args();
        tracing::info!("Docker command to run: {} {}", self.program, args.join(" "));

        // stdout と stderr を同じログファイルにまとめる
        let log = File::create(log_path).map_err(|source| BuildError::LogFile {
            path: log_path.to_path_buf(),
            source,
        })?;
        let log_err = log.try_clone()?;

        let status = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .status()
            .await
            .map_err(|source| BuildError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        tracing::debug!("{} exited with {}", self.program, status);
        Ok(status.success())
    }
}
