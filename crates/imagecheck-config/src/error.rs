use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "不明な親イメージ失敗時の動作です: {0}\n\
        指定可能な値: best-effort, skip-dependents"
    )]
    InvalidParentFailurePolicy(String),

    #[error("リトライ回数は1以上を指定してください: {0}")]
    InvalidMaxAttempts(u32),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
