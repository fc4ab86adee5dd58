use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("ファイル読み込みエラー: {path}\n理由: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("イメージカタログのパースエラー: {path}\n理由: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "依存イメージの展開が上限を超えました（循環依存の可能性があります）: {}",
        .nodes.join(", ")
    )]
    CycleDetected { nodes: Vec<String> },
}

pub type Result<T> = std::result::Result<T, CatalogError>;
