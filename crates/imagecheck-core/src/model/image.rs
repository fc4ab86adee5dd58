//! イメージノード定義

use std::fmt;
use std::hash::{Hash, Hasher};

/// ビルド対象のイメージ（Dockerfileのディレクトリ単位）
///
/// 同一性はディレクトリパスのみで決まります。`parent` は「なぜ含まれたか」を
/// 表すだけで、集合上は同じパスのノードは区別されません。
#[derive(Debug, Clone)]
pub struct ImageNode {
    /// リポジトリルートからのDockerfileディレクトリ（例: docker/test/base）
    pub path: String,
    /// イメージのリポジトリ名（タグのプレフィックス）
    pub repo: String,
    /// このノードを変更対象に含めたベースイメージのパス
    pub parent: Option<String>,
}

impl ImageNode {
    pub fn new(path: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            repo: repo.into(),
            parent: None,
        }
    }

    pub fn with_parent(
        path: impl Into<String>,
        repo: impl Into<String>,
        parent: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            repo: repo.into(),
            parent: Some(parent.into()),
        }
    }
}

impl PartialEq for ImageNode {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for ImageNode {}

impl Hash for ImageNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl fmt::Display for ImageNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repo)
    }
}
