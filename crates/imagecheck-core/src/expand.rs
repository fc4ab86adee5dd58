//! 依存イメージの展開
//!
//! 直接変更されたイメージから、それを FROM している依存イメージを
//! 推移的に追加します。

use crate::catalog::ImageCatalog;
use crate::error::{CatalogError, Result};
use crate::model::ImageNode;
use std::collections::HashSet;
use tracing::info;

/// 展開リストの上限（カタログのエントリ数に対する倍率）
pub const EXPANSION_FACTOR: usize = 5;

/// パスで一意化されたイメージの集合
///
/// 集合の反復順序にビルド順序の意味はありません。
/// ビルド順序は各ノードの `parent` から [`crate::graph::ImageGraph`] で導出します。
#[derive(Debug, Clone, Default)]
pub struct ImageSet {
    nodes: Vec<ImageNode>,
}

impl ImageSet {
    pub fn get(&self, path: &str) -> Option<&ImageNode> {
        self.nodes.iter().find(|n| n.path == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl FromIterator<ImageNode> for ImageSet {
    /// 同じパスが複数回現れた場合は最初のノードを残す
    fn from_iter<T: IntoIterator<Item = ImageNode>>(iter: T) -> Self {
        let mut seen = HashSet::new();
        let nodes = iter
            .into_iter()
            .filter(|node| seen.insert(node.path.clone()))
            .collect();
        Self { nodes }
    }
}

impl IntoIterator for ImageSet {
    type Item = ImageNode;
    type IntoIter = std::vec::IntoIter<ImageNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

/// 変更イメージに依存イメージを推移的に追加する
///
/// リストをインデックス順に処理し、処理したノードの依存イメージを末尾に追加します
/// （レベル順）。依存ノードのリポジトリ名は起点ノードから引き継ぎ、`parent` には
/// 起点ノードのパスを設定します。
///
/// 処理数がカタログのエントリ数の [`EXPANSION_FACTOR`] 倍を超えた場合は
/// [`CatalogError::CycleDetected`] を返します。
///
/// 最後にリストを逆順にしてパスで一意化します。同じパスに複数の経路で到達した場合は
/// 最後に追加されたノードが残ります。
pub fn expand_dependents(seeds: Vec<ImageNode>, catalog: &ImageCatalog) -> Result<ImageSet> {
    let limit = EXPANSION_FACTOR * catalog.len();
    let mut queue = seeds;
    let mut index = 0;

    while index < queue.len() {
        let image = queue[index].clone();
        for dependent in catalog.dependents_of(&image.path) {
            info!(
                "Marking docker image '{}' as changed because it depends on changed docker image '{}'",
                dependent, image
            );
            queue.push(ImageNode::with_parent(dependent, &image.repo, &image.path));
        }

        index += 1;
        if index > limit {
            return Err(CatalogError::CycleDetected {
                nodes: queue.iter().map(|n| n.path.clone()).collect(),
            });
        }
    }

    let result: ImageSet = queue.into_iter().rev().collect();
    info!(
        "Changed docker images: {}",
        result
            .iter()
            .map(|n| n.path.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(result)
}
