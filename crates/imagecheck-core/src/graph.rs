//! 変更イメージの依存グラフ
//!
//! 展開済みの [`ImageSet`] をパスをキーにしたアリーナに格納し、
//! `parent → 子` の辺からビルド順序（トポロジカル順）を求めます。

use crate::error::{CatalogError, Result};
use crate::expand::ImageSet;
use crate::model::ImageNode;
use std::collections::{BTreeSet, HashMap};

/// ビルド対象イメージの有向グラフ
#[derive(Debug, Clone, Default)]
pub struct ImageGraph {
    /// 全ノード
    nodes: Vec<ImageNode>,
    /// パス → ノードID
    index: HashMap<String, usize>,
    /// 親ノードID → 子ノードID
    children: HashMap<usize, Vec<usize>>,
    /// 親ノードID（グラフ内に親が存在する場合のみ）
    parents: Vec<Option<usize>>,
}

impl ImageGraph {
    /// 展開済みの集合からグラフを構築
    ///
    /// 親がグラフ内に存在しない `parent` は無視されます。
    pub fn from_set(set: ImageSet) -> Self {
        let nodes: Vec<ImageNode> = set.into_iter().collect();
        let index: HashMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(id, node)| (node.path.clone(), id))
            .collect();

        let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut parents = Vec::with_capacity(nodes.len());
        for (id, node) in nodes.iter().enumerate() {
            let parent = node
                .parent
                .as_deref()
                .and_then(|path| index.get(path).copied());
            if let Some(parent_id) = parent {
                children.entry(parent_id).or_default().push(id);
            }
            parents.push(parent);
        }

        Self {
            nodes,
            index,
            children,
            parents,
        }
    }

    pub fn get(&self, path: &str) -> Option<&ImageNode> {
        self.index.get(path).map(|&id| &self.nodes[id])
    }

    /// グラフ内の親ノード
    pub fn parent_of(&self, path: &str) -> Option<&ImageNode> {
        let id = *self.index.get(path)?;
        self.parents[id].map(|parent_id| &self.nodes[parent_id])
    }

    /// 祖先ノードをルート側から順に返す（自身は含まない）
    pub fn ancestors(&self, path: &str) -> Vec<&ImageNode> {
        let mut chain = Vec::new();
        let mut current = self.index.get(path).copied();

        while let Some(id) = current {
            current = self.parents[id];
            if let Some(parent_id) = current {
                // 循環した親リンクで無限ループしない
                if chain.len() >= self.nodes.len() {
                    break;
                }
                chain.push(&self.nodes[parent_id]);
            }
        }

        chain.reverse();
        chain
    }

    /// 親が子より先に来る順序でノードを返す
    ///
    /// Kahn のアルゴリズム。同時に処理可能なノードはパスの辞書順に並べます。
    pub fn topological_order(&self) -> Result<Vec<&ImageNode>> {
        let mut in_degree: Vec<usize> = self
            .parents
            .iter()
            .map(|parent| usize::from(parent.is_some()))
            .collect();

        let mut ready: BTreeSet<(&str, usize)> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(id, _)| in_degree[*id] == 0)
            .map(|(id, node)| (node.path.as_str(), id))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some((_, id)) = ready.pop_first() {
            order.push(&self.nodes[id]);

            for &child in self.children.get(&id).into_iter().flatten() {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    ready.insert((self.nodes[child].path.as_str(), child));
                }
            }
        }

        if order.len() != self.nodes.len() {
            let nodes = self
                .nodes
                .iter()
                .enumerate()
                .filter(|(id, _)| in_degree[*id] > 0)
                .map(|(_, node)| node.path.clone())
                .collect();
            return Err(CatalogError::CycleDetected { nodes });
        }

        Ok(order)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ImageNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
