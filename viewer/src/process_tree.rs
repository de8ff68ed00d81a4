use std::collections::HashMap;

use hostview_shared::{Pid, Process};

/// フォレスト内のノード位置（入力順のインデックス）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// プロセス1件と、解決済みの親子関係
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessNode {
    pub process: Process,
    pub parent: Option<NodeId>,
    /// 入力順
    pub children: Vec<NodeId>,
}

impl ProcessNode {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// pid/ppid から再構成したプロセスフォレスト
///
/// ノードはスナップショットの入力順で保持する。テーブル表示はこの順序をそのまま使い、
/// ツリー表示は `roots()` から辿る。
///
/// ppid が 0/None、自分自身、またはスナップショットに存在しない pid を指す場合はルート。
/// 2つ以上のプロセスで閉じた ppid の循環はどのルートからも辿れないので、
/// 構築時に壊さず `detached()` で報告する。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessForest {
    nodes: Vec<ProcessNode>,
    roots: Vec<NodeId>,
    by_pid: HashMap<Pid, NodeId>,
}

impl ProcessForest {
    /// 1パスで親子関係を構築
    pub fn build(processes: Vec<Process>) -> Self {
        // 同じ pid が複数あれば後勝ち
        let by_pid: HashMap<Pid, NodeId> = processes
            .iter()
            .enumerate()
            .map(|(index, process)| (process.pid, NodeId(index)))
            .collect();

        let mut nodes: Vec<ProcessNode> = processes
            .into_iter()
            .map(|process| ProcessNode {
                process,
                parent: None,
                children: Vec::new(),
            })
            .collect();

        let mut roots = Vec::new();
        for index in 0..nodes.len() {
            let id = NodeId(index);
            let parent = nodes[index]
                .process
                .parent_pid()
                .and_then(|ppid| by_pid.get(&ppid).copied());

            match parent {
                Some(parent) => {
                    nodes[index].parent = Some(parent);
                    nodes[parent.0].children.push(id);
                }
                None => roots.push(id),
            }
        }

        Self {
            nodes,
            roots,
            by_pid,
        }
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> &ProcessNode {
        &self.nodes[id.0]
    }

    /// 入力順の全ノード
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &ProcessNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index), node))
    }

    /// 入力順のプロセス
    pub fn processes(&self) -> impl Iterator<Item = &Process> {
        self.nodes.iter().map(|node| &node.process)
    }

    pub fn node_for_pid(&self, pid: Pid) -> Option<NodeId> {
        self.by_pid.get(&pid).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// ルートからの前順走査（ノード, 深さ）
    pub fn preorder(&self) -> Vec<(NodeId, usize)> {
        self.walk(|_| true)
    }

    /// `descend` が false を返したノードの子は辿らない
    pub fn walk<F>(&self, mut descend: F) -> Vec<(NodeId, usize)>
    where
        F: FnMut(NodeId) -> bool,
    {
        let mut visited = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(NodeId, usize)> =
            self.roots.iter().rev().map(|&root| (root, 0)).collect();

        while let Some((id, depth)) = stack.pop() {
            visited.push((id, depth));
            if descend(id) {
                for &child in self.node(id).children.iter().rev() {
                    stack.push((child, depth + 1));
                }
            }
        }

        visited
    }

    /// ルートから到達できるノード数（循環が無ければ len() と等しい）
    pub fn reachable_count(&self) -> usize {
        self.preorder().len()
    }

    /// ppid の循環に閉じ込められてルートから辿れないノード（入力順）
    pub fn detached(&self) -> Vec<NodeId> {
        let mut reachable = vec![false; self.nodes.len()];
        for (id, _) in self.preorder() {
            reachable[id.0] = true;
        }

        reachable
            .iter()
            .enumerate()
            .filter(|(_, &seen)| !seen)
            .map(|(index, _)| NodeId(index))
            .collect()
    }
}
