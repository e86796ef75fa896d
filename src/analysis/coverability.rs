//! Karp-Miller 覆盖树构造.
//!
//! 对可能无限的可达集构造有限的符号化过逼近：广度优先展开后继标识，
//! 沿当前分支自根向下检查祖先覆盖关系，将严格增长的分量加速为 ω，
//! 并按标识值合并重复节点。ω 节点的出现即为无界性的判据.

use std::collections::VecDeque;
use std::collections::hash_map::Entry;
use std::fs;
use std::path::Path;

use log::{debug, trace};
use petgraph::dot::{Config, Dot};
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use rustc_hash::FxHashMap;

use crate::net::ids::TransitionId;
use crate::net::structure::Marking;
use crate::net::{FireError, Net};

/// 覆盖树节点：插入序号与（可能含 ω 的）标识.
#[derive(Debug, Clone)]
pub struct CoverNode {
    pub index: usize,
    pub marking: Marking,
}

/// 覆盖树边：产生该后继的迁移.
#[derive(Debug, Clone)]
pub struct CoverEdge {
    pub transition: TransitionId,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct CoverTreeConfig {
    /// 节点预算上限，None 表示不设上限.
    ///
    /// Karp-Miller 构造必然终止，但病态加速模式下树在稳定前可能很大；
    /// 预算耗尽后丢弃新发现的标识并置 `truncated`.
    pub node_limit: Option<usize>,
}

impl Default for CoverTreeConfig {
    fn default() -> Self {
        Self { node_limit: None }
    }
}

#[derive(Debug, Clone)]
pub struct CoverTreeStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub unbounded: bool,
    pub truncated: bool,
}

/// Karp-Miller 覆盖树.
///
/// 节点按标识值唯一（值相同的标识合并为一个节点，既不加边也不重新
/// 展开——后发现的路径视为已被既有节点代表）；`unbounded` 单调置位，
/// 表示某个可达覆盖类含 ω 分量.
#[derive(Debug)]
pub struct CoverabilityTree {
    pub graph: StableGraph<CoverNode, CoverEdge>,
    pub root: NodeIndex,
    pub markings: FxHashMap<Marking, NodeIndex>,
    pub unbounded: bool,
    pub truncated: bool,
}

impl CoverabilityTree {
    pub fn build(net: &Net) -> Self {
        Self::with_config(net, CoverTreeConfig::default())
    }

    pub fn with_config(net: &Net, config: CoverTreeConfig) -> Self {
        let mut graph = StableGraph::new();
        let mut markings: FxHashMap<Marking, NodeIndex> = FxHashMap::default();
        let mut queue: VecDeque<(NodeIndex, Vec<Marking>)> = VecDeque::new();
        let mut unbounded = false;
        let mut truncated = false;

        let root_marking = net.initial_marking();
        let root = graph.add_node(CoverNode {
            index: 0,
            marking: root_marking.clone(),
        });
        markings.insert(root_marking.clone(), root);
        queue.push_back((root, vec![root_marking]));

        while let Some((node, path)) = queue.pop_front() {
            let marking = graph[node].marking.clone();

            for (transition, _) in net.transitions.iter_enumerated() {
                let mut child = match net.fire_transition(&marking, transition) {
                    Ok(next) => next,
                    Err(FireError::NotEnabled(_)) => continue,
                    Err(err) => {
                        debug!("skipping transition: {err}");
                        continue;
                    }
                };

                // 加速：自根向下取第一个被 child 严格覆盖的祖先，命中即止.
                for ancestor in &path {
                    if ancestor < &child {
                        trace!("accelerating {child} against ancestor {ancestor}");
                        child = child.widen_against(ancestor);
                        break;
                    }
                }

                if child.has_omega() {
                    unbounded = true;
                }

                match markings.entry(child.clone()) {
                    // 同值节点已存在：不加边、不重新入队.
                    Entry::Occupied(_) => {}
                    Entry::Vacant(entry) => {
                        if let Some(limit) = config.node_limit {
                            if graph.node_count() >= limit {
                                truncated = true;
                                continue;
                            }
                        }
                        let index = graph.add_node(CoverNode {
                            index: graph.node_count(),
                            marking: child.clone(),
                        });
                        graph.add_edge(
                            node,
                            index,
                            CoverEdge {
                                transition,
                                name: net.transitions[transition].name.clone(),
                            },
                        );
                        entry.insert(index);
                        let mut next_path = path.clone();
                        next_path.push(child);
                        queue.push_back((index, next_path));
                    }
                }
            }
        }

        debug!(
            "coverability tree: {} nodes, {} edges, unbounded={}",
            graph.node_count(),
            graph.edge_count(),
            unbounded
        );

        Self {
            graph,
            root,
            markings,
            unbounded,
            truncated,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// 节点按插入顺序迭代；该顺序由广度优先展开确定.
    pub fn nodes(&self) -> impl Iterator<Item = &CoverNode> {
        self.graph.node_weights()
    }

    pub fn contains_marking(&self, marking: &Marking) -> bool {
        self.markings.contains_key(marking)
    }

    pub fn node_of(&self, marking: &Marking) -> Option<NodeIndex> {
        self.markings.get(marking).copied()
    }

    /// 单步迁移后继的标识集合；未知标识返回 None.
    pub fn successors(&self, marking: &Marking) -> Option<Vec<&Marking>> {
        let index = *self.markings.get(marking)?;
        Some(
            self.graph
                .neighbors(index)
                .map(|succ| &self.graph[succ].marking)
                .collect(),
        )
    }

    pub fn stats(&self) -> CoverTreeStats {
        CoverTreeStats {
            node_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
            unbounded: self.unbounded,
            truncated: self.truncated,
        }
    }

    pub fn dot(&self) -> String {
        fn escape(s: &str) -> String {
            s.replace('\\', "\\\\").replace('"', "\\\"")
        }

        let mut edge_attr = |_, edge: petgraph::stable_graph::EdgeReference<CoverEdge>| -> String {
            format!("label=\"{}\"", escape(&edge.weight().name))
        };

        let mut node_attr = |_, (_idx, node): (NodeIndex, &CoverNode)| -> String {
            format!(
                "label=\"s{}\\n{}\"",
                node.index,
                escape(&node.marking.to_string())
            )
        };

        format!(
            "{:?}",
            Dot::with_attr_getters(
                &self.graph,
                &[Config::EdgeNoLabel],
                &mut edge_attr,
                &mut node_attr
            )
        )
    }

    pub fn write_dot<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let dot = self.dot();
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, dot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::index_vec::IndexVec;
    use crate::net::structure::Tokens;
    use crate::net::{Place, Transition};
    use petgraph::visit::{EdgeRef, IntoEdgeReferences};

    /// p0 -t0-> p0 + p0：单库所 token 生成器，无界.
    fn generator_net() -> Net {
        let mut net = Net::empty();
        let p0 = net.add_place(Place::new("p0", 1));
        let t0 = net.add_transition(Transition::new("t0"));
        net.set_input_weight(p0, t0, 1);
        net.set_output_weight(p0, t0, 2);
        net
    }

    /// p0 -t0-> p1 -t1-> p2：有界三库所链.
    fn chain_net() -> Net {
        let mut net = Net::empty();
        let p0 = net.add_place(Place::new("p0", 1));
        let p1 = net.add_place(Place::new("p1", 0));
        let p2 = net.add_place(Place::new("p2", 0));
        let t0 = net.add_transition(Transition::new("t0"));
        let t1 = net.add_transition(Transition::new("t1"));
        net.set_input_weight(p0, t0, 1);
        net.set_output_weight(p1, t0, 1);
        net.set_input_weight(p1, t1, 1);
        net.set_output_weight(p2, t1, 1);
        net
    }

    fn finite(counts: Vec<u64>) -> Marking {
        Marking::from_finite(IndexVec::from(counts))
    }

    #[test]
    fn generator_widens_to_omega_within_two_firings() {
        let net = generator_net();
        let tree = CoverabilityTree::build(&net);

        assert!(tree.unbounded);
        assert!(!tree.truncated);
        assert_eq!(tree.node_count(), 2);

        let omega = Marking::new(IndexVec::from(vec![Tokens::Omega]));
        assert!(tree.contains_marking(&omega));
        assert_eq!(tree.successors(&finite(vec![1])), Some(vec![&omega]));
        // ω 节点的自后继与既有节点合并，不再加边.
        assert_eq!(tree.successors(&omega), Some(vec![]));
    }

    #[test]
    fn accelerated_node_still_covers_its_ancestor() {
        let net = generator_net();
        let tree = CoverabilityTree::build(&net);

        let root = &tree.graph[tree.root].marking;
        let omega = Marking::new(IndexVec::from(vec![Tokens::Omega]));
        assert!(omega.covers(root));
        assert!(omega.has_omega());
    }

    #[test]
    fn chain_net_enumerates_exactly_three_markings() {
        let net = chain_net();
        let tree = CoverabilityTree::build(&net);

        assert!(!tree.unbounded);
        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.edge_count(), 2);
        assert!(tree.contains_marking(&finite(vec![1, 0, 0])));
        assert!(tree.contains_marking(&finite(vec![0, 1, 0])));
        assert!(tree.contains_marking(&finite(vec![0, 0, 1])));
        assert_eq!(
            tree.successors(&finite(vec![1, 0, 0])),
            Some(vec![&finite(vec![0, 1, 0])])
        );
    }

    #[test]
    fn construction_is_deterministic() {
        let net = chain_net();
        let left = CoverabilityTree::build(&net);
        let right = CoverabilityTree::build(&net);

        let shape = |tree: &CoverabilityTree| {
            let nodes: Vec<Marking> = tree.nodes().map(|node| node.marking.clone()).collect();
            let edges: Vec<(Marking, Marking, TransitionId)> = tree
                .graph
                .edge_references()
                .map(|edge| {
                    (
                        tree.graph[edge.source()].marking.clone(),
                        tree.graph[edge.target()].marking.clone(),
                        edge.weight().transition,
                    )
                })
                .collect();
            (nodes, edges)
        };

        assert_eq!(shape(&left), shape(&right));
    }

    #[test]
    fn node_limit_truncates_tree() {
        let net = chain_net();
        let tree = CoverabilityTree::with_config(
            &net,
            CoverTreeConfig {
                node_limit: Some(1),
            },
        );

        assert!(tree.truncated);
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn bounded_cycle_terminates_without_omega() {
        // p0 <-> p1 循环：可达集有限，无加速发生.
        let mut net = Net::empty();
        let p0 = net.add_place(Place::new("p0", 1));
        let p1 = net.add_place(Place::new("p1", 0));
        let t0 = net.add_transition(Transition::new("t0"));
        let t1 = net.add_transition(Transition::new("t1"));
        net.set_input_weight(p0, t0, 1);
        net.set_output_weight(p1, t0, 1);
        net.set_input_weight(p1, t1, 1);
        net.set_output_weight(p0, t1, 1);

        let tree = CoverabilityTree::build(&net);
        assert!(!tree.unbounded);
        assert_eq!(tree.node_count(), 2);
    }
}
