//! 精确可达图（显式状态枚举）.
//!
//! 与覆盖树不同，可达图不做加速，只枚举精确可达的有限标识；作为消费
//! 同一网模型的独立验证器使用，用于与符号引擎契约一致的交叉检查。
//! 无界网上的枚举不会自行终止，调用方应设置 `state_limit`.

use std::collections::VecDeque;
use std::collections::hash_map::Entry;
use std::fs;
use std::path::Path;

use petgraph::dot::{Config, Dot};
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::analysis::ReachabilityOracle;
use crate::net::Net;
use crate::net::ids::TransitionId;
use crate::net::structure::Marking;

#[derive(Debug, Clone)]
pub struct StateNode {
    pub index: usize,
    pub marking: Marking,
    pub enabled: Vec<TransitionId>,
}

#[derive(Debug, Clone)]
pub struct StateEdge {
    pub transition: TransitionId,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct StateGraphConfig {
    /// 最多探索的状态数量，None 表示不设上限.
    pub state_limit: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct StateGraphStats {
    pub state_count: usize,
    pub edge_count: usize,
    pub deadlock_count: usize,
    pub truncated: bool,
}

#[derive(Debug)]
pub struct StateGraph {
    pub graph: StableGraph<StateNode, StateEdge>,
    pub initial: NodeIndex,
    pub deadlocks: FxHashSet<NodeIndex>,
    pub truncated: bool,
    pub markings: FxHashMap<Marking, NodeIndex>,
}

impl StateGraph {
    pub fn from_net(net: &Net) -> Self {
        Self::with_config(net, StateGraphConfig::default())
    }

    pub fn with_config(net: &Net, config: StateGraphConfig) -> Self {
        let mut graph = StableGraph::new();
        let mut markings: FxHashMap<Marking, NodeIndex> = FxHashMap::default();
        let mut queue = VecDeque::new();
        let mut deadlocks = FxHashSet::default();
        let mut truncated = false;

        let initial_marking = net.initial_marking();
        let initial_index = graph.add_node(StateNode {
            index: 0,
            marking: initial_marking.clone(),
            enabled: Vec::new(),
        });
        markings.insert(initial_marking, initial_index);
        queue.push_back(initial_index);

        while let Some(state_index) = queue.pop_front() {
            let current_marking = graph[state_index].marking.clone();
            let enabled = net.enabled_transitions(&current_marking);
            graph[state_index].enabled = enabled.clone();

            if enabled.is_empty() {
                deadlocks.insert(state_index);
                continue;
            }

            for transition_id in enabled {
                let Ok(next_marking) = net.fire_transition(&current_marking, transition_id) else {
                    continue;
                };

                let target_index = match markings.entry(next_marking.clone()) {
                    Entry::Occupied(entry) => *entry.get(),
                    Entry::Vacant(entry) => {
                        if let Some(limit) = config.state_limit {
                            if graph.node_count() >= limit {
                                truncated = true;
                                continue;
                            }
                        }
                        let index = graph.add_node(StateNode {
                            index: graph.node_count(),
                            marking: next_marking,
                            enabled: Vec::new(),
                        });
                        entry.insert(index);
                        queue.push_back(index);
                        index
                    }
                };

                graph.add_edge(
                    state_index,
                    target_index,
                    StateEdge {
                        transition: transition_id,
                        name: net.transitions[transition_id].name.clone(),
                    },
                );
            }
        }

        Self {
            graph,
            initial: initial_index,
            deadlocks,
            truncated,
            markings,
        }
    }

    pub fn stats(&self) -> StateGraphStats {
        StateGraphStats {
            state_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
            deadlock_count: self.deadlocks.len(),
            truncated: self.truncated,
        }
    }

    pub fn node(&self, index: NodeIndex) -> &StateNode {
        &self.graph[index]
    }

    pub fn contains_marking(&self, marking: &Marking) -> bool {
        self.markings.contains_key(marking)
    }

    pub fn dot(&self) -> String {
        fn escape(s: &str) -> String {
            s.replace('\\', "\\\\").replace('"', "\\\"")
        }

        let mut edge_attr = |_, edge: petgraph::stable_graph::EdgeReference<StateEdge>| -> String {
            format!("label=\"{}\"", escape(&edge.weight().name))
        };

        let mut node_attr = |_, (_idx, node): (NodeIndex, &StateNode)| -> String {
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

impl ReachabilityOracle for StateGraph {
    fn reachable_count(&self) -> usize {
        self.graph.node_count()
    }

    fn is_reachable(&self, marking: &Marking) -> bool {
        marking.is_finite() && self.markings.contains_key(marking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::index_vec::IndexVec;
    use crate::net::structure::Tokens;
    use crate::net::{Place, Transition};

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
    fn chain_net_has_exactly_three_states() {
        let net = chain_net();
        let state_graph = StateGraph::from_net(&net);
        let stats = state_graph.stats();

        assert_eq!(stats.state_count, 3);
        assert_eq!(stats.edge_count, 2);
        assert_eq!(stats.deadlock_count, 1);
        assert!(!stats.truncated);

        assert_eq!(state_graph.reachable_count(), 3);
        assert!(state_graph.is_reachable(&finite(vec![1, 0, 0])));
        assert!(state_graph.is_reachable(&finite(vec![0, 0, 1])));
        assert!(!state_graph.is_reachable(&finite(vec![1, 1, 0])));
    }

    #[test]
    fn omega_markings_are_never_exactly_reachable() {
        let net = chain_net();
        let state_graph = StateGraph::from_net(&net);
        let omega = Marking::new(IndexVec::from(vec![
            Tokens::Omega,
            Tokens::Finite(0),
            Tokens::Finite(0),
        ]));

        assert!(!state_graph.is_reachable(&omega));
    }

    #[test]
    fn state_limit_truncates_graph() {
        let net = chain_net();
        let config = StateGraphConfig {
            state_limit: Some(1),
        };
        let state_graph = StateGraph::with_config(&net, config);

        assert!(state_graph.truncated);
        assert_eq!(state_graph.graph.node_count(), 1);
    }
}
