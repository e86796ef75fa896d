//! 覆盖分析报告：汇总覆盖树、有界性与优化结果，支持 JSON 落盘.
use std::fmt;
use std::path::Path;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::analysis::coverability::CoverabilityTree;
use crate::analysis::optimizer::{ObjectiveWeights, OptimizeOutcome};
use crate::net::io::{self, IoError};
use crate::net::structure::Marking;
use crate::net::Net;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveReport {
    /// 按库所顺序的权重.
    pub weights: Vec<i64>,
    pub outcome: OutcomeReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeReport {
    /// 正权重库所带 ω 分量，目标无上界.
    Unbounded { places: Vec<String> },
    /// 最优标识（ω 序列化为 null）与目标值.
    Optimal { marking: Marking, value: i64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub places: Vec<String>,
    pub transitions: usize,
    pub tree_nodes: usize,
    pub tree_edges: usize,
    pub unbounded: bool,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective: Option<ObjectiveReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact_states: Option<usize>,
}

impl AnalysisReport {
    pub fn new(net: &Net, tree: &CoverabilityTree) -> Self {
        Self {
            places: net.places.iter().map(|place| place.name.clone()).collect(),
            transitions: net.transitions_len(),
            tree_nodes: tree.node_count(),
            tree_edges: tree.edge_count(),
            unbounded: tree.unbounded,
            truncated: tree.truncated,
            objective: None,
            exact_states: None,
        }
    }

    pub fn with_objective(
        mut self,
        net: &Net,
        weights: &ObjectiveWeights,
        outcome: &OptimizeOutcome,
    ) -> Self {
        let outcome = match outcome {
            OptimizeOutcome::Unbounded { places } => OutcomeReport::Unbounded {
                places: places
                    .iter()
                    .map(|place| net.places[*place].name.clone())
                    .collect(),
            },
            OptimizeOutcome::Best { marking, value } => OutcomeReport::Optimal {
                marking: marking.clone(),
                value: *value,
            },
        };
        self.objective = Some(ObjectiveReport {
            weights: weights.iter().map(|(_, weight)| weight).collect(),
            outcome,
        });
        self
    }

    /// 将报告以 JSON 保存到文件.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), IoError> {
        io::write_json(path, self)
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Karp-Miller 覆盖分析报告 ===")?;
        writeln!(
            f,
            "总计: {} 个库所, {} 个迁移",
            self.places.len(),
            self.transitions
        )?;
        writeln!(
            f,
            "覆盖树: {} 个节点, {} 条边",
            self.tree_nodes, self.tree_edges
        )?;
        if self.unbounded {
            writeln!(f, "有界性: 网是无界的（存在 ω 标识）")?;
        } else {
            writeln!(f, "有界性: 网是有界的")?;
        }
        if self.truncated {
            writeln!(f, "警告: 节点预算耗尽，结果不完整")?;
        }

        if let Some(objective) = &self.objective {
            let assignment = self
                .places
                .iter()
                .zip(objective.weights.iter())
                .map(|(place, weight)| format!("{place}={weight}"))
                .join(", ");
            writeln!(f, "目标权重: {assignment}")?;
            match &objective.outcome {
                OutcomeReport::Unbounded { places } => {
                    writeln!(f, "优化结果: 目标无上界，正权重无界库所: {places:?}")?;
                }
                OutcomeReport::Optimal { marking, value } => {
                    writeln!(f, "优化结果: 最优标识 {marking}，目标值 {value}")?;
                }
            }
        }

        if let Some(exact_states) = self.exact_states {
            writeln!(f, "精确可达标识数: {exact_states}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::optimizer::optimize;
    use crate::net::index_vec::IndexVec;
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

    #[test]
    fn report_serializes_objective_outcome() {
        let net = chain_net();
        let tree = CoverabilityTree::build(&net);
        let weights = ObjectiveWeights::new(IndexVec::from(vec![1, 2, 3]));
        let outcome = optimize(&tree, &weights);

        let report = AnalysisReport::new(&net, &tree).with_objective(&net, &weights, &outcome);
        assert!(!report.unbounded);
        assert_eq!(report.tree_nodes, 3);

        let json = io::to_json_string(&report).unwrap();
        let back: AnalysisReport = io::from_json_str(&json).unwrap();
        assert_eq!(back.places, vec!["p0", "p1", "p2"]);
        match back.objective.unwrap().outcome {
            OutcomeReport::Optimal { value, .. } => assert_eq!(value, 3),
            other => panic!("expected optimal outcome, got {other:?}"),
        }
    }

    #[test]
    fn display_mentions_unbounded_objective() {
        let mut net = Net::empty();
        let p0 = net.add_place(Place::new("p0", 1));
        let t0 = net.add_transition(Transition::new("t0"));
        net.set_input_weight(p0, t0, 1);
        net.set_output_weight(p0, t0, 2);

        let tree = CoverabilityTree::build(&net);
        let weights = ObjectiveWeights::new(IndexVec::from(vec![1]));
        let outcome = optimize(&tree, &weights);
        let report = AnalysisReport::new(&net, &tree).with_objective(&net, &weights, &outcome);

        let text = report.to_string();
        assert!(text.contains("无界"));
        assert!(text.contains("目标无上界"));
    }
}
