//! 运行时: 可激发判定、发射语义与网构造校验.
use std::fmt::{self, Write as FmtWrite};
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use thiserror::Error;

use crate::net::ids::{PlaceId, TransitionId};
use crate::net::incidence::Incidence;
use crate::net::index_vec::{Idx, IndexVec};
use crate::net::io::NetSpec;
use crate::net::structure::{Marking, Place, Tokens, Transition, Weight};

#[derive(Debug, Error)]
pub enum FireError {
    #[error("transition {0:?} is out of bounds")]
    OutOfBounds(TransitionId),
    #[error("transition {0:?} is not enabled under the supplied marking")]
    NotEnabled(TransitionId),
}

/// 网构造期校验失败；一经通过，遍历阶段不再出现结构错误.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("duplicate place {0:?} in place list")]
    DuplicatePlace(String),
    #[error("transition {transition:?} references unknown place {place:?}")]
    UnknownPlace { transition: String, place: String },
    #[error("initial marking references unknown place {0:?}")]
    UnknownInitialPlace(String),
    #[error("objective weights reference unknown place {0:?}")]
    UnknownWeightPlace(String),
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct Net {
    pub places: IndexVec<PlaceId, Place>,
    pub transitions: IndexVec<TransitionId, Transition>,
    pub pre: Incidence<Weight>,
    pub post: Incidence<Weight>,
}

impl fmt::Debug for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Net")
            .field("places", &self.places)
            .field("transitions", &self.transitions)
            .field("pre", &self.pre)
            .field("post", &self.post)
            .finish()
    }
}

impl Net {
    pub fn empty() -> Self {
        Self {
            places: IndexVec::new(),
            transitions: IndexVec::new(),
            pre: Incidence::new(0, 0, 0u64),
            post: Incidence::new(0, 0, 0u64),
        }
    }

    /// 从外部网描述构造并一次性校验（参见 [`NetError`]）.
    ///
    /// 输入/输出列表中的重复出现累加为弧权重；初始标识列出的库所各持
    /// 恰好一个 token.
    pub fn from_spec(spec: &NetSpec) -> Result<Self, NetError> {
        let mut net = Net::empty();
        let mut index: IndexMap<String, PlaceId> = IndexMap::new();

        for name in &spec.places {
            if index.contains_key(name) {
                return Err(NetError::DuplicatePlace(name.clone()));
            }
            let place = net.add_place(Place::new(name.clone(), 0));
            index.insert(name.clone(), place);
        }

        for transition_spec in &spec.transitions {
            let transition = net.add_transition(Transition::new(transition_spec.name.clone()));
            for input in &transition_spec.inputs {
                let place = *index.get(input).ok_or_else(|| NetError::UnknownPlace {
                    transition: transition_spec.name.clone(),
                    place: input.clone(),
                })?;
                net.add_input_arc(place, transition, 1);
            }
            for output in &transition_spec.outputs {
                let place = *index.get(output).ok_or_else(|| NetError::UnknownPlace {
                    transition: transition_spec.name.clone(),
                    place: output.clone(),
                })?;
                net.add_output_arc(place, transition, 1);
            }
        }

        for name in &spec.initial_marking {
            let place = *index
                .get(name)
                .ok_or_else(|| NetError::UnknownInitialPlace(name.clone()))?;
            net.places[place].tokens = 1;
        }

        Ok(net)
    }

    pub fn add_place(&mut self, place: Place) -> PlaceId {
        let place_id = self.places.push(place);
        self.pre.push_place_with_default(0);
        self.post.push_place_with_default(0);
        place_id
    }

    pub fn add_transition(&mut self, transition: Transition) -> TransitionId {
        let transition_id = self.transitions.push(transition);
        self.pre.push_transition_with_default(0);
        self.post.push_transition_with_default(0);
        transition_id
    }

    pub fn set_input_weight(&mut self, place: PlaceId, transition: TransitionId, weight: Weight) {
        self.pre.set(place, transition, weight);
    }

    pub fn set_output_weight(&mut self, place: PlaceId, transition: TransitionId, weight: Weight) {
        self.post.set(place, transition, weight);
    }

    /// 输入弧: place -> transition，权重累加.
    pub fn add_input_arc(&mut self, place: PlaceId, transition: TransitionId, weight: Weight) {
        if weight == 0 {
            return;
        }
        let entry = self.pre.get_mut(place, transition);
        *entry += weight;
    }

    /// 输出弧: transition -> place，权重累加.
    pub fn add_output_arc(&mut self, place: PlaceId, transition: TransitionId, weight: Weight) {
        if weight == 0 {
            return;
        }
        let entry = self.post.get_mut(place, transition);
        *entry += weight;
    }

    pub fn get_place(&self, place: PlaceId) -> Option<&Place> {
        self.places.get(place)
    }

    pub fn get_transition(&self, transition: TransitionId) -> Option<&Transition> {
        self.transitions.get(transition)
    }

    pub fn place_by_name(&self, name: &str) -> Option<PlaceId> {
        self.places
            .iter_enumerated()
            .find(|(_, place)| place.name == name)
            .map(|(place_id, _)| place_id)
    }

    pub fn places_len(&self) -> usize {
        self.places.len()
    }

    pub fn transitions_len(&self) -> usize {
        self.transitions.len()
    }

    pub fn initial_marking(&self) -> Marking {
        Marking::from_finite(IndexVec::from(
            self.places.iter().map(|p| p.tokens).collect::<Vec<_>>(),
        ))
    }

    pub fn enabled_transitions(&self, marking: &Marking) -> Vec<TransitionId> {
        self.transitions
            .indices()
            .filter(|&transition| self.is_transition_enabled(transition, marking))
            .collect()
    }

    /// 单步发射：先完整执行消耗，再执行产生；ω 分量双向吸收.
    ///
    /// 纯函数，调用方标识不被修改；未激发迁移以 [`FireError::NotEnabled`]
    /// 报告且无部分副作用.
    pub fn fire_transition(
        &self,
        marking: &Marking,
        transition: TransitionId,
    ) -> Result<Marking, FireError> {
        if transition.index() >= self.transitions_len() {
            return Err(FireError::OutOfBounds(transition));
        }
        if !self.is_transition_enabled(transition, marking) {
            return Err(FireError::NotEnabled(transition));
        }

        let mut next = marking.clone();

        for place in self.places.indices() {
            let weight = *self.pre.get(place, transition);
            if weight > 0 {
                let tokens = next.tokens_mut(place);
                *tokens = tokens
                    .checked_sub(weight)
                    .expect("enabled transition must have sufficient tokens");
            }
        }

        for place in self.places.indices() {
            let weight = *self.post.get(place, transition);
            if weight > 0 {
                let tokens = next.tokens_mut(place);
                *tokens = *tokens + weight;
            }
        }

        Ok(next)
    }

    fn is_transition_enabled(&self, transition: TransitionId, marking: &Marking) -> bool {
        if transition.index() >= self.transitions_len() {
            return false;
        }
        for (place, row) in self.pre.rows().iter_enumerated() {
            let weight = row[transition.index()];
            if marking.tokens(place) < Tokens::Finite(weight) {
                return false;
            }
        }
        true
    }

    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        let _ = writeln!(&mut dot, "digraph PetriNet {{");
        let _ = writeln!(&mut dot, "    rankdir=LR;");
        let _ = writeln!(&mut dot, "    node [fontname=\"Helvetica\"];");

        for (place_id, place) in self.places.iter_enumerated() {
            let node_id = format!("place_{}", place_id.index());
            let label = format!("{}\\n{}", escape_label(&place.name), place.tokens);
            let _ = writeln!(
                &mut dot,
                "    {} [label=\"{}\", shape=circle, style=filled, fillcolor=\"#e3f2fd\"];",
                node_id, label
            );
        }

        for (transition_id, transition) in self.transitions.iter_enumerated() {
            let node_id = format!("trans_{}", transition_id.index());
            let _ = writeln!(
                &mut dot,
                "    {} [label=\"{}\", shape=box, style=filled, fillcolor=\"#ffe0b2\"];",
                node_id,
                escape_label(&transition.name)
            );
        }

        for (place_id, row) in self.pre.rows().iter_enumerated() {
            let place_node = format!("place_{}", place_id.index());
            for (idx, weight) in row.iter().enumerate() {
                if *weight == 0 {
                    continue;
                }
                let transition_node = format!("trans_{}", idx);
                if *weight == 1 {
                    let _ = writeln!(&mut dot, "    {} -> {};", place_node, transition_node);
                } else {
                    let _ = writeln!(
                        &mut dot,
                        "    {} -> {} [label=\"{}\"];",
                        place_node, transition_node, weight
                    );
                }
            }
        }

        for (place_id, row) in self.post.rows().iter_enumerated() {
            let place_node = format!("place_{}", place_id.index());
            for (idx, weight) in row.iter().enumerate() {
                if *weight == 0 {
                    continue;
                }
                let transition_node = format!("trans_{}", idx);
                if *weight == 1 {
                    let _ = writeln!(&mut dot, "    {} -> {};", transition_node, place_node);
                } else {
                    let _ = writeln!(
                        &mut dot,
                        "    {} -> {} [label=\"{}\"];",
                        transition_node, place_node, weight
                    );
                }
            }
        }

        let _ = writeln!(&mut dot, "}}");
        dot
    }

    pub fn write_dot<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_dot())
    }

    /// 结构诊断：报告无任何连接弧的孤立库所与迁移.
    pub fn log_diagnostics(&self) {
        for (place_id, place) in self.places.iter_enumerated() {
            let connected = self.transitions.indices().any(|transition| {
                *self.pre.get(place_id, transition) > 0
                    || *self.post.get(place_id, transition) > 0
            });
            if !connected {
                log::warn!(
                    "库所 '{}' (id={}) 无任何连接弧",
                    place.name,
                    place_id.index()
                );
            }
        }
        for (transition_id, transition) in self.transitions.iter_enumerated() {
            let connected = self.places.indices().any(|place| {
                *self.pre.get(place, transition_id) > 0
                    || *self.post.get(place, transition_id) > 0
            });
            if !connected {
                log::warn!(
                    "迁移 '{}' (id={}) 无任何连接弧",
                    transition.name,
                    transition_id.index()
                );
            }
        }
    }
}

impl Default for Net {
    fn default() -> Self {
        Self::empty()
    }
}

fn escape_label(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::io::TransitionSpec;

    fn chain_spec() -> NetSpec {
        NetSpec {
            places: vec!["p0".into(), "p1".into(), "p2".into()],
            transitions: vec![
                TransitionSpec {
                    name: "t0".into(),
                    inputs: vec!["p0".into()],
                    outputs: vec!["p1".into()],
                },
                TransitionSpec {
                    name: "t1".into(),
                    inputs: vec!["p1".into()],
                    outputs: vec!["p2".into()],
                },
            ],
            initial_marking: vec!["p0".into()],
        }
    }

    #[test]
    fn add_place_and_transition_updates_incidence() {
        let mut net = Net::empty();
        let p = net.add_place(Place::new("p", 1));
        let t = net.add_transition(Transition::new("t"));

        net.set_input_weight(p, t, 1);
        net.set_output_weight(p, t, 1);

        assert_eq!(net.places_len(), 1);
        assert_eq!(net.transitions_len(), 1);
        assert_eq!(*net.pre.get(p, t), 1);
        assert_eq!(*net.post.get(p, t), 1);
    }

    #[test]
    fn from_spec_accumulates_repeated_outputs() {
        let spec = NetSpec {
            places: vec!["p0".into()],
            transitions: vec![TransitionSpec {
                name: "t0".into(),
                inputs: vec!["p0".into()],
                outputs: vec!["p0".into(), "p0".into()],
            }],
            initial_marking: vec!["p0".into()],
        };
        let net = Net::from_spec(&spec).unwrap();

        let p0 = net.place_by_name("p0").unwrap();
        let t0 = TransitionId::new(0);
        assert_eq!(*net.pre.get(p0, t0), 1);
        assert_eq!(*net.post.get(p0, t0), 2);
        assert_eq!(net.initial_marking().tokens(p0), Tokens::Finite(1));
    }

    #[test]
    fn from_spec_rejects_malformed_nets() {
        let mut spec = chain_spec();
        spec.transitions[0].inputs.push("nowhere".into());
        assert!(matches!(
            Net::from_spec(&spec),
            Err(NetError::UnknownPlace { .. })
        ));

        let mut spec = chain_spec();
        spec.initial_marking = vec!["nowhere".into()];
        assert!(matches!(
            Net::from_spec(&spec),
            Err(NetError::UnknownInitialPlace(_))
        ));

        let mut spec = chain_spec();
        spec.places.push("p0".into());
        assert!(matches!(
            Net::from_spec(&spec),
            Err(NetError::DuplicatePlace(_))
        ));
    }

    #[test]
    fn firing_with_empty_input_place_is_not_enabled() {
        let net = Net::from_spec(&chain_spec()).unwrap();
        let marking = net.initial_marking();
        let t1 = TransitionId::new(1);

        assert!(matches!(
            net.fire_transition(&marking, t1),
            Err(FireError::NotEnabled(_))
        ));
    }

    #[test]
    fn firing_consumes_before_producing() {
        // p0 -t0-> p0, p0：消耗先于产生，自环库所按发射前的量消耗.
        let spec = NetSpec {
            places: vec!["p0".into()],
            transitions: vec![TransitionSpec {
                name: "t0".into(),
                inputs: vec!["p0".into()],
                outputs: vec!["p0".into(), "p0".into()],
            }],
            initial_marking: vec!["p0".into()],
        };
        let net = Net::from_spec(&spec).unwrap();
        let p0 = net.place_by_name("p0").unwrap();

        let next = net
            .fire_transition(&net.initial_marking(), TransitionId::new(0))
            .unwrap();
        assert_eq!(next.tokens(p0), Tokens::Finite(2));
    }

    #[test]
    fn firing_leaves_omega_components_at_omega() {
        let net = Net::from_spec(&chain_spec()).unwrap();
        let p0 = net.place_by_name("p0").unwrap();
        let p1 = net.place_by_name("p1").unwrap();

        let mut marking = net.initial_marking();
        *marking.tokens_mut(p0) = Tokens::Omega;

        let next = net.fire_transition(&marking, TransitionId::new(0)).unwrap();
        assert_eq!(next.tokens(p0), Tokens::Omega);
        assert_eq!(next.tokens(p1), Tokens::Finite(1));
    }

    #[test]
    fn out_of_bounds_transition_is_rejected() {
        let net = Net::from_spec(&chain_spec()).unwrap();
        assert!(matches!(
            net.fire_transition(&net.initial_marking(), TransitionId::new(9)),
            Err(FireError::OutOfBounds(_))
        ));
    }
}
