//! 覆盖树上的线性目标优化.
//!
//! 为每个库所指定整数权重，在覆盖树的全部节点上求加权标识的最大值；
//! 正权重库所出现 ω 分量时目标无上界，作为合法的终态结果报告.

use std::ops::RangeInclusive;

use itertools::Itertools;
use log::debug;
use rand::Rng;
use rustc_hash::FxHashMap;

use crate::analysis::coverability::CoverabilityTree;
use crate::net::ids::PlaceId;
use crate::net::index_vec::IndexVec;
use crate::net::structure::Tokens;
use crate::net::{Marking, Net, NetError};

/// 每库所一个整数目标权重.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectiveWeights(IndexVec<PlaceId, i64>);

impl ObjectiveWeights {
    pub fn new(weights: IndexVec<PlaceId, i64>) -> Self {
        Self(weights)
    }

    /// 由名字到权重的映射构造；未列出的库所权重为 0，未知名字拒绝.
    pub fn from_spec(net: &Net, spec: &FxHashMap<String, i64>) -> Result<Self, NetError> {
        for name in spec.keys() {
            if net.place_by_name(name).is_none() {
                return Err(NetError::UnknownWeightPlace(name.clone()));
            }
        }
        let weights = net
            .places
            .iter()
            .map(|place| spec.get(&place.name).copied().unwrap_or(0))
            .collect::<Vec<_>>();
        Ok(Self(IndexVec::from(weights)))
    }

    /// 演示驱动用：每库所在给定范围内随机取权重.
    pub fn random<R: Rng>(net: &Net, rng: &mut R, range: RangeInclusive<i64>) -> Self {
        let weights = net
            .places
            .iter()
            .map(|_| rng.random_range(range.clone()))
            .collect::<Vec<_>>();
        Self(IndexVec::from(weights))
    }

    pub fn weight(&self, place: PlaceId) -> i64 {
        self.0[place]
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlaceId, i64)> + '_ {
        self.0.iter_enumerated().map(|(place, weight)| (place, *weight))
    }
}

/// 优化结果：最优标识或目标无上界.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptimizeOutcome {
    Best { marking: Marking, value: i64 },
    /// 正权重库所带 ω 分量；`places` 为全部此类库所（排序去重）.
    Unbounded { places: Vec<PlaceId> },
}

/// 在覆盖树的全部节点上求线性目标的最大值.
///
/// ω 分量对求和贡献 0：经无上界检查后，ω 只会落在非正权重的库所上，
/// 其真实贡献不影响最大值。节点按插入顺序访问，并列时保留首个最大值.
pub fn optimize(tree: &CoverabilityTree, weights: &ObjectiveWeights) -> OptimizeOutcome {
    let mut witnesses = Vec::new();
    for node in tree.nodes() {
        for (place, tokens) in node.marking.iter() {
            if tokens.is_omega() && weights.weight(place) > 0 {
                witnesses.push(place);
            }
        }
    }
    if !witnesses.is_empty() {
        let places = witnesses.into_iter().sorted().dedup().collect();
        return OptimizeOutcome::Unbounded { places };
    }

    let mut best: Option<(Marking, i64)> = None;
    for node in tree.nodes() {
        let value = node
            .marking
            .iter()
            .map(|(place, tokens)| match tokens {
                Tokens::Finite(count) => count as i64 * weights.weight(place),
                Tokens::Omega => 0,
            })
            .sum::<i64>();
        debug!("marking {} -> value {}", node.marking, value);

        match &best {
            Some((_, best_value)) if *best_value >= value => {}
            _ => best = Some((node.marking.clone(), value)),
        }
    }

    let (marking, value) = best.expect("coverability tree always contains the root");
    OptimizeOutcome::Best { marking, value }
}
