//! P/T 网静态结构元素：库所、迁移与扩展标识。
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Add;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::net::ids::PlaceId;
use crate::net::index_vec::IndexVec;

pub type Weight = u64;

/// 扩展自然数 token 计数：有限值或 ω（无界多）.
///
/// 序列化为 `Option<Weight>`，`None` 表示 ω.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<Weight>", into = "Option<Weight>")]
pub enum Tokens {
    Finite(Weight),
    Omega,
}

impl Tokens {
    pub fn is_omega(self) -> bool {
        matches!(self, Tokens::Omega)
    }

    pub fn finite(self) -> Option<Weight> {
        match self {
            Tokens::Finite(value) => Some(value),
            Tokens::Omega => None,
        }
    }

    /// 消耗 `weight` 个 token；ω 吸收消耗，有限值不足时返回 `None`.
    pub fn checked_sub(self, weight: Weight) -> Option<Tokens> {
        match self {
            Tokens::Omega => Some(Tokens::Omega),
            Tokens::Finite(value) => value.checked_sub(weight).map(Tokens::Finite),
        }
    }
}

impl Add<Weight> for Tokens {
    type Output = Tokens;

    /// 产生 `weight` 个 token；ω 吸收产生.
    fn add(self, weight: Weight) -> Tokens {
        match self {
            Tokens::Omega => Tokens::Omega,
            Tokens::Finite(value) => Tokens::Finite(value.saturating_add(weight)),
        }
    }
}

impl Ord for Tokens {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Tokens::Omega, Tokens::Omega) => Ordering::Equal,
            (Tokens::Omega, Tokens::Finite(_)) => Ordering::Greater,
            (Tokens::Finite(_), Tokens::Omega) => Ordering::Less,
            (Tokens::Finite(left), Tokens::Finite(right)) => left.cmp(right),
        }
    }
}

impl PartialOrd for Tokens {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<Weight> for Tokens {
    fn from(value: Weight) -> Self {
        Tokens::Finite(value)
    }
}

impl From<Option<Weight>> for Tokens {
    fn from(value: Option<Weight>) -> Self {
        match value {
            Some(value) => Tokens::Finite(value),
            None => Tokens::Omega,
        }
    }
}

impl From<Tokens> for Option<Weight> {
    fn from(value: Tokens) -> Self {
        value.finite()
    }
}

impl fmt::Display for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tokens::Finite(value) => write!(f, "{value}"),
            Tokens::Omega => write!(f, "ω"),
        }
    }
}

impl fmt::Debug for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Debug)]
pub struct Place {
    pub name: String,
    /// 初始 token 数.
    pub tokens: Weight,
}

impl Place {
    pub fn new(name: impl Into<String>, tokens: Weight) -> Self {
        Self {
            name: name.into(),
            tokens,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Transition {
    pub name: String,
}

impl Transition {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transition").field(&self.name).finish()
    }
}

/// 标识：每库所一个扩展 token 计数的不可变向量.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Marking(pub IndexVec<PlaceId, Tokens>);

impl Marking {
    pub fn new(cells: IndexVec<PlaceId, Tokens>) -> Self {
        Self(cells)
    }

    pub fn from_finite(counts: IndexVec<PlaceId, Weight>) -> Self {
        Self(IndexVec::from(
            counts.iter().map(|count| Tokens::Finite(*count)).collect::<Vec<_>>(),
        ))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlaceId, Tokens)> + '_ {
        self.0.iter_enumerated().map(|(place, tokens)| (place, *tokens))
    }

    pub fn tokens(&self, place: PlaceId) -> Tokens {
        self.0[place]
    }

    pub fn tokens_mut(&mut self, place: PlaceId) -> &mut Tokens {
        &mut self.0[place]
    }

    pub fn has_omega(&self) -> bool {
        self.0.iter().any(|tokens| tokens.is_omega())
    }

    pub fn is_finite(&self) -> bool {
        !self.has_omega()
    }

    /// `self` 在扩展序下覆盖 `other`.
    pub fn covers(&self, other: &Marking) -> bool {
        matches!(
            self.partial_cmp(other),
            Some(Ordering::Greater | Ordering::Equal)
        )
    }

    /// Karp-Miller 加速：相对 `ancestor` 在有限比较下严格增长的分量替换为 ω.
    ///
    /// 后置条件：`ancestor ≤ 结果` 且结果逐分量 ≥ `self`.
    pub fn widen_against(&self, ancestor: &Marking) -> Marking {
        debug_assert_eq!(self.len(), ancestor.len());
        let cells = self
            .0
            .iter()
            .zip(ancestor.0.iter())
            .map(|(child, anc)| match (*child, *anc) {
                (Tokens::Finite(c), Tokens::Finite(a)) if c > a => Tokens::Omega,
                _ => *child,
            })
            .collect::<Vec<_>>();
        Marking(IndexVec::from(cells))
    }
}

impl Hash for Marking {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for value in self.0.iter() {
            value.hash(state);
        }
    }
}

impl fmt::Debug for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (place, tokens) in self.iter() {
            map.entry(&place, &tokens);
        }
        map.finish()
    }
}

impl fmt::Display for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({})",
            self.0.iter().map(|tokens| tokens.to_string()).join(", ")
        )
    }
}

/// 扩展序的逐分量偏序：既有分量更小又有分量更大的标识不可比.
impl PartialOrd for Marking {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.len() != other.len() {
            return None;
        }
        let mut less = false;
        let mut greater = false;
        for (idx, left) in self.0.iter_enumerated() {
            let right = other.0[idx];
            match left.cmp(&right) {
                Ordering::Less => less = true,
                Ordering::Greater => greater = true,
                Ordering::Equal => {}
            }
        }
        match (less, greater) {
            (true, true) => None,
            (true, false) => Some(Ordering::Less),
            (false, true) => Some(Ordering::Greater),
            (false, false) => Some(Ordering::Equal),
        }
    }
}
