//! # Petri 网核心定义（Place/Transition Net）
//!
//! 设离散库所集合 `P` 与迁移集合 `T`，基数分别为 `|P|` 与 `|T|`。
//! 定义输入/输出映射 `Pre, Post ∈ ℕ^{|P|×|T|}`。状态为扩展标识
//! `M ∈ (ℕ ∪ {ω})^{|P|}`，其中 ω 表示无界多 token：
//!
//! * 迁移 `t ∈ T` **可激发** 当且仅当 `∀p ∈ P: M[p] = ω ∨ M[p] ≥ Pre[p, t]`；
//! * **发射** 分两趟完成：先对所有输入库所执行消耗，再对所有输出库所
//!   执行产生，故输入输出重叠的库所按发射前的量消耗；ω 分量双向吸收
//!   （`ω - k = ω`，`ω + k = ω`）；
//! * 扩展序 `≤` 逐分量比较，有限值按数值、任意有限值 `≤ ω`；该偏序仅
//!   用于覆盖树构造中的祖先比较，从不对节点做全序排序。
//!
//! 提供的核心 API 支持：
//! * 外部网描述（JSON/RON）的一次性构造校验；
//! * 可激发集计算与单步发射；
//! * Karp-Miller 覆盖树、线性目标优化与精确可达性交叉检查
//!   （见 [`crate::analysis`]）。
//!
//! ## 示例
//!
//! ```rust
//! use pncover::net::*;
//!
//! let mut net = Net::empty();
//! let p0 = net.add_place(Place::new("p0", 1));
//! let p1 = net.add_place(Place::new("p1", 0));
//! let t0 = net.add_transition(Transition::new("t0"));
//!
//! net.set_input_weight(p0, t0, 1);
//! net.set_output_weight(p1, t0, 1);
//!
//! let marking = net.initial_marking();
//! assert_eq!(net.enabled_transitions(&marking), vec![t0]);
//! let next = net.fire_transition(&marking, t0).unwrap();
//! assert_eq!(next.tokens(p0), Tokens::Finite(0));
//! assert_eq!(next.tokens(p1), Tokens::Finite(1));
//! ```

pub mod core;
pub mod ids;
pub mod incidence;
pub mod index_vec;
pub mod io;
pub mod structure;

pub use self::core::{FireError, Net, NetError};
pub use ids::{PlaceId, TransitionId};
pub use incidence::Incidence;
pub use index_vec::{Idx, IndexVec};
pub use io::{IoError, NetSpec, TransitionSpec};
pub use structure::{Marking, Place, Tokens, Transition, Weight};
