//! 分析资源预算与随机权重范围配置（TOML）.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoverConfig {
    /// 覆盖树节点预算.
    #[serde(default = "default_node_limit")]
    pub node_limit: Option<usize>,
    /// 精确可达图状态预算.
    #[serde(default = "default_state_limit")]
    pub state_limit: Option<usize>,
    /// 随机目标权重的下界.
    #[serde(default = "default_weight_min")]
    pub weight_min: i64,
    /// 随机目标权重的上界.
    #[serde(default = "default_weight_max")]
    pub weight_max: i64,
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            node_limit: default_node_limit(),
            state_limit: default_state_limit(),
            weight_min: default_weight_min(),
            weight_max: default_weight_max(),
        }
    }
}

impl CoverConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: CoverConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }
}

fn default_node_limit() -> Option<usize> {
    Some(100_000)
}

fn default_state_limit() -> Option<usize> {
    Some(100_000)
}

fn default_weight_min() -> i64 {
    1
}

fn default_weight_max() -> i64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: CoverConfig = toml::from_str("").unwrap();
        assert_eq!(config.node_limit, Some(100_000));
        assert_eq!(config.weight_min, 1);
        assert_eq!(config.weight_max, 10);
    }

    #[test]
    fn partial_document_keeps_remaining_defaults() {
        let config: CoverConfig = toml::from_str("weight_max = 5").unwrap();
        assert_eq!(config.weight_max, 5);
        assert_eq!(config.weight_min, 1);
        assert_eq!(config.state_limit, Some(100_000));
    }
}
