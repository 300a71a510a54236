use serde::{Deserialize, Serialize};

use crate::error::{Result, RuleError};
use crate::expression::{filter_config_string, parse_filter_config, Group};

use super::action::{action_config_string, parse_action_config, DeviceCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleNodeKind {
    Filter,
    Action,
}

/// 规则链中已持久化的节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleNode {
    pub id: String,
    pub rule_chain_id: String,
    #[serde(rename = "type")]
    pub kind: RuleNodeKind,
    pub name: String,
    pub config: String,
    #[serde(default)]
    pub next_node_id: Option<String>,
}

/// 创建或更新节点时提交的载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleNodeDraft {
    pub rule_chain_id: String,
    #[serde(rename = "type")]
    pub kind: RuleNodeKind,
    pub name: String,
    pub config: String,
    pub next_node_id: Option<String>,
}

/// 解码后的节点配置
#[derive(Debug, Clone, PartialEq)]
pub enum RuleNodeConfig {
    Filter(Group),
    Action(DeviceCommand),
}

impl RuleNodeConfig {
    pub fn kind(&self) -> RuleNodeKind {
        match self {
            RuleNodeConfig::Filter(_) => RuleNodeKind::Filter,
            RuleNodeConfig::Action(_) => RuleNodeKind::Action,
        }
    }

    pub fn decode(kind: RuleNodeKind, config: &str) -> Result<Self> {
        let decoded = match kind {
            RuleNodeKind::Filter => parse_filter_config(config).map(RuleNodeConfig::Filter),
            RuleNodeKind::Action => parse_action_config(config).map(RuleNodeConfig::Action),
        };
        decoded.map_err(|err| RuleError::MalformedConfig(err.to_string()))
    }

    pub fn encode(&self) -> Result<String> {
        match self {
            RuleNodeConfig::Filter(group) => filter_config_string(group),
            RuleNodeConfig::Action(command) => action_config_string(command),
        }
    }
}

impl RuleNode {
    pub fn decode_config(&self) -> Result<RuleNodeConfig> {
        RuleNodeConfig::decode(self.kind, &self.config)
    }
}
