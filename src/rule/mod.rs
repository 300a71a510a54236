/// 规则链节点与动作描述
pub mod action;
pub mod node;

pub use action::{action_config_string, action_config_value, parse_action_config, CommandConfig, DeviceCommand};
pub use node::{RuleNode, RuleNodeConfig, RuleNodeDraft, RuleNodeKind};
