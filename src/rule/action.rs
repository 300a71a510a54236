use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, RuleError};

pub const INITIATED_BY_DEVICE: &str = "device";

/// 设备指令动作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCommand {
    pub device_uuid: String,
    pub state_name: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default = "default_initiated_by")]
    pub initiated_by: String,
}

fn default_initiated_by() -> String {
    INITIATED_BY_DEVICE.to_string()
}

impl DeviceCommand {
    pub fn new(
        device_uuid: impl Into<String>,
        state_name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            device_uuid: device_uuid.into(),
            state_name: state_name.into(),
            value: value.into(),
            initiated_by: default_initiated_by(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.device_uuid.is_empty() {
            return Err(RuleError::IncompleteAction("deviceUuid"));
        }
        if self.state_name.is_empty() {
            return Err(RuleError::IncompleteAction("stateName"));
        }
        if self.value.is_null() || self.value == Value::String(String::new()) {
            return Err(RuleError::IncompleteAction("value"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CommandConfig {
    #[serde(rename = "DEVICE_COMMAND")]
    DeviceCommand { command: DeviceCommand },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ActionEnvelope {
    Action { config: CommandConfig },
}

/// 存量配置可能是完整信封，也可能只有内层指令
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredAction {
    Envelope(ActionEnvelope),
    Command(CommandConfig),
}

/// 序列化为 `{"type":"action","config":{"type":"DEVICE_COMMAND","command":{...}}}`
pub fn action_config_string(command: &DeviceCommand) -> Result<String> {
    Ok(serde_json::to_string(&action_config_value(command)?)?)
}

pub fn action_config_value(command: &DeviceCommand) -> Result<Value> {
    let envelope = ActionEnvelope::Action {
        config: CommandConfig::DeviceCommand {
            command: command.clone(),
        },
    };
    Ok(serde_json::to_value(&envelope)?)
}

pub fn parse_action_config(config: &str) -> Result<DeviceCommand> {
    let stored: StoredAction = serde_json::from_str(config)?;
    let CommandConfig::DeviceCommand { command } = match stored {
        StoredAction::Envelope(ActionEnvelope::Action { config }) => config,
        StoredAction::Command(config) => config,
    };
    Ok(command)
}
