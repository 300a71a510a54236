use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::api::{Device, TelemetryVariable};

/// 设备能力名的区间后缀，例如 `brightnessRange: {"min": 0, "max": 100}`
pub const RANGE_SUFFIX: &str = "Range";

/// 条件键的类别，决定值输入控件的形式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeyKind {
    /// 设备状态，只能取声明的枚举值
    Enumerated { values: Vec<Value> },
    /// 设备开关
    Flag,
    /// 声明了上下限的数值
    Range { min: f64, max: f64 },
    /// 传感器遥测，自由输入
    Telemetry {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyOption {
    pub name: String,
    #[serde(flatten)]
    pub kind: KeyKind,
}

/// 值输入控件
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "input", rename_all = "snake_case")]
pub enum ValueInput {
    Choice { options: Vec<Value> },
    Number { min: Option<f64>, max: Option<f64> },
    Text,
}

impl KeyKind {
    pub fn value_input(&self) -> ValueInput {
        match self {
            KeyKind::Enumerated { values } => ValueInput::Choice {
                options: values.clone(),
            },
            KeyKind::Flag => ValueInput::Choice {
                options: vec![Value::Bool(true), Value::Bool(false)],
            },
            KeyKind::Range { min, max } => ValueInput::Number {
                min: Some(*min),
                max: Some(*max),
            },
            KeyKind::Telemetry { .. } => ValueInput::Text,
        }
    }

    /// 把表单输入的字符串转换成键期望的 JSON 类型，无法转换时原样返回
    pub fn normalize(&self, value: Value) -> Value {
        let text = match value.as_str() {
            Some(text) => text.trim().to_string(),
            None => return value,
        };
        let trimmed = text.as_str();
        match self {
            KeyKind::Flag => trimmed.parse::<bool>().map(Value::Bool).unwrap_or(value),
            KeyKind::Range { .. } | KeyKind::Telemetry { .. } => parse_number(trimmed)
                .map(Value::Number)
                .unwrap_or(value),
            KeyKind::Enumerated { values } => values
                .iter()
                .find(|candidate| match candidate {
                    Value::String(option) => option == trimmed,
                    other => other.to_string() == trimmed,
                })
                .cloned()
                .unwrap_or(value),
        }
    }
}

fn parse_number(text: &str) -> Option<Number> {
    if let Ok(integer) = text.parse::<i64>() {
        return Some(Number::from(integer));
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

/// 从设备能力表推导可用的条件键
///
/// 同名键只保留一个，范围键优先。
pub fn derive_device_keys(device: &Device) -> Vec<KeyOption> {
    let mut keys: Vec<KeyOption> = Vec::new();
    for (name, capability) in &device.capabilities {
        let Some(option) = capability_key(name, capability) else {
            tracing::debug!(
                device = %device.uuid,
                capability = %name,
                "跳过无法识别的设备能力"
            );
            continue;
        };
        match keys.iter_mut().find(|existing| existing.name == option.name) {
            None => keys.push(option),
            Some(existing) => {
                tracing::debug!(
                    device = %device.uuid,
                    capability = %name,
                    key = %option.name,
                    "设备能力推导出重复的键"
                );
                if matches!(option.kind, KeyKind::Range { .. }) {
                    *existing = option;
                }
            }
        }
    }
    keys
}

fn capability_key(name: &str, capability: &Value) -> Option<KeyOption> {
    if let Some(base) = name.strip_suffix(RANGE_SUFFIX) {
        if base.is_empty() {
            return None;
        }
        let (min, max) = range_bounds(capability)?;
        return Some(KeyOption {
            name: base.to_string(),
            kind: KeyKind::Range { min, max },
        });
    }

    let kind = match capability {
        Value::Array(values) => KeyKind::Enumerated {
            values: values.clone(),
        },
        Value::Bool(_) => KeyKind::Flag,
        _ => return None,
    };
    Some(KeyOption {
        name: name.to_string(),
        kind,
    })
}

fn range_bounds(capability: &Value) -> Option<(f64, f64)> {
    let (min, max) = match capability {
        Value::Object(bounds) => (bounds.get("min")?.as_f64()?, bounds.get("max")?.as_f64()?),
        Value::Array(bounds) if bounds.len() == 2 => (bounds[0].as_f64()?, bounds[1].as_f64()?),
        _ => return None,
    };
    (min <= max).then_some((min, max))
}

pub fn derive_sensor_keys(variables: &[TelemetryVariable]) -> Vec<KeyOption> {
    variables
        .iter()
        .map(|variable| {
            let kind = match (variable.min, variable.max) {
                (Some(min), Some(max)) if min <= max => KeyKind::Range { min, max },
                _ => KeyKind::Telemetry {
                    unit: variable.unit.clone(),
                },
            };
            KeyOption {
                name: variable.name.clone(),
                kind,
            }
        })
        .collect()
}
