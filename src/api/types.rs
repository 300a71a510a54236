use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 传感器声明的遥测变量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryVariable {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl TelemetryVariable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: None,
            min: None,
            max: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
    pub uuid: String,
    pub name: String,
    /// 列表接口通常不带变量，需要单独请求详情
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<TelemetryVariable>>,
}

impl Sensor {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            variables: None,
        }
    }

    pub fn with_variables(mut self, variables: Vec<TelemetryVariable>) -> Self {
        self.variables = Some(variables);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub uuid: String,
    pub name: String,
    /// 能力表：数组 = 枚举状态，布尔 = 开关，`xxxRange` = 数值区间
    #[serde(default)]
    pub capabilities: Map<String, Value>,
}

impl Device {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            capabilities: Map::new(),
        }
    }

    pub fn with_capability(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.capabilities.insert(name.into(), value.into());
        self
    }
}
