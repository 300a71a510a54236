use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 组合子节点的逻辑运算符
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl LogicalOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}

/// 比较运算符
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    #[default]
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
}

impl ComparisonOperator {
    pub const ALL: [ComparisonOperator; 6] = [
        ComparisonOperator::Eq,
        ComparisonOperator::Ne,
        ComparisonOperator::Gt,
        ComparisonOperator::Ge,
        ComparisonOperator::Lt,
        ComparisonOperator::Le,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "==",
            ComparisonOperator::Ne => "!=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Ge => ">=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Le => "<=",
        }
    }

    /// 是否为有序比较（仅对数值有意义）
    pub fn is_ordering(&self) -> bool {
        !matches!(self, ComparisonOperator::Eq | ComparisonOperator::Ne)
    }
}

/// 条件引用的实体类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Sensor,
    Device,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Sensor => "sensor",
            SourceType::Device => "device",
        }
    }
}

/// 叶子节点：对传感器遥测或设备状态的比较
///
/// `key` 必须属于 `uuid` 指向的实体，但这里不做结构校验，
/// 由编辑器根据参考数据填充下拉选项来保证。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub source_type: SourceType,
    pub uuid: String,
    pub key: String,
    pub operator: ComparisonOperator,
    #[serde(default)]
    pub value: Value,
}

impl Condition {
    pub fn new(
        source_type: SourceType,
        uuid: impl Into<String>,
        key: impl Into<String>,
        operator: ComparisonOperator,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            source_type,
            uuid: uuid.into(),
            key: key.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn sensor(
        uuid: impl Into<String>,
        key: impl Into<String>,
        operator: ComparisonOperator,
        value: impl Into<Value>,
    ) -> Self {
        Self::new(SourceType::Sensor, uuid, key, operator, value)
    }

    pub fn device(
        uuid: impl Into<String>,
        key: impl Into<String>,
        operator: ComparisonOperator,
        value: impl Into<Value>,
    ) -> Self {
        Self::new(SourceType::Device, uuid, key, operator, value)
    }

    /// 编辑器新增条件时使用的空白条件
    pub fn blank(source_type: SourceType) -> Self {
        Self::new(source_type, "", "", ComparisonOperator::Eq, "")
    }

    pub fn apply(&mut self, patch: ConditionPatch) {
        if let Some(source_type) = patch.source_type {
            self.source_type = source_type;
        }
        if let Some(uuid) = patch.uuid {
            self.uuid = uuid;
        }
        if let Some(key) = patch.key {
            self.key = key;
        }
        if let Some(operator) = patch.operator {
            self.operator = operator;
        }
        if let Some(value) = patch.value {
            self.value = value;
        }
    }
}

/// `update_condition` 的浅合并补丁
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<SourceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<ComparisonOperator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl ConditionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = Some(source_type);
        self
    }

    pub fn uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn operator(mut self, operator: ComparisonOperator) -> Self {
        self.operator = Some(operator);
        self
    }

    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// 内部节点：按 AND/OR 组合有序子节点
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub operator: LogicalOperator,
    #[serde(default)]
    pub children: Vec<ExpressionNode>,
}

impl Group {
    pub fn new(operator: LogicalOperator) -> Self {
        Self {
            operator,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: impl Into<ExpressionNode>) -> Self {
        self.children.push(child.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExpressionNode {
    Condition(Condition),
    Group(Group),
}

impl From<Condition> for ExpressionNode {
    fn from(condition: Condition) -> Self {
        ExpressionNode::Condition(condition)
    }
}

impl From<Group> for ExpressionNode {
    fn from(group: Group) -> Self {
        ExpressionNode::Group(group)
    }
}

/// 按路径查询得到的借用视图，序列化形状与 `ExpressionNode` 一致
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeRef<'a> {
    Condition(&'a Condition),
    Group(&'a Group),
}

impl<'a> NodeRef<'a> {
    pub fn as_condition(&self) -> Option<&'a Condition> {
        match self {
            NodeRef::Condition(condition) => Some(condition),
            NodeRef::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&'a Group> {
        match self {
            NodeRef::Group(group) => Some(group),
            NodeRef::Condition(_) => None,
        }
    }
}

impl<'a> From<&'a ExpressionNode> for NodeRef<'a> {
    fn from(node: &'a ExpressionNode) -> Self {
        match node {
            ExpressionNode::Condition(condition) => NodeRef::Condition(condition),
            ExpressionNode::Group(group) => NodeRef::Group(group),
        }
    }
}
