//! 内部树模型与规则引擎线上格式之间的转换
//!
//! 线上格式用 `expressions` 作为子节点数组，用大写 `UUID` 引用实体，
//! 组的运算符放在 `type` 字段里；条件没有 `type` 字段。
//! 两个方向的转换只在这里做。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

use super::types::{ComparisonOperator, Condition, ExpressionNode, Group, LogicalOperator, SourceType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireExpression {
    Group(WireGroup),
    Condition(WireCondition),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireGroup {
    #[serde(rename = "type")]
    pub operator: LogicalOperator,
    pub expressions: Vec<WireExpression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireCondition {
    #[serde(rename = "sourceType")]
    pub source_type: SourceType,
    #[serde(rename = "UUID")]
    pub uuid: String,
    pub key: String,
    pub operator: ComparisonOperator,
    #[serde(default)]
    pub value: Value,
}

pub fn to_wire_format(group: &Group) -> WireGroup {
    WireGroup {
        operator: group.operator,
        expressions: group.children.iter().map(node_to_wire).collect(),
    }
}

/// 单独的线上条件会被包进默认 AND 组
pub fn from_wire_format(expression: WireExpression) -> Group {
    match expression {
        WireExpression::Group(group) => group_from_wire(group),
        WireExpression::Condition(condition) => {
            Group::default().with_child(condition_from_wire(condition))
        }
    }
}

pub fn parse_filter_config(config: &str) -> Result<Group> {
    let expression: WireExpression = serde_json::from_str(config)?;
    Ok(from_wire_format(expression))
}

pub fn parse_filter_value(config: Value) -> Result<Group> {
    let expression: WireExpression = serde_json::from_value(config)?;
    Ok(from_wire_format(expression))
}

pub fn filter_config_string(group: &Group) -> Result<String> {
    Ok(serde_json::to_string(&to_wire_format(group))?)
}

fn node_to_wire(node: &ExpressionNode) -> WireExpression {
    match node {
        ExpressionNode::Group(group) => WireExpression::Group(to_wire_format(group)),
        ExpressionNode::Condition(condition) => WireExpression::Condition(WireCondition {
            source_type: condition.source_type,
            uuid: condition.uuid.clone(),
            key: condition.key.clone(),
            operator: condition.operator,
            value: condition.value.clone(),
        }),
    }
}

fn group_from_wire(group: WireGroup) -> Group {
    Group {
        operator: group.operator,
        children: group
            .expressions
            .into_iter()
            .map(|expression| match expression {
                WireExpression::Group(nested) => ExpressionNode::Group(group_from_wire(nested)),
                WireExpression::Condition(condition) => condition_from_wire(condition),
            })
            .collect(),
    }
}

fn condition_from_wire(condition: WireCondition) -> ExpressionNode {
    ExpressionNode::Condition(Condition {
        source_type: condition.source_type,
        uuid: condition.uuid,
        key: condition.key,
        operator: condition.operator,
        value: condition.value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_uses_expressions_and_uppercase_uuid() {
        let group = Group::new(LogicalOperator::Or).with_child(Condition::sensor(
            "s1",
            "temp",
            ComparisonOperator::Ge,
            30,
        ));
        let value = serde_json::to_value(to_wire_format(&group)).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "OR",
                "expressions": [
                    { "sourceType": "sensor", "UUID": "s1", "key": "temp", "operator": ">=", "value": 30 }
                ]
            })
        );
    }

    #[test]
    fn test_bare_condition_is_wrapped() {
        let group = parse_filter_config(
            r#"{"sourceType":"device","UUID":"d1","key":"power","operator":"==","value":"on"}"#,
        )
        .unwrap();
        assert_eq!(group.operator, LogicalOperator::And);
        assert_eq!(group.children.len(), 1);
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        let result = parse_filter_config(
            r#"{"type":"XOR","expressions":[]}"#,
        );
        assert!(result.is_err());
    }
}
