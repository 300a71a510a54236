use std::collections::HashMap;

use serde_json::Value;

use super::types::{ComparisonOperator, Condition, ExpressionNode, Group, LogicalOperator, SourceType};

/// 提供当前读数的数据源
pub trait TelemetrySource {
    fn reading(&self, source_type: SourceType, uuid: &str, key: &str) -> Option<Value>;
}

/// 内存中的读数快照
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    readings: HashMap<(SourceType, String, String), Value>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        source_type: SourceType,
        uuid: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.readings
            .insert((source_type, uuid.into(), key.into()), value.into());
        self
    }
}

impl TelemetrySource for Snapshot {
    fn reading(&self, source_type: SourceType, uuid: &str, key: &str) -> Option<Value> {
        self.readings
            .get(&(source_type, uuid.to_string(), key.to_string()))
            .cloned()
    }
}

/// 递归求值表达式树
///
/// 空组求值为 false：没有子节点的过滤器不应放行任何消息。
/// 缺失读数的条件求值为 false。
pub fn evaluate<S: TelemetrySource + ?Sized>(group: &Group, source: &S) -> bool {
    if group.children.is_empty() {
        return false;
    }
    let mut results = group.children.iter().map(|child| match child {
        ExpressionNode::Condition(condition) => evaluate_condition(condition, source),
        ExpressionNode::Group(nested) => evaluate(nested, source),
    });
    match group.operator {
        LogicalOperator::And => results.all(|matched| matched),
        LogicalOperator::Or => results.any(|matched| matched),
    }
}

pub fn evaluate_condition<S: TelemetrySource + ?Sized>(condition: &Condition, source: &S) -> bool {
    match source.reading(condition.source_type, &condition.uuid, &condition.key) {
        Some(actual) => compare(condition.operator, &actual, &condition.value),
        None => false,
    }
}

/// 比较规则：
/// - 两边都能解释为数值时按数值比较（表单输入的数字字符串也算）
/// - 期望值为数组时，`==` 表示读数在数组中，`!=` 表示不在
/// - 其余情况只支持相等比较
pub fn compare(operator: ComparisonOperator, actual: &Value, expected: &Value) -> bool {
    if let Value::Array(options) = expected {
        if operator.is_ordering() {
            return false;
        }
        let contained = options.iter().any(|option| loosely_equal(actual, option));
        return (operator == ComparisonOperator::Eq) == contained;
    }

    if let (Some(lhs), Some(rhs)) = (as_number(actual), as_number(expected)) {
        return match operator {
            ComparisonOperator::Eq => lhs == rhs,
            ComparisonOperator::Ne => lhs != rhs,
            ComparisonOperator::Gt => lhs > rhs,
            ComparisonOperator::Ge => lhs >= rhs,
            ComparisonOperator::Lt => lhs < rhs,
            ComparisonOperator::Le => lhs <= rhs,
        };
    }

    if operator.is_ordering() {
        return false;
    }
    (operator == ComparisonOperator::Eq) == loosely_equal(actual, expected)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn loosely_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Bool(flag), Value::String(text)) | (Value::String(text), Value::Bool(flag)) => {
            text.parse::<bool>().map(|parsed| parsed == *flag).unwrap_or(false)
        }
        _ => match (as_number(lhs), as_number(rhs)) {
            (Some(a), Some(b)) => a == b,
            _ => lhs == rhs,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_string_compares_as_number() {
        assert!(compare(ComparisonOperator::Gt, &json!(31.5), &json!("30")));
        assert!(!compare(ComparisonOperator::Lt, &json!(31.5), &json!(30)));
    }

    #[test]
    fn test_array_expected_means_membership() {
        let expected = json!(["on", "standby"]);
        assert!(compare(ComparisonOperator::Eq, &json!("on"), &expected));
        assert!(compare(ComparisonOperator::Ne, &json!("off"), &expected));
        assert!(!compare(ComparisonOperator::Gt, &json!("on"), &expected));
    }

    #[test]
    fn test_flag_matches_string_form() {
        assert!(compare(ComparisonOperator::Eq, &json!(true), &json!("true")));
        assert!(!compare(ComparisonOperator::Ge, &json!(true), &json!(true)));
    }

    #[test]
    fn test_group_semantics() {
        let mut snapshot = Snapshot::new();
        snapshot
            .insert(SourceType::Sensor, "s1", "temp", 35)
            .insert(SourceType::Device, "d1", "power", "off");

        let hot = Condition::sensor("s1", "temp", ComparisonOperator::Gt, 30);
        let powered = Condition::device("d1", "power", ComparisonOperator::Eq, "on");

        let all = Group::new(LogicalOperator::And)
            .with_child(hot.clone())
            .with_child(powered.clone());
        let any = Group::new(LogicalOperator::Or).with_child(hot).with_child(powered);

        assert!(!evaluate(&all, &snapshot));
        assert!(evaluate(&any, &snapshot));
        assert!(!evaluate(&Group::new(LogicalOperator::And), &snapshot));
    }

    #[test]
    fn test_missing_reading_is_false() {
        let snapshot = Snapshot::new();
        let condition = Condition::sensor("s9", "humidity", ComparisonOperator::Ne, 0);
        assert!(!evaluate_condition(&condition, &snapshot));
    }
}
