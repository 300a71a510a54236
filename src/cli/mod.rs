use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::api::Device;
use crate::error::{Result, RuleError};
use crate::expression::{
    parse_filter_value, ExpressionBuilder, ExpressionNode, Group, NodeRef,
};
use crate::reference::{derive_device_keys, KeyKind, KeyOption};

/// 表达式文件的格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionFormat {
    /// `{"type":"group","operator":...,"children":[...]}`
    Tree,
    /// `{"type":"AND","expressions":[...]}`
    Wire,
}

/// 自动识别内部树格式或线上格式
pub fn parse_expression(text: &str) -> Result<(ExpressionFormat, Group)> {
    let value: Value = serde_json::from_str(text)?;
    let is_tree = matches!(
        value.get("type").and_then(Value::as_str),
        Some("group") | Some("condition")
    );
    if is_tree {
        let node: ExpressionNode = serde_json::from_value(value)?;
        Ok((
            ExpressionFormat::Tree,
            ExpressionBuilder::from_node(node).into_expression(),
        ))
    } else {
        let group = parse_filter_value(value)
            .map_err(|err| RuleError::MalformedConfig(err.to_string()))?;
        Ok((ExpressionFormat::Wire, group))
    }
}

pub fn load_expression(path: &Path) -> Result<(ExpressionFormat, Group)> {
    let text = fs::read_to_string(path)
        .map_err(|e| RuleError::Other(anyhow::anyhow!("failed to read `{}`: {}", path.display(), e)))?;
    parse_expression(&text)
}

/// 把表达式渲染成缩进大纲，每行前缀为节点路径
pub fn render_outline(group: &Group) -> String {
    let builder = ExpressionBuilder::from_group(group.clone());
    let mut out = format!("[] {}\n", group.operator.as_str());
    for (path, node) in builder.nodes() {
        let indent = "  ".repeat(path.len());
        let line = match node {
            NodeRef::Group(nested) => nested.operator.as_str().to_string(),
            NodeRef::Condition(condition) => format!(
                "{}:{}.{} {} {}",
                condition.source_type.as_str(),
                condition.uuid,
                condition.key,
                condition.operator.as_str(),
                condition.value
            ),
        };
        let _ = writeln!(out, "{indent}{path:?} {line}");
    }
    out
}

pub fn load_device_keys(path: &Path) -> Result<Vec<KeyOption>> {
    let text = fs::read_to_string(path)
        .map_err(|e| RuleError::Other(anyhow::anyhow!("failed to read `{}`: {}", path.display(), e)))?;
    let device: Device = serde_json::from_str(&text)?;
    Ok(derive_device_keys(&device))
}

pub fn describe_key(option: &KeyOption) -> String {
    match &option.kind {
        KeyKind::Enumerated { values } => {
            let values: Vec<String> = values.iter().map(Value::to_string).collect();
            format!("{} (one of {})", option.name, values.join(", "))
        }
        KeyKind::Flag => format!("{} (flag)", option.name),
        KeyKind::Range { min, max } => format!("{} (range {min}..={max})", option.name),
        KeyKind::Telemetry { unit: Some(unit) } => format!("{} ({unit})", option.name),
        KeyKind::Telemetry { unit: None } => option.name.clone(),
    }
}
