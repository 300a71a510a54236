use serde::Serialize;
use serde_json::Value;

use crate::expression::{
    ComparisonOperator, Condition, ExpressionNode, Group, LogicalOperator, SourceType,
};
use crate::reference::{EntityOption, KeyOption, ReferenceCatalog, ValueInput};
use crate::rule::RuleNodeKind;

use super::ActionForm;

/// 编辑器某一时刻的完整快照，视图只根据它渲染
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorView {
    pub kind: RuleNodeKind,
    pub name: String,
    pub editing_node: Option<String>,
    pub open: bool,
    pub revision: u64,
    pub preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<GroupView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupView {
    pub path: Vec<usize>,
    pub operator: LogicalOperator,
    pub children: Vec<NodeView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeView {
    Group(GroupView),
    Condition(ConditionView),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionView {
    pub path: Vec<usize>,
    pub source_type: SourceType,
    pub uuid: String,
    pub key: String,
    pub operator: ComparisonOperator,
    pub value: Value,
    pub entity_options: Vec<EntityOption>,
    pub key_options: Vec<KeyOption>,
    pub value_input: ValueInput,
    /// 已保存的键不在当前选项中（例如传感器详情加载失败）
    pub key_known: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionView {
    pub device_uuid: String,
    pub state_name: String,
    pub value: Value,
    pub device_options: Vec<EntityOption>,
    pub state_options: Vec<KeyOption>,
    pub value_input: ValueInput,
}

pub(crate) fn render_group(group: &Group, path: &mut Vec<usize>, catalog: &ReferenceCatalog) -> GroupView {
    let mut children = Vec::with_capacity(group.children.len());
    for (index, child) in group.children.iter().enumerate() {
        path.push(index);
        children.push(match child {
            ExpressionNode::Group(nested) => NodeView::Group(render_group(nested, path, catalog)),
            ExpressionNode::Condition(condition) => {
                NodeView::Condition(render_condition(condition, path, catalog))
            }
        });
        path.pop();
    }
    GroupView {
        path: path.clone(),
        operator: group.operator,
        children,
    }
}

fn render_condition(condition: &Condition, path: &[usize], catalog: &ReferenceCatalog) -> ConditionView {
    let key_options = if condition.uuid.is_empty() {
        Vec::new()
    } else {
        catalog.keys(condition.source_type, &condition.uuid)
    };
    let selected = key_options.iter().find(|option| option.name == condition.key);
    let value_input = selected
        .map(|option| option.kind.value_input())
        .unwrap_or(ValueInput::Text);
    let key_known = condition.key.is_empty() || selected.is_some();

    ConditionView {
        path: path.to_vec(),
        source_type: condition.source_type,
        uuid: condition.uuid.clone(),
        key: condition.key.clone(),
        operator: condition.operator,
        value: condition.value.clone(),
        entity_options: catalog.entities(condition.source_type),
        key_options,
        value_input,
        key_known,
    }
}

pub(crate) fn render_action(form: &ActionForm, catalog: &ReferenceCatalog) -> ActionView {
    let state_options = if form.device_uuid.is_empty() {
        Vec::new()
    } else {
        catalog.keys(SourceType::Device, &form.device_uuid)
    };
    let value_input = state_options
        .iter()
        .find(|option| option.name == form.state_name)
        .map(|option| option.kind.value_input())
        .unwrap_or(ValueInput::Text);

    ActionView {
        device_uuid: form.device_uuid.clone(),
        state_name: form.state_name.clone(),
        value: form.value.clone(),
        device_options: catalog.entities(SourceType::Device),
        state_options,
        value_input,
    }
}
