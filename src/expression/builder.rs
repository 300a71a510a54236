use crate::error::{Result, RuleError};

use super::types::{
    Condition, ConditionPatch, ExpressionNode, Group, LogicalOperator, NodeRef,
};

/// 以 Group 为根的表达式树
///
/// 节点通过路径（从根开始逐层的子节点下标）定位。路径不是稳定标识：
/// 删除某个兄弟节点后，其后的下标全部前移，调用方必须在每次结构变更后重新计算路径。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressionBuilder {
    root: Group,
}

impl ExpressionBuilder {
    /// 空的 AND 根节点
    pub fn new() -> Self {
        Self::default()
    }

    /// 条件会被包进默认的 AND 组，组直接作为根
    pub fn from_node(node: impl Into<ExpressionNode>) -> Self {
        match node.into() {
            ExpressionNode::Group(root) => Self { root },
            ExpressionNode::Condition(condition) => Self {
                root: Group::default().with_child(condition),
            },
        }
    }

    pub fn from_group(root: Group) -> Self {
        Self { root }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let node: ExpressionNode = serde_json::from_str(json)?;
        Ok(Self::from_node(node))
    }

    pub fn expression(&self) -> &Group {
        &self.root
    }

    pub fn expression_mut(&mut self) -> &mut Group {
        &mut self.root
    }

    pub fn into_expression(self) -> Group {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    pub fn add_condition(&mut self, condition: Condition, group_path: &[usize]) -> Result<()> {
        let group = self
            .group_at_mut(group_path)
            .ok_or_else(|| RuleError::InvalidGroupPath(group_path.to_vec()))?;
        group.children.push(ExpressionNode::Condition(condition));
        Ok(())
    }

    pub fn add_group(&mut self, operator: LogicalOperator, group_path: &[usize]) -> Result<()> {
        let group = self
            .group_at_mut(group_path)
            .ok_or_else(|| RuleError::InvalidGroupPath(group_path.to_vec()))?;
        group.children.push(ExpressionNode::Group(Group::new(operator)));
        Ok(())
    }

    /// 根节点不可删除；路径越界时返回 false 且不做修改
    pub fn remove_node(&mut self, path: &[usize]) -> bool {
        let Some((&index, parent_path)) = path.split_last() else {
            return false;
        };
        match self.group_at_mut(parent_path) {
            Some(parent) if index < parent.children.len() => {
                parent.children.remove(index);
                true
            }
            _ => false,
        }
    }

    pub fn update_condition(&mut self, path: &[usize], patch: ConditionPatch) -> bool {
        match self.condition_at_mut(path) {
            Some(condition) => {
                condition.apply(patch);
                true
            }
            None => false,
        }
    }

    pub fn update_group_operator(&mut self, path: &[usize], operator: LogicalOperator) -> bool {
        match self.group_at_mut(path) {
            Some(group) => {
                group.operator = operator;
                true
            }
            None => false,
        }
    }

    /// 空路径总是返回根组
    pub fn node_by_path(&self, path: &[usize]) -> Option<NodeRef<'_>> {
        let Some((&index, parent_path)) = path.split_last() else {
            return Some(NodeRef::Group(&self.root));
        };
        self.group_at(parent_path)?
            .children
            .get(index)
            .map(NodeRef::from)
    }

    pub fn condition_at(&self, path: &[usize]) -> Option<&Condition> {
        self.node_by_path(path).and_then(|node| node.as_condition())
    }

    pub fn group_at(&self, path: &[usize]) -> Option<&Group> {
        let mut current = &self.root;
        for &index in path {
            match current.children.get(index) {
                Some(ExpressionNode::Group(group)) => current = group,
                _ => return None,
            }
        }
        Some(current)
    }

    fn group_at_mut(&mut self, path: &[usize]) -> Option<&mut Group> {
        let mut current = &mut self.root;
        for &index in path {
            match current.children.get_mut(index) {
                Some(ExpressionNode::Group(group)) => current = group,
                _ => return None,
            }
        }
        Some(current)
    }

    fn condition_at_mut(&mut self, path: &[usize]) -> Option<&mut Condition> {
        let (&index, parent_path) = path.split_last()?;
        match self.group_at_mut(parent_path)?.children.get_mut(index) {
            Some(ExpressionNode::Condition(condition)) => Some(condition),
            _ => None,
        }
    }

    /// 先序列出根以外的所有节点及其当前路径
    ///
    /// 按此顺序逐个追加到一棵新树，得到的路径与原树一致。
    pub fn nodes(&self) -> Vec<(Vec<usize>, NodeRef<'_>)> {
        let mut out = Vec::new();
        collect_nodes(&self.root, &mut Vec::new(), &mut out);
        out
    }

    pub fn conditions(&self) -> Vec<(Vec<usize>, &Condition)> {
        self.nodes()
            .into_iter()
            .filter_map(|(path, node)| node.as_condition().map(|condition| (path, condition)))
            .collect()
    }

    /// 保存前检查：不允许空组，条件必须选定实体和键
    pub fn validate(&self) -> Result<()> {
        validate_group(&self.root, &mut Vec::new())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&NodeRef::Group(&self.root))?)
    }
}

fn collect_nodes<'a>(
    group: &'a Group,
    path: &mut Vec<usize>,
    out: &mut Vec<(Vec<usize>, NodeRef<'a>)>,
) {
    for (index, child) in group.children.iter().enumerate() {
        path.push(index);
        out.push((path.clone(), NodeRef::from(child)));
        if let ExpressionNode::Group(nested) = child {
            collect_nodes(nested, path, out);
        }
        path.pop();
    }
}

fn validate_group(group: &Group, path: &mut Vec<usize>) -> Result<()> {
    if group.children.is_empty() {
        return Err(RuleError::EmptyGroup(path.clone()));
    }
    for (index, child) in group.children.iter().enumerate() {
        path.push(index);
        match child {
            ExpressionNode::Group(nested) => validate_group(nested, path)?,
            ExpressionNode::Condition(condition) => {
                let missing = if condition.uuid.is_empty() {
                    Some("uuid")
                } else if condition.key.is_empty() {
                    Some("key")
                } else {
                    None
                };
                if let Some(field) = missing {
                    return Err(RuleError::IncompleteCondition {
                        path: path.clone(),
                        field,
                    });
                }
            }
        }
        path.pop();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{ComparisonOperator, SourceType};
    use serde_json::json;

    fn temp_above(value: i64) -> Condition {
        Condition::sensor("s1", "temp", ComparisonOperator::Gt, value)
    }

    #[test]
    fn test_new_builder_has_empty_and_root() {
        let builder = ExpressionBuilder::new();
        let value = serde_json::to_value(NodeRef::Group(builder.expression())).unwrap();
        assert_eq!(
            value,
            json!({ "type": "group", "operator": "AND", "children": [] })
        );
    }

    #[test]
    fn test_condition_is_wrapped_in_default_group() {
        let builder = ExpressionBuilder::from_node(temp_above(30));
        let root = builder.expression();
        assert_eq!(root.operator, LogicalOperator::And);
        assert_eq!(root.children.len(), 1);
    }

    #[test]
    fn test_add_condition_to_condition_path_fails() {
        let mut builder = ExpressionBuilder::new();
        builder.add_condition(temp_above(30), &[]).unwrap();
        let err = builder.add_condition(temp_above(40), &[0]).unwrap_err();
        assert!(matches!(err, RuleError::InvalidGroupPath(path) if path == vec![0]));
        let err = builder.add_group(LogicalOperator::Or, &[3]).unwrap_err();
        assert!(matches!(err, RuleError::InvalidGroupPath(_)));
    }

    #[test]
    fn test_node_by_path_stops_at_condition() {
        let mut builder = ExpressionBuilder::new();
        builder.add_condition(temp_above(30), &[]).unwrap();
        assert!(builder.node_by_path(&[0, 0]).is_none());
        assert!(builder.node_by_path(&[1]).is_none());
        assert!(builder.node_by_path(&[]).unwrap().as_group().is_some());
    }

    #[test]
    fn test_update_group_operator_on_root() {
        let mut builder = ExpressionBuilder::new();
        assert!(builder.update_group_operator(&[], LogicalOperator::Or));
        assert_eq!(builder.expression().operator, LogicalOperator::Or);
    }

    #[test]
    fn test_validate_reports_incomplete_condition() {
        let mut builder = ExpressionBuilder::new();
        assert!(matches!(builder.validate(), Err(RuleError::EmptyGroup(_))));

        builder.add_group(LogicalOperator::Or, &[]).unwrap();
        builder
            .add_condition(Condition::blank(SourceType::Device), &[0])
            .unwrap();
        match builder.validate() {
            Err(RuleError::IncompleteCondition { path, field }) => {
                assert_eq!(path, vec![0, 0]);
                assert_eq!(field, "uuid");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_conditions_lists_paths_depth_first() {
        let mut builder = ExpressionBuilder::new();
        builder.add_condition(temp_above(1), &[]).unwrap();
        builder.add_group(LogicalOperator::Or, &[]).unwrap();
        builder.add_condition(temp_above(2), &[1]).unwrap();
        let paths: Vec<Vec<usize>> = builder.conditions().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec![vec![0], vec![1, 0]]);
    }
}
