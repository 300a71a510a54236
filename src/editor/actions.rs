use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::expression::{ComparisonOperator, LogicalOperator, SourceType};

/// 编辑器接受的用户操作
///
/// 视图根据快照渲染，交互产生一个按路径寻址的操作，
/// 编辑器更新树后重新生成预览，视图再次渲染。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EditorAction {
    SetName {
        name: String,
    },
    AddCondition {
        #[serde(default)]
        group_path: Vec<usize>,
        #[serde(default)]
        source_type: SourceType,
    },
    AddGroup {
        #[serde(default)]
        group_path: Vec<usize>,
        operator: LogicalOperator,
    },
    RemoveNode {
        path: Vec<usize>,
    },
    SetGroupOperator {
        #[serde(default)]
        path: Vec<usize>,
        operator: LogicalOperator,
    },
    /// 清空实体、键和值
    SelectSourceType {
        path: Vec<usize>,
        source_type: SourceType,
    },
    /// 清空键和值；传感器会等待遥测键加载完成
    SelectEntity {
        path: Vec<usize>,
        uuid: String,
    },
    /// 清空值
    SelectKey {
        path: Vec<usize>,
        key: String,
    },
    SetOperator {
        path: Vec<usize>,
        operator: ComparisonOperator,
    },
    /// 原样写入已带类型的值
    SetValue {
        path: Vec<usize>,
        value: Value,
    },
    /// 表单文本输入，按键类型转换为数值或布尔
    InputValue {
        path: Vec<usize>,
        text: String,
    },
    SelectActionDevice {
        uuid: String,
    },
    SelectActionState {
        state: String,
    },
    SetActionValue {
        value: Value,
    },
    InputActionValue {
        text: String,
    },
}
