/// 表达式树模块 - 条件组的构建、求值与序列化
pub mod builder;
pub mod eval;
pub mod types;
pub mod wire;

pub use builder::ExpressionBuilder;
pub use eval::{evaluate, evaluate_condition, Snapshot, TelemetrySource};
pub use types::{
    ComparisonOperator, Condition, ConditionPatch, ExpressionNode, Group, LogicalOperator,
    NodeRef, SourceType,
};
pub use wire::{
    filter_config_string, from_wire_format, parse_filter_config, parse_filter_value,
    to_wire_format, WireCondition, WireExpression, WireGroup,
};
