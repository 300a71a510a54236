pub mod api;
pub mod cli;
pub mod config;
pub mod editor;
pub mod error;
pub mod expression;
pub mod reference;
pub mod rule;
pub mod utils;

#[cfg(feature = "http-client")]
pub use api::HttpPlatformClient;
pub use api::{Device, PlatformApi, Sensor, TelemetryVariable};
pub use config::{ClientConfig, EnvConfig};
pub use editor::{
    ActionForm, ActionView, ConditionView, EditorAction, EditorMode, EditorView, GroupView,
    NodeView, PreviewHandle, RuleEditor,
};
pub use error::{Result, RuleError};
pub use expression::{
    evaluate, filter_config_string, from_wire_format, parse_filter_config, to_wire_format,
    ComparisonOperator, Condition, ConditionPatch, ExpressionBuilder, ExpressionNode, Group,
    LogicalOperator, NodeRef, Snapshot, SourceType, TelemetrySource, WireCondition,
    WireExpression, WireGroup,
};
pub use reference::{
    derive_device_keys, derive_sensor_keys, EntityOption, KeyKind, KeyOption, ReferenceCatalog,
    ValueInput,
};
pub use rule::{DeviceCommand, RuleNode, RuleNodeConfig, RuleNodeDraft, RuleNodeKind};
pub use utils::{logging, validation, ConfigValidator, LoggingConfig};
