//! 规则节点编辑器（无界面）
//!
//! 持有一棵表达式树或一个动作表单，以及组织内的参考数据。
//! 所有修改都通过 [`RuleEditor::dispatch`] 进入，修改后重新序列化实时预览；
//! 回填已保存节点时预览同步被抑制，直到回填结束。

pub mod actions;
pub mod view;

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;

use crate::api::PlatformApi;
use crate::error::{Result, RuleError};
use crate::expression::{
    filter_config_string, to_wire_format, Condition, ConditionPatch, ExpressionBuilder, Group,
    NodeRef, SourceType,
};
use crate::reference::ReferenceCatalog;
use crate::rule::{
    action_config_string, action_config_value, DeviceCommand, RuleNode, RuleNodeConfig,
    RuleNodeDraft, RuleNodeKind,
};
use crate::utils::validation::ConfigValidator;

pub use actions::EditorAction;
pub use view::{ActionView, ConditionView, EditorView, GroupView, NodeView};

/// 实时预览，可交给渲染端只读共享
pub type PreviewHandle = Arc<RwLock<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum EditorMode {
    Add,
    Edit { node_id: String },
}

/// 动作节点的平铺表单
#[derive(Debug, Clone, PartialEq)]
pub struct ActionForm {
    pub device_uuid: String,
    pub state_name: String,
    pub value: Value,
}

impl Default for ActionForm {
    fn default() -> Self {
        Self {
            device_uuid: String::new(),
            state_name: String::new(),
            value: Value::String(String::new()),
        }
    }
}

impl ActionForm {
    pub fn to_command(&self) -> DeviceCommand {
        DeviceCommand::new(
            self.device_uuid.clone(),
            self.state_name.clone(),
            self.value.clone(),
        )
    }
}

fn empty_value() -> Value {
    Value::String(String::new())
}

pub struct RuleEditor<A> {
    api: A,
    organization_id: String,
    rule_chain_id: String,
    mode: EditorMode,
    kind: RuleNodeKind,
    name: String,
    builder: ExpressionBuilder,
    action: ActionForm,
    catalog: ReferenceCatalog,
    preview: PreviewHandle,
    revision: u64,
    suppress_sync: bool,
    open: bool,
}

impl<A: PlatformApi> RuleEditor<A> {
    /// 新增模式：加载参考数据，从空的 AND 组开始
    pub async fn create(
        api: A,
        organization_id: impl Into<String>,
        rule_chain_id: impl Into<String>,
        kind: RuleNodeKind,
    ) -> Self {
        let organization_id = organization_id.into();
        let catalog = ReferenceCatalog::load(&api, &organization_id).await;
        let mut editor = Self::assemble(
            api,
            organization_id,
            rule_chain_id.into(),
            kind,
            EditorMode::Add,
            catalog,
        );
        editor.sync_preview();
        editor
    }

    /// 编辑模式：加载参考数据后按已保存的配置回填表单
    ///
    /// 配置无法解析时记录错误并回退为空表单。
    pub async fn edit(api: A, organization_id: impl Into<String>, node: RuleNode) -> Self {
        let organization_id = organization_id.into();
        let catalog = ReferenceCatalog::load(&api, &organization_id).await;
        let mut editor = Self::assemble(
            api,
            organization_id,
            node.rule_chain_id.clone(),
            node.kind,
            EditorMode::Edit {
                node_id: node.id.clone(),
            },
            catalog,
        );
        editor.name = node.name.clone();
        editor.rehydrate(&node).await;
        editor.sync_preview();
        editor
    }

    fn assemble(
        api: A,
        organization_id: String,
        rule_chain_id: String,
        kind: RuleNodeKind,
        mode: EditorMode,
        catalog: ReferenceCatalog,
    ) -> Self {
        Self {
            api,
            organization_id,
            rule_chain_id,
            mode,
            kind,
            name: String::new(),
            builder: ExpressionBuilder::new(),
            action: ActionForm::default(),
            catalog,
            preview: Arc::new(RwLock::new(String::new())),
            revision: 0,
            suppress_sync: false,
            open: true,
        }
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    pub fn kind(&self) -> RuleNodeKind {
        self.kind
    }

    pub fn mode(&self) -> &EditorMode {
        &self.mode
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn builder(&self) -> &ExpressionBuilder {
        &self.builder
    }

    pub fn action_form(&self) -> &ActionForm {
        &self.action
    }

    pub fn catalog(&self) -> &ReferenceCatalog {
        &self.catalog
    }

    pub fn preview(&self) -> String {
        self.preview.read().clone()
    }

    pub fn preview_handle(&self) -> PreviewHandle {
        Arc::clone(&self.preview)
    }

    /// 预览被重新生成的次数
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn close(&mut self) {
        if self.open {
            tracing::debug!(organization = %self.organization_id, "规则编辑器已关闭");
        }
        self.open = false;
    }

    pub fn view(&self) -> EditorView {
        let editing_node = match &self.mode {
            EditorMode::Add => None,
            EditorMode::Edit { node_id } => Some(node_id.clone()),
        };
        let (filter, action) = match self.kind {
            RuleNodeKind::Filter => (
                Some(view::render_group(
                    self.builder.expression(),
                    &mut Vec::new(),
                    &self.catalog,
                )),
                None,
            ),
            RuleNodeKind::Action => (None, Some(view::render_action(&self.action, &self.catalog))),
        };
        EditorView {
            kind: self.kind,
            name: self.name.clone(),
            editing_node,
            open: self.open,
            revision: self.revision,
            preview: self.preview(),
            filter,
            action,
        }
    }

    /// 应用一个用户操作，然后刷新预览
    pub async fn dispatch(&mut self, action: EditorAction) -> Result<()> {
        self.ensure_open()?;
        self.apply(action).await?;
        self.sync_preview();
        Ok(())
    }

    async fn apply(&mut self, action: EditorAction) -> Result<()> {
        match action {
            EditorAction::SetName { name } => {
                self.name = name;
            }
            EditorAction::AddCondition {
                group_path,
                source_type,
            } => {
                self.builder
                    .add_condition(Condition::blank(source_type), &group_path)?;
            }
            EditorAction::AddGroup {
                group_path,
                operator,
            } => {
                self.builder.add_group(operator, &group_path)?;
            }
            EditorAction::RemoveNode { path } => {
                if !self.builder.remove_node(&path) {
                    return Err(RuleError::InvalidPath(path));
                }
            }
            EditorAction::SetGroupOperator { path, operator } => {
                if !self.builder.update_group_operator(&path, operator) {
                    return Err(RuleError::InvalidGroupPath(path));
                }
            }
            EditorAction::SelectSourceType { path, source_type } => {
                let patch = ConditionPatch::new()
                    .source_type(source_type)
                    .uuid("")
                    .key("")
                    .value(empty_value());
                self.patch_condition(path, patch)?;
            }
            EditorAction::SelectEntity { path, uuid } => {
                let source_type = self
                    .builder
                    .condition_at(&path)
                    .map(|condition| condition.source_type)
                    .ok_or_else(|| RuleError::InvalidConditionPath(path.clone()))?;
                let patch = ConditionPatch::new()
                    .uuid(uuid.clone())
                    .key("")
                    .value(empty_value());
                self.patch_condition(path, patch)?;
                if source_type == SourceType::Sensor && !uuid.is_empty() {
                    self.catalog.ensure_sensor_keys(&self.api, &uuid).await;
                }
            }
            EditorAction::SelectKey { path, key } => {
                let patch = ConditionPatch::new().key(key).value(empty_value());
                self.patch_condition(path, patch)?;
            }
            EditorAction::SetOperator { path, operator } => {
                self.patch_condition(path, ConditionPatch::new().operator(operator))?;
            }
            EditorAction::SetValue { path, value } => {
                self.patch_condition(path, ConditionPatch::new().value(value))?;
            }
            EditorAction::InputValue { path, text } => {
                let condition = self
                    .builder
                    .condition_at(&path)
                    .ok_or_else(|| RuleError::InvalidConditionPath(path.clone()))?;
                let value = match self.catalog.key(
                    condition.source_type,
                    &condition.uuid,
                    &condition.key,
                ) {
                    Some(option) => option.kind.normalize(Value::String(text)),
                    None => Value::String(text),
                };
                self.patch_condition(path, ConditionPatch::new().value(value))?;
            }
            EditorAction::SelectActionDevice { uuid } => {
                self.action = ActionForm {
                    device_uuid: uuid,
                    ..ActionForm::default()
                };
            }
            EditorAction::SelectActionState { state } => {
                self.action.state_name = state;
                self.action.value = empty_value();
            }
            EditorAction::SetActionValue { value } => {
                self.action.value = value;
            }
            EditorAction::InputActionValue { text } => {
                let value = match self.catalog.key(
                    SourceType::Device,
                    &self.action.device_uuid,
                    &self.action.state_name,
                ) {
                    Some(option) => option.kind.normalize(Value::String(text)),
                    None => Value::String(text),
                };
                self.action.value = value;
            }
        }
        Ok(())
    }

    fn patch_condition(&mut self, path: Vec<usize>, patch: ConditionPatch) -> Result<()> {
        if self.builder.update_condition(&path, patch) {
            Ok(())
        } else {
            Err(RuleError::InvalidConditionPath(path))
        }
    }

    async fn rehydrate(&mut self, node: &RuleNode) {
        self.suppress_sync = true;
        match node.decode_config() {
            Ok(RuleNodeConfig::Filter(group)) => {
                if let Err(err) = self.rehydrate_filter(group).await {
                    tracing::error!(node = %node.id, error = %err, "回填过滤条件失败，回退为空表达式");
                    self.builder = ExpressionBuilder::new();
                }
            }
            Ok(RuleNodeConfig::Action(command)) => {
                if let Err(err) = self.rehydrate_action(command).await {
                    tracing::error!(node = %node.id, error = %err, "回填动作失败，回退为空表单");
                    self.action = ActionForm::default();
                }
            }
            Err(err) => {
                tracing::error!(node = %node.id, error = %err, "规则配置无法解析，回退为空表单");
            }
        }
        self.suppress_sync = false;
    }

    /// 按先序逐个重放节点，路径与原树保持一致
    async fn rehydrate_filter(&mut self, group: Group) -> Result<()> {
        let source = ExpressionBuilder::from_group(group);

        let sensor_uuids: Vec<String> = source
            .conditions()
            .into_iter()
            .filter(|(_, condition)| {
                condition.source_type == SourceType::Sensor && !condition.uuid.is_empty()
            })
            .map(|(_, condition)| condition.uuid.clone())
            .collect();
        self.catalog
            .prefetch_sensor_keys(&self.api, &sensor_uuids)
            .await;

        self.builder = ExpressionBuilder::new();
        self.builder
            .update_group_operator(&[], source.expression().operator);

        for (path, node) in source.nodes() {
            let parent = path[..path.len() - 1].to_vec();
            match node {
                NodeRef::Group(group) => {
                    self.dispatch(EditorAction::AddGroup {
                        group_path: parent,
                        operator: group.operator,
                    })
                    .await?;
                }
                NodeRef::Condition(condition) => {
                    self.replay_condition(parent, path, condition).await?;
                }
            }
        }
        Ok(())
    }

    async fn replay_condition(
        &mut self,
        group_path: Vec<usize>,
        path: Vec<usize>,
        condition: &Condition,
    ) -> Result<()> {
        self.dispatch(EditorAction::AddCondition {
            group_path,
            source_type: condition.source_type,
        })
        .await?;
        // 传感器的键在这里加载完成后才会继续设置键和值
        self.dispatch(EditorAction::SelectEntity {
            path: path.clone(),
            uuid: condition.uuid.clone(),
        })
        .await?;
        self.dispatch(EditorAction::SelectKey {
            path: path.clone(),
            key: condition.key.clone(),
        })
        .await?;
        self.dispatch(EditorAction::SetOperator {
            path: path.clone(),
            operator: condition.operator,
        })
        .await?;
        self.dispatch(EditorAction::SetValue {
            path,
            value: condition.value.clone(),
        })
        .await
    }

    async fn rehydrate_action(&mut self, command: DeviceCommand) -> Result<()> {
        self.dispatch(EditorAction::SelectActionDevice {
            uuid: command.device_uuid,
        })
        .await?;
        self.dispatch(EditorAction::SelectActionState {
            state: command.state_name,
        })
        .await?;
        self.dispatch(EditorAction::SetActionValue {
            value: command.value,
        })
        .await
    }

    /// 当前节点配置（线上格式）
    pub fn config_value(&self) -> Result<Value> {
        match self.kind {
            RuleNodeKind::Filter => Ok(serde_json::to_value(to_wire_format(
                self.builder.expression(),
            ))?),
            RuleNodeKind::Action => action_config_value(&self.action.to_command()),
        }
    }

    fn sync_preview(&mut self) {
        if self.suppress_sync {
            return;
        }
        let rendered = self
            .config_value()
            .and_then(|value| serde_json::to_string_pretty(&value).map_err(RuleError::from));
        match rendered {
            Ok(text) => {
                *self.preview.write() = text;
                self.revision += 1;
            }
            Err(err) => tracing::error!(error = %err, "生成配置预览失败"),
        }
    }

    /// 校验表单并生成提交载荷
    pub fn draft(&self) -> Result<RuleNodeDraft> {
        ConfigValidator::validate_node_name(&self.name)?;
        let config = match self.kind {
            RuleNodeKind::Filter => {
                self.builder.validate()?;
                filter_config_string(self.builder.expression())?
            }
            RuleNodeKind::Action => {
                let command = self.action.to_command();
                command.validate()?;
                action_config_string(&command)?
            }
        };
        Ok(RuleNodeDraft {
            rule_chain_id: self.rule_chain_id.clone(),
            kind: self.kind,
            name: self.name.trim().to_string(),
            config,
            next_node_id: None,
        })
    }

    /// 保存节点
    ///
    /// 成功后编辑器关闭；失败时记录错误并保持打开，状态不回滚，可以直接重试。
    pub async fn save(&mut self) -> Result<RuleNode> {
        self.ensure_open()?;
        self.suppress_sync = false;
        self.sync_preview();

        let draft = self.draft().inspect_err(|err| {
            tracing::warn!(error = %err, "规则节点未通过校验");
        })?;

        let result = match &self.mode {
            EditorMode::Add => self.api.create_rule_node(&draft).await,
            EditorMode::Edit { node_id } => self.api.update_rule_node(node_id, &draft).await,
        };

        match result {
            Ok(node) => {
                tracing::info!(node = %node.id, kind = ?node.kind, "规则节点已保存");
                self.open = false;
                Ok(node)
            }
            Err(err) => {
                tracing::error!(error = %err, name = %draft.name, "保存规则节点失败，编辑器保持打开");
                Err(err)
            }
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(RuleError::EditorClosed)
        }
    }
}
