mod common;

use std::sync::Arc;

use agrirules::{
    parse_filter_config, ComparisonOperator, EditorAction, EditorMode, LogicalOperator, NodeView,
    RuleEditor, RuleError, RuleNode, RuleNodeKind, SourceType, ValueInput,
};
use common::{platform, MockPlatform};
use serde_json::{json, Value};

fn preview_json(editor: &RuleEditor<Arc<MockPlatform>>) -> Value {
    serde_json::from_str(&editor.preview()).unwrap()
}

async fn filter_editor(api: &Arc<MockPlatform>) -> RuleEditor<Arc<MockPlatform>> {
    RuleEditor::create(Arc::clone(api), "org-1", "chain-1", RuleNodeKind::Filter).await
}

async fn add_humidity_condition(editor: &mut RuleEditor<Arc<MockPlatform>>) {
    editor
        .dispatch(EditorAction::AddCondition {
            group_path: vec![],
            source_type: SourceType::Sensor,
        })
        .await
        .unwrap();
    editor
        .dispatch(EditorAction::SelectEntity {
            path: vec![0],
            uuid: "s1".to_string(),
        })
        .await
        .unwrap();
    editor
        .dispatch(EditorAction::SelectKey {
            path: vec![0],
            key: "humidity".to_string(),
        })
        .await
        .unwrap();
    editor
        .dispatch(EditorAction::SetOperator {
            path: vec![0],
            operator: ComparisonOperator::Ge,
        })
        .await
        .unwrap();
    editor
        .dispatch(EditorAction::InputValue {
            path: vec![0],
            text: "80".to_string(),
        })
        .await
        .unwrap();
}

fn stored_filter(config: Value) -> RuleNode {
    RuleNode {
        id: "node-7".to_string(),
        rule_chain_id: "chain-1".to_string(),
        kind: RuleNodeKind::Filter,
        name: "Greenhouse alarm".to_string(),
        config: config.to_string(),
        next_node_id: None,
    }
}

#[tokio::test]
async fn add_mode_starts_empty_with_reference_data() {
    let api = platform();
    let editor = filter_editor(&api).await;

    assert!(editor.is_open());
    assert_eq!(editor.mode(), &EditorMode::Add);
    assert_eq!(editor.revision(), 1);
    assert_eq!(
        preview_json(&editor),
        json!({ "type": "AND", "expressions": [] })
    );
    assert_eq!(api.count_calls("list_sensors"), 1);
    assert_eq!(api.count_calls("list_devices"), 1);
}

#[tokio::test]
async fn selecting_a_sensor_populates_keys_before_returning() {
    let api = platform();
    let mut editor = filter_editor(&api).await;

    editor
        .dispatch(EditorAction::AddCondition {
            group_path: vec![],
            source_type: SourceType::Sensor,
        })
        .await
        .unwrap();
    editor
        .dispatch(EditorAction::SelectEntity {
            path: vec![0],
            uuid: "s1".to_string(),
        })
        .await
        .unwrap();

    let view = editor.view();
    let root = view.filter.unwrap();
    let NodeView::Condition(row) = &root.children[0] else {
        panic!("expected a condition row");
    };
    let keys: Vec<&str> = row.key_options.iter().map(|k| k.name.as_str()).collect();
    assert_eq!(keys, vec!["temperature", "humidity"]);
    assert_eq!(row.entity_options.len(), 2);
    assert_eq!(api.count_calls("sensor_detail:s1"), 1);
}

#[tokio::test]
async fn cascade_builds_a_typed_condition() {
    let api = platform();
    let mut editor = filter_editor(&api).await;
    add_humidity_condition(&mut editor).await;

    let condition = editor.builder().condition_at(&[0]).unwrap();
    assert_eq!(condition.value, json!(80));

    let view = editor.view();
    let NodeView::Condition(row) = &view.filter.as_ref().unwrap().children[0] else {
        panic!("expected a condition row");
    };
    assert_eq!(
        row.value_input,
        ValueInput::Number {
            min: Some(0.0),
            max: Some(100.0)
        }
    );
    assert!(row.key_known);

    assert_eq!(
        preview_json(&editor),
        json!({
            "type": "AND",
            "expressions": [
                { "sourceType": "sensor", "UUID": "s1", "key": "humidity", "operator": ">=", "value": 80 }
            ]
        })
    );
    assert_eq!(editor.revision(), 6);
}

#[tokio::test]
async fn changing_source_type_clears_dependent_fields() {
    let api = platform();
    let mut editor = filter_editor(&api).await;
    add_humidity_condition(&mut editor).await;

    editor
        .dispatch(EditorAction::SelectSourceType {
            path: vec![0],
            source_type: SourceType::Device,
        })
        .await
        .unwrap();

    let condition = editor.builder().condition_at(&[0]).unwrap();
    assert_eq!(condition.source_type, SourceType::Device);
    assert!(condition.uuid.is_empty());
    assert!(condition.key.is_empty());
    assert_eq!(condition.value, json!(""));

    editor
        .dispatch(EditorAction::SelectEntity {
            path: vec![0],
            uuid: "d1".to_string(),
        })
        .await
        .unwrap();
    editor
        .dispatch(EditorAction::SelectKey {
            path: vec![0],
            key: "mode".to_string(),
        })
        .await
        .unwrap();

    let view = editor.view();
    let NodeView::Condition(row) = &view.filter.as_ref().unwrap().children[0] else {
        panic!("expected a condition row");
    };
    assert_eq!(
        row.value_input,
        ValueInput::Choice {
            options: vec![json!("auto"), json!("manual")]
        }
    );
}

#[tokio::test]
async fn structural_misuse_is_reported() {
    let api = platform();
    let mut editor = filter_editor(&api).await;
    add_humidity_condition(&mut editor).await;
    let revision = editor.revision();

    let err = editor
        .dispatch(EditorAction::AddCondition {
            group_path: vec![0],
            source_type: SourceType::Sensor,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RuleError::InvalidGroupPath(_)));

    let err = editor
        .dispatch(EditorAction::SelectKey {
            path: vec![3],
            key: "temperature".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RuleError::InvalidConditionPath(_)));

    let err = editor
        .dispatch(EditorAction::RemoveNode { path: vec![] })
        .await
        .unwrap_err();
    assert!(matches!(err, RuleError::InvalidPath(_)));
    assert_eq!(editor.revision(), revision);
}

#[tokio::test]
async fn save_creates_node_and_closes() {
    let api = platform();
    let mut editor = filter_editor(&api).await;
    add_humidity_condition(&mut editor).await;
    editor
        .dispatch(EditorAction::SetName {
            name: "Humid greenhouse".to_string(),
        })
        .await
        .unwrap();

    let node = editor.save().await.unwrap();
    assert_eq!(node.kind, RuleNodeKind::Filter);
    assert_eq!(node.rule_chain_id, "chain-1");
    assert!(!editor.is_open());

    let draft = api.last_draft().unwrap();
    assert_eq!(draft.next_node_id, None);
    assert_eq!(
        parse_filter_config(&draft.config).unwrap(),
        editor.builder().expression().clone()
    );

    let err = editor
        .dispatch(EditorAction::SetName {
            name: "again".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RuleError::EditorClosed));
}

#[tokio::test]
async fn failed_save_keeps_editor_open_for_retry() {
    let api = platform();
    let mut editor = filter_editor(&api).await;
    add_humidity_condition(&mut editor).await;
    editor
        .dispatch(EditorAction::SetName {
            name: "Humid greenhouse".to_string(),
        })
        .await
        .unwrap();
    api.fail_next_saves(1);

    let err = editor.save().await.unwrap_err();
    assert!(matches!(err, RuleError::Api { status: 503, .. }));
    assert!(editor.is_open());
    assert_eq!(editor.builder().expression().children.len(), 1);

    editor.save().await.unwrap();
    assert_eq!(api.count_calls("create_rule_node"), 2);
    assert!(!editor.is_open());
}

#[tokio::test]
async fn incomplete_filter_is_not_sent() {
    let api = platform();
    let mut editor = filter_editor(&api).await;
    editor
        .dispatch(EditorAction::SetName {
            name: "Empty".to_string(),
        })
        .await
        .unwrap();

    assert!(matches!(
        editor.save().await,
        Err(RuleError::EmptyGroup(_))
    ));

    editor
        .dispatch(EditorAction::AddCondition {
            group_path: vec![],
            source_type: SourceType::Device,
        })
        .await
        .unwrap();
    assert!(matches!(
        editor.save().await,
        Err(RuleError::IncompleteCondition { field: "uuid", .. })
    ));
    assert_eq!(api.count_calls("create_rule_node"), 0);
    assert!(editor.is_open());
}

#[tokio::test]
async fn edit_mode_rehydrates_nested_filter_without_intermediate_syncs() {
    let api = platform();
    let config = json!({
        "type": "OR",
        "expressions": [
            { "sourceType": "sensor", "UUID": "s1", "key": "temperature", "operator": ">", "value": 30 },
            {
                "type": "AND",
                "expressions": [
                    { "sourceType": "sensor", "UUID": "s2", "key": "moisture", "operator": "<", "value": "20" },
                    { "sourceType": "device", "UUID": "d1", "key": "mode", "operator": "==", "value": "auto" }
                ]
            }
        ]
    });
    let node = stored_filter(config.clone());

    let editor = RuleEditor::edit(Arc::clone(&api), "org-1", node).await;

    assert_eq!(editor.revision(), 1);
    assert_eq!(preview_json(&editor), config);
    assert_eq!(editor.name(), "Greenhouse alarm");
    assert_eq!(
        editor.builder().expression().operator,
        LogicalOperator::Or
    );
    assert_eq!(api.count_calls("sensor_detail:s1"), 1);
    assert_eq!(api.count_calls("sensor_detail:s2"), 1);

    let view = editor.view();
    let NodeView::Group(nested) = &view.filter.as_ref().unwrap().children[1] else {
        panic!("expected a nested group");
    };
    let NodeView::Condition(moisture) = &nested.children[0] else {
        panic!("expected a condition row");
    };
    assert_eq!(moisture.path, vec![1, 0]);
    assert!(moisture.key_known);
    assert_eq!(moisture.value, json!("20"));
}

#[tokio::test]
async fn edit_mode_fetches_missing_sensor_only_once() {
    let api = platform();
    let node = stored_filter(json!({
        "type": "AND",
        "expressions": [
            { "sourceType": "sensor", "UUID": "s404", "key": "temperature", "operator": ">", "value": 30 },
            { "sourceType": "sensor", "UUID": "s404", "key": "humidity", "operator": "<", "value": 40 }
        ]
    }));

    let editor = RuleEditor::edit(Arc::clone(&api), "org-1", node).await;

    assert_eq!(api.count_calls("sensor_detail:s404"), 1);
    assert_eq!(editor.builder().expression().children.len(), 2);

    let view = editor.view();
    let root = view.filter.as_ref().unwrap();
    for child in &root.children {
        let NodeView::Condition(row) = child else {
            panic!("expected a condition row");
        };
        assert!(row.key_options.is_empty());
        assert!(!row.key_known);
    }
}

#[tokio::test]
async fn edit_mode_save_updates_existing_node() {
    let api = platform();
    let node = stored_filter(json!({
        "sourceType": "device", "UUID": "d1", "key": "power", "operator": "==", "value": true
    }));
    let mut editor = RuleEditor::edit(Arc::clone(&api), "org-1", node).await;

    editor
        .dispatch(EditorAction::SetOperator {
            path: vec![0],
            operator: ComparisonOperator::Ne,
        })
        .await
        .unwrap();
    let saved = editor.save().await.unwrap();

    assert_eq!(saved.id, "node-7");
    assert_eq!(api.count_calls("update_rule_node:node-7"), 1);
    let stored: Value = serde_json::from_str(&saved.config).unwrap();
    assert_eq!(
        stored,
        json!({
            "type": "AND",
            "expressions": [
                { "sourceType": "device", "UUID": "d1", "key": "power", "operator": "!=", "value": true }
            ]
        })
    );
}

#[tokio::test]
async fn malformed_config_falls_back_to_empty_form() {
    let api = platform();
    let mut node = stored_filter(json!({}));
    node.config = "{\"type\": \"AND\", \"expressions\": [".to_string();

    let editor = RuleEditor::edit(Arc::clone(&api), "org-1", node).await;

    assert!(editor.is_open());
    assert!(editor.builder().is_empty());
    assert_eq!(
        preview_json(&editor),
        json!({ "type": "AND", "expressions": [] })
    );
}

#[tokio::test]
async fn action_editor_round_trips_device_command() {
    let api = platform();
    let node = RuleNode {
        id: "node-9".to_string(),
        rule_chain_id: "chain-1".to_string(),
        kind: RuleNodeKind::Action,
        name: "Start pump".to_string(),
        config: json!({
            "type": "DEVICE_COMMAND",
            "command": { "deviceUuid": "d1", "stateName": "mode", "value": "manual", "initiatedBy": "device" }
        })
        .to_string(),
        next_node_id: None,
    };
    let mut editor = RuleEditor::edit(Arc::clone(&api), "org-1", node).await;

    let view = editor.view();
    let action = view.action.unwrap();
    assert_eq!(action.device_uuid, "d1");
    assert_eq!(action.state_name, "mode");
    assert_eq!(action.value, json!("manual"));
    assert_eq!(
        action.value_input,
        ValueInput::Choice {
            options: vec![json!("auto"), json!("manual")]
        }
    );

    editor
        .dispatch(EditorAction::SelectActionState {
            state: "flow".to_string(),
        })
        .await
        .unwrap();
    editor
        .dispatch(EditorAction::InputActionValue {
            text: "60".to_string(),
        })
        .await
        .unwrap();
    editor.save().await.unwrap();

    let stored: Value = serde_json::from_str(&api.last_draft().unwrap().config).unwrap();
    assert_eq!(
        stored,
        json!({
            "type": "action",
            "config": {
                "type": "DEVICE_COMMAND",
                "command": { "deviceUuid": "d1", "stateName": "flow", "value": 60, "initiatedBy": "device" }
            }
        })
    );
}

#[tokio::test]
async fn new_action_requires_state_and_value() {
    let api = platform();
    let mut editor =
        RuleEditor::create(Arc::clone(&api), "org-1", "chain-1", RuleNodeKind::Action).await;
    editor
        .dispatch(EditorAction::SetName {
            name: "Pump on".to_string(),
        })
        .await
        .unwrap();
    editor
        .dispatch(EditorAction::SelectActionDevice {
            uuid: "d1".to_string(),
        })
        .await
        .unwrap();

    assert!(matches!(
        editor.save().await,
        Err(RuleError::IncompleteAction("stateName"))
    ));

    editor
        .dispatch(EditorAction::SelectActionState {
            state: "power".to_string(),
        })
        .await
        .unwrap();
    editor
        .dispatch(EditorAction::InputActionValue {
            text: "true".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(editor.action_form().value, json!(true));
    editor.save().await.unwrap();
}

#[tokio::test]
async fn offline_reference_data_leaves_dropdowns_empty() {
    let api = Arc::new(MockPlatform::offline());
    let mut editor =
        RuleEditor::create(Arc::clone(&api), "org-1", "chain-1", RuleNodeKind::Filter).await;
    editor
        .dispatch(EditorAction::AddCondition {
            group_path: vec![],
            source_type: SourceType::Device,
        })
        .await
        .unwrap();

    let view = editor.view();
    let NodeView::Condition(row) = &view.filter.as_ref().unwrap().children[0] else {
        panic!("expected a condition row");
    };
    assert!(row.entity_options.is_empty());
    assert!(row.key_options.is_empty());
    assert_eq!(row.value_input, ValueInput::Text);
}

#[tokio::test]
async fn preview_handle_tracks_edits() {
    let api = platform();
    let mut editor = filter_editor(&api).await;
    let handle = editor.preview_handle();

    editor
        .dispatch(EditorAction::SetGroupOperator {
            path: vec![],
            operator: LogicalOperator::Or,
        })
        .await
        .unwrap();

    let shared: Value = serde_json::from_str(&handle.read()).unwrap();
    assert_eq!(shared["type"], json!("OR"));
}

#[tokio::test]
async fn closing_discards_further_edits() {
    let api = platform();
    let mut editor = filter_editor(&api).await;
    editor.close();

    assert!(matches!(editor.save().await, Err(RuleError::EditorClosed)));
    assert_eq!(api.count_calls("create_rule_node"), 0);
}
