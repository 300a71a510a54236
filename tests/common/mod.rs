#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use agrirules::{
    Device, PlatformApi, RuleError, RuleNode, RuleNodeDraft, Sensor, TelemetryVariable,
};

/// 记录调用的内存平台
#[derive(Default)]
pub struct MockPlatform {
    pub sensors: Vec<Sensor>,
    pub devices: Vec<Device>,
    pub details: HashMap<String, Sensor>,
    pub fail_listing: bool,
    pub failing_saves: Mutex<u32>,
    pub calls: Mutex<Vec<String>>,
    pub drafts: Mutex<Vec<RuleNodeDraft>>,
}

impl MockPlatform {
    pub fn farm() -> Self {
        let greenhouse = Sensor::new("s1", "Greenhouse A");
        let greenhouse_detail = Sensor::new("s1", "Greenhouse A").with_variables(vec![
            TelemetryVariable::new("temperature").with_unit("C"),
            TelemetryVariable::new("humidity").with_bounds(0.0, 100.0),
        ]);
        let soil = Sensor::new("s2", "Soil station");
        let soil_detail = Sensor::new("s2", "Soil station")
            .with_variables(vec![TelemetryVariable::new("moisture").with_unit("%")]);

        let pump = Device::new("d1", "Irrigation pump")
            .with_capability("power", json!(true))
            .with_capability("mode", json!(["auto", "manual"]))
            .with_capability("flowRange", json!({ "min": 0, "max": 120 }));

        let mut details = HashMap::new();
        details.insert("s1".to_string(), greenhouse_detail);
        details.insert("s2".to_string(), soil_detail);

        Self {
            sensors: vec![greenhouse, soil],
            devices: vec![pump],
            details,
            ..Self::default()
        }
    }

    pub fn offline() -> Self {
        Self {
            fail_listing: true,
            ..Self::farm()
        }
    }

    pub fn fail_next_saves(&self, count: u32) {
        *self.failing_saves.lock() = count;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub fn last_draft(&self) -> Option<RuleNodeDraft> {
        self.drafts.lock().last().cloned()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }

    fn store(&self, id: String, draft: &RuleNodeDraft) -> agrirules::Result<RuleNode> {
        {
            let mut failing = self.failing_saves.lock();
            if *failing > 0 {
                *failing -= 1;
                return Err(RuleError::Api {
                    status: 503,
                    body: "rule engine unavailable".to_string(),
                });
            }
        }
        self.drafts.lock().push(draft.clone());
        Ok(RuleNode {
            id,
            rule_chain_id: draft.rule_chain_id.clone(),
            kind: draft.kind,
            name: draft.name.clone(),
            config: draft.config.clone(),
            next_node_id: None,
        })
    }
}

#[async_trait]
impl PlatformApi for MockPlatform {
    async fn list_sensors(&self, organization_id: &str) -> agrirules::Result<Vec<Sensor>> {
        self.record(format!("list_sensors:{organization_id}"));
        if self.fail_listing {
            return Err(RuleError::Api {
                status: 500,
                body: "boom".to_string(),
            });
        }
        Ok(self.sensors.clone())
    }

    async fn list_devices(&self, organization_id: &str) -> agrirules::Result<Vec<Device>> {
        self.record(format!("list_devices:{organization_id}"));
        if self.fail_listing {
            return Err(RuleError::Api {
                status: 500,
                body: "boom".to_string(),
            });
        }
        Ok(self.devices.clone())
    }

    async fn sensor_detail(&self, sensor_uuid: &str) -> agrirules::Result<Sensor> {
        self.record(format!("sensor_detail:{sensor_uuid}"));
        self.details
            .get(sensor_uuid)
            .cloned()
            .ok_or_else(|| RuleError::Api {
                status: 404,
                body: format!("sensor {sensor_uuid} not found"),
            })
    }

    async fn create_rule_node(&self, draft: &RuleNodeDraft) -> agrirules::Result<RuleNode> {
        self.record(format!("create_rule_node:{}", draft.name));
        let id = format!("node-{}", self.drafts.lock().len() + 1);
        self.store(id, draft)
    }

    async fn update_rule_node(
        &self,
        node_id: &str,
        draft: &RuleNodeDraft,
    ) -> agrirules::Result<RuleNode> {
        self.record(format!("update_rule_node:{node_id}"));
        self.store(node_id.to_string(), draft)
    }
}

pub fn platform() -> Arc<MockPlatform> {
    Arc::new(MockPlatform::farm())
}
