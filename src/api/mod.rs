//! 平台 REST 接口的抽象
//!
//! 编辑器只依赖 [`PlatformApi`]，测试中用内存实现替换，
//! 生产环境使用 `http-client` 特性下的 [`HttpPlatformClient`]。

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::rule::{RuleNode, RuleNodeDraft};

#[cfg(feature = "http-client")]
pub mod http;
pub mod types;

#[cfg(feature = "http-client")]
pub use http::HttpPlatformClient;
pub use types::{Device, Sensor, TelemetryVariable};

#[async_trait]
pub trait PlatformApi: Send + Sync {
    async fn list_sensors(&self, organization_id: &str) -> Result<Vec<Sensor>>;

    async fn list_devices(&self, organization_id: &str) -> Result<Vec<Device>>;

    /// 单个传感器详情，包含遥测变量列表
    async fn sensor_detail(&self, sensor_uuid: &str) -> Result<Sensor>;

    async fn create_rule_node(&self, draft: &RuleNodeDraft) -> Result<RuleNode>;

    async fn update_rule_node(&self, node_id: &str, draft: &RuleNodeDraft) -> Result<RuleNode>;
}

#[async_trait]
impl<T> PlatformApi for Arc<T>
where
    T: PlatformApi + ?Sized,
{
    async fn list_sensors(&self, organization_id: &str) -> Result<Vec<Sensor>> {
        (**self).list_sensors(organization_id).await
    }

    async fn list_devices(&self, organization_id: &str) -> Result<Vec<Device>> {
        (**self).list_devices(organization_id).await
    }

    async fn sensor_detail(&self, sensor_uuid: &str) -> Result<Sensor> {
        (**self).sensor_detail(sensor_uuid).await
    }

    async fn create_rule_node(&self, draft: &RuleNodeDraft) -> Result<RuleNode> {
        (**self).create_rule_node(draft).await
    }

    async fn update_rule_node(&self, node_id: &str, draft: &RuleNodeDraft) -> Result<RuleNode> {
        (**self).update_rule_node(node_id, draft).await
    }
}
