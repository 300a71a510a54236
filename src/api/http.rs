use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::config::ClientConfig;
use crate::error::{Result, RuleError};
use crate::rule::{RuleNode, RuleNodeDraft};
use crate::utils::validation::ConfigValidator;

use super::types::{Device, Sensor};
use super::PlatformApi;

/// 基于 reqwest 的平台客户端，使用 Bearer token 认证
#[derive(Clone)]
pub struct HttpPlatformClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpPlatformClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(config.timeout)
            .build()
            .map_err(|e| RuleError::Other(anyhow!("failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| RuleError::Other(anyhow!("platform request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RuleError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| RuleError::Other(anyhow!("failed to decode platform response: {}", e)))
    }
}

#[async_trait]
impl PlatformApi for HttpPlatformClient {
    #[instrument(skip(self))]
    async fn list_sensors(&self, organization_id: &str) -> Result<Vec<Sensor>> {
        ConfigValidator::validate_path_segment(organization_id)?;
        let path = format!("/organizations/{}/sensors", organization_id);
        self.send(self.request(Method::GET, &path)).await
    }

    #[instrument(skip(self))]
    async fn list_devices(&self, organization_id: &str) -> Result<Vec<Device>> {
        ConfigValidator::validate_path_segment(organization_id)?;
        let path = format!("/organizations/{}/devices", organization_id);
        self.send(self.request(Method::GET, &path)).await
    }

    #[instrument(skip(self))]
    async fn sensor_detail(&self, sensor_uuid: &str) -> Result<Sensor> {
        ConfigValidator::validate_path_segment(sensor_uuid)?;
        let path = format!("/sensors/{}", sensor_uuid);
        self.send(self.request(Method::GET, &path)).await
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    async fn create_rule_node(&self, draft: &RuleNodeDraft) -> Result<RuleNode> {
        self.send(self.request(Method::POST, "/rule-nodes").json(draft))
            .await
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    async fn update_rule_node(&self, node_id: &str, draft: &RuleNodeDraft) -> Result<RuleNode> {
        ConfigValidator::validate_path_segment(node_id)?;
        let path = format!("/rule-nodes/{}", node_id);
        self.send(self.request(Method::PATCH, &path).json(draft))
            .await
    }
}
