use std::time::Duration;

use crate::error::{Result, RuleError};
use crate::utils::validation::ConfigValidator;

use super::env::EnvConfig;

pub const ENV_API_URL: &str = "AGRIRULES_API_URL";
pub const ENV_TOKEN: &str = "AGRIRULES_TOKEN";
pub const ENV_ORG_ID: &str = "AGRIRULES_ORG_ID";
pub const ENV_TIMEOUT_SECS: &str = "AGRIRULES_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// 平台客户端配置
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: String,
    pub organization_id: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            organization_id: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 从环境变量读取配置，token 支持 `${VAR}` 间接引用
    pub fn from_env() -> Result<Self> {
        let base_url = EnvConfig::get_env(ENV_API_URL)?;
        let raw_token = EnvConfig::get_env_optional(ENV_TOKEN).unwrap_or_default();
        let token = EnvConfig::resolve_secret(&raw_token, ENV_TOKEN)?;

        let timeout = match EnvConfig::get_env_optional(ENV_TIMEOUT_SECS) {
            Some(raw) => {
                let secs = raw.parse::<u64>().map_err(|_| {
                    RuleError::Config(format!("{ENV_TIMEOUT_SECS} 必须是正整数，当前值: {raw}"))
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let config = Self {
            base_url,
            token,
            organization_id: EnvConfig::get_env_optional(ENV_ORG_ID),
            timeout,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ConfigValidator::validate_url(&self.base_url)?;
        ConfigValidator::validate_token(&self.token)?;
        if let Some(organization_id) = &self.organization_id {
            ConfigValidator::validate_path_segment(organization_id)?;
        }
        if self.timeout.is_zero() {
            return Err(RuleError::Config("请求超时不能为 0".to_string()));
        }
        Ok(())
    }
}
