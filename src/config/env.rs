use crate::error::{Result, RuleError};
use std::env;

/// 环境变量配置管理
pub struct EnvConfig;

impl EnvConfig {
    /// 解析密钥类配置
    ///
    /// 优先级：
    /// 1. 直接传入的值（如果不以 ${} 包裹）
    /// 2. 环境变量（如果值为 ${VAR_NAME} 格式）
    /// 3. 值为空时读取默认环境变量
    pub fn resolve_secret(value: &str, default_env_var: &str) -> Result<String> {
        if value.starts_with("${") && value.ends_with('}') {
            let env_var_name = &value[2..value.len() - 1];
            Self::get_env(env_var_name)
        } else if value.is_empty() {
            Self::get_env(default_env_var)
        } else {
            Ok(value.to_string())
        }
    }

    /// 从环境变量获取值
    pub fn get_env(key: &str) -> Result<String> {
        env::var(key).map_err(|_| {
            RuleError::Config(format!(
                "环境变量 '{}' 未设置。请在 .env 文件中设置或通过环境变量传递。",
                key
            ))
        })
    }

    /// 获取可选的环境变量
    pub fn get_env_optional(key: &str) -> Option<String> {
        env::var(key).ok().filter(|value| !value.is_empty())
    }
}
