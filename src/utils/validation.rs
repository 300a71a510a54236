use crate::error::{Result, RuleError};

/// 配置验证器
pub struct ConfigValidator;

impl ConfigValidator {
    /// 验证 URL 格式
    pub fn validate_url(url: &str) -> Result<()> {
        if url.is_empty() {
            return Err(RuleError::Config("URL 不能为空".to_string()));
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(RuleError::Config(
                "URL 必须以 http:// 或 https:// 开头".to_string(),
            ));
        }

        Ok(())
    }

    /// 验证访问令牌
    pub fn validate_token(token: &str) -> Result<()> {
        if token.trim().is_empty() {
            return Err(RuleError::Config("访问令牌不能为空".to_string()));
        }

        if token.starts_with("your_") {
            return Err(RuleError::Config(
                "访问令牌看起来是占位符，请提供真实的令牌".to_string(),
            ));
        }

        Ok(())
    }

    /// 验证拼接进 URL 路径的标识符
    pub fn validate_path_segment(segment: &str) -> Result<()> {
        if segment.is_empty() {
            return Err(RuleError::Config("标识符不能为空".to_string()));
        }

        // "." 与 ".." 会改写请求路径
        if segment.chars().all(|c| c == '.') {
            return Err(RuleError::Config(format!(
                "标识符 '{}' 不能只由点组成",
                segment
            )));
        }

        if !segment
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            return Err(RuleError::Config(format!(
                "标识符 '{}' 包含无效字符，应该只包含字母、数字、下划线、点和短横线",
                segment
            )));
        }

        Ok(())
    }

    /// 验证规则节点名称
    pub fn validate_node_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(RuleError::MissingName);
        }

        if name.chars().count() > 100 {
            return Err(RuleError::Config(
                "规则节点名称过长（最多 100 字符）".to_string(),
            ));
        }

        Ok(())
    }
}
