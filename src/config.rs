use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 表单服务的域名（提交地址由它拼接而成）
    pub provider_base_url: String,
    /// 提交请求的超时时间（秒）
    pub request_timeout_secs: u64,
    /// 同时处理的用户数量
    pub max_concurrent_users: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 提交失败记录文件
    pub failure_log_file: String,
    /// 启动时导入的表单 JSON 文件
    pub form_json_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider_base_url: "https://docs.google.com".to_string(),
            request_timeout_secs: 15,
            max_concurrent_users: 100,
            verbose_logging: false,
            failure_log_file: "submit_failures.txt".to_string(),
            form_json_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载配置，环境变量优先
    pub async fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let config: Config = crate::models::loaders::load_toml(path).await?;
        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(self) -> Self {
        Self {
            provider_base_url: std::env::var("PROVIDER_BASE_URL").unwrap_or(self.provider_base_url),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.request_timeout_secs),
            max_concurrent_users: std::env::var("MAX_CONCURRENT_USERS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.max_concurrent_users),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(self.verbose_logging),
            failure_log_file: std::env::var("FAILURE_LOG_FILE").unwrap_or(self.failure_log_file),
            form_json_path: std::env::var("FORM_JSON_PATH").ok().or(self.form_json_path),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// 检查配置是否可用
    pub fn validate(&self) -> Result<(), ConfigError> {
        if url::Url::parse(&self.provider_base_url).is_err() {
            return Err(ConfigError::InvalidValue {
                key: "provider_base_url",
                value: self.provider_base_url.clone(),
            });
        }
        if self.max_concurrent_users == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_concurrent_users",
                value: self.max_concurrent_users.to_string(),
            });
        }
        if self.failure_log_file.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "failure_log_file",
                value: self.failure_log_file.clone(),
            });
        }
        Ok(())
    }
}
