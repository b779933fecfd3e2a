use std::time::Duration;

use crate::error::{AppError, AppResult};

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 每批同时处理的章节数量
    pub batch_size: usize,
    /// 批次之间的间隔（毫秒）
    pub batch_pause_ms: u64,
    /// 每个章节最多尝试的生成次数
    pub max_attempts: u32,
    /// 单次生成调用的超时（秒）
    pub request_timeout_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_temperature: f32,
    // --- 填充模式 ---
    /// 占位符名称，`[Country]` / `{Country}` 中的 `Country`
    pub placeholder_name: String,
    // --- 文件 ---
    pub request_file: String,
    pub output_file: String,
    /// 章节注册表（TOML），缺省使用内置注册表
    pub registry_file: Option<String>,
    /// 预计算的章节边界（JSON）
    pub boundary_cache_file: Option<String>,
    /// 参考资料（JSON）
    pub reference_store_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: 2,
            batch_pause_ms: 1000,
            max_attempts: 5,
            request_timeout_secs: 120,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            llm_temperature: 0.3,
            placeholder_name: "Country".to_string(),
            request_file: "request.json".to_string(),
            output_file: "response.json".to_string(),
            registry_file: None,
            boundary_cache_file: None,
            reference_store_file: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            batch_size: env_parse("BATCH_SIZE", default.batch_size),
            batch_pause_ms: env_parse("BATCH_PAUSE_MS", default.batch_pause_ms),
            max_attempts: env_parse("MAX_ATTEMPTS", default.max_attempts),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", default.request_timeout_secs),
            verbose_logging: env_parse("VERBOSE_LOGGING", default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            llm_temperature: env_parse("LLM_TEMPERATURE", default.llm_temperature),
            placeholder_name: std::env::var("PLACEHOLDER_NAME").unwrap_or(default.placeholder_name),
            request_file: std::env::var("REQUEST_FILE").unwrap_or(default.request_file),
            output_file: std::env::var("OUTPUT_FILE").unwrap_or(default.output_file),
            registry_file: env_optional("REGISTRY_FILE"),
            boundary_cache_file: env_optional("BOUNDARY_CACHE_FILE"),
            reference_store_file: env_optional("REFERENCE_STORE_FILE"),
        }
    }

    /// 启动时校验
    pub fn validate(&self) -> AppResult<()> {
        if self.batch_size == 0 {
            return Err(AppError::invalid_config("batch_size", "必须至少为 1"));
        }
        if self.max_attempts == 0 {
            return Err(AppError::invalid_config("max_attempts", "必须至少为 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(AppError::invalid_config("request_timeout_secs", "必须至少为 1"));
        }
        if self.llm_model_name.trim().is_empty() {
            return Err(AppError::invalid_config("llm_model_name", "不能为空"));
        }
        if self.placeholder_name.trim().is_empty() {
            return Err(AppError::invalid_config("placeholder_name", "不能为空"));
        }
        Ok(())
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
