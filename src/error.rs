use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 请求校验错误（整个请求失败）
    #[error("请求错误: {0}")]
    Request(#[from] RequestError),
    /// 章节定位 / 注册表错误
    #[error("章节错误: {0}")]
    Section(#[from] SectionError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 请求预检错误
///
/// 在发出任何生成调用之前校验，任意一项失败都会终止整个请求
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    /// 文档没有任何内容
    #[error("文档内容为空")]
    EmptyDocument,
    /// 没有指定要编辑的章节
    #[error("至少需要指定一个章节")]
    NoSections,
    /// 编辑说明为空
    #[error("编辑说明不能为空")]
    EmptyInstructions,
    /// 填充模式缺少主体名称
    #[error("填充主体不能为空")]
    EmptySubject,
}

/// 章节相关错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SectionError {
    /// 文档中没有匹配的标题（单个章节可恢复）
    #[error("未找到章节标题: {section}")]
    NotFound { section: String },
    /// 请求的章节名不在注册表中（整个请求失败）
    #[error("无效的章节: {}", .0.join(", "))]
    InvalidSectionNames(Vec<String>),
    /// 注册表条目不合法
    #[error("章节模式不合法 ({section}): {reason}")]
    InvalidPattern { section: String, reason: String },
}

/// 生成服务错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// 请求频率限制
    #[error("请求频率限制: {message}")]
    RateLimited { message: String },
    /// 请求超时
    #[error("请求超时: {message}")]
    Timeout { message: String },
    /// 暂时性错误（网络抖动、5xx 等）
    #[error("暂时性错误: {message}")]
    Transient { message: String },
    /// 不可重试的错误
    #[error("致命错误: {message}")]
    Fatal { message: String },
}

impl GenerationError {
    pub fn rate_limited(message: impl Into<String>) -> Self {
        GenerationError::RateLimited {
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        GenerationError::Timeout {
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        GenerationError::Transient {
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        GenerationError::Fatal {
            message: message.into(),
        }
    }

    /// 是否值得重试
    pub fn is_retryable(&self) -> bool {
        !matches!(self, GenerationError::Fatal { .. })
    }
}

/// 单个恢复阶段的失败记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: &'static str,
    pub reason: String,
}

/// 所有恢复阶段都失败
///
/// 保留原始文本用于诊断，不会被强制转换为空结果
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("所有恢复阶段均失败 ({} 个阶段), 原始输出 {} 字符", .stages.len(), .raw.chars().count())]
pub struct ParseFailure {
    pub raw: String,
    pub stages: Vec<StageFailure>,
}

/// 节点违反 Block Node 结构约定
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{path}: {reason}")]
pub struct ShapeViolation {
    pub path: String,
    pub reason: String,
}

impl ShapeViolation {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 配置错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// 配置项取值不合法
    #[error("配置项 {field} 不合法: {reason}")]
    InvalidValue { field: String, reason: String },
}

// ========== 从常见错误类型转换 ==========

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建配置项错误
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Config(ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
