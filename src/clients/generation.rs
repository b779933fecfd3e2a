//! 生成服务接口
//!
//! 对外部文本生成服务的抽象：输入 prompt，输出原始文本。
//! 结构化输出的声明不可信，结果一律交给响应恢复流程处理。

use async_trait::async_trait;

use crate::error::GenerationError;

/// 文本生成客户端
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// 根据错误信息归类
///
/// 服务端返回的错误只有文本可用时使用
pub fn classify_message(message: &str) -> GenerationError {
    let lower = message.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["429", "rate limit", "rate_limit", "too many requests", "tpm", "rpm"]) {
        GenerationError::rate_limited(message)
    } else if has(&["timed out", "timeout", "deadline"]) {
        GenerationError::timeout(message)
    } else if has(&[
        "401",
        "403",
        "unauthorized",
        "invalid api key",
        "invalid_api_key",
        "model_not_found",
        "does not exist",
        "context_length_exceeded",
    ]) {
        GenerationError::fatal(message)
    } else {
        GenerationError::transient(message)
    }
}
