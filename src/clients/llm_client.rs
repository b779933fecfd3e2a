//! OpenAI 兼容的生成客户端
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::clients::generation::{classify_message, GenerationClient};
use crate::config::Config;
use crate::error::GenerationError;

/// LLM 生成客户端
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
    timeout: Duration,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            temperature: config.llm_temperature,
            timeout: config.request_timeout(),
        }
    }

    async fn send(&self, prompt: &str) -> Result<String, GenerationError> {
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(classify_openai_error)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
            .temperature(self.temperature)
            .build()
            .map_err(classify_openai_error)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            classify_openai_error(e)
        })?;

        // 提取响应内容
        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|content| content.trim().to_string())
            .ok_or_else(|| GenerationError::transient("LLM 返回内容为空"))
    }
}

/// 把 SDK 错误归类为可重试 / 不可重试
fn classify_openai_error(err: OpenAIError) -> GenerationError {
    match err {
        // 请求参数本身有问题，重试没有意义
        OpenAIError::InvalidArgument(message) => GenerationError::fatal(message),
        other => classify_message(&other.to_string()),
    }
}

#[async_trait]
impl GenerationClient for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        debug!(
            "调用 LLM API，模型: {}，prompt 长度: {} 字符",
            self.model_name,
            prompt.len()
        );
        match tokio::time::timeout(self.timeout, self.send(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::timeout(format!(
                "{} 秒内未返回",
                self.timeout.as_secs()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_is_fatal() {
        let err = classify_openai_error(OpenAIError::InvalidArgument("bad".to_string()));
        assert!(!err.is_retryable());
    }

    /// 测试真实 API 调用（需要网络和有效的 API key）
    #[tokio::test]
    #[ignore]
    async fn test_live_generate() {
        let config = Config::from_env();
        let client = LlmClient::new(&config);
        let result = client
            .generate(r#"Return exactly this JSON array: [{"type":"paragraph","content":[{"type":"text","text":"ok"}]}]"#)
            .await;
        println!("LLM 响应: {:?}", result);
        assert!(result.is_ok());
    }
}
