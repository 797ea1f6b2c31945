/// LLM API 客户端
///
/// 面向 OpenAI 兼容的推理服务（如 vLLM）。请求体用 `async-openai` 的类型构建，
/// 再附加服务端扩展字段 `top_k` 与 `chat_template_kwargs`；响应中额外读取
/// `reasoning_content`。
use std::time::Duration;

use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clients::http::{build_client, join_url, read_json};
use crate::config::InferenceConfig;
use crate::error::{AppError, AppResult, LlmError};
use crate::models::record::CompletionRecord;

/// 采样参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub enable_thinking: bool,
}

impl SamplingParams {
    pub fn from_config(config: &InferenceConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            enable_thinking: config.enable_thinking(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatTemplateKwargs {
    enable_thinking: bool,
}

/// 标准请求加上服务端扩展字段
#[derive(Debug, Serialize)]
struct VendorChatRequest {
    #[serde(flatten)]
    request: CreateChatCompletionRequest,
    max_tokens: u32,
    top_k: u32,
    chat_template_kwargs: ChatTemplateKwargs,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
}

/// LLM 客户端
pub struct LlmClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model_name: String,
    sampling: SamplingParams,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(config: &InferenceConfig) -> AppResult<Self> {
        Self::with_settings(
            &config.base_url,
            &config.api_key,
            &config.model,
            SamplingParams::from_config(config),
            config.http_timeout(),
        )
    }

    pub fn with_settings(
        base_url: &str,
        api_key: impl Into<String>,
        model_name: impl Into<String>,
        sampling: SamplingParams,
        timeout: Duration,
    ) -> AppResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: join_url(base_url, "chat/completions"),
            api_key: api_key.into(),
            model_name: model_name.into(),
            sampling,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn build_request(&self, prompt: &str) -> Result<VendorChatRequest, LlmError> {
        let user_message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![ChatCompletionRequestMessage::User(user_message)])
            .temperature(self.sampling.temperature)
            .top_p(self.sampling.top_p)
            .build()?;

        Ok(VendorChatRequest {
            request,
            max_tokens: self.sampling.max_tokens,
            top_k: self.sampling.top_k,
            chat_template_kwargs: ChatTemplateKwargs {
                enable_thinking: self.sampling.enable_thinking,
            },
        })
    }

    /// 发送单条用户消息
    ///
    /// # 返回
    /// 第一个 choice 的 `content` 与 `reasoning_content`
    pub async fn complete(&self, prompt: &str) -> AppResult<CompletionRecord> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", prompt.chars().count());

        let body = self.build_request(prompt)?;
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&self.endpoint, e))?;
        let parsed: ChatResponse = read_json(response, &self.endpoint).await?;

        let message = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::EmptyChoices {
                model: self.model_name.clone(),
            })?
            .message;

        debug!("LLM API 调用成功");
        Ok(CompletionRecord {
            reasoning_content: message.reasoning_content,
            content: message.content,
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> LlmClient {
        LlmClient::with_settings(
            "http://localhost:8000/v1/",
            "EMPTY",
            "qwen",
            SamplingParams {
                max_tokens: 128,
                temperature: 0.5,
                top_p: 0.75,
                top_k: 20,
                enable_thinking: false,
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn request_carries_vendor_fields() {
        let llm = client();
        assert_eq!(llm.endpoint, "http://localhost:8000/v1/chat/completions");

        let body = serde_json::to_value(llm.build_request("hello").unwrap()).unwrap();
        assert_eq!(body["model"], "qwen");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert_eq!(body["max_tokens"], 128);
        assert_eq!(body["top_k"], 20);
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["top_p"], 0.75);
        assert_eq!(body["chat_template_kwargs"]["enable_thinking"], false);
    }
}
