/// 声音克隆服务客户端
///
/// 先对参考音频做一次预处理，之后每条文本调用合成接口
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::clients::http::{build_client, ensure_success, join_url, read_json};
use crate::error::{AppError, AppResult};

/// 预处理结果，合成时作为参考音频与参考文本
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessResult {
    #[serde(default)]
    pub asr_format_audio_url: Option<String>,
    #[serde(default)]
    pub reference_audio_text: Option<String>,
}

/// 声音克隆服务客户端
pub struct VoiceClient {
    client: Client,
    base_url: String,
}

impl VoiceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
        })
    }

    /// 预处理参考音频
    pub async fn preprocess_audio(&self, reference_audio: &str, lang: &str) -> AppResult<PreprocessResult> {
        let url = join_url(&self.base_url, "v1/preprocess_and_tran");
        let payload = json!({
            "format": "wav",
            "reference_audio": reference_audio,
            "lang": lang,
        });
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&url, e))?;
        read_json(response, &url).await
    }

    /// 合成一段语音，返回 wav 字节
    pub async fn synthesize_audio(
        &self,
        text: &str,
        reference: &PreprocessResult,
        speaker: &str,
    ) -> AppResult<Vec<u8>> {
        let url = join_url(&self.base_url, "v1/invoke");
        let payload = json!({
            "speaker": speaker,
            "text": text,
            "format": "wav",
            "topP": 0.7,
            "max_new_tokens": 1024,
            "chunk_length": 100,
            "repetition_penalty": 1.2,
            "temperature": 0.7,
            "need_asr": false,
            "streaming": false,
            "is_fixed_seed": 0,
            "is_norm": 0,
            "reference_audio": reference.asr_format_audio_url,
            "reference_text": reference.reference_audio_text,
        });
        debug!("调用语音合成 {} ({} 字符)", speaker, text.chars().count());

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&url, e))?;
        let response = ensure_success(response, &url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::api_request_failed(&url, e))?;
        Ok(bytes.to_vec())
    }
}
