//! 语音合成引擎 - 业务能力层
//!
//! 只负责"把一段文本合成为 wav 文件"，不关心批处理流程

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::clients::voice_client::{PreprocessResult, VoiceClient};
use crate::error::{AppError, AppResult, SpeechError};
use crate::utils::logging::truncate_text;

/// 一次合成请求
#[derive(Debug, Clone, Copy)]
pub struct SpeechRequest<'a> {
    /// 规范化后的文本
    pub text: &'a str,
    /// 输出 wav 路径
    pub out_path: &'a Path,
    /// 说话人标识（通常是输出文件名）
    pub speaker: &'a str,
}

/// 语音合成能力
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    fn name(&self) -> &str;

    /// 批处理开始前调用一次，失败则整个批次终止
    async fn prepare(&mut self) -> AppResult<()> {
        Ok(())
    }

    async fn synthesize(&self, request: &SpeechRequest<'_>) -> AppResult<()>;
}

/// 调用本地 TTS 命令行程序（Coqui `tts`）
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    model_name: String,
    speaker_wav: PathBuf,
    language: String,
    gpu: bool,
}

impl CommandEngine {
    pub fn new(
        program: impl Into<String>,
        model_name: impl Into<String>,
        speaker_wav: impl Into<PathBuf>,
        language: impl Into<String>,
        gpu: bool,
    ) -> Self {
        Self {
            program: program.into(),
            model_name: model_name.into(),
            speaker_wav: speaker_wav.into(),
            language: language.into(),
            gpu,
        }
    }

    /// 单次合成的命令行参数
    pub fn arguments(&self, request: &SpeechRequest<'_>) -> Vec<String> {
        let mut args = vec![
            "--model_name".to_string(),
            self.model_name.clone(),
            "--text".to_string(),
            request.text.to_string(),
            "--speaker_wav".to_string(),
            self.speaker_wav.display().to_string(),
            "--language_idx".to_string(),
            self.language.clone(),
            "--out_path".to_string(),
            request.out_path.display().to_string(),
        ];
        if self.gpu {
            args.push("--use_cuda".to_string());
            args.push("true".to_string());
        }
        args
    }

    async fn run(&self, args: &[String]) -> AppResult<()> {
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| SpeechError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpeechError::CommandFailed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: truncate_text(stderr.trim(), 500),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl SpeechEngine for CommandEngine {
    fn name(&self) -> &str {
        "command"
    }

    async fn prepare(&mut self) -> AppResult<()> {
        info!("🔧 检查 TTS 程序: {} (模型 {}, gpu={})", self.program, self.model_name, self.gpu);
        self.run(&["--help".to_string()]).await.map_err(|e| {
            AppError::from(SpeechError::EngineInit {
                engine: self.program.clone(),
                reason: e.to_string(),
            })
        })
    }

    async fn synthesize(&self, request: &SpeechRequest<'_>) -> AppResult<()> {
        debug!("{} -> {}", self.program, request.out_path.display());
        self.run(&self.arguments(request)).await
    }
}

/// 通过声音克隆 HTTP 服务合成
pub struct HttpVoiceEngine {
    client: VoiceClient,
    reference_audio: String,
    language: String,
    reference: Option<PreprocessResult>,
}

impl HttpVoiceEngine {
    pub fn new(client: VoiceClient, reference_audio: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            client,
            reference_audio: reference_audio.into(),
            language: language.into(),
            reference: None,
        }
    }
}

#[async_trait]
impl SpeechEngine for HttpVoiceEngine {
    fn name(&self) -> &str {
        "http"
    }

    async fn prepare(&mut self) -> AppResult<()> {
        info!("🔧 预处理参考音频: {}", self.reference_audio);
        let reference = self
            .client
            .preprocess_audio(&self.reference_audio, &self.language)
            .await
            .map_err(|e| {
                AppError::from(SpeechError::EngineInit {
                    engine: "http".to_string(),
                    reason: e.to_string(),
                })
            })?;
        debug!("参考音频预处理结果: {:?}", reference);
        self.reference = Some(reference);
        Ok(())
    }

    async fn synthesize(&self, request: &SpeechRequest<'_>) -> AppResult<()> {
        let reference = self.reference.as_ref().ok_or_else(|| SpeechError::EngineInit {
            engine: "http".to_string(),
            reason: "参考音频尚未预处理".to_string(),
        })?;

        let audio = self
            .client
            .synthesize_audio(request.text, reference, request.speaker)
            .await?;
        tokio::fs::write(request.out_path, &audio)
            .await
            .map_err(|e| AppError::file_write_failed(request.out_path.display().to_string(), e))?;
        debug!("已写入 {} ({} 字节)", request.out_path.display(), audio.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_arguments_follow_cli_flags() {
        let engine = CommandEngine::new("tts", "xtts_v2", "speaker.wav", "en", true);
        let out = PathBuf::from("out/001.wav");
        let args = engine.arguments(&SpeechRequest {
            text: "hello",
            out_path: &out,
            speaker: "001",
        });
        assert_eq!(
            args,
            vec![
                "--model_name", "xtts_v2", "--text", "hello", "--speaker_wav", "speaker.wav",
                "--language_idx", "en", "--out_path", "out/001.wav", "--use_cuda", "true",
            ]
        );

        let cpu = CommandEngine::new("tts", "xtts_v2", "speaker.wav", "en", false);
        assert!(!cpu
            .arguments(&SpeechRequest {
                text: "x",
                out_path: &out,
                speaker: "001",
            })
            .contains(&"--use_cuda".to_string()));
    }

    #[tokio::test]
    async fn missing_program_fails_preparation() {
        let mut engine = CommandEngine::new(
            "definitely-not-a-tts-binary-7f3a",
            "xtts_v2",
            "speaker.wav",
            "en",
            false,
        );
        let err = engine.prepare().await.unwrap_err();
        assert!(matches!(err, AppError::Speech(SpeechError::EngineInit { .. })));
    }

    #[tokio::test]
    async fn http_engine_requires_preparation() {
        let client = VoiceClient::new("http://127.0.0.1:9", std::time::Duration::from_secs(1)).unwrap();
        let engine = HttpVoiceEngine::new(client, "speaker.wav", "en");
        let out = PathBuf::from("never.wav");
        let err = engine
            .synthesize(&SpeechRequest {
                text: "x",
                out_path: &out,
                speaker: "001",
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Speech(SpeechError::EngineInit { .. })));
    }
}
