//! 运行配置
//!
//! 每个批处理任务一份扁平配置，启动时从命令行解析（均可由环境变量提供），
//! 解析后经 `normalized()` 夹紧到合理下限，此后只读。

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::Serialize;

use crate::services::poller::CompletionMatcher;
use crate::services::retry::RetryPolicy;

/// 视频合成任务配置
#[derive(Parser, Clone, Debug, Serialize)]
#[command(name = "gen_video", about = "提交音频与参考视频，批量生成口型同步视频")]
pub struct VideoConfig {
    /// 输入 JSON 文件（仅用于确定任务数量与顺序）
    #[arg(long, env = "GEN_VIDEO_TEXT_FILE", default_value = "patient_results.json")]
    pub text_file: PathBuf,
    /// 参考视频路径
    #[arg(long, env = "GEN_VIDEO_REF_VIDEO", default_value = "ref_face.mp4")]
    pub ref_video_path: String,
    /// 提交接口 URL
    #[arg(long, env = "GEN_VIDEO_SUBMIT_URL", default_value = "http://127.0.0.1:8383/easy/submit")]
    pub submit_url: String,
    /// 查询接口基础 URL
    #[arg(long, env = "GEN_VIDEO_QUERY_URL_BASE", default_value = "http://127.0.0.1:8383")]
    pub query_url_base: String,
    /// 音频文件名前缀 URL（例如 http://host/audio）
    #[arg(long, env = "GEN_VIDEO_AUDIO_BASE_URL")]
    pub audio_base_url: Option<String>,
    /// 元数据 sidecar 存放目录
    #[arg(long, env = "GEN_VIDEO_METADATA_DIR", default_value = ".")]
    pub metadata_dir: PathBuf,
    /// 只记录将要提交的内容，不发起请求
    #[arg(long, env = "GEN_VIDEO_DRY_RUN")]
    pub dry_run: bool,
    /// 跳过已有 sidecar 的任务
    #[arg(long, env = "GEN_VIDEO_RESUME")]
    pub resume: bool,
    /// 为每个任务写入 sidecar 元数据
    #[arg(long, env = "GEN_VIDEO_WRITE_METADATA")]
    pub write_metadata: bool,
    /// 提交失败后的重试次数
    #[arg(long, env = "GEN_VIDEO_RETRIES", default_value_t = 0)]
    pub retries: u32,
    /// HTTP 超时（秒）
    #[arg(long, env = "GEN_VIDEO_TIMEOUT", default_value_t = 15.0)]
    pub timeout: f64,
    /// 任务间隔（秒）
    #[arg(long, env = "GEN_VIDEO_SLEEP_SECONDS", default_value_t = 0.0)]
    pub sleep_seconds: f64,
    /// 提交后轮询任务状态
    #[arg(long, env = "GEN_VIDEO_POLL_PROGRESS")]
    pub poll_progress: bool,
    /// 轮询间隔（秒）
    #[arg(long, env = "GEN_VIDEO_POLL_INTERVAL", default_value_t = 2.0)]
    pub poll_interval: f64,
    /// 轮询最长时间（秒）
    #[arg(long, env = "GEN_VIDEO_POLL_TIMEOUT", default_value_t = 300.0)]
    pub poll_timeout: f64,
    /// 状态 JSON 中表示完成状态的字段（支持 a.b 路径）
    #[arg(long, env = "GEN_VIDEO_COMPLETION_FIELD", default_value = "status")]
    pub completion_field: String,
    /// 视为完成的状态值，可重复或以逗号分隔；能解析为 JSON 的按 JSON 比较
    #[arg(
        long = "completion-value",
        env = "GEN_VIDEO_COMPLETION_VALUES",
        value_delimiter = ',',
        default_values_t = ["completed".to_string(), "done".to_string(), "2".to_string()]
    )]
    pub completion_values: Vec<String>,
    /// 结果 JSON 输出路径
    #[arg(long, env = "GEN_VIDEO_RESULTS_JSON")]
    pub results_json: Option<PathBuf>,
    /// 结果 CSV 输出路径
    #[arg(long, env = "GEN_VIDEO_RESULTS_CSV")]
    pub results_csv: Option<PathBuf>,
    /// JSONL 遥测日志
    #[arg(long, env = "GEN_VIDEO_HOOKS_LOG")]
    pub hooks_log: Option<PathBuf>,
    /// 运行汇总 JSON
    #[arg(long, env = "GEN_VIDEO_RUN_SUMMARY")]
    pub run_summary: Option<PathBuf>,
    /// 失败达到该数量后提前终止
    #[arg(long, env = "GEN_VIDEO_MAX_FAILURES")]
    pub max_failures: Option<usize>,
}

impl VideoConfig {
    pub fn normalized(mut self) -> Self {
        self.timeout = self.timeout.max(1.0);
        self.sleep_seconds = self.sleep_seconds.max(0.0);
        self.poll_interval = self.poll_interval.max(0.5);
        self.poll_timeout = self.poll_timeout.max(1.0);
        self
    }

    pub fn http_timeout(&self) -> Duration {
        secs(self.timeout)
    }

    pub fn pacing(&self) -> Duration {
        secs(self.sleep_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        secs(self.poll_interval)
    }

    pub fn poll_timeout(&self) -> Duration {
        secs(self.poll_timeout)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries)
    }

    pub fn completion_matcher(&self) -> CompletionMatcher {
        CompletionMatcher::from_cli(&self.completion_field, &self.completion_values)
    }
}

/// 语音引擎类型
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// 本地 TTS 命令行程序
    Command,
    /// 声音克隆 HTTP 服务
    Http,
}

/// 批量语音合成配置
#[derive(Parser, Clone, Debug, Serialize)]
#[command(name = "tts_batch", about = "为患者结果批量合成语音")]
pub struct TtsConfig {
    /// TTS 模型名称
    #[arg(long, env = "TTS_MODEL_NAME", default_value = "tts_models/multilingual/multi-dataset/xtts_v2")]
    pub model_name: String,
    /// 输入 JSON 文件
    #[arg(long, env = "TTS_INPUT_JSON", default_value = "patient_results.json")]
    pub input_json: PathBuf,
    /// wav 输出目录
    #[arg(long, env = "TTS_OUTPUT_DIR", default_value = "gen_audio_data")]
    pub output_dir: PathBuf,
    /// 参考说话人音频
    #[arg(long, env = "TTS_SPEAKER_WAV", default_value = "speaker.wav")]
    pub speaker_wav: PathBuf,
    /// 语言代码
    #[arg(long, env = "TTS_LANGUAGE", default_value = "en")]
    pub language: String,
    /// 强制 CPU 推理
    #[arg(long, env = "TTS_CPU")]
    pub cpu: bool,
    /// 最多处理的条目数
    #[arg(long, env = "TTS_LIMIT")]
    pub limit: Option<usize>,
    /// 语音引擎
    #[arg(long, value_enum, env = "TTS_ENGINE", default_value_t = EngineKind::Command)]
    pub engine: EngineKind,
    /// command 引擎调用的程序
    #[arg(long, env = "TTS_COMMAND", default_value = "tts")]
    pub tts_command: String,
    /// http 引擎的服务地址
    #[arg(long, env = "TTS_VOICE_BASE_URL", default_value = "http://127.0.0.1:18180")]
    pub voice_base_url: String,
    /// http 引擎超时（秒）
    #[arg(long, env = "TTS_TIMEOUT", default_value_t = 120.0)]
    pub timeout: f64,
    /// 只处理并记录，不合成音频
    #[arg(long, env = "TTS_DRY_RUN")]
    pub dry_run: bool,
    /// 跳过已存在的输出文件
    #[arg(long, env = "TTS_RESUME")]
    pub resume: bool,
    /// 用于生成输出文件名的字段
    #[arg(long, env = "TTS_FILENAME_FIELD")]
    pub filename_field: Option<String>,
    /// 为每个条目写入 sidecar 元数据
    #[arg(long, env = "TTS_WRITE_METADATA")]
    pub write_metadata: bool,
    /// 将换行规整为空格
    #[arg(long, env = "TTS_STRIP_NEWLINES")]
    pub strip_newlines: bool,
    /// 不展开缩写（例如 ICH）
    #[arg(long, env = "TTS_NO_ACRONYM")]
    pub no_acronym: bool,
    /// 合成失败后的重试次数
    #[arg(long, env = "TTS_RETRIES", default_value_t = 0)]
    pub retries: u32,
    /// 条目间隔（秒）
    #[arg(long, env = "TTS_SLEEP_SECONDS", default_value_t = 0.0)]
    pub sleep_seconds: f64,
    /// JSONL 遥测日志
    #[arg(long, env = "TTS_HOOKS_LOG")]
    pub hooks_log: Option<PathBuf>,
    /// 运行汇总 JSON
    #[arg(long, env = "TTS_RUN_SUMMARY")]
    pub run_summary: Option<PathBuf>,
    /// 失败达到该数量后提前终止
    #[arg(long, env = "TTS_MAX_FAILURES")]
    pub max_failures: Option<usize>,
    /// 结果 JSON 输出路径
    #[arg(long, env = "TTS_RESULTS_JSON")]
    pub results_json: Option<PathBuf>,
    /// 结果 CSV 输出路径
    #[arg(long, env = "TTS_RESULTS_CSV")]
    pub results_csv: Option<PathBuf>,
}

impl TtsConfig {
    pub fn normalized(mut self) -> Self {
        self.timeout = self.timeout.max(1.0);
        self.sleep_seconds = self.sleep_seconds.max(0.0);
        self
    }

    pub fn gpu(&self) -> bool {
        !self.cpu
    }

    pub fn expand_acronyms(&self) -> bool {
        !self.no_acronym
    }

    pub fn http_timeout(&self) -> Duration {
        secs(self.timeout)
    }

    pub fn pacing(&self) -> Duration {
        secs(self.sleep_seconds)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries)
    }
}

/// 提示词中病例字段使用的标签语言
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptLanguage {
    #[default]
    En,
    Zh,
}

/// LLM 推理配置
#[derive(Parser, Clone, Debug)]
#[command(name = "infer_prompts", about = "为 ICH 病例批量生成患者/医生提示词并调用 LLM")]
pub struct InferenceConfig {
    /// 包含患者数据的 Excel 文件
    #[arg(env = "LLM_DATA_PATH")]
    pub data_path: PathBuf,
    /// 模型名称
    #[arg(long, env = "LLM_MODEL_NAME", default_value = "/devdata/llm_weights/Qwen3-30B-A3B")]
    pub model: String,
    /// OpenAI 兼容接口地址
    #[arg(long, env = "LLM_API_BASE_URL", default_value = "http://localhost:8000/v1")]
    pub base_url: String,
    /// API 密钥
    #[arg(long, env = "LLM_API_KEY", default_value = "EMPTY", hide_env_values = true)]
    pub api_key: String,
    /// 输出目录
    #[arg(long, env = "LLM_OUTPUT_DIR", default_value = "./Qwen3-30B-A3B_result/eng")]
    pub output_dir: PathBuf,
    /// Excel 工作表索引
    #[arg(long, env = "LLM_SHEET_INDEX", default_value_t = 0)]
    pub sheet_index: usize,
    #[arg(long, env = "LLM_MAX_TOKENS", default_value_t = 32768)]
    pub max_tokens: u32,
    #[arg(long, env = "LLM_TEMPERATURE", default_value_t = 0.6)]
    pub temperature: f32,
    #[arg(long, env = "LLM_TOP_P", default_value_t = 0.95)]
    pub top_p: f32,
    #[arg(long, env = "LLM_TOP_K", default_value_t = 20)]
    pub top_k: u32,
    /// 最多处理的行数
    #[arg(long, env = "LLM_LIMIT_ROWS")]
    pub limit_rows: Option<usize>,
    /// 关闭模型的思考输出
    #[arg(long, env = "LLM_DISABLE_THINKING")]
    pub disable_thinking: bool,
    /// 病例字段标签语言
    #[arg(long, value_enum, env = "LLM_PROMPT_LANGUAGE", default_value_t = PromptLanguage::En)]
    pub prompt_language: PromptLanguage,
    /// 指南与临床试验文本（TOML），缺省使用内置文本
    #[arg(long, env = "ICH_GUIDELINES")]
    pub guidelines: Option<PathBuf>,
    /// 调用失败后的重试次数
    #[arg(long, env = "LLM_RETRIES", default_value_t = 0)]
    pub retries: u32,
    /// 单次请求超时（秒）
    #[arg(long, env = "LLM_TIMEOUT", default_value_t = 600.0)]
    pub timeout: f64,
    /// 只生成提示词，不调用 LLM
    #[arg(long, env = "LLM_DRY_RUN")]
    pub dry_run: bool,
    /// 额外保存 prompts.json
    #[arg(long, env = "LLM_SAVE_PROMPTS")]
    pub save_prompts: bool,
}

impl InferenceConfig {
    pub fn normalized(mut self) -> Self {
        self.timeout = self.timeout.max(1.0);
        self
    }

    pub fn enable_thinking(&self) -> bool {
        !self.disable_thinking
    }

    pub fn http_timeout(&self) -> Duration {
        secs(self.timeout)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries)
    }
}

/// 指南文本工具配置
#[derive(Parser, Clone, Debug)]
#[command(name = "guideline_tool", about = "检索、列出或导出提示词引用的指南文本")]
pub struct GuidelineToolConfig {
    /// 指南与临床试验文本（TOML），缺省使用内置文本
    #[arg(long, env = "ICH_GUIDELINES")]
    pub guidelines: Option<PathBuf>,
    /// 检索关键词（大小写不敏感）
    #[arg(long, env = "GUIDELINE_SEARCH")]
    pub search: Option<String>,
    /// 文本来源：guideline / clinical_trials；缺省时检索两者
    #[arg(long, env = "GUIDELINE_SOURCE")]
    pub source: Option<String>,
    /// 列出指定来源的全部段落
    #[arg(long, env = "GUIDELINE_LIST")]
    pub list: bool,
    /// 最多显示的段落数
    #[arg(long, env = "GUIDELINE_LIMIT", default_value_t = 5)]
    pub limit: usize,
    /// 以 JSON 导出两份文本到该路径
    #[arg(long, env = "GUIDELINE_EXPORT")]
    pub export: Option<PathBuf>,
}

/// 秒数配置的上限，超出或无法表示的值按此处理
pub const MAX_CONFIG_DURATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0))
        .unwrap_or(MAX_CONFIG_DURATION)
        .min(MAX_CONFIG_DURATION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_defaults_follow_service_layout() {
        let config = VideoConfig::parse_from(["gen_video"]).normalized();
        assert_eq!(config.submit_url, "http://127.0.0.1:8383/easy/submit");
        assert_eq!(config.query_url_base, "http://127.0.0.1:8383");
        assert_eq!(config.retries, 0);
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.completion_values, vec!["completed", "done", "2"]);
    }

    #[test]
    fn normalized_clamps_lower_bounds() {
        let config = VideoConfig::parse_from([
            "gen_video",
            "--timeout",
            "0.1",
            "--poll-interval",
            "0.01",
            "--poll-timeout",
            "0",
            "--sleep-seconds=-3",
        ])
        .normalized();
        assert_eq!(config.timeout, 1.0);
        assert_eq!(config.poll_interval, 0.5);
        assert_eq!(config.poll_timeout, 1.0);
        assert_eq!(config.pacing(), Duration::ZERO);
    }

    #[test]
    fn oversized_durations_are_capped() {
        let config = VideoConfig::parse_from([
            "gen_video",
            "--poll-timeout",
            "1e20",
            "--timeout",
            "inf",
            "--sleep-seconds",
            "NaN",
        ])
        .normalized();
        assert_eq!(config.poll_timeout(), MAX_CONFIG_DURATION);
        assert_eq!(config.http_timeout(), MAX_CONFIG_DURATION);
        assert_eq!(config.pacing(), Duration::ZERO);
    }

    #[test]
    fn switches_and_lists_read_environment() {
        std::env::set_var("TTS_STRIP_NEWLINES", "true");
        std::env::set_var("TTS_MAX_FAILURES", "3");
        let config = TtsConfig::parse_from(["tts_batch"]);
        std::env::remove_var("TTS_STRIP_NEWLINES");
        std::env::remove_var("TTS_MAX_FAILURES");
        assert!(config.strip_newlines);
        assert_eq!(config.max_failures, Some(3));

        let video = VideoConfig::parse_from(["gen_video", "--completion-value", "finished,3"]);
        assert_eq!(video.completion_values, vec!["finished", "3"]);
    }

    #[test]
    fn tts_flags_invert_into_switches() {
        let config = TtsConfig::parse_from(["tts_batch", "--cpu", "--no-acronym", "--engine", "http"]);
        assert!(!config.gpu());
        assert!(!config.expand_acronyms());
        assert_eq!(config.engine, EngineKind::Http);
    }

    #[test]
    fn inference_requires_data_path() {
        assert!(InferenceConfig::try_parse_from(["infer_prompts"]).is_err());
        let config = InferenceConfig::parse_from(["infer_prompts", "cases.xlsx", "--prompt-language", "zh"]);
        assert_eq!(config.data_path, PathBuf::from("cases.xlsx"));
        assert_eq!(config.prompt_language, PromptLanguage::Zh);
        assert!(config.enable_thinking());
        assert_eq!(config.top_k, 20);
    }

    #[test]
    fn guideline_tool_defaults() {
        let config = GuidelineToolConfig::parse_from(["guideline_tool", "--search", "ENRICH"]);
        assert_eq!(config.search.as_deref(), Some("ENRICH"));
        assert_eq!(config.limit, 5);
        assert!(config.source.is_none());
        assert!(!config.list);
    }
}
