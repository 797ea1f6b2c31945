//! # ICH Agent Pipeline
//!
//! 面向脑出血（ICH）临床辅助决策流程的批处理任务集合：
//! 口型同步视频生成、批量语音合成、病例提示词构建与 LLM 推理。
//!
//! ## 架构设计
//!
//! 本系统沿用分层架构：
//!
//! ### ① 外部服务层（Clients）
//! - `clients/` - 只负责与外部 HTTP 服务通信
//! - `VideoClient` - 提交视频任务、查询进度
//! - `VoiceClient` - 声音克隆服务
//! - `LlmClient` - OpenAI 兼容推理服务
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单条记录
//! - `RetryPolicy` - 有界重试
//! - `poll_until_complete` - 进度轮询
//! - `SpeechEngine` - 语音合成
//! - `PromptGenerator` - 提示词生成
//! - `RunRecorder` - 遥测与失败护栏
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一条记录"的完整处理流程
//! - `RecordCtx` - 上下文封装（序号 + 标识）
//! - `VideoFlow` / `SpeechFlow` / `InferenceFlow`
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/` - 读取输入、逐条调度、汇总并写出结果
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod guideline;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod text;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{GuidelineToolConfig, InferenceConfig, TtsConfig, VideoConfig};
pub use error::{AppError, AppResult};
pub use orchestrator::{InferenceRunner, RunReport, TtsRunner, VideoRunner};
pub use workflow::{ItemOutcome, RecordCtx};
