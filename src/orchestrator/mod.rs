//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度：读取输入、逐条委托流程层、
//! 控制条目间隔与失败上限、汇总并写出结果。
//!
//! ## 层次关系
//!
//! ```text
//! video_runner / tts_runner / inference_runner (处理整个输入文件)
//!     ↓
//! workflow::*Flow (处理单条记录)
//!     ↓
//! services (能力层：retry / poller / speech / prompt / telemetry)
//!     ↓
//! clients (外部服务：视频 / 声音克隆 / LLM)
//! ```
//!
//! ## 设计原则
//!
//! 1. **严格串行**：一条记录处理完才开始下一条
//! 2. **资源隔离**：只有编排层持有语音引擎与遥测记录器
//! 3. **无业务逻辑**：只做调度和统计

pub mod inference_runner;
pub mod run_report;
pub mod tts_runner;
pub mod video_runner;

pub use inference_runner::{InferenceReport, InferenceRunner, PromptEntry};
pub use run_report::RunReport;
pub use tts_runner::{build_engine, TtsRunner};
pub use video_runner::VideoRunner;
