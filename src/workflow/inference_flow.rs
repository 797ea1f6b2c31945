//! 病例推理流程 - 流程层
//!
//! 流程顺序：
//! 1. 渲染患者版、医生版提示词
//! 2. 依次调用 LLM（有界重试；演练模式不调用）
//! 3. 重试耗尽时记录错误，不中断批次

use serde::Serialize;
use tracing::{error, info};

use crate::clients::LlmClient;
use crate::models::patient::PatientCase;
use crate::models::record::CompletionRecord;
use crate::services::prompt::{PromptGenerator, PromptPair};
use crate::services::retry::RetryPolicy;
use crate::workflow::record_ctx::RecordCtx;

/// 一份病例的推理结果
#[derive(Debug, Clone, Serialize)]
pub struct InferenceOutcome {
    pub prompts: PromptPair,
    pub patient: CompletionRecord,
    pub doctor: CompletionRecord,
}

/// 病例推理流程
pub struct InferenceFlow {
    client: LlmClient,
    generator: PromptGenerator,
    retry: RetryPolicy,
    dry_run: bool,
}

impl InferenceFlow {
    pub fn new(client: LlmClient, generator: PromptGenerator, retry: RetryPolicy, dry_run: bool) -> Self {
        Self {
            client,
            generator,
            retry,
            dry_run,
        }
    }

    pub async fn run(&self, case: &PatientCase, ctx: &RecordCtx) -> InferenceOutcome {
        let prompts = self.generator.generate(case);

        if self.dry_run {
            info!(
                "{} 🧪 演练: 患者提示词 {} 字符，医生提示词 {} 字符",
                ctx,
                prompts.patient_prompt.chars().count(),
                prompts.doctor_prompt.chars().count()
            );
            return InferenceOutcome {
                prompts,
                patient: CompletionRecord::default(),
                doctor: CompletionRecord::default(),
            };
        }

        info!("{} 🤖 患者版推理 ({})", ctx, self.client.model_name());
        let patient = self.complete(&prompts.patient_prompt, "患者版", ctx).await;
        info!("{} 🤖 医生版推理 ({})", ctx, self.client.model_name());
        let doctor = self.complete(&prompts.doctor_prompt, "医生版", ctx).await;

        InferenceOutcome {
            prompts,
            patient,
            doctor,
        }
    }

    async fn complete(&self, prompt: &str, audience: &str, ctx: &RecordCtx) -> CompletionRecord {
        let label = format!("{} {}", ctx, audience);
        match self.retry.run(&label, |_| self.client.complete(prompt)).await {
            Ok(done) => done.value,
            Err(exhausted) => {
                error!(
                    "{} ❌ {}推理失败 (共尝试 {} 次): {}",
                    ctx, audience, exhausted.attempts, exhausted.last_error
                );
                CompletionRecord::failed(exhausted.last_error.to_string())
            }
        }
    }
}
