/// 口型同步视频服务客户端
///
/// 封装提交任务与查询进度两个接口
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::clients::http::{build_client, ensure_success, join_url, read_json};
use crate::error::{AppError, AppResult};
use crate::models::record::VideoTask;
use crate::services::poller::StatusSource;

/// 视频服务客户端
pub struct VideoClient {
    client: Client,
    submit_url: String,
    query_url_base: String,
}

impl VideoClient {
    pub fn new(
        submit_url: impl Into<String>,
        query_url_base: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            submit_url: submit_url.into(),
            query_url_base: query_url_base.into(),
        })
    }

    /// 提交合成任务，成功时任务编码即为 `speaker_id`
    pub async fn submit(&self, task: &VideoTask) -> AppResult<()> {
        debug!("提交视频任务 {} -> {}", task.speaker_id, self.submit_url);
        let response = self
            .client
            .post(&self.submit_url)
            .json(&task.submit_payload())
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&self.submit_url, e))?;
        ensure_success(response, &self.submit_url).await?;
        Ok(())
    }

    /// 查询任务进度
    pub async fn query_progress(&self, task_code: &str) -> AppResult<Value> {
        let url = join_url(&self.query_url_base, "easy/query");
        let response = self
            .client
            .get(&url)
            .query(&[("code", task_code)])
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&url, e))?;
        read_json(response, &url).await
    }
}

#[async_trait]
impl StatusSource for VideoClient {
    async fn query_status(&self, task_code: &str) -> AppResult<Value> {
        self.query_progress(task_code).await
    }
}
