//! 各客户端共用的 HTTP 辅助函数

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::error::{ApiError, AppError, AppResult};

/// 带超时的 HTTP 客户端
pub fn build_client(timeout: Duration) -> AppResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::api_request_failed("<client>", e))
}

/// 拼接基础地址与路径
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// 非 2xx 响应转换为错误
pub async fn ensure_success(response: Response, endpoint: &str) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::BadStatus {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    }
    .into())
}

/// 读取响应体并解析 JSON
pub async fn read_json<T: DeserializeOwned>(response: Response, endpoint: &str) -> AppResult<T> {
    let response = ensure_success(response, endpoint).await?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| AppError::api_request_failed(endpoint, e))?;
    serde_json::from_slice(&bytes).map_err(|source| {
        AppError::from(ApiError::JsonParseFailed {
            endpoint: endpoint.to_string(),
            source,
        })
    })
}
