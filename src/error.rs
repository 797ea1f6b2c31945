use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// HTTP 服务调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 输入数据错误
    #[error("输入错误: {0}")]
    Input(#[from] InputError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 语音合成错误
    #[error("语音合成错误: {0}")]
    Speech(#[from] SpeechError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败（超时、连接失败等）
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 非 2xx 响应
    #[error("API返回错误状态 ({endpoint}): status={status}, body={body}")]
    BadStatus {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// JSON 解析失败
    #[error("JSON解析失败 ({endpoint}): {source}")]
    JsonParseFailed {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// JSON 读写失败
    #[error("JSON处理失败 ({path}): {source}")]
    JsonFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// Excel 读取失败
    #[error("Excel读取失败 ({path}): {source}")]
    ExcelReadFailed {
        path: String,
        #[source]
        source: calamine::Error,
    },
    /// Excel 写入失败
    #[error("Excel写入失败 ({path}): {source}")]
    ExcelWriteFailed {
        path: String,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },
    /// CSV 写入失败
    #[error("CSV写入失败 ({path}): {source}")]
    CsvWriteFailed {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// 输入数据错误
#[derive(Debug, Error)]
pub enum InputError {
    /// JSON 顶层不是数组
    #[error("输入文件顶层必须是 JSON 数组: {path}")]
    NotAnArray { path: String },
    /// 工作表不存在
    #[error("工作表索引 {index} 不存在: {path}")]
    SheetNotFound { path: String, index: usize },
    /// 缺少必需的列
    #[error("缺少 {logical} 列，期望其中之一 {expected:?}；现有列: {available}")]
    MissingColumn {
        logical: String,
        expected: Vec<String>,
        available: String,
    },
    /// 单元格内容无法解析为体积
    #[error("第 {row} 行 {column} 无法解析为数值: '{value}'")]
    InvalidVolume {
        row: usize,
        column: String,
        value: String,
    },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// 请求构建失败
    #[error("LLM请求构建失败: {0}")]
    RequestBuild(#[from] async_openai::error::OpenAIError),
    /// 返回结果为空
    #[error("LLM返回结果为空 (模型: {model})")]
    EmptyChoices { model: String },
}

/// 语音合成错误
#[derive(Debug, Error)]
pub enum SpeechError {
    /// 参考音频不存在
    #[error("参考音频不存在: {path}")]
    SpeakerWavMissing { path: String },
    /// 引擎初始化失败
    #[error("语音引擎 {engine} 初始化失败: {reason}")]
    EngineInit { engine: String, reason: String },
    /// 无法启动外部程序
    #[error("无法启动 {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// 外部程序返回非零状态
    #[error("{program} 退出状态 {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 未知的指南文本来源
    #[error("未知的文本来源 '{source_name}'")]
    UnknownSource { source_name: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建API请求失败错误
    pub fn api_request_failed(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        AppError::Api(ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source,
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建 JSON 读写错误
    pub fn json_failed(path: impl Into<String>, source: serde_json::Error) -> Self {
        AppError::File(FileError::JsonFailed {
            path: path.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
