pub mod http;
pub mod llm_client;
pub mod video_client;
pub mod voice_client;

pub use llm_client::{LlmClient, SamplingParams};
pub use video_client::VideoClient;
pub use voice_client::{PreprocessResult, VoiceClient};
