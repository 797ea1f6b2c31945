pub mod naming;
pub mod poller;
pub mod prompt;
pub mod retry;
pub mod sidecar;
pub mod speech;
pub mod telemetry;

pub use poller::{poll_until_complete, CompletionMatcher, PollOutcome, StatusSource};
pub use prompt::{PromptGenerator, PromptPair};
pub use retry::{RetryExhausted, RetryPolicy, Retried};
pub use speech::{CommandEngine, HttpVoiceEngine, SpeechEngine, SpeechRequest};
pub use telemetry::RunRecorder;
