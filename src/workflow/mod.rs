pub mod inference_flow;
pub mod record_ctx;
pub mod speech_flow;
pub mod video_flow;

pub use inference_flow::{InferenceFlow, InferenceOutcome};
pub use record_ctx::{ItemOutcome, RecordCtx};
pub use speech_flow::SpeechFlow;
pub use video_flow::VideoFlow;
