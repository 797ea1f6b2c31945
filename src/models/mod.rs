pub mod loaders;
pub mod patient;
pub mod record;
pub mod writers;

pub use loaders::{load_json_records, load_patient_cases, ColumnMap};
pub use patient::{format_volume, PatientCase};
pub use record::{CompletionRecord, RecordStatus, ResultRecord, SpeechTask, VideoTask};
pub use writers::{write_completions_csv, write_completions_xlsx, write_json, write_results_csv};
