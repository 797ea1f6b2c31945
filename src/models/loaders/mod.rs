pub mod excel_loader;
pub mod json_loader;

pub use excel_loader::{load_patient_cases, ColumnMap};
pub use json_loader::load_json_records;
