pub mod normalizer;

pub use normalizer::{clean_text, convert_medical_units, strip_newlines, TextNormalizer};
