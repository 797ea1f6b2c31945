//! 提示词引用的指南与临床试验文本

pub mod repository;
pub mod toolkit;

pub use repository::{GuidelineDocument, GuidelineRepository};
pub use toolkit::{summarize_blocks, GuidelineToolkit};
