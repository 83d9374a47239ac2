// Declare submodules
mod common;
mod extraction;
mod summarization;

pub use common::*;
pub use extraction::{event_extraction_prompt, EVENT_EXTRACTION_SYSTEM};
pub use summarization::{substory_summary_prompt, SUMMARY_SYSTEM};
