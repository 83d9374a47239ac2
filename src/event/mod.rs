pub mod extraction;
pub mod types;

pub use extraction::{parse_event_response, EventExtractor, LlmEventExtractor};
pub use types::*;

// Module-level constants
pub const TARGET_EVENT: &str = "event";
