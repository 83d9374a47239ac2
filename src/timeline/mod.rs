pub mod assembly;
pub mod format;
pub mod types;

pub use assembly::{assemble, positional_title, validate, WindowParts};
pub use format::{format_time_window, parse_time_window, TimeWindowParseError, TIME_WINDOW_SEPARATOR};
pub use types::{Substory, Timeline, TimelineWindow};
