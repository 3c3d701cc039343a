pub mod line;
pub mod tail;

pub use line::{parse_line, strip_colors, LogEvent};
pub use tail::LogTail;
