pub mod display;
pub mod filename;

pub use display::{format_time_range, format_wall_time};
pub use filename::{parse, parse_with_info, ParsedDate, PatternKind, DEFAULT_ASSUMED_OFFSET_MINUTES};
