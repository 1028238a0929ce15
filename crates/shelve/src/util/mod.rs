pub mod format;
pub mod paths;

pub use format::{format_timestamp, parse_timestamp, TIMESTAMP_FORMAT};
pub use paths::{expand_home, extension, file_name, folder, numbered_destination, stem};
