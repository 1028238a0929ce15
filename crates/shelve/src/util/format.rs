use chrono::{Local, NaiveDateTime, SubsecRound};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text.trim(), TIMESTAMP_FORMAT).ok()
}

/// Local time truncated to the precision the history file keeps.
pub fn now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(6)
}
