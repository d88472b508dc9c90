use chrono::prelude::*;

/// Layout of the timestamp embedded in rotated file names. Dashes instead of
/// colons keep the names portable.
pub const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";

pub fn format_backup_time(t: &DateTime<Utc>) -> String {
    t.format(BACKUP_TIME_FORMAT).to_string()
}

pub fn parse_backup_time(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, BACKUP_TIME_FORMAT)
        .ok()
        .map(|t| Utc.from_utc_datetime(&t))
}
