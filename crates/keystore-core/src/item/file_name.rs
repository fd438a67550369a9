//! Storage file naming: `UTC--<timestamp>--<id>.json`

use chrono::{DateTime, Offset, TimeZone};

/// Format an instant as `YYYY-MM-DDTHH-MM-SS.nnnnnnnnn` plus `Z` for UTC
/// or a signed `±HHMM` offset (`+0200`, `-0030`) otherwise.
pub fn timestamp<Tz: TimeZone>(instant: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let offset_secs = instant.offset().fix().local_minus_utc();
    let zone = if offset_secs == 0 {
        "Z".to_string()
    } else {
        let sign = if offset_secs < 0 { '-' } else { '+' };
        let abs = offset_secs.unsigned_abs();
        format!("{}{:02}{:02}", sign, abs / 3600, abs % 3600 / 60)
    };
    format!("{}{}", instant.format("%Y-%m-%dT%H-%M-%S%.9f"), zone)
}

/// File name for an item created at `instant` with the given id
pub fn file_name<Tz: TimeZone>(instant: &DateTime<Tz>, id: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("UTC--{}--{}.json", timestamp(instant), id)
}
